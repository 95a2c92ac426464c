//! Domain error types.

use chrono::NaiveDate;

use crate::domain::ohlcv::PriceField;

/// Top-level error type for barsim.
#[derive(Debug, thiserror::Error)]
pub enum BacktestError {
    #[error("no strategy has been added to the engine")]
    NoStrategy,

    #[error("no data has been added to the engine")]
    NoData,

    #[error("{field} price is undefined for bar {date}")]
    MissingPrice { date: NaiveDate, field: PriceField },

    #[error("bar dates must be strictly increasing: bar {index} ({current}) follows {previous}")]
    UnorderedDates {
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("invalid order: {reason}")]
    InvalidOrder { reason: String },

    #[error("{kind} orders are not supported")]
    UnsupportedOrderKind { kind: &'static str },

    #[error("invalid stop loss: {reason}")]
    InvalidStopLoss { reason: String },

    #[error("invalid take profit: {reason}")]
    InvalidTakeProfit { reason: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("no data for {ticker} on {exchange}")]
    NoBars { ticker: String, exchange: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BacktestError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            BacktestError::Io(_) | BacktestError::Report { .. } => 1,
            BacktestError::ConfigParse { .. }
            | BacktestError::ConfigMissing { .. }
            | BacktestError::ConfigInvalid { .. } => 2,
            BacktestError::Database { .. } | BacktestError::DatabaseQuery { .. } => 3,
            BacktestError::InvalidOrder { .. }
            | BacktestError::UnsupportedOrderKind { .. }
            | BacktestError::InvalidStopLoss { .. }
            | BacktestError::InvalidTakeProfit { .. } => 4,
            BacktestError::NoData
            | BacktestError::NoBars { .. }
            | BacktestError::MissingPrice { .. }
            | BacktestError::UnorderedDates { .. } => 5,
            BacktestError::NoStrategy => 6,
        }
    }
}

impl From<&BacktestError> for std::process::ExitCode {
    fn from(err: &BacktestError) -> Self {
        std::process::ExitCode::from(err.exit_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_price_message_names_field_and_date() {
        let err = BacktestError::MissingPrice {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            field: PriceField::Open,
        };
        assert_eq!(err.to_string(), "open price is undefined for bar 2024-03-01");
    }

    #[test]
    fn unsupported_kind_message() {
        let err = BacktestError::UnsupportedOrderKind { kind: "stop" };
        assert_eq!(err.to_string(), "stop orders are not supported");
    }

    #[test]
    fn exit_codes_group_by_concern() {
        let config = BacktestError::ConfigMissing {
            section: "backtest".into(),
            key: "ticker".into(),
        };
        let db = BacktestError::Database {
            reason: "locked".into(),
        };
        assert_eq!(config.exit_code(), 2);
        assert_eq!(db.exit_code(), 3);
        assert_eq!(BacktestError::NoData.exit_code(), 5);
        assert_eq!(BacktestError::NoStrategy.exit_code(), 6);
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::other("disk full");
        let err: BacktestError = io.into();
        assert!(matches!(err, BacktestError::Io(_)));
    }
}
