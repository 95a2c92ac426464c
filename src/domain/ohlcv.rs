//! OHLCV bar representation.

use chrono::NaiveDate;
use std::fmt;

use crate::domain::error::BacktestError;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PriceField::Open => "open",
            PriceField::High => "high",
            PriceField::Low => "low",
            PriceField::Close => "close",
        };
        f.write_str(name)
    }
}

impl OhlcvBar {
    /// Look up a price field, failing when the source left it undefined (NaN).
    pub fn price(&self, field: PriceField) -> Result<f64, BacktestError> {
        let value = match field {
            PriceField::Open => self.open,
            PriceField::High => self.high,
            PriceField::Low => self.low,
            PriceField::Close => self.close,
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(BacktestError::MissingPrice {
                date: self.date,
                field,
            })
        }
    }
}

/// Dates must be unique and strictly increasing.
pub fn validate_series(bars: &[OhlcvBar]) -> Result<(), BacktestError> {
    for (i, pair) in bars.windows(2).enumerate() {
        if pair[1].date <= pair[0].date {
            return Err(BacktestError::UnorderedDates {
                index: i + 1,
                previous: pair[0].date,
                current: pair[1].date,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: &str, close: f64) -> OhlcvBar {
        OhlcvBar {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close,
            volume: 50_000,
        }
    }

    #[test]
    fn price_returns_requested_field() {
        let b = bar("2024-01-15", 105.0);
        assert_eq!(b.price(PriceField::Open).unwrap(), 100.0);
        assert_eq!(b.price(PriceField::High).unwrap(), 110.0);
        assert_eq!(b.price(PriceField::Low).unwrap(), 90.0);
        assert_eq!(b.price(PriceField::Close).unwrap(), 105.0);
    }

    #[test]
    fn nan_price_is_missing() {
        let b = bar("2024-01-15", f64::NAN);
        match b.price(PriceField::Close) {
            Err(BacktestError::MissingPrice { field, date }) => {
                assert_eq!(field, PriceField::Close);
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
            }
            other => panic!("expected MissingPrice, got {other:?}"),
        }
    }

    #[test]
    fn increasing_series_is_valid() {
        let bars = vec![bar("2024-01-01", 1.0), bar("2024-01-02", 1.0), bar("2024-01-05", 1.0)];
        assert!(validate_series(&bars).is_ok());
        assert!(validate_series(&[]).is_ok());
    }

    #[test]
    fn duplicate_date_rejected() {
        let bars = vec![bar("2024-01-01", 1.0), bar("2024-01-02", 1.0), bar("2024-01-02", 1.0)];
        match validate_series(&bars) {
            Err(BacktestError::UnorderedDates { index, .. }) => assert_eq!(index, 2),
            other => panic!("expected UnorderedDates, got {other:?}"),
        }
    }

    #[test]
    fn descending_date_rejected() {
        let bars = vec![bar("2024-01-03", 1.0), bar("2024-01-02", 1.0)];
        assert!(matches!(
            validate_series(&bars),
            Err(BacktestError::UnorderedDates { index: 1, .. })
        ));
    }
}
