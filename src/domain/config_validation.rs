//! Configuration validation.
//!
//! Validates all config fields before a backtest runs.

use crate::domain::error::BacktestError;
use crate::domain::strategies::STRATEGY_NAMES;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DATA_SOURCES: [&str; 3] = ["csv", "sqlite", "postgres"];

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    validate_initial_cash(config)?;
    validate_risk_free_rate(config)?;
    validate_year_lengths(config)?;
    validate_dates(config)?;
    validate_required(config, "backtest", "exchange")?;
    validate_required(config, "backtest", "ticker")?;
    validate_data_source(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    validate_strategy_name(config)?;
    validate_size(config)?;
    validate_periods(config)?;
    validate_percentages(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> BacktestError {
    BacktestError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_required(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<(), BacktestError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(BacktestError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn validate_initial_cash(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let value = config.get_double("backtest", "initial_cash", 100_000.0);
    if !(value > 0.0) {
        return Err(invalid("backtest", "initial_cash", "initial_cash must be positive"));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let value = config.get_double("backtest", "risk_free_rate", 0.0);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_year_lengths(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    for (key, default) in [("trading_days", 252), ("days_in_year", 365)] {
        let value = config.get_int("backtest", key, default);
        if !(1..=366).contains(&value) {
            return Err(invalid("backtest", key, "must be between 1 and 366"));
        }
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let start_str = config.get_string("backtest", "start_date");
    let end_str = config.get_string("backtest", "end_date");

    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    if start_date > end_date {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    Ok(())
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, BacktestError> {
    match value {
        None => Err(BacktestError::ConfigMissing {
            section: "backtest".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            invalid(
                "backtest",
                field,
                &format!("invalid {} format, expected YYYY-MM-DD", field),
            )
        }),
    }
}

fn validate_data_source(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string());
    match source.as_str() {
        "csv" => validate_required(config, "data", "csv_dir"),
        "sqlite" => validate_required(config, "sqlite", "path"),
        "postgres" => validate_required(config, "postgres", "connection_string"),
        other => Err(invalid(
            "data",
            "source",
            &format!("unknown source '{}', expected one of {:?}", other, DATA_SOURCES),
        )),
    }
}

fn validate_strategy_name(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let name = config
        .get_string("strategy", "name")
        .unwrap_or_else(|| "buy_and_hold".to_string());
    if !STRATEGY_NAMES.contains(&name.as_str()) {
        return Err(invalid(
            "strategy",
            "name",
            &format!("unknown strategy '{}', expected one of {:?}", name, STRATEGY_NAMES),
        ));
    }
    Ok(())
}

fn validate_size(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let value = config.get_double("strategy", "size", 1.0);
    if !(value > 0.0) {
        return Err(invalid("strategy", "size", "size must be positive"));
    }
    Ok(())
}

fn validate_periods(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let fast = config.get_int("strategy", "fast_period", 10);
    let slow = config.get_int("strategy", "slow_period", 30);
    if fast < 1 {
        return Err(invalid("strategy", "fast_period", "fast_period must be at least 1"));
    }
    if slow <= fast {
        return Err(invalid(
            "strategy",
            "slow_period",
            "slow_period must be greater than fast_period",
        ));
    }
    Ok(())
}

fn validate_percentages(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    for key in ["discount_pct", "markup_pct"] {
        let value = config.get_double("strategy", key, 1.0);
        if !(0.0..100.0).contains(&value) {
            return Err(invalid("strategy", key, "must be between 0 and 100"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapConfig(HashMap<(String, String), String>);

    impl MapConfig {
        fn new(entries: &[(&str, &str, &str)]) -> Self {
            MapConfig(
                entries
                    .iter()
                    .map(|(s, k, v)| ((s.to_string(), k.to_string()), v.to_string()))
                    .collect(),
            )
        }

        fn valid() -> Self {
            Self::new(&[
                ("backtest", "exchange", "ASX"),
                ("backtest", "ticker", "BHP"),
                ("backtest", "start_date", "2020-01-01"),
                ("backtest", "end_date", "2024-12-31"),
                ("backtest", "initial_cash", "100000"),
                ("data", "source", "csv"),
                ("data", "csv_dir", "./data"),
                ("strategy", "name", "sma_cross"),
            ])
        }

        fn with(mut self, section: &str, key: &str, value: &str) -> Self {
            self.0
                .insert((section.to_string(), key.to_string()), value.to_string());
            self
        }
    }

    impl ConfigPort for MapConfig {
        fn get_string(&self, section: &str, key: &str) -> Option<String> {
            self.0.get(&(section.to_string(), key.to_string())).cloned()
        }
        fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
            self.get_string(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }
        fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
            self.get_string(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }
        fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
            self.get_string(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }
    }

    fn invalid_key(result: Result<(), BacktestError>) -> String {
        match result {
            Err(BacktestError::ConfigInvalid { key, .. }) => key,
            Err(BacktestError::ConfigMissing { key, .. }) => key,
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn valid_config_passes() {
        let config = MapConfig::valid();
        assert!(validate_backtest_config(&config).is_ok());
        assert!(validate_strategy_config(&config).is_ok());
    }

    #[test]
    fn non_positive_cash_rejected() {
        let config = MapConfig::valid().with("backtest", "initial_cash", "0");
        assert_eq!(invalid_key(validate_backtest_config(&config)), "initial_cash");
    }

    #[test]
    fn risk_free_rate_bounds() {
        let config = MapConfig::valid().with("backtest", "risk_free_rate", "1.5");
        assert_eq!(invalid_key(validate_backtest_config(&config)), "risk_free_rate");
        let config = MapConfig::valid().with("backtest", "risk_free_rate", "0.04");
        assert!(validate_backtest_config(&config).is_ok());
    }

    #[test]
    fn trading_days_bounds() {
        let config = MapConfig::valid().with("backtest", "trading_days", "0");
        assert_eq!(invalid_key(validate_backtest_config(&config)), "trading_days");
    }

    #[test]
    fn missing_ticker() {
        let mut config = MapConfig::valid();
        config.0.remove(&("backtest".to_string(), "ticker".to_string()));
        assert!(matches!(
            validate_backtest_config(&config),
            Err(BacktestError::ConfigMissing { .. })
        ));
    }

    #[test]
    fn bad_date_format() {
        let config = MapConfig::valid().with("backtest", "start_date", "01/01/2020");
        assert_eq!(invalid_key(validate_backtest_config(&config)), "start_date");
    }

    #[test]
    fn start_after_end_rejected() {
        let config = MapConfig::valid().with("backtest", "start_date", "2025-01-01");
        assert_eq!(invalid_key(validate_backtest_config(&config)), "start_date");
    }

    #[test]
    fn sqlite_source_needs_path() {
        let config = MapConfig::valid().with("data", "source", "sqlite");
        assert_eq!(invalid_key(validate_backtest_config(&config)), "path");
        let config = config.with("sqlite", "path", "bars.db");
        assert!(validate_backtest_config(&config).is_ok());
    }

    #[test]
    fn postgres_source_needs_connection_string() {
        let config = MapConfig::valid().with("data", "source", "postgres");
        assert_eq!(invalid_key(validate_backtest_config(&config)), "connection_string");
    }

    #[test]
    fn unknown_source_rejected() {
        let config = MapConfig::valid().with("data", "source", "parquet");
        assert_eq!(invalid_key(validate_backtest_config(&config)), "source");
    }

    #[test]
    fn unknown_strategy_rejected() {
        let config = MapConfig::valid().with("strategy", "name", "martingale");
        assert_eq!(invalid_key(validate_strategy_config(&config)), "name");
    }

    #[test]
    fn period_ordering() {
        let config = MapConfig::valid()
            .with("strategy", "fast_period", "20")
            .with("strategy", "slow_period", "10");
        assert_eq!(invalid_key(validate_strategy_config(&config)), "slow_period");
    }

    #[test]
    fn negative_size_rejected() {
        let config = MapConfig::valid().with("strategy", "size", "-3");
        assert_eq!(invalid_key(validate_strategy_config(&config)), "size");
    }

    #[test]
    fn percentage_bounds() {
        let config = MapConfig::valid().with("strategy", "markup_pct", "150");
        assert_eq!(invalid_key(validate_strategy_config(&config)), "markup_pct");
    }
}
