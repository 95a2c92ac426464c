//! Data access port trait.

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

/// Source of historical bars. Implementations return bars sorted by date with
/// both ends of the range inclusive.
pub trait DataPort {
    fn fetch_ohlcv(
        &self,
        exchange: &str,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, BacktestError>;

    fn list_symbols(&self, exchange: &str) -> Result<Vec<String>, BacktestError>;

    fn get_data_range(
        &self,
        exchange: &str,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BacktestError>;
}
