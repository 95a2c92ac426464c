//! CSV file data adapter.
//!
//! One file per instrument, `<TICKER>_<EXCHANGE>.csv`, with a header row and the
//! columns `date,open,high,low,close,volume`. An empty price cell loads as NaN
//! and surfaces as a missing-price error when the engine reads it.

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, exchange: &str, ticker: &str) -> PathBuf {
        self.base_path.join(format!(
            "{}_{}.csv",
            ticker.to_uppercase(),
            exchange.to_uppercase()
        ))
    }

    fn read_all(&self, exchange: &str, ticker: &str) -> Result<Vec<OhlcvBar>, BacktestError> {
        let path = self.csv_path(exchange, ticker);
        let content = fs::read_to_string(&path).map_err(|e| BacktestError::Database {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| BacktestError::Database {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = column(&record, 0, "date")?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                BacktestError::Database {
                    reason: format!("invalid date format: {}", e),
                }
            })?;

            let volume_str = column(&record, 5, "volume")?;
            let volume: i64 = if volume_str.is_empty() {
                0
            } else {
                volume_str.parse().map_err(|e| BacktestError::Database {
                    reason: format!("invalid volume value: {}", e),
                })?
            };

            bars.push(OhlcvBar {
                date,
                open: price(&record, 1, "open")?,
                high: price(&record, 2, "high")?,
                low: price(&record, 3, "low")?,
                close: price(&record, 4, "close")?,
                volume,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

fn column<'r>(
    record: &'r csv::StringRecord,
    index: usize,
    name: &str,
) -> Result<&'r str, BacktestError> {
    record
        .get(index)
        .map(str::trim)
        .ok_or_else(|| BacktestError::Database {
            reason: format!("missing {} column", name),
        })
}

fn price(record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, BacktestError> {
    let raw = column(record, index, name)?;
    if raw.is_empty() {
        return Ok(f64::NAN);
    }
    raw.parse().map_err(|e| BacktestError::Database {
        reason: format!("invalid {} value: {}", name, e),
    })
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        exchange: &str,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, BacktestError> {
        let bars: Vec<OhlcvBar> = self
            .read_all(exchange, ticker)?
            .into_iter()
            .filter(|b| b.date >= start_date && b.date <= end_date)
            .collect();
        debug!(exchange, ticker, bars = bars.len(), "loaded bars from csv");
        Ok(bars)
    }

    fn list_symbols(&self, exchange: &str) -> Result<Vec<String>, BacktestError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| BacktestError::Database {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let suffix = format!("_{}.csv", exchange.to_uppercase());
        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| BacktestError::Database {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(ticker) = name_str.strip_suffix(&suffix) {
                symbols.push(ticker.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        exchange: &str,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BacktestError> {
        if !self.csv_path(exchange, ticker).exists() {
            return Ok(None);
        }
        let bars = self.read_all(exchange, ticker)?;
        match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Ok(Some((first.date, last.date, bars.len()))),
            _ => Ok(None),
        }
    }
}
