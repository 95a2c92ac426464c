//! SQLite data adapter.
//!
//! Bars live in a single `ohlcv` table keyed by (exchange, ticker, date). Price
//! columns are nullable; a NULL loads as NaN.

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use tracing::debug;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_error(e: r2d2::Error) -> BacktestError {
    BacktestError::Database {
        reason: e.to_string(),
    }
}

fn query_error(e: rusqlite::Error) -> BacktestError {
    BacktestError::DatabaseQuery {
        reason: e.to_string(),
    }
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, BacktestError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| BacktestError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_error)?;

        debug!(path = %db_path, pool_size, "opened sqlite pool");
        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, BacktestError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_error)?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, BacktestError> {
        self.pool.get().map_err(pool_error)
    }

    pub fn initialize_schema(&self) -> Result<(), BacktestError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS ohlcv (
                    exchange TEXT NOT NULL,
                    ticker TEXT NOT NULL,
                    date TEXT NOT NULL,
                    open REAL,
                    high REAL,
                    low REAL,
                    close REAL,
                    volume INTEGER NOT NULL DEFAULT 0,
                    PRIMARY KEY (exchange, ticker, date)
                );
                CREATE INDEX IF NOT EXISTS idx_ohlcv_date ON ohlcv(date);",
            )
            .map_err(query_error)
    }

    pub fn insert_bars(
        &self,
        exchange: &str,
        ticker: &str,
        bars: &[OhlcvBar],
    ) -> Result<(), BacktestError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_error)?;

        let nullable = |v: f64| v.is_finite().then_some(v);
        for bar in bars {
            tx.execute(
                "INSERT OR REPLACE INTO ohlcv (exchange, ticker, date, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    exchange.to_uppercase(),
                    ticker.to_uppercase(),
                    bar.date.format(DATE_FORMAT).to_string(),
                    nullable(bar.open),
                    nullable(bar.high),
                    nullable(bar.low),
                    nullable(bar.close),
                    bar.volume
                ],
            )
            .map_err(query_error)?;
        }

        tx.commit().map_err(query_error)
    }
}

impl DataPort for SqliteAdapter {
    fn fetch_ohlcv(
        &self,
        exchange: &str,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, BacktestError> {
        let conn = self.conn()?;

        let query = "SELECT date, open, high, low, close, volume
                     FROM ohlcv
                     WHERE exchange = ?1 AND ticker = ?2 AND date >= ?3 AND date <= ?4
                     ORDER BY date ASC";

        let mut stmt = conn.prepare(query).map_err(query_error)?;

        let price = |v: Option<f64>| v.unwrap_or(f64::NAN);
        let rows = stmt
            .query_map(
                params![
                    exchange.to_uppercase(),
                    ticker.to_uppercase(),
                    start_date.format(DATE_FORMAT).to_string(),
                    end_date.format(DATE_FORMAT).to_string()
                ],
                |row| {
                    let date_str: String = row.get(0)?;
                    let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            date_str.len(),
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?;
                    Ok(OhlcvBar {
                        date,
                        open: price(row.get(1)?),
                        high: price(row.get(2)?),
                        low: price(row.get(3)?),
                        close: price(row.get(4)?),
                        volume: row.get(5)?,
                    })
                },
            )
            .map_err(query_error)?;

        let bars = rows.collect::<Result<Vec<_>, _>>().map_err(query_error)?;
        debug!(exchange, ticker, bars = bars.len(), "loaded bars from sqlite");
        Ok(bars)
    }

    fn list_symbols(&self, exchange: &str) -> Result<Vec<String>, BacktestError> {
        let conn = self.conn()?;

        let query = "SELECT DISTINCT ticker FROM ohlcv WHERE exchange = ?1 ORDER BY ticker";

        let mut stmt = conn.prepare(query).map_err(query_error)?;
        let rows = stmt
            .query_map(params![exchange.to_uppercase()], |row| row.get(0))
            .map_err(query_error)?;

        rows.collect::<Result<Vec<String>, _>>().map_err(query_error)
    }

    fn get_data_range(
        &self,
        exchange: &str,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BacktestError> {
        let conn = self.conn()?;

        let query =
            "SELECT MIN(date), MAX(date), COUNT(*) FROM ohlcv WHERE exchange = ?1 AND ticker = ?2";

        let result: (Option<String>, Option<String>, i64) = conn
            .query_row(
                query,
                params![exchange.to_uppercase(), ticker.to_uppercase()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_error)?;

        let parse = |s: &str| {
            NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| BacktestError::Database {
                reason: e.to_string(),
            })
        };

        match result {
            (Some(min_str), Some(max_str), count) if count > 0 => {
                Ok(Some((parse(&min_str)?, parse(&max_str)?, count as usize)))
            }
            _ => Ok(None),
        }
    }
}
