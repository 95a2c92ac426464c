//! PostgreSQL data adapter.
//!
//! Reads `public.ohlcv (exchange, ticker, date DATE, open..close, volume)`.
//! Prices may be NULL; a NULL loads as NaN.

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use postgres::NoTls;
use r2d2_postgres::PostgresConnectionManager;
use tracing::debug;

type Manager = PostgresConnectionManager<NoTls>;

pub struct PostgresAdapter {
    pool: Pool<Manager>,
}

fn query_error(e: postgres::Error) -> BacktestError {
    BacktestError::DatabaseQuery {
        reason: e.to_string(),
    }
}

impl PostgresAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, BacktestError> {
        let connection_string = config
            .get_string("postgres", "connection_string")
            .ok_or_else(|| BacktestError::ConfigMissing {
                section: "postgres".into(),
                key: "connection_string".into(),
            })?;

        let pg_config: postgres::Config = connection_string
            .parse()
            .map_err(|e: postgres::Error| BacktestError::ConfigInvalid {
                section: "postgres".into(),
                key: "connection_string".into(),
                reason: e.to_string(),
            })?;
        let pool_size = config.get_int("postgres", "pool_size", 2).max(1) as u32;

        let pool = Pool::builder()
            .max_size(pool_size)
            .build(PostgresConnectionManager::new(pg_config, NoTls))
            .map_err(|e| BacktestError::Database {
                reason: e.to_string(),
            })?;

        debug!(pool_size, "opened postgres pool");
        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<Manager>, BacktestError> {
        self.pool.get().map_err(|e| BacktestError::Database {
            reason: e.to_string(),
        })
    }
}

impl DataPort for PostgresAdapter {
    fn fetch_ohlcv(
        &self,
        exchange: &str,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, BacktestError> {
        let query = "SELECT date, \
                            open::double precision, high::double precision, \
                            low::double precision, close::double precision, \
                            volume::bigint \
                     FROM public.ohlcv \
                     WHERE exchange = $1 AND ticker = $2 AND date >= $3 AND date <= $4 \
                     ORDER BY date ASC";

        let exchange = exchange.to_uppercase();
        let ticker = ticker.to_uppercase();
        let rows = self
            .conn()?
            .query(query, &[&exchange, &ticker, &start_date, &end_date])
            .map_err(query_error)?;

        let price = |v: Option<f64>| v.unwrap_or(f64::NAN);
        let bars: Vec<OhlcvBar> = rows
            .into_iter()
            .map(|row| OhlcvBar {
                date: row.get(0),
                open: price(row.get(1)),
                high: price(row.get(2)),
                low: price(row.get(3)),
                close: price(row.get(4)),
                volume: row.get::<_, Option<i64>>(5).unwrap_or(0),
            })
            .collect();

        debug!(%exchange, %ticker, bars = bars.len(), "loaded bars from postgres");
        Ok(bars)
    }

    fn list_symbols(&self, exchange: &str) -> Result<Vec<String>, BacktestError> {
        let query =
            "SELECT DISTINCT ticker FROM public.ohlcv WHERE exchange = $1 ORDER BY ticker";

        let rows = self
            .conn()?
            .query(query, &[&exchange.to_uppercase()])
            .map_err(query_error)?;

        Ok(rows.into_iter().map(|row| row.get(0)).collect())
    }

    fn get_data_range(
        &self,
        exchange: &str,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BacktestError> {
        let query = "SELECT MIN(date), MAX(date), COUNT(*) \
                     FROM public.ohlcv WHERE exchange = $1 AND ticker = $2";

        let row = self
            .conn()?
            .query_one(query, &[&exchange.to_uppercase(), &ticker.to_uppercase()])
            .map_err(query_error)?;

        let min: Option<NaiveDate> = row.get(0);
        let max: Option<NaiveDate> = row.get(1);
        let count: i64 = row.get(2);

        match (min, max) {
            (Some(min), Some(max)) if count > 0 => Ok(Some((min, max, count as usize))),
            _ => Ok(None),
        }
    }
}
