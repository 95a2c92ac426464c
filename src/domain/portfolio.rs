//! Per-bar portfolio snapshots and the buy-and-hold benchmark series.

use chrono::NaiveDate;
use serde::Serialize;

use super::error::BacktestError;
use super::ohlcv::{OhlcvBar, PriceField};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub date: NaiveDate,
    pub stock: f64,
    pub cash: f64,
    pub total_aum: f64,
}

impl Snapshot {
    pub fn new(date: NaiveDate, cash: f64, stock: f64) -> Self {
        Snapshot {
            date,
            stock,
            cash,
            total_aum: cash + stock,
        }
    }
}

/// Append-only, one snapshot per bar in bar order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortfolioSeries {
    snapshots: Vec<Snapshot>,
}

impl PortfolioSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        PortfolioSeries {
            snapshots: Vec::with_capacity(capacity),
        }
    }

    pub fn record(&mut self, date: NaiveDate, cash: f64, stock: f64) {
        self.snapshots.push(Snapshot::new(date, cash, stock));
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn first(&self) -> Option<&Snapshot> {
        self.snapshots.first()
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.snapshots.iter().map(|s| s.date).collect()
    }

    pub fn cash(&self) -> Vec<f64> {
        self.snapshots.iter().map(|s| s.cash).collect()
    }

    pub fn stock(&self) -> Vec<f64> {
        self.snapshots.iter().map(|s| s.stock).collect()
    }

    pub fn total_aum(&self) -> Vec<f64> {
        self.snapshots.iter().map(|s| s.total_aum).collect()
    }
}

/// Value of holding `initial_cash / first_open` shares, marked at each close.
pub fn buy_and_hold_series(
    bars: &[OhlcvBar],
    initial_cash: f64,
) -> Result<Vec<f64>, BacktestError> {
    let first = bars.first().ok_or(BacktestError::NoData)?;
    let shares = initial_cash / first.price(PriceField::Open)?;
    bars.iter()
        .map(|bar| Ok(shares * bar.price(PriceField::Close)?))
        .collect()
}
