//! Executed fills.

use chrono::NaiveDate;

use super::order::{OrderKind, OrderSide};

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub ticker: String,
    pub side: OrderSide,
    pub size: f64,
    pub price: f64,
    pub kind: OrderKind,
    pub bar_index: usize,
    pub date: NaiveDate,
}

impl Trade {
    pub fn signed_size(&self) -> f64 {
        self.side.sign() * self.size
    }

    /// Cash consumed by the fill; negative for sells.
    pub fn notional(&self) -> f64 {
        self.price * self.signed_size()
    }
}

/// Current holding derived from the trade log.
pub fn position_size(trades: &[Trade]) -> f64 {
    trades.iter().map(Trade::signed_size).sum()
}
