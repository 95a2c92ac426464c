//! Order value object: a requested trade that has not executed yet.

use crate::domain::error::BacktestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn sign(self) -> f64 {
        match self {
            OrderSide::Buy => 1.0,
            OrderSide::Sell => -1.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderKind {
    Market,
    Limit { limit_price: f64 },
    Stop { stop_price: f64 },
    StopLimit { stop_price: f64, limit_price: f64 },
}

impl OrderKind {
    pub fn limit_price(&self) -> Option<f64> {
        match *self {
            OrderKind::Limit { limit_price } | OrderKind::StopLimit { limit_price, .. } => {
                Some(limit_price)
            }
            OrderKind::Market | OrderKind::Stop { .. } => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OrderKind::Market => "market",
            OrderKind::Limit { .. } => "limit",
            OrderKind::Stop { .. } => "stop",
            OrderKind::StopLimit { .. } => "stop_limit",
        }
    }

    fn prices(&self) -> [Option<f64>; 2] {
        match *self {
            OrderKind::Market => [None, None],
            OrderKind::Limit { limit_price } => [Some(limit_price), None],
            OrderKind::Stop { stop_price } => [Some(stop_price), None],
            OrderKind::StopLimit {
                stop_price,
                limit_price,
            } => [Some(stop_price), Some(limit_price)],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub ticker: String,
    pub side: OrderSide,
    /// Unsigned magnitude; the direction lives in `side`.
    pub size: f64,
    pub kind: OrderKind,
    pub bar_index: usize,
}

impl Order {
    pub fn new(
        ticker: &str,
        side: OrderSide,
        size: f64,
        kind: OrderKind,
        bar_index: usize,
    ) -> Result<Self, BacktestError> {
        if !size.is_finite() || size <= 0.0 {
            return Err(BacktestError::InvalidOrder {
                reason: format!("size must be a positive number, got {size}"),
            });
        }
        let bad_price = kind
            .prices()
            .into_iter()
            .flatten()
            .find(|p| !p.is_finite() || *p <= 0.0);
        if let Some(price) = bad_price {
            return Err(BacktestError::InvalidOrder {
                reason: format!(
                    "{} price must be a positive number, got {price}",
                    kind.label()
                ),
            });
        }
        Ok(Order {
            ticker: ticker.to_string(),
            side,
            size,
            kind,
            bar_index,
        })
    }

    /// Positive for buys, negative for sells.
    pub fn signed_size(&self) -> f64 {
        self.side.sign() * self.size
    }
}
