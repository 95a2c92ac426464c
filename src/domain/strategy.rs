//! Strategy contract and the per-bar context handed to it.
//!
//! A [`BarContext`] only exists while the engine is inside a strategy hook, so
//! orders can never be placed outside an active bar. Everything the strategy can
//! see (cash, position, trade log, price history) is a snapshot taken before the
//! hook runs; orders placed through the context are returned to the engine and
//! resolved against the next bar.

use chrono::NaiveDate;

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::{OhlcvBar, PriceField};
use crate::domain::order::{Order, OrderKind, OrderSide};
use crate::domain::trade::{self, Trade};

pub trait Strategy {
    fn name(&self) -> &str;

    /// Called once per bar, after pending orders were resolved.
    fn on_bar(&mut self, ctx: &mut BarContext<'_>) -> Result<(), BacktestError>;
}

#[derive(Debug)]
pub struct BarContext<'a> {
    index: usize,
    history: &'a [OhlcvBar],
    cash: f64,
    trades: &'a [Trade],
    orders: Vec<Order>,
}

impl<'a> BarContext<'a> {
    /// `bars` is the full series; only `bars[..=index]` is visible to the strategy.
    pub(crate) fn new(
        bars: &'a [OhlcvBar],
        index: usize,
        cash: f64,
        trades: &'a [Trade],
    ) -> Self {
        BarContext {
            index,
            history: &bars[..=index],
            cash,
            trades,
            orders: Vec::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn bar(&self) -> &OhlcvBar {
        &self.history[self.index]
    }

    pub fn date(&self) -> NaiveDate {
        self.bar().date
    }

    /// Bars up to and including the current one.
    pub fn history(&self) -> &[OhlcvBar] {
        self.history
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn trades(&self) -> &[Trade] {
        self.trades
    }

    pub fn position_size(&self) -> f64 {
        trade::position_size(self.trades)
    }

    pub fn close(&self) -> Result<f64, BacktestError> {
        self.bar().price(PriceField::Close)
    }

    /// Orders placed during this bar so far.
    pub fn pending(&self) -> &[Order] {
        &self.orders
    }

    pub fn buy(&mut self, ticker: &str, size: f64) -> Result<(), BacktestError> {
        self.submit(ticker, OrderSide::Buy, size, OrderKind::Market)
    }

    pub fn sell(&mut self, ticker: &str, size: f64) -> Result<(), BacktestError> {
        self.submit(ticker, OrderSide::Sell, size, OrderKind::Market)
    }

    pub fn buy_limit(
        &mut self,
        ticker: &str,
        limit_price: f64,
        size: f64,
    ) -> Result<(), BacktestError> {
        self.submit(ticker, OrderSide::Buy, size, OrderKind::Limit { limit_price })
    }

    pub fn sell_limit(
        &mut self,
        ticker: &str,
        limit_price: f64,
        size: f64,
    ) -> Result<(), BacktestError> {
        self.submit(ticker, OrderSide::Sell, size, OrderKind::Limit { limit_price })
    }

    /// Queue an order for the next bar. Stop orders have no fill rule and are
    /// refused here rather than silently dropped later.
    pub fn submit(
        &mut self,
        ticker: &str,
        side: OrderSide,
        size: f64,
        kind: OrderKind,
    ) -> Result<(), BacktestError> {
        if let OrderKind::Stop { .. } | OrderKind::StopLimit { .. } = kind {
            return Err(BacktestError::UnsupportedOrderKind { kind: kind.label() });
        }
        let order = Order::new(ticker, side, size, kind, self.index)?;
        self.orders.push(order);
        Ok(())
    }

    pub(crate) fn into_orders(self) -> Vec<Order> {
        self.orders
    }
}
