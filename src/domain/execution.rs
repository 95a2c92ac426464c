//! Order fill matching.
//!
//! Orders placed on bar `t` are resolved against bar `t + 1`:
//!
//! | side | kind   | fillable when                                  | price  |
//! |------|--------|------------------------------------------------|--------|
//! | buy  | market | cash >= size * open                            | open   |
//! | buy  | limit  | cash >= size * max(open, limit), limit >= low  | limit  |
//! | sell | market | position >= size                               | open   |
//! | sell | limit  | position >= size, limit <= high                | limit  |
//!
//! Anything else is dropped for the bar. Limit orders are day-only.

use tracing::debug;

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::{OhlcvBar, PriceField};
use crate::domain::order::{Order, OrderKind, OrderSide};
use crate::domain::trade::{self, Trade};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FillSummary {
    pub filled: usize,
    pub discarded: usize,
}

/// Decide whether `order` fills on `bar`. Returns the fill price, or `None`
/// when the order is not fillable.
pub fn match_order(
    order: &Order,
    bar: &OhlcvBar,
    cash: f64,
    position: f64,
) -> Result<Option<f64>, BacktestError> {
    let open = bar.price(PriceField::Open)?;

    let fill_price = match (order.side, order.kind) {
        (OrderSide::Buy, OrderKind::Market) => (cash >= order.size * open).then_some(open),
        (OrderSide::Buy, OrderKind::Limit { limit_price }) => {
            let low = bar.price(PriceField::Low)?;
            let affordable = cash >= order.size * open && cash >= order.size * limit_price;
            (affordable && limit_price >= low).then_some(limit_price)
        }
        (OrderSide::Sell, OrderKind::Market) => (position >= order.size).then_some(open),
        (OrderSide::Sell, OrderKind::Limit { limit_price }) => {
            let high = bar.price(PriceField::High)?;
            (position >= order.size && limit_price <= high).then_some(limit_price)
        }
        // refused at submission
        (_, OrderKind::Stop { .. } | OrderKind::StopLimit { .. }) => None,
    };

    Ok(fill_price)
}

/// Resolve every pending order against `bar`, in submission order. Each order
/// sees the cash and position left by the fills before it. The queue is empty
/// afterwards whether or not anything filled.
pub fn fill_orders(
    pending: &mut Vec<Order>,
    bar: &OhlcvBar,
    bar_index: usize,
    cash: &mut f64,
    trades: &mut Vec<Trade>,
) -> Result<FillSummary, BacktestError> {
    let mut summary = FillSummary::default();
    let mut position = trade::position_size(trades);

    for order in pending.drain(..) {
        match match_order(&order, bar, *cash, position)? {
            Some(price) => {
                let fill = Trade {
                    ticker: order.ticker,
                    side: order.side,
                    size: order.size,
                    price,
                    kind: order.kind,
                    bar_index,
                    date: bar.date,
                };
                *cash -= fill.notional();
                position += fill.signed_size();
                debug!(
                    date = %bar.date,
                    side = fill.side.label(),
                    kind = fill.kind.label(),
                    size = fill.size,
                    price = fill.price,
                    cash = *cash,
                    "order filled"
                );
                trades.push(fill);
                summary.filled += 1;
            }
            None => {
                debug!(
                    date = %bar.date,
                    side = order.side.label(),
                    kind = order.kind.label(),
                    size = order.size,
                    limit = ?order.kind.limit_price(),
                    low = bar.low,
                    high = bar.high,
                    "order not filled"
                );
                summary.discarded += 1;
            }
        }
    }

    Ok(summary)
}
