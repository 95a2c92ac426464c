//! Bundled strategies, selectable by name from configuration.

use crate::domain::error::BacktestError;
use crate::domain::strategy::{BarContext, Strategy};

/// Buys as many whole shares as the cash covers at the current close, then
/// holds. Re-sizes and retries on every bar while flat, so a gap up that makes
/// the first order unaffordable only delays entry.
#[derive(Debug, Clone)]
pub struct BuyAndHold {
    ticker: String,
}

impl BuyAndHold {
    pub fn new(ticker: &str) -> Self {
        BuyAndHold {
            ticker: ticker.to_string(),
        }
    }
}

impl Strategy for BuyAndHold {
    fn name(&self) -> &str {
        "buy_and_hold"
    }

    fn on_bar(&mut self, ctx: &mut BarContext<'_>) -> Result<(), BacktestError> {
        if ctx.position_size() > 0.0 {
            return Ok(());
        }
        let shares = (ctx.cash() / ctx.close()?).floor();
        if shares > 0.0 {
            ctx.buy(&self.ticker, shares)?;
        }
        Ok(())
    }
}

/// Simple moving average crossover: long while the fast average is above the
/// slow one.
#[derive(Debug, Clone)]
pub struct SmaCross {
    ticker: String,
    fast: usize,
    slow: usize,
    size: f64,
}

impl SmaCross {
    pub fn new(ticker: &str, fast: usize, slow: usize, size: f64) -> Result<Self, BacktestError> {
        if fast == 0 || fast >= slow {
            return Err(BacktestError::ConfigInvalid {
                section: "strategy".into(),
                key: "fast_period".into(),
                reason: "fast_period must be positive and below slow_period".into(),
            });
        }
        Ok(SmaCross {
            ticker: ticker.to_string(),
            fast,
            slow,
            size,
        })
    }
}

/// Mean of the last `period` closes ending `offset` bars before the current one.
fn sma(ctx: &BarContext<'_>, period: usize, offset: usize) -> Option<f64> {
    let history = ctx.history();
    let end = history.len().checked_sub(offset)?;
    let start = end.checked_sub(period)?;
    let window = &history[start..end];
    Some(window.iter().map(|b| b.close).sum::<f64>() / period as f64)
}

impl Strategy for SmaCross {
    fn name(&self) -> &str {
        "sma_cross"
    }

    fn on_bar(&mut self, ctx: &mut BarContext<'_>) -> Result<(), BacktestError> {
        let averages = (
            sma(ctx, self.fast, 1),
            sma(ctx, self.slow, 1),
            sma(ctx, self.fast, 0),
            sma(ctx, self.slow, 0),
        );
        let (Some(prev_fast), Some(prev_slow), Some(fast), Some(slow)) = averages else {
            return Ok(());
        };

        let position = ctx.position_size();
        if prev_fast <= prev_slow && fast > slow && position <= 0.0 {
            ctx.buy(&self.ticker, self.size)?;
        } else if prev_fast >= prev_slow && fast < slow && position > 0.0 {
            ctx.sell(&self.ticker, position)?;
        }
        Ok(())
    }
}

/// Day-only limit orders around the close: bid below it while flat, offer
/// above it while holding.
#[derive(Debug, Clone)]
pub struct LimitDip {
    ticker: String,
    discount_pct: f64,
    markup_pct: f64,
    size: f64,
}

impl LimitDip {
    pub fn new(ticker: &str, discount_pct: f64, markup_pct: f64, size: f64) -> Self {
        LimitDip {
            ticker: ticker.to_string(),
            discount_pct,
            markup_pct,
            size,
        }
    }
}

impl Strategy for LimitDip {
    fn name(&self) -> &str {
        "limit_dip"
    }

    fn on_bar(&mut self, ctx: &mut BarContext<'_>) -> Result<(), BacktestError> {
        let close = ctx.close()?;
        let position = ctx.position_size();
        if position > 0.0 {
            ctx.sell_limit(&self.ticker, close * (1.0 + self.markup_pct / 100.0), position)?;
        } else {
            ctx.buy_limit(&self.ticker, close * (1.0 - self.discount_pct / 100.0), self.size)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParams {
    pub name: String,
    pub size: f64,
    pub fast_period: usize,
    pub slow_period: usize,
    pub discount_pct: f64,
    pub markup_pct: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyParams {
            name: "buy_and_hold".into(),
            size: 1.0,
            fast_period: 10,
            slow_period: 30,
            discount_pct: 1.0,
            markup_pct: 1.0,
        }
    }
}

pub const STRATEGY_NAMES: [&str; 3] = ["buy_and_hold", "sma_cross", "limit_dip"];

pub fn build_strategy(
    ticker: &str,
    params: &StrategyParams,
) -> Result<Box<dyn Strategy>, BacktestError> {
    match params.name.as_str() {
        "buy_and_hold" => Ok(Box::new(BuyAndHold::new(ticker))),
        "sma_cross" => Ok(Box::new(SmaCross::new(
            ticker,
            params.fast_period,
            params.slow_period,
            params.size,
        )?)),
        "limit_dip" => Ok(Box::new(LimitDip::new(
            ticker,
            params.discount_pct,
            params.markup_pct,
            params.size,
        ))),
        other => Err(BacktestError::ConfigInvalid {
            section: "strategy".into(),
            key: "name".into(),
            reason: format!("unknown strategy '{other}', expected one of {STRATEGY_NAMES:?}"),
        }),
    }
}
