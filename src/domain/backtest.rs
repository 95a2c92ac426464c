//! Backtest engine and event loop.
//!
//! Each bar runs three steps in order: resolve the orders placed on the
//! previous bar against this bar's prices, call the strategy, then record a
//! portfolio snapshot at the close. The first bar never has anything to fill.

use tracing::{debug, info};

use crate::domain::error::BacktestError;
use crate::domain::execution;
use crate::domain::metrics::MetricsReport;
use crate::domain::ohlcv::{self, OhlcvBar, PriceField};
use crate::domain::order::Order;
use crate::domain::portfolio::{self, PortfolioSeries};
use crate::domain::strategy::{BarContext, Strategy};
use crate::domain::trade::{self, Trade};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_cash: f64,
    /// Periods per year used to annualise volatility.
    pub trading_days: f64,
    /// Calendar days per year used to annualise returns.
    pub days_in_year: f64,
    pub risk_free_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_cash: 100_000.0,
            trading_days: 252.0,
            days_in_year: 365.0,
            risk_free_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub strategy_name: String,
    pub report: MetricsReport,
    pub portfolio: PortfolioSeries,
    /// Buy-and-hold value per bar, parallel to `portfolio`.
    pub benchmark: Vec<f64>,
    pub trades: Vec<Trade>,
    pub final_cash: f64,
    pub position_size: f64,
}

pub struct Engine {
    config: BacktestConfig,
    strategy: Option<Box<dyn Strategy>>,
    bars: Option<Vec<OhlcvBar>>,
}

impl Engine {
    pub fn new(config: BacktestConfig) -> Self {
        Engine {
            config,
            strategy: None,
            bars: None,
        }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Attach the bar series. Dates must be strictly increasing.
    pub fn add_data(&mut self, bars: Vec<OhlcvBar>) -> Result<(), BacktestError> {
        ohlcv::validate_series(&bars)?;
        self.bars = Some(bars);
        Ok(())
    }

    pub fn add_strategy(&mut self, strategy: Box<dyn Strategy>) {
        self.strategy = Some(strategy);
    }

    pub fn run(&mut self) -> Result<BacktestResult, BacktestError> {
        let strategy = self.strategy.as_mut().ok_or(BacktestError::NoStrategy)?;
        let bars = match self.bars.as_deref() {
            Some(bars) if !bars.is_empty() => bars,
            _ => return Err(BacktestError::NoData),
        };

        info!(
            strategy = strategy.name(),
            bars = bars.len(),
            start = %bars[0].date,
            end = %bars[bars.len() - 1].date,
            initial_cash = self.config.initial_cash,
            "starting backtest"
        );

        let mut cash = self.config.initial_cash;
        let mut trades: Vec<Trade> = Vec::new();
        let mut pending: Vec<Order> = Vec::new();
        let mut portfolio = PortfolioSeries::with_capacity(bars.len());

        for (index, bar) in bars.iter().enumerate() {
            let fills = execution::fill_orders(&mut pending, bar, index, &mut cash, &mut trades)?;
            if fills.filled + fills.discarded > 0 {
                debug!(
                    date = %bar.date,
                    filled = fills.filled,
                    discarded = fills.discarded,
                    cash,
                    "resolved pending orders"
                );
            }

            let mut ctx = BarContext::new(bars, index, cash, &trades);
            strategy.on_bar(&mut ctx)?;
            pending = ctx.into_orders();

            let stock = trade::position_size(&trades) * bar.price(PriceField::Close)?;
            portfolio.record(bar.date, cash, stock);
        }

        if !pending.is_empty() {
            debug!(orders = pending.len(), "orders placed on the last bar were never filled");
        }

        let benchmark = portfolio::buy_and_hold_series(bars, self.config.initial_cash)?;
        let report = MetricsReport::compute(&portfolio, &benchmark, &self.config);
        let position_size = trade::position_size(&trades);

        info!(
            trades = trades.len(),
            final_cash = cash,
            position_size,
            total_return = report.total_return,
            "backtest finished"
        );

        Ok(BacktestResult {
            strategy_name: strategy.name().to_string(),
            report,
            portfolio,
            benchmark,
            trades,
            final_cash: cash,
            position_size,
        })
    }
}
