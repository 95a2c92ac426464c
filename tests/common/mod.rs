#![allow(dead_code)]

use barsim::domain::error::BacktestError;
pub use barsim::domain::ohlcv::OhlcvBar;
use barsim::domain::order::{OrderKind, OrderSide};
use barsim::domain::strategy::{BarContext, Strategy};
use barsim::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashMap;

pub const TICKER: &str = "BHP";
pub const EXCHANGE: &str = "ASX";

/// In-memory data port keyed by ticker. Range filtering mirrors the real
/// adapters: both ends inclusive.
pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }

    fn check(&self, ticker: &str) -> Result<(), BacktestError> {
        match self.errors.get(ticker) {
            Some(reason) => Err(BacktestError::Database {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        _exchange: &str,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, BacktestError> {
        self.check(ticker)?;
        Ok(self
            .data
            .get(ticker)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self, _exchange: &str) -> Result<Vec<String>, BacktestError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        _exchange: &str,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BacktestError> {
        self.check(ticker)?;
        match self.data.get(ticker) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date).min().unwrap();
                let max = bars.iter().map(|b| b.date).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn day(offset: usize) -> NaiveDate {
    date("2024-01-01") + chrono::Duration::days(offset as i64)
}

pub fn make_bar(date_str: &str, open: f64, high: f64, low: f64, close: f64) -> OhlcvBar {
    OhlcvBar {
        date: date(date_str),
        open,
        high,
        low,
        close,
        volume: 1000,
    }
}

/// Consecutive daily bars from 2024-01-01 with the given opens. Close is
/// open + 2, the range is one unit either side of the body.
pub fn bars_from_opens(opens: &[f64]) -> Vec<OhlcvBar> {
    opens
        .iter()
        .enumerate()
        .map(|(i, &open)| OhlcvBar {
            date: day(i),
            open,
            high: open + 3.0,
            low: open - 1.0,
            close: open + 2.0,
            volume: 1000,
        })
        .collect()
}

/// Flat bars: every price equals `price`.
pub fn flat_bars(n: usize, price: f64) -> Vec<OhlcvBar> {
    (0..n)
        .map(|i| OhlcvBar {
            date: day(i),
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 1000,
        })
        .collect()
}

/// Bars from a closing-price path; open is the previous close.
pub fn generate_bars(closes: &[f64]) -> Vec<OhlcvBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            OhlcvBar {
                date: day(i),
                open,
                high: open.max(close) * 1.01,
                low: open.min(close) * 0.99,
                close,
                volume: 1000 + i as i64,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub struct ScriptedOrder {
    pub side: OrderSide,
    pub kind: OrderKind,
    pub size: f64,
}

impl ScriptedOrder {
    pub fn market(side: OrderSide, size: f64) -> Self {
        ScriptedOrder {
            side,
            kind: OrderKind::Market,
            size,
        }
    }

    pub fn limit(side: OrderSide, limit_price: f64, size: f64) -> Self {
        ScriptedOrder {
            side,
            kind: OrderKind::Limit { limit_price },
            size,
        }
    }
}

/// Places a fixed list of orders on given bar indices and records what it
/// saw at each hook.
#[derive(Default)]
pub struct ScriptedStrategy {
    pub script: HashMap<usize, Vec<ScriptedOrder>>,
    /// Queue length seen on entry to each hook.
    pub pending_on_entry: Vec<usize>,
    pub cash_seen: Vec<f64>,
    pub position_seen: Vec<f64>,
}

impl ScriptedStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, index: usize, order: ScriptedOrder) -> Self {
        self.script.entry(index).or_default().push(order);
        self
    }
}

impl Strategy for ScriptedStrategy {
    fn name(&self) -> &str {
        "scripted"
    }

    fn on_bar(&mut self, ctx: &mut BarContext<'_>) -> Result<(), BacktestError> {
        self.pending_on_entry.push(ctx.pending().len());
        self.cash_seen.push(ctx.cash());
        self.position_seen.push(ctx.position_size());
        if let Some(orders) = self.script.get(&ctx.index()) {
            for o in orders.clone() {
                ctx.submit(TICKER, o.side, o.size, o.kind)?;
            }
        }
        Ok(())
    }
}

/// Shares the recording strategy with the test after the engine takes
/// ownership of its box.
pub struct Shared(pub std::rc::Rc<std::cell::RefCell<ScriptedStrategy>>);

impl Strategy for Shared {
    fn name(&self) -> &str {
        "scripted"
    }

    fn on_bar(&mut self, ctx: &mut BarContext<'_>) -> Result<(), BacktestError> {
        self.0.borrow_mut().on_bar(ctx)
    }
}
