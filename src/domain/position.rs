//! Standalone position value type with stop-loss / take-profit validation.
//!
//! The engine tracks holdings through the trade log; this type is for callers
//! that want to reason about a single open position.

use chrono::NaiveDate;

use crate::domain::error::BacktestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionType {
    Long,
    Short,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    ticker: String,
    bar_index: usize,
    position_type: PositionType,
    open_price: f64,
    open_date: NaiveDate,
    size: f64,
    stop_loss: Option<f64>,
    take_profit: Option<f64>,
}

impl Position {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ticker: &str,
        bar_index: usize,
        position_type: PositionType,
        open_price: f64,
        open_date: NaiveDate,
        size: f64,
        stop_loss: Option<f64>,
        take_profit: Option<f64>,
    ) -> Result<Self, BacktestError> {
        let position = Position {
            ticker: ticker.to_string(),
            bar_index,
            position_type,
            open_price,
            open_date,
            size,
            stop_loss,
            take_profit,
        };
        position.validate_stop_loss()?;
        position.validate_take_profit()?;
        Ok(position)
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn bar_index(&self) -> usize {
        self.bar_index
    }

    pub fn position_type(&self) -> PositionType {
        self.position_type
    }

    pub fn open_price(&self) -> f64 {
        self.open_price
    }

    pub fn open_date(&self) -> NaiveDate {
        self.open_date
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn stop_loss(&self) -> Option<f64> {
        self.stop_loss
    }

    pub fn take_profit(&self) -> Option<f64> {
        self.take_profit
    }

    /// Copy with a new stop loss; `None` removes it.
    pub fn with_stop_loss(&self, stop_loss: Option<f64>) -> Result<Self, BacktestError> {
        Position::new(
            &self.ticker,
            self.bar_index,
            self.position_type,
            self.open_price,
            self.open_date,
            self.size,
            stop_loss,
            self.take_profit,
        )
    }

    /// Copy with a new take profit; `None` removes it.
    pub fn with_take_profit(&self, take_profit: Option<f64>) -> Result<Self, BacktestError> {
        Position::new(
            &self.ticker,
            self.bar_index,
            self.position_type,
            self.open_price,
            self.open_date,
            self.size,
            self.stop_loss,
            take_profit,
        )
    }

    pub fn with_size(&self, size: f64) -> Result<Self, BacktestError> {
        Position::new(
            &self.ticker,
            self.bar_index,
            self.position_type,
            self.open_price,
            self.open_date,
            size,
            self.stop_loss,
            self.take_profit,
        )
    }

    /// Long: price * size. Short: (2 * open - price) * size, i.e. the escrowed
    /// notional plus the gain from the price falling.
    pub fn value(&self, current_price: f64) -> f64 {
        match self.position_type {
            PositionType::Long => current_price * self.size,
            PositionType::Short => (2.0 * self.open_price - current_price) * self.size,
        }
    }

    fn validate_stop_loss(&self) -> Result<(), BacktestError> {
        let Some(stop_loss) = self.stop_loss else {
            return Ok(());
        };
        match self.position_type {
            PositionType::Long if stop_loss > self.open_price => {
                Err(BacktestError::InvalidStopLoss {
                    reason: "stop loss must be at or below open price for a long position".into(),
                })
            }
            PositionType::Short if stop_loss < self.open_price => {
                Err(BacktestError::InvalidStopLoss {
                    reason: "stop loss must be at or above open price for a short position".into(),
                })
            }
            _ => Ok(()),
        }
    }

    fn validate_take_profit(&self) -> Result<(), BacktestError> {
        let Some(take_profit) = self.take_profit else {
            return Ok(());
        };
        match self.position_type {
            PositionType::Long if take_profit < self.open_price => {
                Err(BacktestError::InvalidTakeProfit {
                    reason: "take profit must be at or above open price for a long position"
                        .into(),
                })
            }
            PositionType::Short if take_profit > self.open_price => {
                Err(BacktestError::InvalidTakeProfit {
                    reason: "take profit must be at or below open price for a short position"
                        .into(),
                })
            }
            _ => Ok(()),
        }
    }
}
