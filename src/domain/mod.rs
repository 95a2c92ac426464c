//! Core domain types and logic.

pub mod ohlcv;
pub mod order;
pub mod trade;
pub mod position;
pub mod portfolio;
pub mod execution;
pub mod strategy;
pub mod strategies;
pub mod backtest;
pub mod metrics;
pub mod config_validation;
pub mod error;
