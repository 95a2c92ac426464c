//! Performance metrics over a value series.
//!
//! Every function here is pure. Ratios whose denominator is zero or undefined
//! come back as NaN; callers treat NaN as "not defined for this run", not as a
//! failure.

use chrono::NaiveDate;
use serde::Serialize;

use super::backtest::BacktestConfig;
use super::portfolio::PortfolioSeries;

pub const REPORT_DECIMALS: i32 = 7;

/// Mean fraction of total assets held in the traded asset.
pub fn exposure(stock: &[f64], total_aum: &[f64]) -> f64 {
    mean(stock.iter().zip(total_aum).map(|(s, t)| s / t))
}

pub fn total_return(final_value: f64, initial_value: f64) -> f64 {
    final_value / initial_value - 1.0
}

/// Calendar days between the earliest and latest date.
pub fn days_invested(dates: &[NaiveDate]) -> i64 {
    match (dates.iter().min(), dates.iter().max()) {
        (Some(first), Some(last)) => (*last - *first).num_days(),
        _ => 0,
    }
}

/// Compounded yearly return; NaN when the run spans zero days.
pub fn annualized_return(total_return: f64, days_invested: i64, days_in_year: f64) -> f64 {
    if days_invested <= 0 {
        return f64::NAN;
    }
    (1.0 + total_return).powf(days_in_year / days_invested as f64) - 1.0
}

/// Period-over-period percentage change; one element shorter than `values`.
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

/// Sample standard deviation (n - 1 denominator); NaN for fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let n = values.len() as f64;
    let m = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

pub fn annualized_volatility(daily_returns: &[f64], trading_days: f64) -> f64 {
    sample_std(daily_returns) * trading_days.sqrt()
}

pub fn sharpe_ratio(
    annualized_return: f64,
    annualized_volatility: f64,
    risk_free_rate: f64,
) -> f64 {
    if annualized_volatility > 0.0 {
        (annualized_return - risk_free_rate) / annualized_volatility
    } else {
        f64::NAN
    }
}

/// Like Sharpe, but divided by the annualised deviation of negative returns only.
pub fn sortino_ratio(
    daily_returns: &[f64],
    annualized_return: f64,
    risk_free_rate: f64,
    trading_days: f64,
) -> f64 {
    let negative: Vec<f64> = daily_returns.iter().copied().filter(|r| *r < 0.0).collect();
    let downside_volatility = sample_std(&negative) * trading_days.sqrt();
    if downside_volatility > 0.0 {
        (annualized_return - risk_free_rate) / downside_volatility
    } else {
        f64::NAN
    }
}

/// Worst decline from the running peak, as a fraction (always <= 0).
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = f64::NAN;
    for &value in values {
        peak = peak.max(value);
        let drawdown = value / peak - 1.0;
        if worst.is_nan() || drawdown < worst {
            worst = drawdown;
        }
    }
    worst
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

#[derive(Debug, Clone, Copy)]
struct SeriesStats {
    total_return: f64,
    annualised_return: f64,
    annualised_volatility: f64,
    sharpe_ratio: f64,
    sortino_ratio: f64,
    max_drawdown: f64,
}

impl SeriesStats {
    fn compute(values: &[f64], days: i64, config: &BacktestConfig) -> Self {
        let first = values.first().copied().unwrap_or(f64::NAN);
        let last = values.last().copied().unwrap_or(f64::NAN);

        let total_return = total_return(last, first);
        let annualised_return = annualized_return(total_return, days, config.days_in_year);
        let daily_returns = pct_change(values);
        let annualised_volatility = annualized_volatility(&daily_returns, config.trading_days);

        SeriesStats {
            total_return,
            annualised_return,
            annualised_volatility,
            sharpe_ratio: sharpe_ratio(
                annualised_return,
                annualised_volatility,
                config.risk_free_rate,
            ),
            sortino_ratio: sortino_ratio(
                &daily_returns,
                annualised_return,
                config.risk_free_rate,
                config.trading_days,
            ),
            max_drawdown: max_drawdown(values),
        }
    }
}

/// Strategy metrics alongside the buy-and-hold benchmark, each rounded to
/// [`REPORT_DECIMALS`] places.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    pub exposure: f64,
    pub total_return: f64,
    pub annualised_return: f64,
    pub annualised_volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub bh_total_return: f64,
    pub bh_annualised_return: f64,
    pub bh_annualised_volatility: f64,
    pub bh_sharpe_ratio: f64,
    pub bh_sortino_ratio: f64,
    pub bh_max_drawdown: f64,
}

impl MetricsReport {
    pub fn compute(
        portfolio: &PortfolioSeries,
        benchmark: &[f64],
        config: &BacktestConfig,
    ) -> Self {
        let days = days_invested(&portfolio.dates());
        let total_aum = portfolio.total_aum();

        let strategy = SeriesStats::compute(&total_aum, days, config);
        let bh = SeriesStats::compute(benchmark, days, config);
        let r = |v: f64| round_to(v, REPORT_DECIMALS);

        MetricsReport {
            exposure: r(exposure(&portfolio.stock(), &total_aum)),
            total_return: r(strategy.total_return),
            annualised_return: r(strategy.annualised_return),
            annualised_volatility: r(strategy.annualised_volatility),
            sharpe_ratio: r(strategy.sharpe_ratio),
            sortino_ratio: r(strategy.sortino_ratio),
            max_drawdown: r(strategy.max_drawdown),
            bh_total_return: r(bh.total_return),
            bh_annualised_return: r(bh.annualised_return),
            bh_annualised_volatility: r(bh.annualised_volatility),
            bh_sharpe_ratio: r(bh.sharpe_ratio),
            bh_sortino_ratio: r(bh.sortino_ratio),
            bh_max_drawdown: r(bh.max_drawdown),
        }
    }

    /// Field names and values in report order.
    pub fn entries(&self) -> [(&'static str, f64); 13] {
        [
            ("exposure", self.exposure),
            ("total_return", self.total_return),
            ("annualised_return", self.annualised_return),
            ("annualised_volatility", self.annualised_volatility),
            ("sharpe_ratio", self.sharpe_ratio),
            ("sortino_ratio", self.sortino_ratio),
            ("max_drawdown", self.max_drawdown),
            ("bh_total_return", self.bh_total_return),
            ("bh_annualised_return", self.bh_annualised_return),
            ("bh_annualised_volatility", self.bh_annualised_volatility),
            ("bh_sharpe_ratio", self.bh_sharpe_ratio),
            ("bh_sortino_ratio", self.bh_sortino_ratio),
            ("bh_max_drawdown", self.bh_max_drawdown),
        ]
    }
}
