//! Before/after regime comparison around a change point.

use crate::core::PriceSeries;
use crate::error::{AnalysisError, Result};
use crate::utils::stats::{mean, std_dev};
use chrono::NaiveDate;
use serde::Serialize;

/// Configuration for regime comparison.
#[derive(Debug, Clone)]
pub struct RegimeConfig {
    /// Maximum observations on each side of the change point
    /// (default 252, one trading year).
    pub window: usize,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self { window: 252 }
    }
}

impl RegimeConfig {
    pub fn window(mut self, window: usize) -> Self {
        self.window = window.max(1);
        self
    }
}

/// Summary statistics of one side of a change point.
#[derive(Debug, Clone, Serialize)]
pub struct WindowStats {
    /// Number of observations in the window.
    pub observations: usize,
    pub mean_price: f64,
    /// Sample std of log-returns in the window; `None` when the window
    /// holds fewer than 2 returns.
    pub volatility: Option<f64>,
}

/// Before/after comparison at one change point.
///
/// Percent changes are `None` when the denominator is undefined or zero;
/// an undefined metric never poisons the rest of the record.
#[derive(Debug, Clone, Serialize)]
pub struct RegimeStats {
    pub changepoint: NaiveDate,
    pub before: WindowStats,
    pub after: WindowStats,
    /// `(after_mean - before_mean) / before_mean * 100`.
    pub price_change_pct: Option<f64>,
    /// Same formula over log-return volatility.
    pub volatility_change_pct: Option<f64>,
}

/// Compare the regimes on either side of `date`.
///
/// The before window covers up to `window` observations strictly
/// preceding the date, the after window up to `window` strictly
/// following it; an observation exactly on the date belongs to neither.
/// An empty window yields a per-entry insufficient-data error so the
/// remaining change points in a batch still get results.
pub fn compare_regimes(
    series: &PriceSeries,
    date: NaiveDate,
    config: &RegimeConfig,
) -> Result<RegimeStats> {
    let split = series.partition_index(date);
    // Skip an observation landing exactly on the change-point date.
    let after_start = if split < series.len() && series.dates()[split] == date {
        split + 1
    } else {
        split
    };

    let before_start = split.saturating_sub(config.window);
    let after_end = (after_start + config.window).min(series.len());

    if split == before_start {
        return Err(AnalysisError::InsufficientData {
            date,
            side: "before",
        });
    }
    if after_start == after_end {
        return Err(AnalysisError::InsufficientData { date, side: "after" });
    }

    let before = window_stats(series, before_start, split);
    let after = window_stats(series, after_start, after_end);

    let price_change_pct = pct_change(before.mean_price, after.mean_price);
    let volatility_change_pct = match (before.volatility, after.volatility) {
        (Some(b), Some(a)) => pct_change(b, a),
        _ => None,
    };

    Ok(RegimeStats {
        changepoint: date,
        before,
        after,
        price_change_pct,
        volatility_change_pct,
    })
}

/// Stats over price indices `[start, end)`. A return belongs to the
/// window when the price it realizes on does.
fn window_stats(series: &PriceSeries, start: usize, end: usize) -> WindowStats {
    let prices = &series.prices()[start..end];
    // Return j realizes at price index j + 1.
    let ret_start = start.max(1) - 1;
    let ret_end = end.max(1) - 1;
    let returns = &series.log_returns()[ret_start..ret_end];

    WindowStats {
        observations: prices.len(),
        mean_price: mean(prices),
        volatility: if returns.len() >= 2 {
            Some(std_dev(returns))
        } else {
            None
        },
    }
}

fn pct_change(before: f64, after: f64) -> Option<f64> {
    if before == 0.0 || !before.is_finite() || !after.is_finite() {
        return None;
    }
    Some((after - before) / before * 100.0)
}
