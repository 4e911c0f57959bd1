//! Rolling-statistics heuristics for change-point detection.
//!
//! Two sub-detectors share the same trailing-window pattern: compute a
//! rolling statistic, compare the current observation's deviation against
//! it, flag when a normalized deviation exceeds a threshold.

use super::{ChangePointCandidate, ChangePointDetector, DetectionMethod};
use crate::core::PriceSeries;
use crate::error::{AnalysisError, Result};

/// Configuration for the rolling heuristics.
#[derive(Debug, Clone)]
pub struct RollingConfig {
    /// Trailing window for the level-shift detector (default 252, one
    /// trading year).
    pub level_window: usize,
    /// Z-score threshold for a level shift (default 2.0).
    pub level_threshold: f64,
    /// Window for the rolling volatility of log-returns (default 60).
    pub vol_window: usize,
    /// Relative-change threshold for a volatility shift (default 1.5,
    /// i.e. a 150% jump of the rolling std in one step).
    pub vol_threshold: f64,
}

impl Default for RollingConfig {
    fn default() -> Self {
        Self {
            level_window: 252,
            level_threshold: 2.0,
            vol_window: 60,
            vol_threshold: 1.5,
        }
    }
}

impl RollingConfig {
    /// Set the level-shift window.
    pub fn level_window(mut self, window: usize) -> Self {
        self.level_window = window;
        self
    }

    /// Set the level-shift z-score threshold.
    pub fn level_threshold(mut self, threshold: f64) -> Self {
        self.level_threshold = threshold;
        self
    }

    /// Set the volatility window.
    pub fn vol_window(mut self, window: usize) -> Self {
        self.vol_window = window;
        self
    }

    /// Set the volatility relative-change threshold.
    pub fn vol_threshold(mut self, threshold: f64) -> Self {
        self.vol_threshold = threshold;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.level_window < 2 || self.vol_window < 2 {
            return Err(AnalysisError::InvalidParameter(
                "rolling windows must be at least 2".to_string(),
            ));
        }
        if self.level_threshold <= 0.0 || self.vol_threshold <= 0.0 {
            return Err(AnalysisError::InvalidParameter(
                "rolling thresholds must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of the rolling heuristics, with the two sub-detectors kept
/// distinct so provenance survives into aggregation.
#[derive(Debug, Clone)]
pub struct RollingResult {
    /// Level shifts flagged by the rolling z-score detector.
    pub level_shifts: Vec<ChangePointCandidate>,
    /// Volatility shifts flagged by the rolling-std detector.
    pub volatility_shifts: Vec<ChangePointCandidate>,
}

impl RollingResult {
    /// All candidates from both sub-detectors, in date order.
    pub fn all_candidates(&self) -> Vec<ChangePointCandidate> {
        let mut all: Vec<ChangePointCandidate> = self
            .level_shifts
            .iter()
            .chain(self.volatility_shifts.iter())
            .cloned()
            .collect();
        all.sort_by_key(|c| (c.date, c.method));
        all
    }
}

/// Detect change points with the rolling heuristics.
///
/// Deterministic: the same series and config always produce the same
/// flagged sets. A window's standard deviation of zero means the
/// normalized deviation is undefined and the index is not flagged.
pub fn rolling_detect(series: &PriceSeries, config: &RollingConfig) -> Result<RollingResult> {
    config.validate()?;
    Ok(RollingResult {
        level_shifts: detect_level_shifts(series, config),
        volatility_shifts: detect_volatility_shifts(series, config),
    })
}

/// Rolling z-score over the raw price level.
///
/// For index `i >= window`, the trailing window is `[i - window, i)` and
/// never includes the tested point itself.
fn detect_level_shifts(series: &PriceSeries, config: &RollingConfig) -> Vec<ChangePointCandidate> {
    let prices = series.prices();
    let w = config.level_window;
    let mut flagged = Vec::new();
    if prices.len() <= w {
        return flagged;
    }

    // Cumulative sums allow O(1) window mean/std (same trick as the
    // segment costs in classic pruned changepoint search).
    let (cum, cum_sq) = cumulative_sums(prices);

    for i in w..prices.len() {
        let sum = cum[i] - cum[i - w];
        let sum_sq = cum_sq[i] - cum_sq[i - w];
        let mean = sum / w as f64;
        let var = ((sum_sq - sum * sum / w as f64) / (w - 1) as f64).max(0.0);
        let std = var.sqrt();
        if std <= 0.0 {
            continue;
        }
        let z = (prices[i] - mean).abs() / std;
        if z > config.level_threshold {
            flagged.push(ChangePointCandidate {
                date: series.dates()[i],
                index: i,
                method: DetectionMethod::HeuristicMean,
                score: z,
            });
        }
    }
    flagged
}

/// One-step relative change of the rolling standard deviation of
/// log-returns.
///
/// The candidate date is the price date on which the flagged return
/// realizes (return `j` spans prices `j` to `j + 1`).
fn detect_volatility_shifts(
    series: &PriceSeries,
    config: &RollingConfig,
) -> Vec<ChangePointCandidate> {
    let returns = series.log_returns();
    let w = config.vol_window;
    let mut flagged = Vec::new();
    if returns.len() < w + 1 {
        return flagged;
    }

    let (cum, cum_sq) = cumulative_sums(returns);
    let rolling_std = |j: usize| -> f64 {
        // Window ending at j inclusive: [j + 1 - w, j + 1).
        let sum = cum[j + 1] - cum[j + 1 - w];
        let sum_sq = cum_sq[j + 1] - cum_sq[j + 1 - w];
        let var = ((sum_sq - sum * sum / w as f64) / (w - 1) as f64).max(0.0);
        var.sqrt()
    };

    for j in w..returns.len() {
        let prev = rolling_std(j - 1);
        if prev <= 0.0 {
            continue;
        }
        let rel_change = (rolling_std(j) - prev) / prev;
        if rel_change.abs() > config.vol_threshold {
            flagged.push(ChangePointCandidate {
                date: series.dates()[j + 1],
                index: j + 1,
                method: DetectionMethod::HeuristicVolatility,
                score: rel_change.abs(),
            });
        }
    }
    flagged
}

fn cumulative_sums(values: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut cum = Vec::with_capacity(values.len() + 1);
    let mut cum_sq = Vec::with_capacity(values.len() + 1);
    cum.push(0.0);
    cum_sq.push(0.0);
    for &x in values {
        cum.push(cum.last().copied().unwrap_or(0.0) + x);
        cum_sq.push(cum_sq.last().copied().unwrap_or(0.0) + x * x);
    }
    (cum, cum_sq)
}

/// [`ChangePointDetector`] adapter over the rolling heuristics.
#[derive(Debug, Clone, Default)]
pub struct RollingDetector {
    config: RollingConfig,
}

impl RollingDetector {
    pub fn new(config: RollingConfig) -> Self {
        Self { config }
    }
}

impl ChangePointDetector for RollingDetector {
    fn detect(&self, series: &PriceSeries) -> Result<Vec<ChangePointCandidate>> {
        Ok(rolling_detect(series, &self.config)?.all_candidates())
    }

    fn name(&self) -> &str {
        "rolling-heuristics"
    }
}
