//! Change-point detection strategies.
//!
//! Two independent strategies produce [`ChangePointCandidate`]s over the
//! same series:
//!
//! - **Rolling heuristics** ([`rolling`]): trailing-window z-score level
//!   shifts and rolling-volatility shifts. Deterministic, cheap.
//! - **Bayesian model** ([`bayes`]): a K-change-point piecewise-mean model
//!   over log-returns, sampled by MCMC, with credible intervals and
//!   convergence diagnostics.
//!
//! The aggregator in [`crate::report`] is strategy-agnostic: it consumes
//! candidates through the [`ChangePointDetector`] trait and merges them by
//! date regardless of origin.

pub mod bayes;
pub mod diagnostics;
pub mod rolling;

use crate::core::PriceSeries;
use crate::error::Result;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

pub use bayes::{
    bayes_detect, BayesConfig, BayesResult, BayesianDetector, ChangePointPosterior, RegimeSummary,
};
pub use diagnostics::{split_r_hat, ConvergenceDiagnostics};
pub use rolling::{rolling_detect, RollingConfig, RollingDetector, RollingResult};

/// Which detector flagged a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum DetectionMethod {
    /// Rolling z-score on the price level.
    HeuristicMean,
    /// Rolling standard-deviation shift on log-returns.
    HeuristicVolatility,
    /// Posterior of the Bayesian multi-change-point model.
    Bayesian,
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HeuristicMean => write!(f, "heuristic-mean"),
            Self::HeuristicVolatility => write!(f, "heuristic-volatility"),
            Self::Bayesian => write!(f, "bayesian"),
        }
    }
}

/// A change point flagged by a single detector, before merging.
///
/// `score` is method-specific confidence metadata: the z-score at the
/// flagged index for [`DetectionMethod::HeuristicMean`], the absolute
/// relative change of rolling volatility for
/// [`DetectionMethod::HeuristicVolatility`], and the credible-interval
/// width in days for [`DetectionMethod::Bayesian`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangePointCandidate {
    pub date: NaiveDate,
    /// Index into the price series the date corresponds to.
    pub index: usize,
    pub method: DetectionMethod,
    pub score: f64,
}

/// Common interface for change-point detection strategies.
///
/// Object-safe, so heterogeneous detectors can be collected behind
/// `Box<dyn ChangePointDetector>`.
pub trait ChangePointDetector {
    /// Detect change-point candidates in the series.
    fn detect(&self, series: &PriceSeries) -> Result<Vec<ChangePointCandidate>>;

    /// Strategy name for reporting.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn method_display_names() {
        assert_eq!(DetectionMethod::HeuristicMean.to_string(), "heuristic-mean");
        assert_eq!(
            DetectionMethod::HeuristicVolatility.to_string(),
            "heuristic-volatility"
        );
        assert_eq!(DetectionMethod::Bayesian.to_string(), "bayesian");
    }

    #[test]
    fn strategies_run_behind_the_trait() {
        let base = NaiveDate::from_ymd_opt(2016, 1, 1).unwrap();
        let prices: Vec<f64> = (0..60)
            .map(|i| {
                let level = if i < 30 { 20.0 } else { 40.0 };
                level + ((i % 3) as f64) * 0.1
            })
            .collect();
        let dates = (0..prices.len())
            .map(|i| base + Duration::days(i as i64))
            .collect();
        let series = PriceSeries::new(dates, prices).unwrap();

        let detectors: Vec<Box<dyn ChangePointDetector>> = vec![
            Box::new(RollingDetector::new(
                RollingConfig::default().level_window(10).vol_window(5),
            )),
            Box::new(BayesianDetector::new(
                BayesConfig::default()
                    .n_changepoints(1)
                    .draws(100)
                    .tune(100)
                    .chains(1)
                    .seed(3),
            )),
        ];

        let mut all = Vec::new();
        for detector in &detectors {
            assert!(!detector.name().is_empty());
            all.extend(detector.detect(&series).unwrap());
        }
        assert!(!all.is_empty());
        assert!(all.iter().any(|c| c.method == DetectionMethod::Bayesian));
    }
}
