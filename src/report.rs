//! Result aggregation: merge detector candidates, enrich each point with
//! regime statistics and correlated events, and emit the final report.

use crate::core::{EventCatalog, PriceSeries};
use crate::correlate::{correlate_events, EventCorrelation, EventMatch, DEFAULT_WINDOW_DAYS};
use crate::detect::{
    bayes_detect, rolling_detect, BayesConfig, BayesResult, ChangePointCandidate,
    ChangePointPosterior, ConvergenceDiagnostics, DetectionMethod, RollingConfig,
};
use crate::error::Result;
use crate::regime::{compare_regimes, RegimeConfig, RegimeStats};
use chrono::NaiveDate;
use log::debug;
use serde::Serialize;

/// Configuration for candidate merging and enrichment.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Candidates whose dates differ by at most this many days merge
    /// into one point (default 1). The earliest date wins; provenance is
    /// unioned.
    pub merge_tolerance_days: i64,
    /// Day window for event correlation (default 30).
    pub correlation_window_days: i64,
    pub regime: RegimeConfig,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            merge_tolerance_days: 1,
            correlation_window_days: DEFAULT_WINDOW_DAYS,
            regime: RegimeConfig::default(),
        }
    }
}

impl AggregatorConfig {
    pub fn merge_tolerance_days(mut self, days: i64) -> Self {
        self.merge_tolerance_days = days.max(0);
        self
    }

    pub fn correlation_window_days(mut self, days: i64) -> Self {
        self.correlation_window_days = days.max(0);
        self
    }

    pub fn regime(mut self, regime: RegimeConfig) -> Self {
        self.regime = regime;
        self
    }
}

/// One fully enriched change point in the final report.
///
/// `regime` is `None` when either surrounding window was empty; the
/// point is still reported rather than dropped.
#[derive(Debug, Clone, Serialize)]
pub struct ChangePointSummary {
    pub date: NaiveDate,
    /// Detection methods that contributed, sorted, without duplicates.
    pub methods: Vec<DetectionMethod>,
    /// The raw candidates merged into this point.
    pub sources: Vec<ChangePointCandidate>,
    /// Posterior summary when the Bayesian detector contributed.
    pub posterior: Option<ChangePointPosterior>,
    pub regime: Option<RegimeStats>,
    pub correlation: EventCorrelation,
}

impl ChangePointSummary {
    /// The closest correlated event, if any.
    pub fn best_event(&self) -> Option<&EventMatch> {
        self.correlation.best()
    }
}

/// Final ordered result of an analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Change points ordered by date.
    pub changepoints: Vec<ChangePointSummary>,
    /// Convergence diagnostics when the Bayesian path ran.
    pub diagnostics: Option<ConvergenceDiagnostics>,
    pub total_points: usize,
    /// Points with at least one correlated event.
    pub correlated_points: usize,
    pub correlated_pct: f64,
}

/// Merge candidates from any number of detectors into deduplicated
/// points.
///
/// Candidates are ordered by date; a candidate joins the current group
/// when its date is within the tolerance of the group's earliest date.
/// Every group keeps the earliest date and the union of provenance.
pub fn merge_candidates(
    mut candidates: Vec<ChangePointCandidate>,
    tolerance_days: i64,
) -> Vec<MergedPoint> {
    candidates.sort_by_key(|c| c.date);

    let mut merged: Vec<MergedPoint> = Vec::new();
    for candidate in candidates {
        match merged.last_mut() {
            Some(group)
                if candidate
                    .date
                    .signed_duration_since(group.date)
                    .num_days()
                    <= tolerance_days =>
            {
                group.sources.push(candidate);
            }
            _ => merged.push(MergedPoint {
                date: candidate.date,
                index: candidate.index,
                sources: vec![candidate],
            }),
        }
    }
    merged
}

/// A deduplicated change point before enrichment.
#[derive(Debug, Clone)]
pub struct MergedPoint {
    pub date: NaiveDate,
    pub index: usize,
    pub sources: Vec<ChangePointCandidate>,
}

impl MergedPoint {
    /// Contributing methods, sorted and deduplicated.
    pub fn methods(&self) -> Vec<DetectionMethod> {
        let mut methods: Vec<DetectionMethod> = self.sources.iter().map(|c| c.method).collect();
        methods.sort_unstable();
        methods.dedup();
        methods
    }
}

/// Enrich merged candidates into the final ordered report.
///
/// No candidate is ever dropped: enrichment failures degrade to explicit
/// `None` markers on that record only.
pub fn aggregate(
    series: &PriceSeries,
    candidates: Vec<ChangePointCandidate>,
    bayes: Option<&BayesResult>,
    catalog: &EventCatalog,
    config: &AggregatorConfig,
) -> AnalysisReport {
    let merged = merge_candidates(candidates, config.merge_tolerance_days);
    let dates: Vec<NaiveDate> = merged.iter().map(|m| m.date).collect();
    let correlations = correlate_events(&dates, catalog, config.correlation_window_days);

    let changepoints: Vec<ChangePointSummary> = merged
        .into_iter()
        .zip(correlations)
        .map(|(point, correlation)| {
            let regime = match compare_regimes(series, point.date, &config.regime) {
                Ok(stats) => Some(stats),
                Err(err) => {
                    debug!("regime comparison unavailable for {}: {err}", point.date);
                    None
                }
            };
            let posterior = bayes.and_then(|result| {
                result
                    .changepoints
                    .iter()
                    .find(|cp| point.sources.iter().any(|s| s.date == cp.median_date))
                    .cloned()
            });
            ChangePointSummary {
                date: point.date,
                methods: point.methods(),
                sources: point.sources,
                posterior,
                regime,
                correlation,
            }
        })
        .collect();

    let total_points = changepoints.len();
    let correlated_points = changepoints
        .iter()
        .filter(|cp| !cp.correlation.matches.is_empty())
        .count();
    let correlated_pct = if total_points > 0 {
        100.0 * correlated_points as f64 / total_points as f64
    } else {
        0.0
    };

    AnalysisReport {
        changepoints,
        diagnostics: bayes.map(|b| b.diagnostics.clone()),
        total_points,
        correlated_points,
        correlated_pct,
    }
}

/// Configuration for the full analysis pipeline.
#[derive(Debug, Clone, Default)]
pub struct AnalysisConfig {
    pub rolling: RollingConfig,
    /// `None` runs the rolling heuristics only.
    pub bayes: Option<BayesConfig>,
    pub aggregator: AggregatorConfig,
}

impl AnalysisConfig {
    pub fn rolling(mut self, rolling: RollingConfig) -> Self {
        self.rolling = rolling;
        self
    }

    pub fn bayes(mut self, bayes: BayesConfig) -> Self {
        self.bayes = Some(bayes);
        self
    }

    pub fn aggregator(mut self, aggregator: AggregatorConfig) -> Self {
        self.aggregator = aggregator;
        self
    }
}

/// Run the full pipeline: rolling heuristics, optional Bayesian model,
/// merge, and enrichment.
pub fn analyze(
    series: &PriceSeries,
    catalog: &EventCatalog,
    config: &AnalysisConfig,
) -> Result<AnalysisReport> {
    let rolling = rolling_detect(series, &config.rolling)?;
    let mut candidates = rolling.all_candidates();

    let bayes = match &config.bayes {
        Some(bayes_config) => {
            let result = bayes_detect(series, bayes_config)?;
            candidates.extend(result.candidates());
            Some(result)
        }
        None => None,
    };

    Ok(aggregate(
        series,
        candidates,
        bayes.as_ref(),
        catalog,
        &config.aggregator,
    ))
}
