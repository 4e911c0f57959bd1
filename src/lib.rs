//! # breakscan
//!
//! Structural-break detection and event correlation for financial time
//! series.
//!
//! The pipeline prepares a validated price series with log-returns, runs
//! two independent change-point detectors (rolling heuristics and a
//! Bayesian multi-change-point model), characterizes the regime on each
//! side of every break, and correlates break dates with a catalog of
//! real-world events.
//!
//! ```
//! use breakscan::prelude::*;
//! use chrono::{Duration, NaiveDate};
//!
//! let base = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
//! let records: Vec<RawRecord> = (0..40i64)
//!     .map(|i| {
//!         let price = if i < 20 { 50.0 } else { 100.0 } + (i % 3) as f64;
//!         RawRecord::new((base + Duration::days(i)).to_string(), price)
//!     })
//!     .collect();
//! let series = prepare_series(&records, "%Y-%m-%d").unwrap();
//!
//! let config = AnalysisConfig::default()
//!     .rolling(RollingConfig::default().level_window(10).vol_window(5));
//! let report = analyze(&series, &EventCatalog::default(), &config).unwrap();
//! assert!(report.total_points >= 1);
//! ```

pub mod core;
pub mod correlate;
pub mod detect;
pub mod error;
pub mod regime;
pub mod report;
pub mod utils;

pub use error::{AnalysisError, Result};

pub mod prelude {
    pub use crate::core::{prepare_series, Event, EventCatalog, PriceSeries, RawRecord};
    pub use crate::correlate::{correlate_events, EventCorrelation, EventMatch};
    pub use crate::detect::{
        bayes_detect, rolling_detect, BayesConfig, BayesResult, ChangePointCandidate,
        ChangePointDetector, DetectionMethod, RollingConfig,
    };
    pub use crate::error::{AnalysisError, Result};
    pub use crate::regime::{compare_regimes, RegimeConfig, RegimeStats};
    pub use crate::report::{analyze, AnalysisConfig, AnalysisReport, ChangePointSummary};
}
