//! Error types for the breakscan library.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors that can occur during change-point analysis.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Input series is malformed or too short to analyze. Fatal to the run.
    #[error("invalid series data: {0}")]
    Data(String),

    /// Model configuration is incompatible with the series, e.g. more
    /// change points than the data can separate. Raised before sampling.
    #[error("model configuration error: {0}")]
    ModelConfig(String),

    /// A regime window around one change point is empty. Reported per
    /// entry; other change points in the batch are unaffected.
    #[error("insufficient data around change point {date}: {side} window is empty")]
    InsufficientData {
        /// The change-point date that could not be enriched.
        date: NaiveDate,
        /// Which window was empty ("before" or "after").
        side: &'static str,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}
