//! Utility functions for change-point analysis.

pub mod stats;

pub use stats::{mean, median, percentile, std_dev, variance};
