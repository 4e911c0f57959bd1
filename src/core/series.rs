//! Price series preparation: validation, ordering, and derived log-returns.

use crate::error::{AnalysisError, Result};
use crate::utils::stats::{mean, std_dev};
use chrono::NaiveDate;
use log::debug;
use serde::Serialize;

/// A raw price record as supplied by an ingestion collaborator.
///
/// Dates arrive as strings in a caller-specified format; unparseable rows
/// are dropped during preparation rather than failing the run.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub date: String,
    pub price: f64,
}

impl RawRecord {
    pub fn new(date: impl Into<String>, price: f64) -> Self {
        Self {
            date: date.into(),
            price,
        }
    }
}

/// A validated, chronologically ordered price series with derived
/// log-returns.
///
/// Invariants: dates strictly increasing, prices positive and finite,
/// `log_returns.len() == len() - 1`. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    dates: Vec<NaiveDate>,
    prices: Vec<f64>,
    log_returns: Vec<f64>,
}

/// Descriptive statistics for a prepared series.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesSummary {
    pub observations: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub min_price: f64,
    pub max_price: f64,
    pub mean_price: f64,
    pub price_std: f64,
    pub mean_return: f64,
    pub return_std: f64,
}

impl PriceSeries {
    /// Create a series from already-parsed observations.
    ///
    /// Fails if fewer than 2 observations remain, dates are not strictly
    /// increasing, or any price is non-positive or non-finite.
    pub fn new(dates: Vec<NaiveDate>, prices: Vec<f64>) -> Result<Self> {
        if dates.len() != prices.len() {
            return Err(AnalysisError::Data(format!(
                "date/price length mismatch: {} vs {}",
                dates.len(),
                prices.len()
            )));
        }
        if dates.len() < 2 {
            return Err(AnalysisError::Data(format!(
                "need at least 2 observations, got {}",
                dates.len()
            )));
        }
        for pair in dates.windows(2) {
            if pair[1] <= pair[0] {
                return Err(AnalysisError::Data(
                    "dates must be strictly increasing".to_string(),
                ));
            }
        }
        for &p in &prices {
            if !p.is_finite() || p <= 0.0 {
                return Err(AnalysisError::Data(format!(
                    "prices must be positive and finite, got {p}"
                )));
            }
        }

        let log_returns = prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect();

        Ok(Self {
            dates,
            prices,
            log_returns,
        })
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    /// Log-returns; entry `i` is `ln(price[i+1] / price[i])`, so the first
    /// observation has no return.
    pub fn log_returns(&self) -> &[f64] {
        &self.log_returns
    }

    /// Date of the observation at `index`, clamped to the series range.
    pub fn date_at_clamped(&self, index: usize) -> NaiveDate {
        self.dates[index.min(self.dates.len() - 1)]
    }

    /// Index of the first observation on or after `date`, or `len()` if
    /// every observation precedes it.
    pub fn partition_index(&self, date: NaiveDate) -> usize {
        self.dates.partition_point(|&d| d < date)
    }

    /// Descriptive statistics over prices and returns.
    pub fn summary(&self) -> SeriesSummary {
        let min_price = self.prices.iter().copied().fold(f64::INFINITY, f64::min);
        let max_price = self
            .prices
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        SeriesSummary {
            observations: self.len(),
            start_date: self.dates[0],
            end_date: self.dates[self.len() - 1],
            min_price,
            max_price,
            mean_price: mean(&self.prices),
            price_std: std_dev(&self.prices),
            mean_return: mean(&self.log_returns),
            return_std: std_dev(&self.log_returns),
        }
    }
}

/// Prepare a validated series from raw records.
///
/// Rows with unparseable dates or non-positive/non-finite prices are
/// dropped. Records are stably sorted by date; when duplicate dates exist
/// the first occurrence in input order wins. Fails with a data error when
/// fewer than 2 valid observations remain.
pub fn prepare_series(records: &[RawRecord], date_format: &str) -> Result<PriceSeries> {
    let mut parsed: Vec<(NaiveDate, f64)> = Vec::with_capacity(records.len());
    let mut dropped = 0usize;

    for record in records {
        match NaiveDate::parse_from_str(&record.date, date_format) {
            Ok(date) if record.price.is_finite() && record.price > 0.0 => {
                parsed.push((date, record.price));
            }
            _ => dropped += 1,
        }
    }
    if dropped > 0 {
        debug!("dropped {dropped} of {} raw records", records.len());
    }

    parsed.sort_by_key(|&(date, _)| date);

    // Keep the first occurrence of each date; sort_by_key is stable so
    // input order decides among duplicates.
    parsed.dedup_by_key(|&mut (date, _)| date);

    if parsed.len() < 2 {
        return Err(AnalysisError::Data(format!(
            "need at least 2 valid observations, got {} ({dropped} dropped)",
            parsed.len()
        )));
    }

    let (dates, prices) = parsed.into_iter().unzip();
    PriceSeries::new(dates, prices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_series() -> PriceSeries {
        let dates = (1..=5).map(|d| date(2020, 1, d)).collect();
        PriceSeries::new(dates, vec![100.0, 110.0, 105.0, 120.0, 118.0]).unwrap()
    }

    #[test]
    fn log_returns_are_one_shorter_than_prices() {
        let series = sample_series();
        assert_eq!(series.log_returns().len(), series.len() - 1);
        assert_relative_eq!(
            series.log_returns()[0],
            (110.0_f64 / 100.0).ln(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn rejects_non_increasing_dates() {
        let dates = vec![date(2020, 1, 2), date(2020, 1, 1)];
        let err = PriceSeries::new(dates, vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, AnalysisError::Data(_)));
    }

    #[test]
    fn rejects_non_positive_prices() {
        let dates = vec![date(2020, 1, 1), date(2020, 1, 2)];
        let err = PriceSeries::new(dates, vec![1.0, 0.0]).unwrap_err();
        assert!(matches!(err, AnalysisError::Data(_)));
    }

    #[test]
    fn prepare_drops_unparseable_dates() {
        let records = vec![
            RawRecord::new("2020-01-02", 10.0),
            RawRecord::new("not-a-date", 11.0),
            RawRecord::new("2020-01-01", 9.0),
            RawRecord::new("2020-01-03", -5.0),
            RawRecord::new("2020-01-04", 12.0),
        ];
        let series = prepare_series(&records, "%Y-%m-%d").unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.dates()[0], date(2020, 1, 1));
        assert_relative_eq!(series.prices()[0], 9.0, epsilon = 1e-12);
    }

    #[test]
    fn prepare_keeps_first_duplicate_date() {
        let records = vec![
            RawRecord::new("2020-01-01", 10.0),
            RawRecord::new("2020-01-02", 20.0),
            RawRecord::new("2020-01-02", 99.0),
        ];
        let series = prepare_series(&records, "%Y-%m-%d").unwrap();
        assert_eq!(series.len(), 2);
        assert_relative_eq!(series.prices()[1], 20.0, epsilon = 1e-12);
    }

    #[test]
    fn prepare_fails_below_two_valid_rows() {
        let records = vec![
            RawRecord::new("garbage", 10.0),
            RawRecord::new("2020-01-01", 10.0),
        ];
        let err = prepare_series(&records, "%Y-%m-%d").unwrap_err();
        assert!(matches!(err, AnalysisError::Data(_)));
    }

    #[test]
    fn prepare_parses_day_month_year_format() {
        // The format the upstream Brent CSV uses.
        let records = vec![
            RawRecord::new("20-May-87", 18.63),
            RawRecord::new("21-May-87", 18.45),
        ];
        let series = prepare_series(&records, "%d-%b-%y").unwrap();
        assert_eq!(series.dates()[0], date(1987, 5, 20));
    }

    #[test]
    fn partition_index_splits_on_date() {
        let series = sample_series();
        assert_eq!(series.partition_index(date(2020, 1, 3)), 2);
        assert_eq!(series.partition_index(date(2019, 12, 1)), 0);
        assert_eq!(series.partition_index(date(2021, 1, 1)), series.len());
    }

    #[test]
    fn summary_reports_ranges() {
        let series = sample_series();
        let summary = series.summary();
        assert_eq!(summary.observations, 5);
        assert_eq!(summary.start_date, date(2020, 1, 1));
        assert_eq!(summary.end_date, date(2020, 1, 5));
        assert_relative_eq!(summary.min_price, 100.0, epsilon = 1e-12);
        assert_relative_eq!(summary.max_price, 120.0, epsilon = 1e-12);
    }
}
