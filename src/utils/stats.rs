//! Statistical utility functions shared across detectors.

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Calculate the sample variance of a slice (n-1 denominator).
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / (values.len() - 1) as f64
}

/// Calculate the sample standard deviation of a slice.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Calculate the median of a slice.
pub fn median(values: &[f64]) -> f64 {
    percentile(values, 50.0)
}

/// Calculate a percentile (0..=100) via linear interpolation between
/// order statistics, matching the numpy default.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() || !(0.0..=100.0).contains(&p) {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_calculates_correctly() {
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0, 4.0, 5.0]), 3.0, epsilon = 1e-10);
        assert_relative_eq!(mean(&[7.5]), 7.5, epsilon = 1e-10);
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn variance_uses_sample_denominator() {
        assert_relative_eq!(variance(&[1.0, 2.0, 3.0, 4.0, 5.0]), 2.5, epsilon = 1e-10);
        assert!(variance(&[1.0]).is_nan());
    }

    #[test]
    fn std_dev_is_sqrt_of_variance() {
        assert_relative_eq!(
            std_dev(&[1.0, 2.0, 3.0, 4.0, 5.0]),
            2.5_f64.sqrt(),
            epsilon = 1e-10
        );
    }

    #[test]
    fn median_handles_odd_even_and_unsorted() {
        assert_relative_eq!(median(&[1.0, 2.0, 3.0, 4.0, 5.0]), 3.0, epsilon = 1e-10);
        assert_relative_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5, epsilon = 1e-10);
        assert_relative_eq!(median(&[5.0, 1.0, 3.0, 2.0, 4.0]), 3.0, epsilon = 1e-10);
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn percentile_interpolates() {
        let values = vec![10.0, 20.0, 30.0, 40.0, 50.0];
        assert_relative_eq!(percentile(&values, 0.0), 10.0, epsilon = 1e-10);
        assert_relative_eq!(percentile(&values, 100.0), 50.0, epsilon = 1e-10);
        assert_relative_eq!(percentile(&values, 25.0), 20.0, epsilon = 1e-10);
        assert_relative_eq!(percentile(&values, 62.5), 35.0, epsilon = 1e-10);
    }

    #[test]
    fn percentile_rejects_out_of_range() {
        assert!(percentile(&[1.0, 2.0], -1.0).is_nan());
        assert!(percentile(&[1.0, 2.0], 101.0).is_nan());
    }
}
