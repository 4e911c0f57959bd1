//! Convergence diagnostics for multi-chain Monte Carlo output.

use serde::Serialize;

/// Split potential-scale-reduction statistic (R-hat) for one parameter.
///
/// Each chain is split in half and the halves are treated as independent
/// chains, so poor mixing within a single chain also inflates the
/// statistic. Values near 1.0 indicate the chains agree; values above
/// ~1.1 indicate non-convergence.
pub fn split_r_hat(chains: &[Vec<f64>]) -> f64 {
    let mut halves: Vec<&[f64]> = Vec::with_capacity(chains.len() * 2);
    for chain in chains {
        let mid = chain.len() / 2;
        if mid < 2 {
            return f64::NAN;
        }
        halves.push(&chain[..mid]);
        halves.push(&chain[mid..mid * 2]);
    }
    if halves.is_empty() {
        return f64::NAN;
    }

    let n = halves[0].len() as f64;
    let m = halves.len() as f64;

    let means: Vec<f64> = halves
        .iter()
        .map(|h| h.iter().sum::<f64>() / h.len() as f64)
        .collect();
    let grand_mean = means.iter().sum::<f64>() / m;

    // Between-chain variance.
    let b = n / (m - 1.0)
        * means
            .iter()
            .map(|mu| (mu - grand_mean) * (mu - grand_mean))
            .sum::<f64>();

    // Within-chain variance.
    let w = halves
        .iter()
        .zip(&means)
        .map(|(h, mu)| {
            h.iter().map(|x| (x - mu) * (x - mu)).sum::<f64>() / (h.len() as f64 - 1.0)
        })
        .sum::<f64>()
        / m;

    if w < 1e-12 {
        // Degenerate chains: identical constants agree perfectly,
        // differing constants never will.
        return if b < 1e-12 { 1.0 } else { f64::INFINITY };
    }

    let var_plus = (n - 1.0) / n * w + b / n;
    (var_plus / w).sqrt()
}

/// Per-parameter convergence report for a sampling run.
#[derive(Debug, Clone, Serialize)]
pub struct ConvergenceDiagnostics {
    /// (parameter name, split R-hat) pairs.
    pub r_hat: Vec<(String, f64)>,
    /// Threshold above which a parameter counts as non-converged.
    pub threshold: f64,
    /// True when every parameter's R-hat is at or below the threshold.
    pub converged: bool,
}

impl ConvergenceDiagnostics {
    pub fn from_r_hat(r_hat: Vec<(String, f64)>, threshold: f64) -> Self {
        let converged = r_hat
            .iter()
            .all(|&(_, r)| r.is_finite() && r <= threshold);
        Self {
            r_hat,
            threshold,
            converged,
        }
    }

    /// The worst R-hat across parameters.
    pub fn max_r_hat(&self) -> f64 {
        self.r_hat
            .iter()
            .map(|&(_, r)| r)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}
