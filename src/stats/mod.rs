//! Statistics over per-case measurements.
//!
//! ## Core Statistics
//!
//! - [`Summary`]: Mean and population standard deviation of one series
//! - [`mean`], [`population_std_dev`]: Basic statistical functions
//! - [`mean_absolute_error`], [`pearson`]: Paired-series agreement
//! - [`limits_of_agreement`]: Bland–Altman style 95% band half-width
//!
//! ## Probabilistic forecasts
//!
//! - [`CrpsScorer`]: Continuous Ranked Probability Score over volume CDFs

pub mod crps;

pub use crps::{CdfRow, CrpsScorer, MAX_VOLUME};

use serde::{Deserialize, Serialize};

/// Multiplier turning a standard deviation into 95% limits of agreement.
pub const LOA_FACTOR: f64 = 1.96;

/// Descriptive statistics for a set of measurements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    /// Mean value.
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
}

impl Summary {
    /// Compute summary statistics for a slice of values.
    ///
    /// Returns `None` if the slice is empty.
    #[must_use]
    pub fn compute(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        Some(Self {
            mean: mean(values),
            std_dev: population_std_dev(values),
        })
    }
}

//=============================================================================
// Core Statistical Functions
//=============================================================================

/// Compute arithmetic mean.
///
/// # Example
///
/// ```
/// use seg_eval::stats::mean;
///
/// assert!((mean(&[1.0, 2.0, 3.0, 4.0, 5.0]) - 3.0).abs() < 0.001);
/// ```
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Compute population standard deviation (N denominator, as `numpy.std`).
///
/// # Example
///
/// ```
/// use seg_eval::stats::population_std_dev;
///
/// let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
/// assert!((population_std_dev(&values) - 2.0).abs() < 0.001);
/// ```
#[must_use]
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Mean of `|a_i - b_i|` over paired values.
///
/// Extra values in the longer slice are ignored. Returns 0 for empty input.
#[must_use]
pub fn mean_absolute_error(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum::<f64>() / n as f64
}

/// Pearson correlation coefficient of two paired series.
///
/// Returns `NaN` if the series differ in length, are empty, or either one
/// has zero variance.
///
/// # Example
///
/// ```
/// use seg_eval::stats::pearson;
///
/// let r = pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]);
/// assert!((r - 1.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return f64::NAN;
    }
    let ma = mean(a);
    let mb = mean(b);

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let dx = x - ma;
        let dy = y - mb;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = (var_a * var_b).sqrt();
    if denom == 0.0 {
        return f64::NAN;
    }
    cov / denom
}

/// Half-width of the 95% limits of agreement for a series with standard
/// deviation `std_dev`.
#[inline]
#[must_use]
pub fn limits_of_agreement(std_dev: f64) -> f64 {
    LOA_FACTOR * std_dev
}
