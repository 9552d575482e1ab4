//! Continuous Ranked Probability Score for volume forecasts.
//!
//! Each forecast is a cumulative distribution `P(y ≤ n)` sampled at integer
//! volumes `n = 0..600` mL. The score compares it with the step function of
//! the observed volume:
//!
//! ```text
//! CRPS = 1/(600·N) · Σ_m Σ_n (P_m(n) − H(n − V_m))²
//! ```
//!
//! where `H(x) = 1` for `x ≥ 0` and `0` otherwise. Lower is better; a perfect
//! forecast scores 0.
//!
//! Validation is fail-closed for the whole batch: one corrupt row voids the
//! score.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::metrics::round_to;

/// Number of CDF samples per forecast (volumes 0..600 mL).
pub const MAX_VOLUME: usize = 600;

/// Decimals of the reported score.
const SCORE_DECIMALS: u32 = 4;

/// Heaviside step: 1 for `x ≥ 0`, 0 otherwise.
#[inline]
#[must_use]
pub fn heaviside(x: f64) -> f64 {
    if x < 0.0 { 0.0 } else { 1.0 }
}

/// One probabilistic volume forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CdfRow {
    /// Volume identifier.
    pub id: String,
    /// Observed volume in mL.
    pub volume: f64,
    /// `P(y ≤ n)` for `n = 0, 1, ...`. Unparseable cells are stored as `NaN`.
    pub probabilities: Vec<f64>,
}

impl CdfRow {
    /// Create a row.
    pub fn new(id: impl Into<String>, volume: f64, probabilities: Vec<f64>) -> Self {
        Self {
            id: id.into(),
            volume,
            probabilities,
        }
    }

    /// The degenerate forecast that puts all mass on `volume`: zeros, then
    /// ones from `trunc(volume)` on. Volumes outside `(0, 600)` give all zeros.
    pub fn step(id: impl Into<String>, volume: f64) -> Self {
        let mut probabilities = vec![0.0; MAX_VOLUME];
        if volume > 0.0 && volume < MAX_VOLUME as f64 {
            let first = volume.trunc() as usize;
            probabilities[first..].fill(1.0);
        }
        Self::new(id, volume, probabilities)
    }

    /// Sum of squared differences against the observed step function.
    fn squared_error(&self, row: usize) -> Result<f64> {
        if self.probabilities.len() < MAX_VOLUME {
            return Err(Error::CorruptCdf {
                row,
                reason: format!(
                    "expected {MAX_VOLUME} probabilities (ID, VOL, P0..P{}), found {}",
                    MAX_VOLUME - 1,
                    self.probabilities.len()
                ),
            });
        }
        if !self.volume.is_finite() {
            return Err(Error::CorruptCdf {
                row,
                reason: "volume is not a finite number".to_string(),
            });
        }

        let mut sum = 0.0;
        for (n, &p) in self.probabilities[..MAX_VOLUME].iter().enumerate() {
            if !p.is_finite() || !(0.0..=1.0).contains(&p) {
                return Err(Error::CorruptCdf {
                    row,
                    reason: format!("P{n} is not a probability ({p})"),
                });
            }
            sum += (p - heaviside(n as f64 - self.volume)).powi(2);
        }
        Ok(sum)
    }
}

/// Scores a batch of forecasts.
#[derive(Debug, Clone, Default)]
pub struct CrpsScorer {
    rows: Vec<CdfRow>,
}

impl CrpsScorer {
    /// Score the given rows.
    #[must_use]
    pub fn new(rows: Vec<CdfRow>) -> Self {
        Self { rows }
    }

    /// Read rows from a `ID, VOL, P0..P599` CSV file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or not valid CSV.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        crate::import::read_cdf_csv(path).map(Self::new)
    }

    /// The forecasts being scored.
    #[must_use]
    pub fn rows(&self) -> &[CdfRow] {
        &self.rows
    }

    /// CRPS over all rows, rounded to 4 decimals.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyCdf`] for an empty batch, [`Error::CorruptCdf`] for the
    /// first row that is short, non-numeric or out of range.
    pub fn score(&self) -> Result<f64> {
        if self.rows.is_empty() {
            return Err(Error::EmptyCdf);
        }
        tracing::info!(volumes = self.rows.len(), "calculating CRPS");

        let mut total = 0.0;
        for (i, row) in self.rows.iter().enumerate() {
            tracing::debug!(id = %row.id, volume = row.volume, "reading forecast");
            total += row.squared_error(i)?;
        }

        let crps = total / (MAX_VOLUME * self.rows.len()) as f64;
        Ok(round_to(crps, SCORE_DECIMALS))
    }

    /// Like [`CrpsScorer::score`], but logs the failure and returns `0.0`.
    #[must_use]
    pub fn score_or_zero(&self) -> f64 {
        self.score().unwrap_or_else(|e| {
            tracing::warn!("CRPS not computed: {e}");
            0.0
        })
    }
}
