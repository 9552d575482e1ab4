//! Agreement metrics between a reference and a target segmentation.
//!
//! Supported metrics:
//!
//! - **Volume** (mL) and the absolute volume difference between the two sides
//! - **Dice**: overlap in [0, 1], 1 = identical
//! - **HD**: symmetric Hausdorff distance in mm, 0 = identical masks
//! - **ASSD**: average symmetric surface distance in mm, 0 = coincident surfaces
//!
//! Cohort-level metrics (correlation, limits of agreement) are produced by
//! [`crate::eval::session::CohortSummary`] and share the [`MetricKind`] keys.
//!
//! ## Reporting precision
//!
//! | Metric | Decimals |
//! |--------|----------|
//! | VOLUME | 1 |
//! | DICE | 3 |
//! | HD | 3 |
//! | ASSD | 3 |
//! | VOLUME MAE, VOLUME CC, VOLUME LOA | 4 |

pub mod overlap;
pub mod surface;

use serde::{Deserialize, Serialize};

pub use overlap::dice;
pub use surface::{SurfaceDistances, hausdorff_distance};

/// The metrics tracked per label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    /// Segmented volume in mL.
    Volume,
    /// Absolute (per case) or mean absolute (cohort) volume error in mL.
    VolumeMae,
    /// Pearson correlation of reference and target volumes across cases.
    VolumeCc,
    /// 95% limits of agreement (1.96 σ of the volume series).
    VolumeLoa,
    /// Dice overlap coefficient.
    Dice,
    /// Symmetric Hausdorff distance in mm.
    Hd,
    /// Average symmetric surface distance in mm.
    Assd,
}

impl MetricKind {
    /// Number of metric kinds.
    pub const COUNT: usize = 7;

    /// All metric kinds.
    pub const ALL: [MetricKind; Self::COUNT] = [
        MetricKind::Volume,
        MetricKind::VolumeMae,
        MetricKind::VolumeCc,
        MetricKind::VolumeLoa,
        MetricKind::Dice,
        MetricKind::Hd,
        MetricKind::Assd,
    ];

    /// Metrics written to the output table, in column order.
    pub const TABLE: [MetricKind; 6] = [
        MetricKind::Volume,
        MetricKind::VolumeMae,
        MetricKind::VolumeCc,
        MetricKind::Dice,
        MetricKind::Hd,
        MetricKind::Assd,
    ];

    /// Name used in reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Volume => "VOLUME",
            Self::VolumeMae => "VOLUME MAE",
            Self::VolumeCc => "VOLUME CC",
            Self::VolumeLoa => "VOLUME LOA",
            Self::Dice => "DICE",
            Self::Hd => "HD",
            Self::Assd => "ASSD",
        }
    }

    /// Position of this metric in [`MetricKind::ALL`].
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A value with its standard deviation. Per-case measurements have `std = 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// The value.
    pub value: f64,
    /// Standard deviation (cohort summaries only).
    pub std: f64,
}

impl Measurement {
    /// Create a measurement.
    #[must_use]
    pub const fn new(value: f64, std: f64) -> Self {
        Self { value, std }
    }

    /// A single value without spread.
    #[must_use]
    pub const fn value(value: f64) -> Self {
        Self { value, std: 0.0 }
    }

    /// Round both fields to `decimals` places.
    #[must_use]
    pub fn rounded(self, decimals: u32) -> Self {
        Self {
            value: round_to(self.value, decimals),
            std: round_to(self.std, decimals),
        }
    }
}

/// Per-metric number of decimals used when reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precision {
    decimals: [u32; MetricKind::COUNT],
}

impl Precision {
    /// Decimals used for any metric without a dedicated entry.
    pub const DEFAULT_DECIMALS: u32 = 4;

    /// Decimals for `metric`.
    #[inline]
    #[must_use]
    pub fn decimals(&self, metric: MetricKind) -> u32 {
        self.decimals[metric.index()]
    }

    /// Override the decimals for `metric`.
    #[must_use]
    pub fn with(mut self, metric: MetricKind, decimals: u32) -> Self {
        self.decimals[metric.index()] = decimals;
        self
    }

    /// Round `m` as `metric` is reported.
    #[must_use]
    pub fn apply(&self, metric: MetricKind, m: Measurement) -> Measurement {
        m.rounded(self.decimals(metric))
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self {
            decimals: [Self::DEFAULT_DECIMALS; MetricKind::COUNT],
        }
        .with(MetricKind::Volume, 1)
        .with(MetricKind::Dice, 3)
        .with(MetricKind::Hd, 3)
        .with(MetricKind::Assd, 3)
    }
}

/// Round to `decimals` places, ties to even on the scaled value.
///
/// This reproduces `numpy.round`, so `round_to(0.125, 2) == 0.12`.
/// Non-finite values pass through unchanged.
#[must_use]
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round_ties_even() / scale
}
