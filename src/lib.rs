//! # seg-eval
//!
//! Agreement metrics for 3D cardiac segmentations.
//!
//! Compares a reference label image with a target label image per anatomical
//! structure (LV cavity, myocardium, infarction, MVO) and aggregates the
//! results over a cohort. A separate scorer computes the CRPS of probabilistic
//! volume forecasts.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use seg_eval::{AssessConfig, CaseAssessment, Cohort};
//!
//! // One case
//! let config = AssessConfig::default();
//! let mut case = CaseAssessment::new("ref/case01.nii.gz", "pred/case01.nii.gz");
//! case.compute(&config);
//! print!("{}", case.render_console(&config.precision));
//!
//! // A cohort from a REFERENCE,TARGET list
//! let mut cohort = Cohort::from_csv("Segmentations.csv", config)?;
//! cohort.compute();
//! cohort.write_csv("Results.csv")?;
//! ```
//!
//! ## Modules
//!
//! - [`error`]: Error types for the library
//! - [`label`]: The fixed label set
//! - [`volume`]: Label volumes, voxel spacing and label statistics
//! - [`metrics`]: Dice, Hausdorff distance, ASSD and reporting precision
//! - [`eval`]: Case and cohort assessment, report generation
//! - [`import`]: CSV import for segmentation lists and forecasts
//! - [`stats`]: Summary statistics and CRPS

pub mod error;
pub mod eval;
pub mod import;
pub mod label;
pub mod metrics;
pub mod stats;
pub mod volume;

// Re-export commonly used types
pub use error::{Error, Result};
pub use eval::{
    case::{CaseAssessment, CaseMetrics, CaseMetricsBuilder},
    report::{CohortReport, MetricRow, MetricsTable},
    session::{AssessConfig, Cohort, CohortSummary},
};
pub use import::SegmentationPair;
pub use label::Label;
pub use metrics::{Measurement, MetricKind, Precision};
pub use stats::{CdfRow, CrpsScorer, Summary};
pub use volume::{LabelStatistics, LabelVolume, Spacing};
