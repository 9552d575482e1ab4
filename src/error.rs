//! Error types for seg-eval operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::label::Label;

/// Result type alias for seg-eval operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while assessing segmentations or scoring forecasts.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// An input file does not exist (or is not a regular file).
    #[error("File does not exist: {0}")]
    MissingFile(PathBuf),

    /// Failed to load a label volume.
    #[error("Volume load failed: {path}: {reason}")]
    VolumeLoad {
        /// Path to the volume that failed to load.
        path: PathBuf,
        /// Reason for the failure.
        reason: String,
    },

    /// Reference and target volumes do not have the same shape.
    #[error("Shape mismatch: reference {expected:?}, target {actual:?}")]
    ShapeMismatch {
        /// Reference shape (z, y, x).
        expected: (usize, usize, usize),
        /// Target shape (z, y, x).
        actual: (usize, usize, usize),
    },

    /// A label has no voxels in one of the compared volumes.
    #[error("Label {label} is empty in the {side} segmentation")]
    EmptyMask {
        /// The label being measured.
        label: Label,
        /// Which side was empty ("reference" or "target").
        side: &'static str,
    },

    /// A label has foreground voxels but no surface voxels (e.g. it fills the whole volume).
    #[error("Label {label} has no surface voxels in the {side} segmentation")]
    EmptySurface {
        /// The label being measured.
        label: Label,
        /// Which side had no surface.
        side: &'static str,
    },

    /// Error reading a CSV input.
    #[error("CSV import error at line {line}: {reason}")]
    CsvImport {
        /// Line number where the error occurred.
        line: usize,
        /// Reason for the failure.
        reason: String,
    },

    /// A row of a CDF file is unusable; the whole CRPS batch is void.
    #[error("Corrupted CDF row {row}: {reason}")]
    CorruptCdf {
        /// Zero-based row index (header excluded).
        row: usize,
        /// What was wrong with the row.
        reason: String,
    },

    /// No CDF rows to score.
    #[error("No CDF rows to score")]
    EmptyCdf,

    /// I/O error wrapper.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// NIfTI decoding error.
    #[error("NIfTI error: {0}")]
    Nifti(#[from] nifti::NiftiError),

    /// Array shape error while rearranging voxel data.
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}
