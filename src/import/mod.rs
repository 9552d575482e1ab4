//! CSV import for segmentation lists and volume forecasts.
//!
//! ## Supported Formats
//!
//! Segmentation list: one row per case, with `REFERENCE` and `TARGET` columns
//! holding label image paths. Header lookup is case-insensitive and other
//! columns are ignored.
//!
//! ```text
//! REFERENCE,TARGET
//! data/ref/case01.nii.gz,data/pred/case01.nii.gz
//! ```
//!
//! Volume forecasts: `ID, VOL, P0, P1, ..., P599`, read positionally. Short
//! rows are accepted here so that the scorer can reject them; cells that do
//! not parse as numbers become `NaN`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use seg_eval::import::read_segmentation_list;
//!
//! let pairs = read_segmentation_list("Segmentations.csv")?;
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::stats::CdfRow;

/// One (reference, target) row of a segmentation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentationPair {
    /// Reference (ground truth) label image.
    pub reference: PathBuf,
    /// Target (candidate) label image.
    pub target: PathBuf,
}

impl SegmentationPair {
    /// Create a pair.
    pub fn new(reference: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            reference: reference.into(),
            target: target.into(),
        }
    }

    /// Whether both files exist.
    #[must_use]
    pub fn files_exist(&self) -> bool {
        self.reference.is_file() && self.target.is_file()
    }
}

/// Read a `REFERENCE, TARGET` segmentation list.
///
/// Paths are returned as written; existence is not checked here.
///
/// # Errors
///
/// Returns an error if the file cannot be read, either column is missing, or a
/// record is malformed.
pub fn read_segmentation_list(path: impl AsRef<Path>) -> Result<Vec<SegmentationPair>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::MissingFile(path.to_path_buf()));
    }
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();

    let reference_idx =
        find_header_index(&header_refs, "REFERENCE").ok_or_else(|| Error::CsvImport {
            line: 1,
            reason: "Could not find REFERENCE column".to_string(),
        })?;
    let target_idx = find_header_index(&header_refs, "TARGET").ok_or_else(|| Error::CsvImport {
        line: 1,
        reason: "Could not find TARGET column".to_string(),
    })?;

    let mut pairs = Vec::new();
    for (line_num, record) in reader.records().enumerate() {
        let record = record.map_err(|e| Error::CsvImport {
            line: line_num + 2, // +2 for 1-based and header
            reason: e.to_string(),
        })?;

        let reference = record.get(reference_idx).unwrap_or("");
        let target = record.get(target_idx).unwrap_or("");
        if reference.is_empty() && target.is_empty() {
            continue;
        }
        pairs.push(SegmentationPair::new(reference, target));
    }

    Ok(pairs)
}

/// Read `ID, VOL, P0..P599` forecast rows.
///
/// # Errors
///
/// Returns an error if the file is missing or cannot be parsed as CSV.
pub fn read_cdf_csv(path: impl AsRef<Path>) -> Result<Vec<CdfRow>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::MissingFile(path.to_path_buf()));
    }
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let id = record.get(0).unwrap_or("").to_string();
        let volume = record.get(1).map_or(f64::NAN, parse_cell);
        let probabilities = record.iter().skip(2).map(parse_cell).collect();
        rows.push(CdfRow::new(id, volume, probabilities));
    }

    tracing::debug!(path = %path.display(), rows = rows.len(), "loaded forecasts");
    Ok(rows)
}

fn parse_cell(cell: &str) -> f64 {
    cell.parse().unwrap_or(f64::NAN)
}

/// Find a header index by name (case-insensitive).
fn find_header_index(headers: &[&str], name: &str) -> Option<usize> {
    let name_lower = name.to_lowercase();
    headers.iter().position(|h| h.to_lowercase() == name_lower)
}
