//! Label volumes, voxel geometry and per-label voxel statistics.
//!
//! Voxel data is stored as `(z, y, x)` so that the innermost axis is the
//! in-plane horizontal direction, matching the layout NIfTI files decode to
//! once their column-major axes are reversed.

use std::path::Path;

use ndarray::{Array3, ArrayView3, Zip};
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::label::Label;

/// Cubic millimetres to millilitres.
pub const MM3_TO_ML: f64 = 0.001;

/// Physical voxel spacing in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spacing {
    /// In-plane horizontal spacing.
    pub x: f64,
    /// In-plane vertical spacing.
    pub y: f64,
    /// Slice spacing.
    pub z: f64,
}

impl Spacing {
    /// Create a spacing from `(sx, sy, sz)`.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Isotropic spacing.
    #[must_use]
    pub const fn isotropic(s: f64) -> Self {
        Self::new(s, s, s)
    }

    /// Spacing along the array axes, i.e. `[z, y, x]`.
    #[inline]
    #[must_use]
    pub const fn along_axes(&self) -> [f64; 3] {
        [self.z, self.y, self.x]
    }

    /// Physical volume of one voxel in mm³.
    #[inline]
    #[must_use]
    pub fn voxel_volume(&self) -> f64 {
        self.x * self.y * self.z
    }

    /// Convert a voxel count to millilitres.
    #[inline]
    #[must_use]
    pub fn to_millilitres(&self, voxels: usize) -> f64 {
        voxels as f64 * self.voxel_volume() * MM3_TO_ML
    }

    /// Whether two spacings agree within `tolerance` on every axis.
    ///
    /// A tolerance of `0.0` asks for exact equality.
    #[must_use]
    pub fn matches(&self, other: &Self, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.z - other.z).abs() <= tolerance
    }
}

impl Default for Spacing {
    fn default() -> Self {
        Self::isotropic(1.0)
    }
}

/// A 3D label image with its voxel spacing.
#[derive(Debug, Clone)]
pub struct LabelVolume {
    data: Array3<u16>,
    spacing: Spacing,
}

impl LabelVolume {
    /// Wrap voxel data laid out as `(z, y, x)`.
    #[must_use]
    pub fn new(data: Array3<u16>, spacing: Spacing) -> Self {
        Self { data, spacing }
    }

    /// Load a NIfTI label image (`.nii` or `.nii.gz`).
    ///
    /// Voxel values are converted to `u16`. Trailing singleton dimensions
    /// (e.g. a 4D file with one time point) are dropped.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let obj = ReaderOptions::new().read_file(path)?;

        let [_, sx, sy, sz, ..] = obj.header().pixdim;
        let spacing = Spacing::new(f64::from(sx), f64::from(sy), f64::from(sz));

        // Column-major [x, y, z, ...]
        let raw = obj.into_volume().into_ndarray::<u16>()?;
        let shape = raw.shape().to_vec();
        if shape.len() < 3 || shape[3..].iter().any(|&d| d != 1) {
            return Err(Error::VolumeLoad {
                path: path.to_path_buf(),
                reason: format!("expected a 3D volume, got dimensions {shape:?}"),
            });
        }

        let data = raw
            .into_shape((shape[0], shape[1], shape[2]))?
            .permuted_axes([2, 1, 0])
            .as_standard_layout()
            .into_owned();

        Ok(Self { data, spacing })
    }

    /// Shape as `(z, y, x)`.
    #[inline]
    #[must_use]
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Voxel spacing.
    #[inline]
    #[must_use]
    pub fn spacing(&self) -> Spacing {
        self.spacing
    }

    /// Read-only view of the voxel data.
    #[inline]
    #[must_use]
    pub fn data(&self) -> ArrayView3<'_, u16> {
        self.data.view()
    }

    /// Number of voxels carrying `label`.
    #[must_use]
    pub fn count(&self, label: Label) -> usize {
        let code = label.code();
        self.data.iter().filter(|&&v| v == code).count()
    }

    /// Binary mask of the voxels carrying `label`.
    #[must_use]
    pub fn mask(&self, label: Label) -> Array3<bool> {
        let code = label.code();
        self.data.mapv(|v| v == code)
    }

    /// Known labels that occur at least once, in [`Label::ALL`] order.
    #[must_use]
    pub fn labels_present(&self) -> Vec<Label> {
        LabelStatistics::of(self).labels_present()
    }

    /// Count voxels where both volumes carry `label`.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    #[must_use]
    pub fn intersection(&self, other: &Self, label: Label) -> usize {
        let code = label.code();
        let mut count = 0usize;
        Zip::from(&self.data).and(&other.data).for_each(|&a, &b| {
            if a == code && b == code {
                count += 1;
            }
        });
        count
    }
}

/// Voxel counts for every known label, gathered in a single pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelStatistics {
    counts: [usize; Label::COUNT],
}

impl LabelStatistics {
    /// Tally a volume. Codes outside the label set are ignored.
    #[must_use]
    pub fn of(volume: &LabelVolume) -> Self {
        let mut counts = [0usize; Label::COUNT];
        for label in volume.data.iter().filter_map(|&v| Label::from_code(v)) {
            counts[label.index()] += 1;
        }
        Self { counts }
    }

    /// Voxel count for `label` (0 if absent).
    #[inline]
    #[must_use]
    pub fn count(&self, label: Label) -> usize {
        self.counts[label.index()]
    }

    /// Labels with a non-zero count.
    #[must_use]
    pub fn labels_present(&self) -> Vec<Label> {
        Label::ALL
            .into_iter()
            .filter(|l| self.count(*l) > 0)
            .collect()
    }
}
