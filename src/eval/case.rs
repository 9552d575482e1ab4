//! Assessment of a single (reference, target) segmentation pair.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::eval::report::MetricsTable;
use crate::eval::session::AssessConfig;
use crate::label::Label;
use crate::metrics::{self, Measurement, MetricKind, Precision, SurfaceDistances};
use crate::volume::LabelVolume;

/// Volume loader callback.
///
/// Takes a file path, returns the decoded label volume.
pub type LoadFn = Box<dyn Fn(&Path) -> Result<LabelVolume> + Send + Sync>;

/// Frozen per-segmentation measurements, one per (label, metric).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseMetrics {
    id: String,
    values: [[Measurement; MetricKind::COUNT]; Label::COUNT],
}

impl CaseMetrics {
    /// Start building metrics for segmentation `id`.
    #[must_use]
    pub fn builder(id: impl Into<String>) -> CaseMetricsBuilder {
        CaseMetricsBuilder {
            metrics: Self::empty(id),
        }
    }

    /// All measurements at `(0, 0)`.
    #[must_use]
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: [[Measurement::default(); MetricKind::COUNT]; Label::COUNT],
        }
    }

    /// Segmentation id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Measurement for `(label, metric)`.
    #[inline]
    #[must_use]
    pub fn get(&self, label: Label, metric: MetricKind) -> Measurement {
        self.values[label.index()][metric.index()]
    }
}

/// Builder for [`CaseMetrics`].
#[derive(Debug, Clone)]
pub struct CaseMetricsBuilder {
    metrics: CaseMetrics,
}

impl CaseMetricsBuilder {
    /// Record a measurement.
    pub fn set(&mut self, label: Label, metric: MetricKind, m: Measurement) -> &mut Self {
        self.metrics.values[label.index()][metric.index()] = m;
        self
    }

    /// Record a measurement, consuming the builder.
    #[must_use]
    pub fn with(mut self, label: Label, metric: MetricKind, m: Measurement) -> Self {
        self.set(label, metric, m);
        self
    }

    /// Freeze the measurements.
    #[must_use]
    pub fn build(self) -> CaseMetrics {
        self.metrics
    }
}

/// File stem with up to two extensions removed (`case01.nii.gz` → `case01`).
#[must_use]
pub fn segmentation_stem(path: &Path) -> String {
    let once = path.file_stem().map(Path::new).unwrap_or(path);
    once.file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}

enum CaseState {
    Invalid(String),
    Loaded {
        reference: LabelVolume,
        target: LabelVolume,
    },
    Computed {
        reference: CaseMetrics,
        target: CaseMetrics,
        spacing_matches: bool,
    },
}

/// One reference/target comparison.
///
/// A case whose files are missing or fail to load is *invalid*: it keeps the
/// reason and every later operation is a no-op.
pub struct CaseAssessment {
    reference_path: PathBuf,
    target_path: PathBuf,
    reference_id: String,
    target_id: String,
    state: CaseState,
}

impl CaseAssessment {
    /// Load both label images with [`LabelVolume::open`].
    pub fn new(reference: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self::open(reference, target, &|p: &Path| LabelVolume::open(p))
    }

    /// Load both label images with `loader`.
    ///
    /// Both paths must be existing files and the volumes must share a shape;
    /// otherwise the case is invalid.
    pub fn open(
        reference: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
        loader: &dyn Fn(&Path) -> Result<LabelVolume>,
    ) -> Self {
        let reference_path = reference.into();
        let target_path = target.into();

        let state = match load_pair(&reference_path, &target_path, loader) {
            Ok((reference, target)) => CaseState::Loaded { reference, target },
            Err(e) => {
                tracing::warn!(
                    reference = %reference_path.display(),
                    target = %target_path.display(),
                    "case not loaded: {e}"
                );
                CaseState::Invalid(e.to_string())
            }
        };

        Self {
            reference_id: format!("r_{}", segmentation_stem(&reference_path)),
            target_id: format!("t_{}", segmentation_stem(&target_path)),
            reference_path,
            target_path,
            state,
        }
    }

    /// Build a case from volumes already in memory, named after `stem`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if the volumes differ in shape.
    pub fn from_volumes(stem: &str, reference: LabelVolume, target: LabelVolume) -> Result<Self> {
        check_shape(&reference, &target)?;
        Ok(Self {
            reference_path: PathBuf::new(),
            target_path: PathBuf::new(),
            reference_id: format!("r_{stem}"),
            target_id: format!("t_{stem}"),
            state: CaseState::Loaded { reference, target },
        })
    }

    /// Reference file path.
    #[must_use]
    pub fn reference_path(&self) -> &Path {
        &self.reference_path
    }

    /// Target file path.
    #[must_use]
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// `r_<stem>` of the reference file.
    #[must_use]
    pub fn reference_id(&self) -> &str {
        &self.reference_id
    }

    /// `t_<stem>` of the target file.
    #[must_use]
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Whether the case loaded successfully.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !matches!(self.state, CaseState::Invalid(_))
    }

    /// Why the case is invalid, if it is.
    #[must_use]
    pub fn invalid_reason(&self) -> Option<&str> {
        match &self.state {
            CaseState::Invalid(reason) => Some(reason),
            _ => None,
        }
    }

    /// Whether metrics have been computed.
    #[must_use]
    pub fn is_computed(&self) -> bool {
        matches!(self.state, CaseState::Computed { .. })
    }

    /// Outcome of the spacing check, once computed.
    #[must_use]
    pub fn spacing_matches(&self) -> Option<bool> {
        match self.state {
            CaseState::Computed { spacing_matches, .. } => Some(spacing_matches),
            _ => None,
        }
    }

    /// Reference-side metrics, once computed.
    #[must_use]
    pub fn reference_metrics(&self) -> Option<&CaseMetrics> {
        match &self.state {
            CaseState::Computed { reference, .. } => Some(reference),
            _ => None,
        }
    }

    /// Target-side metrics, once computed.
    #[must_use]
    pub fn target_metrics(&self) -> Option<&CaseMetrics> {
        match &self.state {
            CaseState::Computed { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Compute every metric for every label present in the reference.
    ///
    /// Runs the spacing check, then volume, Dice, Hausdorff and ASSD. A failure
    /// for one label and metric is logged and leaves that measurement at
    /// `(0, 0)`. The loaded volumes are released afterwards. Invalid or
    /// already computed cases are left untouched.
    pub fn compute(&mut self, config: &AssessConfig) {
        let CaseState::Loaded { reference, target } = &self.state else {
            return;
        };

        let ref_spacing = reference.spacing();
        let spacing_matches = ref_spacing.matches(&target.spacing(), config.spacing_tolerance);
        if !spacing_matches {
            tracing::warn!(
                case = %self.reference_id,
                reference = ?ref_spacing,
                target = ?target.spacing(),
                "pixel spacing does not match"
            );
        }

        let labels = reference.labels_present();
        let mut ref_metrics = CaseMetrics::builder(self.reference_id.clone());
        let mut tar_metrics = CaseMetrics::builder(self.target_id.clone());

        // Voxel volume always comes from the reference.
        for &label in &labels {
            let ref_ml = ref_spacing.to_millilitres(reference.count(label));
            let tar_ml = ref_spacing.to_millilitres(target.count(label));
            let diff = Measurement::value((ref_ml - tar_ml).abs());
            ref_metrics
                .set(label, MetricKind::Volume, Measurement::value(ref_ml))
                .set(label, MetricKind::VolumeMae, diff);
            tar_metrics
                .set(label, MetricKind::Volume, Measurement::value(tar_ml))
                .set(label, MetricKind::VolumeMae, diff);
        }

        // Pairwise metrics are shared by both sides.
        let mut record = |label: Label, metric: MetricKind, outcome: Result<f64>| match outcome {
            Ok(v) => {
                ref_metrics.set(label, metric, Measurement::value(v));
                tar_metrics.set(label, metric, Measurement::value(v));
            }
            Err(e) => {
                tracing::warn!(case = %self.reference_id, %label, %metric, "metric skipped: {e}");
            }
        };
        for &label in &labels {
            record(label, MetricKind::Dice, metrics::dice(reference, target, label));
        }
        for &label in &labels {
            record(label, MetricKind::Hd, metrics::hausdorff_distance(reference, target, label));
        }
        for &label in &labels {
            let assd = SurfaceDistances::compute(reference, target, label).map(|d| d.assd());
            record(label, MetricKind::Assd, assd);
        }

        tracing::debug!(case = %self.reference_id, labels = labels.len(), "case computed");
        self.state = CaseState::Computed {
            reference: ref_metrics.build(),
            target: tar_metrics.build(),
            spacing_matches,
        };
    }

    /// Both sides' metric table, rounded with `precision`.
    ///
    /// Empty for cases that are invalid or not yet computed.
    #[must_use]
    pub fn table(&self, precision: &Precision) -> MetricsTable {
        match &self.state {
            CaseState::Computed { reference, target, .. } => {
                MetricsTable::from_cases([reference, target], precision)
            }
            _ => MetricsTable::new(),
        }
    }

    /// Text table of both sides' metrics, for printing.
    #[must_use]
    pub fn render_console(&self, precision: &Precision) -> String {
        match &self.state {
            CaseState::Invalid(reason) => format!(
                "{} <- {}: not assessed ({reason})\n",
                self.reference_path.display(),
                self.target_path.display()
            ),
            CaseState::Loaded { .. } => format!(
                "{} <- {}: not computed\n",
                self.reference_path.display(),
                self.target_path.display()
            ),
            CaseState::Computed { .. } => self.table(precision).render(),
        }
    }
}

fn load_pair(
    reference: &Path,
    target: &Path,
    loader: &dyn Fn(&Path) -> Result<LabelVolume>,
) -> Result<(LabelVolume, LabelVolume)> {
    for path in [reference, target] {
        if !path.is_file() {
            return Err(Error::MissingFile(path.to_path_buf()));
        }
    }
    let reference = loader(reference)?;
    let target = loader(target)?;
    check_shape(&reference, &target)?;
    Ok((reference, target))
}

fn check_shape(reference: &LabelVolume, target: &LabelVolume) -> Result<()> {
    if reference.shape() != target.shape() {
        return Err(Error::ShapeMismatch {
            expected: reference.shape(),
            actual: target.shape(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::Spacing;
    use ndarray::{Array3, s};

    /// LV cube plus a myocardium slab; the target's LV is shifted by one voxel.
    fn pair(spacing: Spacing) -> (LabelVolume, LabelVolume) {
        let mut a = Array3::<u16>::zeros((8, 10, 10));
        a.slice_mut(s![2..6, 2..6, 2..6]).fill(1);
        a.slice_mut(s![2..6, 7..9, 2..6]).fill(2);

        let mut b = Array3::<u16>::zeros((8, 10, 10));
        b.slice_mut(s![2..6, 2..6, 3..7]).fill(1);
        b.slice_mut(s![2..6, 7..9, 2..6]).fill(2);

        (LabelVolume::new(a, spacing), LabelVolume::new(b, spacing))
    }

    #[test]
    fn test_segmentation_stem() {
        assert_eq!(segmentation_stem(Path::new("/data/case01.nii.gz")), "case01");
        assert_eq!(segmentation_stem(Path::new("case02.nii")), "case02");
        assert_eq!(segmentation_stem(Path::new("dir/plain")), "plain");
    }

    #[test]
    fn test_builder_freezes_values() {
        let m = CaseMetrics::builder("r_x")
            .with(Label::Myocardium, MetricKind::Dice, Measurement::value(0.8))
            .build();
        assert_eq!(m.id(), "r_x");
        assert_eq!(m.get(Label::Myocardium, MetricKind::Dice).value, 0.8);
        assert_eq!(m.get(Label::LvCavity, MetricKind::Dice), Measurement::default());
    }

    #[test]
    fn test_compute_case() {
        let (a, b) = pair(Spacing::new(1.0, 1.0, 2.0));
        let mut case = CaseAssessment::from_volumes("case01", a, b).unwrap();
        assert!(case.is_valid());
        assert!(!case.is_computed());

        case.compute(&AssessConfig::default());
        assert_eq!(case.spacing_matches(), Some(true));

        let r = case.reference_metrics().unwrap();
        let t = case.target_metrics().unwrap();
        assert_eq!(r.id(), "r_case01");
        assert_eq!(t.id(), "t_case01");

        // 64 voxels of 2 mm³
        let lv = Label::LvCavity;
        assert!((r.get(lv, MetricKind::Volume).value - 0.128).abs() < 1e-12);
        assert!((t.get(lv, MetricKind::Volume).value - 0.128).abs() < 1e-12);
        assert_eq!(r.get(lv, MetricKind::VolumeMae).value, 0.0);

        // 48 of 64 voxels shared
        let dice = r.get(lv, MetricKind::Dice).value;
        assert!((dice - 0.75).abs() < 1e-12);
        assert_eq!(t.get(lv, MetricKind::Dice).value, dice);
        assert!((r.get(lv, MetricKind::Hd).value - 1.0).abs() < 1e-12);
        assert!(r.get(lv, MetricKind::Assd).value > 0.0);

        let myo = Label::Myocardium;
        assert_eq!(r.get(myo, MetricKind::Dice).value, 1.0);
        assert_eq!(r.get(myo, MetricKind::Hd).value, 0.0);
        assert_eq!(r.get(myo, MetricKind::Assd).value, 0.0);

        // Labels absent from the reference stay at zero.
        assert_eq!(r.get(Label::Mvo, MetricKind::Dice), Measurement::default());
    }

    #[test]
    fn test_missing_label_in_target_is_skipped() {
        let (a, _) = pair(Spacing::default());
        let mut b = Array3::<u16>::zeros((8, 10, 10));
        b.slice_mut(s![2..6, 2..6, 2..6]).fill(1);
        let b = LabelVolume::new(b, Spacing::default());

        let mut case = CaseAssessment::from_volumes("c", a, b).unwrap();
        case.compute(&AssessConfig::default());
        let r = case.reference_metrics().unwrap();
        let t = case.target_metrics().unwrap();

        let myo = Label::Myocardium;
        assert!((r.get(myo, MetricKind::Volume).value - 0.032).abs() < 1e-12);
        assert_eq!(t.get(myo, MetricKind::Volume).value, 0.0);
        assert!((r.get(myo, MetricKind::VolumeMae).value - 0.032).abs() < 1e-12);
        assert_eq!(r.get(myo, MetricKind::Dice).value, 0.0);
        // Empty target mask: HD and ASSD skipped, other labels unaffected.
        assert_eq!(r.get(myo, MetricKind::Hd).value, 0.0);
        assert_eq!(r.get(myo, MetricKind::Assd).value, 0.0);
        assert_eq!(r.get(Label::LvCavity, MetricKind::Dice).value, 1.0);
    }

    #[test]
    fn test_filled_reference_skips_assd_only() {
        let a = LabelVolume::new(Array3::<u16>::ones((4, 4, 4)), Spacing::default());
        let mut b = Array3::<u16>::zeros((4, 4, 4));
        b.slice_mut(s![0..2, 0..2, 0..2]).fill(1);
        let b = LabelVolume::new(b, Spacing::default());

        let mut case = CaseAssessment::from_volumes("c", a, b).unwrap();
        case.compute(&AssessConfig::default());
        let r = case.reference_metrics().unwrap();

        // The reference has no surface, so ASSD stays at zero while HD is kept.
        let lv = Label::LvCavity;
        assert!((r.get(lv, MetricKind::Dice).value - 16.0 / 72.0).abs() < 1e-12);
        assert!((r.get(lv, MetricKind::Hd).value - 12f64.sqrt()).abs() < 1e-12);
        assert_eq!(r.get(lv, MetricKind::Assd).value, 0.0);
    }

    #[test]
    fn test_spacing_mismatch_uses_reference_spacing() {
        let (a, b) = pair(Spacing::new(1.0, 1.0, 2.0));
        let b = LabelVolume::new(b.data().to_owned(), Spacing::new(1.0, 1.0, 3.0));
        let mut case = CaseAssessment::from_volumes("c", a, b).unwrap();
        case.compute(&AssessConfig::default());

        assert_eq!(case.spacing_matches(), Some(false));
        let t = case.target_metrics().unwrap();
        assert!((t.get(Label::LvCavity, MetricKind::Volume).value - 0.128).abs() < 1e-12);
    }

    #[test]
    fn test_missing_files_make_invalid_case() {
        let mut case = CaseAssessment::new("/no/ref.nii.gz", "/no/tar.nii.gz");
        assert!(!case.is_valid());
        assert!(case.invalid_reason().is_some());
        assert_eq!(case.reference_id(), "r_ref");
        assert_eq!(case.target_id(), "t_tar");

        case.compute(&AssessConfig::default());
        assert!(!case.is_computed());
        assert!(case.reference_metrics().is_none());
        assert!(case.table(&Precision::default()).is_empty());
        assert!(case.render_console(&Precision::default()).contains("not assessed"));
    }

    #[test]
    fn test_custom_loader_and_shape_check() {
        let dir = tempfile::tempdir().unwrap();
        let r = dir.path().join("r.nii");
        let t = dir.path().join("t.nii");
        std::fs::write(&r, b"").unwrap();
        std::fs::write(&t, b"").unwrap();

        let loader = |p: &Path| -> Result<LabelVolume> {
            let n = if p.ends_with("r.nii") { 4 } else { 5 };
            Ok(LabelVolume::new(Array3::zeros((n, n, n)), Spacing::default()))
        };
        let case = CaseAssessment::open(&r, &t, &loader);
        assert!(!case.is_valid());
        assert!(case.invalid_reason().unwrap().contains("Shape mismatch"));
    }

    #[test]
    fn test_render_console() {
        let (a, b) = pair(Spacing::default());
        let mut case = CaseAssessment::from_volumes("case01", a, b).unwrap();
        case.compute(&AssessConfig::default());
        let text = case.render_console(&Precision::default());
        assert!(text.contains("r_case01"));
        assert!(text.contains("t_case01"));
        assert!(text.contains("ASSD"));
    }
}
