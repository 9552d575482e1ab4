//! Cohort evaluation session.
//!
//! This module provides [`Cohort`], the main entry point for assessing a list
//! of segmentation pairs. Each surviving pair is assessed as a
//! [`CaseAssessment`], then the per-case metrics are folded into a
//! [`CohortSummary`].

use std::path::Path;

use rayon::prelude::*;

use crate::error::Result;
use crate::eval::case::{CaseAssessment, CaseMetrics, LoadFn};
use crate::eval::report::{CohortReport, MetricsTable};
use crate::import::{SegmentationPair, read_segmentation_list};
use crate::label::Label;
use crate::metrics::{Measurement, MetricKind, Precision};
use crate::stats::{Summary, limits_of_agreement, mean_absolute_error, pearson};
use crate::volume::LabelVolume;

/// Configuration for an assessment run.
#[derive(Debug, Clone)]
pub struct AssessConfig {
    /// Decimals used when reporting each metric.
    pub precision: Precision,

    /// Assess cases on the rayon thread pool.
    pub parallel: bool,

    /// Largest per-axis spacing difference (mm) still treated as a match.
    pub spacing_tolerance: f64,
}

impl AssessConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> AssessConfigBuilder {
        AssessConfigBuilder::default()
    }
}

impl Default for AssessConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`AssessConfig`].
#[derive(Debug, Default)]
pub struct AssessConfigBuilder {
    precision: Option<Precision>,
    parallel: Option<bool>,
    spacing_tolerance: Option<f64>,
}

impl AssessConfigBuilder {
    /// Set the reporting precision.
    #[must_use]
    pub fn precision(mut self, precision: Precision) -> Self {
        self.precision = Some(precision);
        self
    }

    /// Enable or disable parallel case assessment.
    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = Some(parallel);
        self
    }

    /// Set the spacing tolerance in mm.
    #[must_use]
    pub fn spacing_tolerance(mut self, tolerance: f64) -> Self {
        self.spacing_tolerance = Some(tolerance);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> AssessConfig {
        AssessConfig {
            precision: self.precision.unwrap_or_default(),
            parallel: self.parallel.unwrap_or(true),
            spacing_tolerance: self.spacing_tolerance.unwrap_or(0.0),
        }
    }
}

/// Cohort-level averages for both sides.
#[derive(Debug, Clone, PartialEq)]
pub struct CohortSummary {
    /// Aggregated reference metrics, named `REFERENCE AVG`.
    pub reference: CaseMetrics,
    /// Aggregated target metrics, named `TARGET AVG`.
    pub target: CaseMetrics,
}

impl Default for CohortSummary {
    fn default() -> Self {
        Self {
            reference: CaseMetrics::empty(Self::REFERENCE_ID),
            target: CaseMetrics::empty(Self::TARGET_ID),
        }
    }
}

impl CohortSummary {
    /// Id of the reference summary rows.
    pub const REFERENCE_ID: &'static str = "REFERENCE AVG";
    /// Id of the target summary rows.
    pub const TARGET_ID: &'static str = "TARGET AVG";

    /// Fold per-case `(reference, target)` metrics into cohort statistics.
    ///
    /// Per label and side: mean and population std of VOLUME, DICE, HD and
    /// ASSD; VOLUME LOA as 1.96 times that side's own volume std. VOLUME MAE
    /// and VOLUME CC compare the two volume series and are shared.
    #[must_use]
    pub fn from_cases(cases: &[(&CaseMetrics, &CaseMetrics)]) -> Self {
        if cases.is_empty() {
            tracing::warn!("no cases assessed, cohort summary left empty");
            return Self::default();
        }

        let mut reference = CaseMetrics::builder(Self::REFERENCE_ID);
        let mut target = CaseMetrics::builder(Self::TARGET_ID);

        for label in Label::ALL {
            let series = |metric: MetricKind| -> (Vec<f64>, Vec<f64>) {
                cases
                    .iter()
                    .map(|(r, t)| (r.get(label, metric).value, t.get(label, metric).value))
                    .unzip()
            };

            let (ref_volumes, tar_volumes) = series(MetricKind::Volume);
            let mae = Measurement::value(mean_absolute_error(&ref_volumes, &tar_volumes));
            let cc = Measurement::value(pearson(&ref_volumes, &tar_volumes));

            for (side, volumes) in [(&mut reference, &ref_volumes), (&mut target, &tar_volumes)] {
                let volume = summarize(volumes);
                side.set(label, MetricKind::Volume, volume)
                    .set(label, MetricKind::VolumeMae, mae)
                    .set(label, MetricKind::VolumeCc, cc)
                    .set(
                        label,
                        MetricKind::VolumeLoa,
                        Measurement::value(limits_of_agreement(volume.std)),
                    );
            }

            for metric in [MetricKind::Dice, MetricKind::Hd, MetricKind::Assd] {
                let (ref_values, tar_values) = series(metric);
                reference.set(label, metric, summarize(&ref_values));
                target.set(label, metric, summarize(&tar_values));
            }
        }

        Self {
            reference: reference.build(),
            target: target.build(),
        }
    }
}

fn summarize(values: &[f64]) -> Measurement {
    Summary::compute(values)
        .map_or_else(Measurement::default, |s| Measurement::new(s.mean, s.std_dev))
}

/// Assessment of a list of segmentation pairs.
///
/// # Example
///
/// ```rust,ignore
/// use seg_eval::{AssessConfig, Cohort};
///
/// let config = AssessConfig::builder().parallel(false).build();
/// let mut cohort = Cohort::from_csv("Segmentations.csv", config)?;
/// cohort.compute();
/// cohort.write_csv("Results.csv")?;
/// ```
pub struct Cohort {
    pairs: Vec<SegmentationPair>,
    config: AssessConfig,
    loader: LoadFn,
    cases: Vec<CaseAssessment>,
    dropped: Vec<SegmentationPair>,
    summary: CohortSummary,
}

impl Cohort {
    /// Create a cohort from `(reference, target)` pairs.
    #[must_use]
    pub fn new(pairs: Vec<SegmentationPair>, config: AssessConfig) -> Self {
        Self {
            pairs,
            config,
            loader: Box::new(|p: &Path| LabelVolume::open(p)),
            cases: Vec::new(),
            dropped: Vec::new(),
            summary: CohortSummary::default(),
        }
    }

    /// Create a cohort from a `REFERENCE, TARGET` CSV list.
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be read.
    pub fn from_csv(path: impl AsRef<Path>, config: AssessConfig) -> Result<Self> {
        let pairs = read_segmentation_list(path)?;
        Ok(Self::new(pairs, config))
    }

    /// Replace the volume loader.
    #[must_use]
    pub fn with_loader(mut self, loader: LoadFn) -> Self {
        self.loader = loader;
        self
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &AssessConfig {
        &self.config
    }

    /// Rows of the input list.
    #[must_use]
    pub fn pairs(&self) -> &[SegmentationPair] {
        &self.pairs
    }

    /// Computed cases, in input order.
    #[must_use]
    pub fn cases(&self) -> &[CaseAssessment] {
        &self.cases
    }

    /// Rows left out because a file was missing or could not be loaded.
    #[must_use]
    pub fn dropped(&self) -> &[SegmentationPair] {
        &self.dropped
    }

    /// Cohort summary from the last [`Cohort::compute`].
    #[must_use]
    pub fn summary(&self) -> &CohortSummary {
        &self.summary
    }

    /// Assess every pair whose files exist, then rebuild the summary.
    pub fn compute(&mut self) {
        tracing::info!(pairs = self.pairs.len(), "assessing segmentations");

        let (plan, mut dropped): (Vec<_>, Vec<_>) = self
            .pairs
            .iter()
            .cloned()
            .partition(SegmentationPair::files_exist);
        for pair in &dropped {
            tracing::warn!(
                reference = %pair.reference.display(),
                target = %pair.target.display(),
                "file does not exist, row dropped"
            );
        }

        let loader = &self.loader;
        let config = &self.config;
        let assess = |pair: &SegmentationPair| {
            let mut case = CaseAssessment::open(&pair.reference, &pair.target, loader.as_ref());
            case.compute(config);
            (pair.clone(), case)
        };
        let assessed: Vec<_> = if config.parallel {
            plan.par_iter().map(&assess).collect()
        } else {
            plan.iter().map(&assess).collect()
        };

        let mut cases = Vec::with_capacity(assessed.len());
        for (pair, case) in assessed {
            if case.is_computed() {
                cases.push(case);
            } else {
                dropped.push(pair);
            }
        }

        let metrics: Vec<_> = cases
            .iter()
            .filter_map(|c| c.reference_metrics().zip(c.target_metrics()))
            .collect();
        self.summary = CohortSummary::from_cases(&metrics);

        tracing::info!(cases = cases.len(), dropped = dropped.len(), "cohort computed");
        self.cases = cases;
        self.dropped = dropped;
    }

    /// Summary rows followed by each case's reference and target rows.
    #[must_use]
    pub fn table(&self) -> MetricsTable {
        let precision = &self.config.precision;
        let mut table = self.summary_table(&MetricKind::TABLE);
        for case in &self.cases {
            for side in [case.reference_metrics(), case.target_metrics()].into_iter().flatten() {
                table.push_case(side, &MetricKind::TABLE, precision);
            }
        }
        table
    }

    /// `REFERENCE AVG` and `TARGET AVG` rows for `metrics`.
    #[must_use]
    pub fn summary_table(&self, metrics: &[MetricKind]) -> MetricsTable {
        let mut table = MetricsTable::new();
        table.push_case(&self.summary.reference, metrics, &self.config.precision);
        table.push_case(&self.summary.target, metrics, &self.config.precision);
        table
    }

    /// Write [`Cohort::table`] as CSV.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        self.table().write_csv(path)?;
        tracing::info!("results written to CSV");
        Ok(())
    }

    /// JSON report: summary rows with limits of agreement, then per-case rows.
    #[must_use]
    pub fn report(&self, name: &str) -> CohortReport {
        let mut report = CohortReport::new(name.to_string());
        report.cases = self.cases.len();
        report.dropped = self.dropped.len();
        report.summary = self.summary_table(&MetricKind::ALL);
        report.results = MetricsTable::from_cases(
            self.cases
                .iter()
                .flat_map(|c| [c.reference_metrics(), c.target_metrics()])
                .flatten(),
            &self.config.precision,
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::Spacing;
    use ndarray::{Array3, s};
    use std::path::PathBuf;

    fn case_metrics(id: &str, volume: f64, dice: f64) -> CaseMetrics {
        CaseMetrics::builder(id)
            .with(Label::LvCavity, MetricKind::Volume, Measurement::value(volume))
            .with(Label::LvCavity, MetricKind::Dice, Measurement::value(dice))
            .build()
    }

    /// Volume whose LV is a block of `depth` slices in a 6x6x6 grid.
    fn lv_volume(depth: usize) -> LabelVolume {
        let mut data = Array3::<u16>::zeros((6, 6, 6));
        data.slice_mut(s![1..1 + depth, 1..5, 1..5]).fill(1);
        LabelVolume::new(data, Spacing::isotropic(10.0))
    }

    /// Loader that reads the LV depth from the file name, e.g. `ref_3.nii`.
    fn fake_loader() -> LoadFn {
        Box::new(|p: &Path| -> Result<LabelVolume> {
            let stem = p.file_stem().unwrap_or_default().to_string_lossy().into_owned();
            let depth = stem.rsplit('_').next().and_then(|d| d.parse().ok()).unwrap_or(1);
            Ok(lv_volume(depth))
        })
    }

    /// Loader for a 4x4x4 LV cube in an 8x8x8 grid at 1 mm, moved one voxel
    /// along x when the file name contains `shift`.
    fn cube_loader() -> LoadFn {
        Box::new(|p: &Path| -> Result<LabelVolume> {
            let x0 = if p.to_string_lossy().contains("shift") { 3 } else { 2 };
            let mut data = Array3::<u16>::zeros((8, 8, 8));
            data.slice_mut(s![2..6, 2..6, x0..x0 + 4]).fill(1);
            Ok(LabelVolume::new(data, Spacing::isotropic(1.0)))
        })
    }

    fn lv_row(table: &MetricsTable, id: &str, metric: &str) -> (f64, f64) {
        let row = table
            .rows
            .iter()
            .find(|r| r.segmentation_id == id && r.label == "LV" && r.metric == metric)
            .unwrap();
        (row.value, row.std)
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn test_config_builder() {
        let config = AssessConfig::builder()
            .parallel(false)
            .spacing_tolerance(1e-3)
            .precision(Precision::default().with(MetricKind::Volume, 2))
            .build();
        assert!(!config.parallel);
        assert!((config.spacing_tolerance - 1e-3).abs() < f64::EPSILON);
        assert_eq!(config.precision.decimals(MetricKind::Volume), 2);

        let default = AssessConfig::default();
        assert!(default.parallel);
        assert_eq!(default.spacing_tolerance, 0.0);
    }

    #[test]
    fn test_summary_statistics() {
        let r1 = case_metrics("r_1", 10.0, 0.8);
        let t1 = case_metrics("t_1", 12.0, 0.8);
        let r2 = case_metrics("r_2", 20.0, 0.9);
        let t2 = case_metrics("t_2", 18.0, 0.9);
        let r3 = case_metrics("r_3", 30.0, 1.0);
        let t3 = case_metrics("t_3", 33.0, 1.0);

        let s = CohortSummary::from_cases(&[(&r1, &t1), (&r2, &t2), (&r3, &t3)]);
        let lv = Label::LvCavity;

        assert_eq!(s.reference.id(), "REFERENCE AVG");
        assert_eq!(s.target.id(), "TARGET AVG");

        let vol = s.reference.get(lv, MetricKind::Volume);
        assert!((vol.value - 20.0).abs() < 1e-12);
        let ref_std = (200.0f64 / 3.0).sqrt();
        assert!((vol.std - ref_std).abs() < 1e-12);

        let mae = s.reference.get(lv, MetricKind::VolumeMae).value;
        assert!((mae - 7.0 / 3.0).abs() < 1e-12);
        assert_eq!(s.target.get(lv, MetricKind::VolumeMae).value, mae);

        let cc = s.reference.get(lv, MetricKind::VolumeCc).value;
        assert!(cc > 0.9 && cc <= 1.0);
        assert_eq!(s.target.get(lv, MetricKind::VolumeCc).value, cc);

        // LOA uses each side's own spread.
        let ref_loa = s.reference.get(lv, MetricKind::VolumeLoa).value;
        assert!((ref_loa - 1.96 * ref_std).abs() < 1e-12);
        let tar_std = s.target.get(lv, MetricKind::Volume).std;
        let tar_loa = s.target.get(lv, MetricKind::VolumeLoa).value;
        assert!((tar_loa - 1.96 * tar_std).abs() < 1e-12);
        assert!((tar_loa - ref_loa).abs() > 1e-6);

        let dice = s.reference.get(lv, MetricKind::Dice);
        assert!((dice.value - 0.9).abs() < 1e-12);
        assert!((dice.std - (0.02f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_empty_cohort_keeps_defaults() {
        let s = CohortSummary::from_cases(&[]);
        assert_eq!(s, CohortSummary::default());

        let mut cohort = Cohort::new(Vec::new(), AssessConfig::default());
        cohort.compute();
        assert!(cohort.cases().is_empty());
        assert_eq!(cohort.table().len(), 2 * Label::COUNT * MetricKind::TABLE.len());
    }

    #[test]
    fn test_missing_files_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let r = touch(dir.path(), "ref_2.nii");
        let t = touch(dir.path(), "tar_2.nii");

        let pairs = vec![
            SegmentationPair::new(&r, &t),
            SegmentationPair::new(&r, dir.path().join("gone.nii")),
        ];
        let mut cohort = Cohort::new(pairs, AssessConfig::default()).with_loader(fake_loader());
        cohort.compute();

        assert_eq!(cohort.cases().len(), 1);
        assert_eq!(cohort.dropped().len(), 1);
        assert_eq!(cohort.cases()[0].reference_id(), "r_ref_2");
    }

    #[test]
    fn test_two_case_cohort_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let pairs = vec![
            SegmentationPair::new(touch(dir.path(), "ref_2.nii"), touch(dir.path(), "tar_2.nii")),
            SegmentationPair::new(touch(dir.path(), "ref_4.nii"), touch(dir.path(), "tar_3.nii")),
        ];

        for parallel in [false, true] {
            let config = AssessConfig::builder().parallel(parallel).build();
            let mut cohort = Cohort::new(pairs.clone(), config).with_loader(fake_loader());
            cohort.compute();
            assert_eq!(cohort.cases().len(), 2);

            let lv = Label::LvCavity;
            let s = cohort.summary();
            // 16 voxels per slice at 1 mL each.
            assert!((s.reference.get(lv, MetricKind::Volume).value - 48.0).abs() < 1e-9);
            assert!((s.target.get(lv, MetricKind::Volume).value - 40.0).abs() < 1e-9);
            assert!((s.reference.get(lv, MetricKind::VolumeMae).value - 8.0).abs() < 1e-9);
            // Case 1 identical, case 2 dice = 2*48/112.
            let dice = s.reference.get(lv, MetricKind::Dice).value;
            assert!((dice - (1.0 + 96.0 / 112.0) / 2.0).abs() < 1e-12);

            let table = cohort.table();
            assert_eq!(table.len(), 6 * Label::COUNT * MetricKind::TABLE.len());
            let ids: Vec<_> = table.rows.iter().map(|r| r.segmentation_id.as_str()).collect();
            assert_eq!(ids[0], "REFERENCE AVG");
            assert!(ids.contains(&"t_tar_3"));
            let order: Vec<_> = cohort.cases().iter().map(CaseAssessment::reference_id).collect();
            assert_eq!(order, ["r_ref_2", "r_ref_4"]);
        }
    }

    #[test]
    fn test_summary_rows_are_rounded() {
        let dir = tempfile::tempdir().unwrap();
        let pairs = vec![
            SegmentationPair::new(touch(dir.path(), "ref_a.nii"), touch(dir.path(), "tar_a.nii")),
            SegmentationPair::new(
                touch(dir.path(), "ref_b.nii"),
                touch(dir.path(), "tar_b_shift.nii"),
            ),
        ];
        let mut cohort = Cohort::new(pairs, AssessConfig::default()).with_loader(cube_loader());
        cohort.compute();
        assert_eq!(cohort.cases().len(), 2);

        // Case a is identical. Case b overlaps 48 of 64 voxels: dice 0.75,
        // HD 1 mm, ASSD 40 / 112 mm.
        let table = cohort.summary_table(&MetricKind::TABLE);
        for id in [CohortSummary::REFERENCE_ID, CohortSummary::TARGET_ID] {
            assert_eq!(lv_row(&table, id, "DICE"), (0.875, 0.125));
            assert_eq!(lv_row(&table, id, "HD"), (0.5, 0.5));
            assert_eq!(lv_row(&table, id, "ASSD"), (0.179, 0.179));
            // 64 mm3 on both sides, no spread.
            assert_eq!(lv_row(&table, id, "VOLUME"), (0.1, 0.0));
            assert_eq!(lv_row(&table, id, "VOLUME MAE"), (0.0, 0.0));
        }
    }

    #[test]
    fn test_single_case_report_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let pairs = vec![SegmentationPair::new(
            touch(dir.path(), "ref_a.nii"),
            touch(dir.path(), "tar_a_shift.nii"),
        )];
        let mut cohort = Cohort::new(pairs, AssessConfig::default()).with_loader(cube_loader());
        cohort.compute();

        let path = dir.path().join("report.json");
        cohort.report("single").write_json(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: CohortReport = serde_json::from_str(&text).unwrap();

        assert_eq!(parsed.cases, 1);
        assert!(lv_row(&parsed.summary, CohortSummary::REFERENCE_ID, "VOLUME CC").0.is_nan());
        assert_eq!(lv_row(&parsed.summary, CohortSummary::TARGET_ID, "DICE"), (0.75, 0.0));
    }

    #[test]
    fn test_csv_and_json_exports() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("list.csv");
        let r = touch(dir.path(), "ref_2.nii");
        let t = touch(dir.path(), "tar_3.nii");
        std::fs::write(
            &list,
            format!("REFERENCE,TARGET\n{},{}\n", r.display(), t.display()),
        )
        .unwrap();

        let mut cohort = Cohort::from_csv(&list, AssessConfig::default())
            .unwrap()
            .with_loader(fake_loader());
        cohort.compute();

        let out = dir.path().join("out.csv");
        cohort.write_csv(&out).unwrap();
        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text.starts_with("SEGMENTATION ID,LABEL,METRIC,VALUE,STD"));
        assert!(text.contains("REFERENCE AVG,LV,VOLUME,32.0,0.0"));
        assert!(text.contains("t_tar_3,LV,VOLUME,48.0,0.0"));

        let report = cohort.report("list");
        assert_eq!(report.cases, 1);
        assert!(report.summary.rows.iter().any(|r| r.metric == "VOLUME LOA"));
        assert!(!report.results.rows.iter().any(|r| r.metric == "VOLUME LOA"));
    }
}
