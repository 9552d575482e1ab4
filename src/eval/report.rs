//! Report types for evaluation results.
//!
//! This module defines the metric table that both the CSV export and the
//! console output are built from, and the JSON cohort report.

use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::eval::case::CaseMetrics;
use crate::label::Label;
use crate::metrics::{MetricKind, Precision};

/// One line of the metric table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    /// Segmentation id (`r_<stem>`, `t_<stem>`, `REFERENCE AVG`, `TARGET AVG`).
    #[serde(rename = "SEGMENTATION ID")]
    pub segmentation_id: String,

    /// Label name.
    #[serde(rename = "LABEL")]
    pub label: String,

    /// Metric name.
    #[serde(rename = "METRIC")]
    pub metric: String,

    /// Rounded value.
    #[serde(rename = "VALUE", deserialize_with = "nan_serde::deserialize")]
    pub value: f64,

    /// Rounded standard deviation.
    #[serde(rename = "STD", deserialize_with = "nan_serde::deserialize")]
    pub std: f64,
}

/// Rows in output order: per segmentation, per label, per metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsTable {
    /// Table rows.
    pub rows: Vec<MetricRow>,
}

impl MetricsTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the rows of one segmentation for the given `metrics`, rounded
    /// with `precision`.
    pub fn push_case(&mut self, case: &CaseMetrics, metrics: &[MetricKind], precision: &Precision) {
        for label in Label::ALL {
            for &metric in metrics {
                let m = precision.apply(metric, case.get(label, metric));
                self.rows.push(MetricRow {
                    segmentation_id: case.id().to_string(),
                    label: label.name().to_string(),
                    metric: metric.name().to_string(),
                    value: m.value,
                    std: m.std,
                });
            }
        }
    }

    /// Build a table of [`MetricKind::TABLE`] rows for several segmentations.
    #[must_use]
    pub fn from_cases<'a>(
        cases: impl IntoIterator<Item = &'a CaseMetrics>,
        precision: &Precision,
    ) -> Self {
        let mut table = Self::new();
        for case in cases {
            table.push_case(case, &MetricKind::TABLE, precision);
        }
        table
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the table as CSV with a `SEGMENTATION ID,LABEL,METRIC,VALUE,STD`
    /// header.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)?;
        if self.rows.is_empty() {
            wtr.write_record(["SEGMENTATION ID", "LABEL", "METRIC", "VALUE", "STD"])?;
        }
        for row in &self.rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Fixed-width text rendering, one blank line after each label group.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<18} {:^5} {:^18} {:<11} {:<11}\n",
            "SEGMENTATION ID", "LABEL", "METRIC", "VALUE", "STD"
        );

        let mut previous: Option<(&str, &str)> = None;
        for row in &self.rows {
            let key = (row.segmentation_id.as_str(), row.label.as_str());
            if previous.is_some_and(|p| p != key) {
                out.push('\n');
            }
            previous = Some(key);
            let _ = writeln!(
                out,
                "{:<18} {:^5} {:^18} {:<11} {:<11}",
                row.segmentation_id, row.label, row.metric, row.value, row.std
            );
        }
        out
    }
}

/// JSON report for a cohort run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohortReport {
    /// Report name (usually the segmentation list file name).
    pub name: String,

    /// Number of cases that were assessed.
    pub cases: usize,

    /// Rows dropped because a file was missing or failed to load.
    pub dropped: usize,

    /// Summary rows, including limits of agreement.
    pub summary: MetricsTable,

    /// Per-case rows.
    pub results: MetricsTable,

    /// When this report was generated.
    #[serde(with = "chrono_serde")]
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl CohortReport {
    /// Create an empty report.
    #[must_use]
    pub fn new(name: String) -> Self {
        Self {
            name,
            cases: 0,
            dropped: 0,
            summary: MetricsTable::new(),
            results: MetricsTable::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

mod chrono_serde {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        dt.to_rfc3339().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// JSON writes non-finite floats as `null`; read them back as NaN.
mod nan_serde {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}
