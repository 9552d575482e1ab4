//! Case and cohort assessment with report generation.
//!
//! - [`case::CaseAssessment`]: one reference/target pair
//! - [`session::Cohort`]: a list of pairs and their [`session::CohortSummary`]
//! - [`session::AssessConfig`]: configuration for an assessment run
//! - [`report`]: metric table, CSV and JSON output

pub mod case;
pub mod report;
pub mod session;

pub use case::{CaseAssessment, CaseMetrics, CaseMetricsBuilder, LoadFn};
pub use report::{CohortReport, MetricRow, MetricsTable};
pub use session::{AssessConfig, AssessConfigBuilder, Cohort, CohortSummary};
