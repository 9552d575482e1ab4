//! Cohort assessment command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use seg_eval::{AssessConfig, Cohort, MetricKind};

pub fn run(
    input: PathBuf,
    output: PathBuf,
    json: Option<PathBuf>,
    sequential: bool,
    spacing_tolerance: f64,
    verbose: bool,
) -> Result<()> {
    if verbose {
        eprintln!("Loading segmentation list from: {}", input.display());
    }

    let config = AssessConfig::builder()
        .parallel(!sequential)
        .spacing_tolerance(spacing_tolerance)
        .build();

    // An unreadable list degrades to an empty cohort.
    let mut cohort = match Cohort::from_csv(&input, config.clone()) {
        Ok(cohort) => cohort,
        Err(e) => {
            eprintln!("Cannot read {}: {e}", input.display());
            Cohort::new(Vec::new(), config)
        }
    };

    if verbose {
        for pair in cohort.pairs() {
            eprintln!("  {}  <-  {}", pair.reference.display(), pair.target.display());
        }
        eprintln!("Total: {} segmentations", cohort.pairs().len());
    }

    cohort.compute();

    println!(
        "Assessed {} case(s), dropped {}",
        cohort.cases().len(),
        cohort.dropped().len()
    );
    for pair in cohort.dropped() {
        println!("  skipped: {}  <-  {}", pair.reference.display(), pair.target.display());
    }
    println!();
    print!("{}", cohort.summary_table(&MetricKind::TABLE).render());

    cohort
        .write_csv(&output)
        .with_context(|| format!("Failed to write results to {}", output.display()))?;
    println!("\nResults written to {}", output.display());

    if let Some(json_path) = json {
        let name = input
            .file_stem()
            .map_or_else(|| "cohort".to_string(), |s| s.to_string_lossy().into_owned());
        cohort
            .report(&name)
            .write_json(&json_path)
            .with_context(|| format!("Failed to write report to {}", json_path.display()))?;
        println!("Report written to {}", json_path.display());
    }

    Ok(())
}
