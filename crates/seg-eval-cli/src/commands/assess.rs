//! Single-case assessment command.

use std::path::PathBuf;

use anyhow::Result;
use seg_eval::{AssessConfig, CaseAssessment};

pub fn run(
    reference: PathBuf,
    target: PathBuf,
    spacing_tolerance: f64,
    verbose: bool,
) -> Result<()> {
    if verbose {
        eprintln!("Reference: {}", reference.display());
        eprintln!("Target:    {}", target.display());
    }

    let config = AssessConfig::builder()
        .spacing_tolerance(spacing_tolerance)
        .build();

    let mut case = CaseAssessment::new(reference, target);
    case.compute(&config);

    if case.spacing_matches() == Some(false) {
        println!("Warning: pixel spacing does not match, volumes use the reference spacing");
    }
    println!();
    print!("{}", case.render_console(&config.precision));

    Ok(())
}
