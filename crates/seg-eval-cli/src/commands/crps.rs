//! CRPS scoring command.

use std::path::PathBuf;

use anyhow::Result;
use seg_eval::CrpsScorer;

pub fn run(file: PathBuf, verbose: bool) -> Result<()> {
    if verbose {
        eprintln!("Loading distributions from: {}", file.display());
    }

    // A missing or unreadable file scores as an empty batch.
    let scorer = CrpsScorer::from_csv(&file).unwrap_or_else(|e| {
        eprintln!("Cannot read {}: {e}", file.display());
        CrpsScorer::default()
    });

    if verbose {
        eprintln!("Number of volumes: {}", scorer.rows().len());
    }

    let crps = scorer.score_or_zero();
    println!("\nCRPS = {crps:.4}\n");

    Ok(())
}
