//! seg-eval CLI - segmentation assessment and CRPS scoring tool

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

/// Agreement metrics for 3D cardiac segmentations.
#[derive(Parser)]
#[command(name = "seg-eval")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess a single reference/target pair
    Assess {
        /// Reference segmentation (NIfTI)
        #[arg(short, long)]
        reference: PathBuf,

        /// Target segmentation (NIfTI)
        #[arg(short, long)]
        target: PathBuf,

        /// Largest per-axis spacing difference (mm) accepted as a match
        #[arg(long, default_value_t = 0.0)]
        spacing_tolerance: f64,
    },

    /// Assess a list of segmentation pairs and export the results
    Cohort {
        /// Input CSV with REFERENCE and TARGET columns
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV file with results
        #[arg(short, long)]
        output: PathBuf,

        /// Also write a JSON report
        #[arg(long)]
        json: Option<PathBuf>,

        /// Assess cases one at a time
        #[arg(long)]
        sequential: bool,

        /// Largest per-axis spacing difference (mm) accepted as a match
        #[arg(long, default_value_t = 0.0)]
        spacing_tolerance: f64,
    },

    /// Calculate CRPS from a CSV of cumulative distributions
    Crps {
        /// CSV file with ID, VOL, P0..P599 columns
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Assess {
            reference,
            target,
            spacing_tolerance,
        } => commands::assess::run(reference, target, spacing_tolerance, cli.verbose),
        Commands::Cohort {
            input,
            output,
            json,
            sequential,
            spacing_tolerance,
        } => commands::cohort::run(input, output, json, sequential, spacing_tolerance, cli.verbose),
        Commands::Crps { file } => commands::crps::run(file, cli.verbose),
    }
}
