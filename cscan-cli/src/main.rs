//! cscan: reproduce the spurious score-test association of a marker that is
//! collinear with an adjustment covariate.
//!
//! CLI entry point using clap for argument parsing.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "cscan",
    version,
    about = "Confounded-covariate score test reproduction",
    long_about = "Selects a marker, turns it into a two-level covariate, simulates a null\n\
                  phenotype and compares a score-test scan against per-marker OLS."
)]
struct Cli {
    /// Number of threads to use
    #[arg(long, default_value = "1", global = true)]
    threads: usize,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full sequence: subsample, select, simulate, scan, compare, report
    Reproduce(commands::reproduce::ReproduceArgs),

    /// Write a random subsample of individuals as a new PLINK fileset
    Subset(commands::subset::SubsetArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    // Set up thread pool
    rayon::ThreadPoolBuilder::new()
        .num_threads(cli.threads)
        .build_global()
        .ok();

    tracing::info!("cscan v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Using {} threads", cli.threads);

    match cli.command {
        Commands::Reproduce(args) => commands::reproduce::run(args),
        Commands::Subset(args) => commands::subset::run(args),
    }
}
