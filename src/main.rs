//! Command-line interface for scanbench
//!
//! # Usage Examples
//!
//! ```bash
//! # 1000 random single-row lookups over a 100k-row store, cold then hot
//! scanbench scan --max 100000 --num 1000 --size 50
//!
//! # Reproducible rowset: cold and hot runs query the same rows
//! scanbench scan --max 100000 --num 1000 --size 50 --seed 42
//!
//! # Crank up scan concurrency
//! scanbench scan --max 1000000 --num 10000 --size 50 --concurrency 32
//! ```

use clap::{Parser, Subcommand};
use scanbench::{harness, ScanOpts};

#[derive(Parser)]
#[command(name = "scanbench")]
#[command(about = "Randomized batch-scan verification harness for key-value stores")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run randomized single-row scans (cold + hot) and verify the results
    Scan {
        /// Scan workload options
        #[command(flatten)]
        opts: ScanOpts,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { opts } => harness::run_scan(&opts).await,
    }
}
