//! scanbench library
//!
//! A harness that issues randomized single-row range queries against a
//! key-value store, verifies the returned entries, and measures query
//! throughput.
//!
//! # Features
//!
//! - Reproducible workloads: a seeded generator samples the same rowset
//!   across runs, so cold and hot executions query the same logical data
//! - Scatter/gather scans: ranges are sharded across a bounded, named
//!   worker pool and merged back into one observed stream
//! - Streaming verification: every returned value is checked against a
//!   deterministic expectation; mismatches, strays, and missing rows are
//!   reported, never fatal
//!
//! # CLI Usage
//!
//! ```bash
//! # 1000 random lookups over a 100k-row store, cold then hot
//! scanbench scan --min 0 --max 100000 --num 1000 --size 50 --seed 42
//! ```

use clap::Args;

pub mod harness;

/// Options for one randomized scan benchmark.
#[derive(Args, Clone, Debug)]
pub struct ScanOpts {
    /// Minimum row id that may be sampled (inclusive)
    #[arg(long, default_value = "0")]
    pub min: u64,

    /// Maximum row id that may be sampled (exclusive)
    #[arg(long)]
    pub max: u64,

    /// Number of random single-row queries per run
    #[arg(long)]
    pub num: u64,

    /// Size in bytes of the values the store was populated with
    #[arg(long)]
    pub size: usize,

    /// Seed for the pseudo-random query generator (same seed = same rowset)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of concurrent scan workers
    #[arg(long, default_value = "8")]
    pub concurrency: usize,
}
