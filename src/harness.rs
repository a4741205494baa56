//! Benchmark orchestration: cold and hot verification runs over a
//! populated store through a scoped worker pool.

use std::sync::Arc;

use anyhow::Context;
use rand::rngs::StdRng;
use rand::SeedableRng;

use scanbench_pool::WorkerPool;
use scanbench_verify::{
    run_query_batch, sample_ranges, BatchScan, MemStore, ScanError, ScatterGather,
    VerificationReport,
};

use crate::ScanOpts;

/// Run the self-contained scan benchmark.
///
/// Populates an in-memory store with every row of `[min, max)`, then
/// performs two verification runs over the same logical rowset: one cold
/// and one hot, the hot run benefiting from whatever the first warmed up.
/// The store handle is released on every exit path, and the worker pool
/// is scope-bound: it is shut down whether the runs succeed or fail.
pub async fn run_scan(opts: &ScanOpts) -> anyhow::Result<()> {
    validate(opts)?;

    tracing::info!(
        rows = opts.max - opts.min,
        value_size = opts.size,
        "populating in-memory store"
    );
    let store = Arc::new(MemStore::populate(opts.min, opts.max, opts.size));

    let pool = WorkerPool::with_default_timeout(opts.concurrency, "scanbench-scan").into_scoped();
    let scanner = ScatterGather::new(store, (*pool).clone());

    let outcome = run_cold_and_hot(&scanner, opts).await;
    scanner.close().await;
    outcome.context("batch scan failed")?;
    Ok(())
}

fn validate(opts: &ScanOpts) -> anyhow::Result<()> {
    if opts.min >= opts.max {
        anyhow::bail!("--min must be less than --max (got {}..{})", opts.min, opts.max);
    }
    if opts.num == 0 {
        anyhow::bail!("--num must be at least 1");
    }
    if opts.num > opts.max - opts.min {
        anyhow::bail!(
            "--num {} exceeds the {} distinct row ids in --min..--max",
            opts.num,
            opts.max - opts.min
        );
    }
    if opts.size == 0 {
        anyhow::bail!("--size must be at least 1");
    }
    if opts.concurrency == 0 {
        anyhow::bail!("--concurrency must be at least 1");
    }
    Ok(())
}

async fn run_cold_and_hot(scanner: &impl BatchScan, opts: &ScanOpts) -> Result<(), ScanError> {
    let cold = run_once(scanner, opts).await?;
    tracing::info!("cold run: {}", cold.summary());
    cold.log();

    let hot = run_once(scanner, opts).await?;
    tracing::info!("hot run: {}", hot.summary());
    hot.log();

    Ok(())
}

/// One verification run. The RNG is rebuilt per run, so a fixed seed
/// queries the same rowset cold and hot, while no seed draws a fresh
/// rowset each time.
async fn run_once(
    scanner: &impl BatchScan,
    opts: &ScanOpts,
) -> Result<VerificationReport, ScanError> {
    let mut rng = match opts.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let queries = sample_ranges(opts.num, opts.min, opts.max, &mut rng)?;
    run_query_batch(scanner, queries, opts.size).await
}
