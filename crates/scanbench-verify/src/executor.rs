//! Client-side scan execution: drives a batch scan to completion,
//! forwards every observed entry to the verifier, and times the run.

use std::time::{Duration, Instant};

use futures::StreamExt;

use crate::error::ScanError;
use crate::report::VerificationReport;
use crate::sampler::{Range, SampledQueries};
use crate::store::BatchScan;
use crate::verifier::ResultVerifier;

/// Submit `ranges` to the store and drain the observed stream into the
/// verifier. Returns wall-clock elapsed time from submission to stream
/// exhaustion.
///
/// A mid-stream store failure aborts the run with the store's error
/// context attached; entries already forwarded to the verifier remain
/// valid. How the store parallelizes the scan is its own business, and no
/// delivery order is assumed. Releasing the store handle is the caller's
/// responsibility on every exit path.
pub async fn execute<S>(
    store: &S,
    ranges: Vec<Range>,
    verifier: &mut ResultVerifier,
) -> Result<Duration, ScanError>
where
    S: BatchScan + ?Sized,
{
    let started = Instant::now();
    let mut stream = store.scan(ranges).await?;
    while let Some(entry) = stream.next().await {
        let (key, value) = entry?;
        verifier.observe(&key, &value);
    }
    Ok(started.elapsed())
}

/// One full verification run: build a verifier over the sampled rowset,
/// execute the scan, and close out the report.
pub async fn run_query_batch<S>(
    store: &S,
    queries: SampledQueries,
    value_size: usize,
) -> Result<VerificationReport, ScanError>
where
    S: BatchScan + ?Sized,
{
    let SampledQueries { ranges, expected } = queries;
    let mut verifier = ResultVerifier::new(expected, value_size);
    let ranges: Vec<Range> = ranges.into_iter().collect();
    let elapsed = execute(store, ranges, &mut verifier).await?;
    Ok(verifier.finish(elapsed))
}
