//! Verification report types.

use std::time::Duration;

/// The outcome of one verification run. Immutable once produced by
/// [`ResultVerifier::finish`](crate::verifier::ResultVerifier::finish).
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationReport {
    /// Rows the sampler expected the scan to return.
    pub expected: u64,
    /// Entries observed, duplicates and strays included.
    pub observed: u64,
    /// Observed values that differed from their deterministic expectation.
    pub mismatched: u64,
    /// Observed rows outside the sampled query set.
    pub unexpected: u64,
    /// Expected rows that were never observed.
    pub not_found: u64,
    /// Wall-clock time from scan submission to stream exhaustion.
    pub elapsed: Duration,
}

impl VerificationReport {
    /// Whether the run surfaced no store defects at all.
    pub fn is_clean(&self) -> bool {
        self.mismatched == 0 && self.unexpected == 0 && self.not_found == 0
    }

    /// Query throughput over the run's wall-clock time.
    pub fn queries_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.expected as f64 / secs
        } else {
            0.0
        }
    }

    /// One-line human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "{:.2} queries/sec in {:.2}s, {} results, {} mismatched, {} unexpected, {} not found",
            self.queries_per_second(),
            self.elapsed.as_secs_f64(),
            self.observed,
            self.mismatched,
            self.unexpected,
            self.not_found
        )
    }

    /// Emit the per-run summary lines.
    pub fn log(&self) {
        tracing::info!(
            "{:6.2} lookups/sec {:6.2} secs",
            self.queries_per_second(),
            self.elapsed.as_secs_f64()
        );
        tracing::info!("num results : {}", self.observed);
        if self.mismatched > 0 {
            tracing::warn!("{} value(s) did not match expectations", self.mismatched);
        }
        if self.unexpected > 0 {
            tracing::warn!("{} unexpected row(s) observed", self.unexpected);
        }
        if self.not_found > 0 {
            tracing::warn!("did not find {} rows", self.not_found);
        }
    }
}
