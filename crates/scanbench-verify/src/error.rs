//! Error types for the scan verification engine.

use scanbench_pool::RejectedExecutionError;
use thiserror::Error;

/// Errors that can occur while sampling queries or executing a scan.
///
/// Value mismatches, unexpected rows, and incomplete coverage are *not*
/// errors: they are diagnostics accumulated into the
/// [`VerificationReport`](crate::report::VerificationReport) and never
/// abort a run. Only a failed scan operation is fatal.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Degenerate sampling or query parameters, rejected up front rather
    /// than allowed to hang rejection sampling.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The store scan failed or was cut off mid-stream. Fatal to the
    /// current run; retry policy belongs to the caller.
    #[error("scan execution failed: {source}")]
    Execution {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The store handle was closed before or during the scan.
    #[error("store handle is closed")]
    HandleClosed,
}

impl ScanError {
    /// Wrap a store-side failure, preserving its error context.
    pub fn execution(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        ScanError::Execution {
            source: source.into(),
        }
    }
}

impl From<RejectedExecutionError> for ScanError {
    fn from(err: RejectedExecutionError) -> Self {
        ScanError::execution(err)
    }
}
