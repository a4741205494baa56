//! Randomized range-scan verification engine.
//!
//! Samples non-overlapping single-row queries from a row-id interval,
//! drives them through a scatter/gather batch scan against an external
//! key-value store, and reconciles the observed entries against
//! deterministically recomputed expectations:
//!
//! - [`sampler`] draws reproducible random rowsets and records them as
//!   expected-but-not-yet-observed,
//! - [`store`] is the seam to the external store (plus the in-memory
//!   reference implementation and the pool-backed scatter/gather),
//! - [`executor`] drives a scan to completion and times it,
//! - [`verifier`] flags mismatches, strays, and missing rows into a
//!   [`VerificationReport`].
//!
//! Store defects are diagnostics, not failures; only a broken scan
//! aborts a run.

pub mod error;
pub mod executor;
pub mod report;
pub mod row;
pub mod sampler;
pub mod store;
pub mod verifier;

pub use error::ScanError;
pub use executor::{execute, run_query_batch};
pub use report::VerificationReport;
pub use sampler::{sample_ranges, ExpectedRows, Range, SampledQueries};
pub use store::{BatchScan, KeyValue, MemStore, RangeFetch, ScanStream, ScatterGather};
pub use verifier::ResultVerifier;
