//! Streaming verification of observed entries against expected rows.

use std::time::Duration;

use crate::report::VerificationReport;
use crate::row::{expected_value, parse_row_key};
use crate::sampler::ExpectedRows;

/// Consumes the observed stream one entry at a time and reconciles it
/// against the expected-row snapshot.
///
/// Mismatched values and unexpected rows are logged and counted, never
/// fatal: the harness exists to surface store defects without aborting.
/// Updates are keyed by row identifier, so the verifier is independent of
/// delivery order and idempotent per row.
pub struct ResultVerifier {
    expected: ExpectedRows,
    value_size: usize,
    observed: u64,
    mismatched: u64,
    unexpected: u64,
}

impl ResultVerifier {
    /// Build a verifier over the expected rows of one sampling pass.
    pub fn new(expected: ExpectedRows, value_size: usize) -> Self {
        Self {
            expected,
            value_size,
            observed: 0,
            mismatched: 0,
            unexpected: 0,
        }
    }

    /// Reconcile one observed entry.
    pub fn observe(&mut self, key: &str, value: &[u8]) {
        self.observed += 1;

        let Some(row_id) = parse_row_key(key) else {
            self.unexpected += 1;
            tracing::warn!(key, "observed entry with a malformed row key");
            return;
        };

        if value != expected_value(row_id, self.value_size).as_slice() {
            self.mismatched += 1;
            tracing::warn!(
                key,
                got_len = value.len(),
                "observed value does not match its deterministic expectation"
            );
        }

        if !self.expected.mark_observed(row_id) {
            self.unexpected += 1;
            tracing::warn!(key, "observed row outside the sampled query set");
        }
    }

    /// Entries observed so far.
    pub fn observed(&self) -> u64 {
        self.observed
    }

    /// Close out the run: count rows never observed and freeze the report.
    pub fn finish(self, elapsed: Duration) -> VerificationReport {
        let not_found = self.expected.not_found_count();
        if not_found > 0 {
            tracing::warn!(not_found, "did not find all expected rows");
        }
        VerificationReport {
            expected: self.expected.len() as u64,
            observed: self.observed,
            mismatched: self.mismatched,
            unexpected: self.unexpected,
            not_found,
            elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::row_key;
    use crate::sampler::sample_ranges;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const VALUE_SIZE: usize = 32;

    fn verifier_for_seed(seed: u64, count: u64) -> (ResultVerifier, Vec<u64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let queries = sample_ranges(count, 0, 1000, &mut rng).unwrap();
        let rows: Vec<u64> = queries.expected.row_ids().collect();
        (ResultVerifier::new(queries.expected, VALUE_SIZE), rows)
    }

    #[test]
    fn test_clean_run_reports_no_defects() {
        let (mut verifier, rows) = verifier_for_seed(42, 5);
        for row_id in &rows {
            verifier.observe(&row_key(*row_id), &expected_value(*row_id, VALUE_SIZE));
        }

        let report = verifier.finish(Duration::from_millis(10));
        assert_eq!(report.expected, 5);
        assert_eq!(report.observed, 5);
        assert_eq!(report.mismatched, 0);
        assert_eq!(report.unexpected, 0);
        assert_eq!(report.not_found, 0);
        assert!(report.is_clean());
    }

    #[test]
    fn test_missing_row_is_counted_not_found() {
        let (mut verifier, rows) = verifier_for_seed(42, 5);
        for row_id in rows.iter().skip(1) {
            verifier.observe(&row_key(*row_id), &expected_value(*row_id, VALUE_SIZE));
        }

        let report = verifier.finish(Duration::from_millis(10));
        assert_eq!(report.observed, 4);
        assert_eq!(report.not_found, 1);
        assert_eq!(report.observed + report.not_found, report.expected);
    }

    #[test]
    fn test_unexpected_row_is_counted_but_not_fatal() {
        let (mut verifier, rows) = verifier_for_seed(42, 5);
        for row_id in &rows {
            verifier.observe(&row_key(*row_id), &expected_value(*row_id, VALUE_SIZE));
        }
        // A row the sampler never asked for.
        let stray = 5000;
        verifier.observe(&row_key(stray), &expected_value(stray, VALUE_SIZE));

        let report = verifier.finish(Duration::from_millis(10));
        assert_eq!(report.observed, 6);
        assert_eq!(report.unexpected, 1);
        assert_eq!(report.not_found, 0);
        assert_eq!(report.mismatched, 0);
    }

    #[test]
    fn test_mismatched_value_is_counted_but_not_fatal() {
        let (mut verifier, rows) = verifier_for_seed(42, 3);
        verifier.observe(&row_key(rows[0]), b"definitely not the expected bytes");
        for row_id in rows.iter().skip(1) {
            verifier.observe(&row_key(*row_id), &expected_value(*row_id, VALUE_SIZE));
        }

        let report = verifier.finish(Duration::from_millis(10));
        assert_eq!(report.mismatched, 1);
        // A mismatched row still counts as observed coverage.
        assert_eq!(report.not_found, 0);
    }

    #[test]
    fn test_duplicate_observation_is_idempotent_for_coverage() {
        let (mut verifier, rows) = verifier_for_seed(42, 2);
        let value = expected_value(rows[0], VALUE_SIZE);
        verifier.observe(&row_key(rows[0]), &value);
        verifier.observe(&row_key(rows[0]), &value);
        verifier.observe(&row_key(rows[1]), &expected_value(rows[1], VALUE_SIZE));

        let report = verifier.finish(Duration::from_millis(10));
        assert_eq!(report.observed, 3);
        assert_eq!(report.not_found, 0);
        assert_eq!(report.unexpected, 0);
    }

    #[test]
    fn test_malformed_key_counts_as_unexpected() {
        let (mut verifier, _) = verifier_for_seed(42, 1);
        verifier.observe("garbage_key", b"whatever");

        let report = verifier.finish(Duration::from_millis(10));
        assert_eq!(report.observed, 1);
        assert_eq!(report.unexpected, 1);
        assert_eq!(report.not_found, 1);
    }
}
