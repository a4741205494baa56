//! Randomized, reproducible sampling of single-row query ranges.

use std::collections::{HashMap, HashSet};

use rand::Rng;

use crate::error::ScanError;
use crate::row::row_key;

/// A query boundary covering exactly one row. Its identity for
/// reconciliation purposes is the row identifier it was derived from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Range {
    row_id: u64,
}

impl Range {
    /// Build a single-row range for the given row identifier.
    pub fn single(row_id: u64) -> Self {
        Self { row_id }
    }

    /// The row identifier this range selects.
    pub fn row_id(&self) -> u64 {
        self.row_id
    }

    /// The canonical store key this range selects.
    pub fn key(&self) -> String {
        row_key(self.row_id)
    }
}

/// Rows expected from a scan, each flagged once observed.
///
/// The key set is fixed at sampling time; only the observed flags flip
/// afterwards, and only through [`ExpectedRows::mark_observed`].
#[derive(Debug)]
pub struct ExpectedRows {
    rows: HashMap<u64, bool>,
}

impl ExpectedRows {
    fn from_rows(rows: impl IntoIterator<Item = u64>) -> Self {
        Self {
            rows: rows.into_iter().map(|row_id| (row_id, false)).collect(),
        }
    }

    /// Number of expected rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no rows are expected.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether the given row is part of the expected set.
    pub fn contains(&self, row_id: u64) -> bool {
        self.rows.contains_key(&row_id)
    }

    /// Iterate over the expected row identifiers, in no particular order.
    pub fn row_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.rows.keys().copied()
    }

    /// Flip the observed flag for a row. Returns `false` when the row is
    /// not part of the expected set, leaving the key set untouched.
    pub fn mark_observed(&mut self, row_id: u64) -> bool {
        match self.rows.get_mut(&row_id) {
            Some(observed) => {
                *observed = true;
                true
            }
            None => false,
        }
    }

    /// Count of rows that were expected but never observed.
    pub fn not_found_count(&self) -> u64 {
        self.rows.values().filter(|observed| !**observed).count() as u64
    }
}

/// The output of one sampling pass: the range set to submit and the
/// matching expected-row snapshot for reconciliation.
#[derive(Debug)]
pub struct SampledQueries {
    /// Distinct single-row ranges, unordered for submission.
    pub ranges: HashSet<Range>,
    /// Every sampled row, initially flagged as not yet observed.
    pub expected: ExpectedRows,
}

/// Sample `count` distinct single-row ranges uniformly from `[min, max)`.
///
/// Degenerate parameters (`min > max`, or more rows requested than the
/// span holds) fail fast with [`ScanError::Configuration`] instead of
/// letting rejection sampling spin forever.
///
/// With a seeded `rng` the draw sequence, and hence the resulting range
/// set, is reproducible: back-to-back cold and hot runs reseeded with the
/// same seed query the same logical rowset.
pub fn sample_ranges(
    count: u64,
    min: u64,
    max: u64,
    rng: &mut impl Rng,
) -> Result<SampledQueries, ScanError> {
    if min > max {
        return Err(ScanError::Configuration(format!(
            "row id range is inverted: min {min} > max {max}"
        )));
    }
    let span = max - min;
    if count > span {
        return Err(ScanError::Configuration(format!(
            "cannot sample {count} distinct rows from the {span} row ids in [{min}, {max})"
        )));
    }

    tracing::debug!(count, min, max, "generating random queries");

    let mut ranges = HashSet::with_capacity(count as usize);
    while (ranges.len() as u64) < count {
        let row_id = rng.random_range(min..max);
        ranges.insert(Range::single(row_id));
    }

    let expected = ExpectedRows::from_rows(ranges.iter().map(Range::row_id));
    Ok(SampledQueries { ranges, expected })
}
