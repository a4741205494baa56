//! Row key canonicalization and deterministic value generation.
//!
//! Row identifiers are integers canonicalized to fixed-width textual keys
//! so they order lexicographically. The expected value for a row is a pure
//! function of `(row_id, size)` shared with whatever process originally
//! wrote the store: writer and verifier must agree bit-for-bit.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Canonical fixed-width key for a row identifier, e.g. `row_0000000042`.
pub fn row_key(row_id: u64) -> String {
    format!("row_{row_id:010}")
}

/// Recover the row identifier from a canonical row key.
///
/// Returns `None` for keys that do not follow the `row_%010d` form.
pub fn parse_row_key(key: &str) -> Option<u64> {
    let digits = key.strip_prefix("row_")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Deterministically derive the expected value bytes for a row.
///
/// Seeds an RNG from the row identifier, fills `size` bytes, and maps each
/// byte into the printable ASCII range. Same `(row_id, size)` always
/// produces the same bytes.
pub fn expected_value(row_id: u64, size: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(row_id);
    let mut value = vec![0u8; size];
    rng.fill_bytes(&mut value);
    for byte in value.iter_mut() {
        *byte = (*byte % 92) + b' ';
    }
    value
}
