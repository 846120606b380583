//! General utilities shared across the engine.

use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current Unix timestamp in milliseconds.
///
/// Returns 0 if the system clock is before the Unix epoch.
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Returns true if `a` and `b` hold the same names, ignoring order.
///
/// Both slices are expected to be free of duplicates; duplicates are counted,
/// so `[A, A]` and `[A, B]` compare unequal.
pub(crate) fn same_name_set<S: AsRef<str>, T: AsRef<str>>(a: &[S], b: &[T]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut left: Vec<&str> = a.iter().map(AsRef::as_ref).collect();
    let mut right: Vec<&str> = b.iter().map(AsRef::as_ref).collect();
    left.sort_unstable();
    right.sort_unstable();
    left == right
}
