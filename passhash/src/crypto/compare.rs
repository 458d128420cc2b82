//! Timing-safe byte comparison for recomputed hash records.

use std::hint::black_box;

/// Compares two equal-length byte strings without exiting early.
///
/// Every position is visited and its XOR difference folded into an
/// accumulator, so the work done does not depend on where the inputs first
/// differ. Slices of different length are unequal; callers are expected to
/// reject those before getting here.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= black_box(x ^ y);
    }
    diff == 0
}
