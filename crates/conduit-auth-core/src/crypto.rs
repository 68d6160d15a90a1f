//! Constant-time comparison helpers

use subtle::ConstantTimeEq;

/// Compare two secrets without leaking where they differ.
///
/// Length is not treated as secret: slices of different lengths compare
/// unequal immediately.
#[inline]
pub fn constant_time_str_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
