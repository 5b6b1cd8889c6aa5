//! Constant-time comparison helpers.
//!
//! Used wherever secret-derived values are compared, so equality checks do
//! not leak where two buffers first differ.

use constant_time_eq::constant_time_eq;

/// Compare two byte slices in constant time.
///
/// Slices of different length compare unequal.
///
/// # Example
///
/// ```rust
/// use uaecc_crypto::utils::constant_time_compare;
///
/// let a = [0u8; 32];
/// let b = [0u8; 32];
/// assert!(constant_time_compare(&a, &b));
///
/// let c = [1u8; 32];
/// assert!(!constant_time_compare(&a, &c));
/// ```
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    constant_time_eq(a, b)
}
