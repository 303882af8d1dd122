//! The single numeric rule deciding whether a computed balance matches an
//! expected one. All three reconciliation checkpoints (carry-over, per-row,
//! period-end) share this constant.

/// Maximum accepted difference, in ledger currency units. The comparison is
/// exclusive: a difference of exactly this value is a mismatch.
pub const TOLERANCE: f64 = 1.00;

pub fn diff(expected: f64, found: f64) -> f64 {
    (expected - found).abs()
}

pub fn within_tolerance(expected: f64, found: f64) -> bool {
    diff(expected, found) < TOLERANCE
}

/// Self-explanatory audit line: context, both values, the absolute
/// difference and the exact rule applied.
pub fn mismatch_message(context: &str, expected: f64, found: f64) -> String {
    format!(
        "{context}: expected {expected:.2}, found {found:.2}, difference {:.2} (tolerance: difference < {TOLERANCE:.2})",
        diff(expected, found)
    )
}
