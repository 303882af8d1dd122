use sha2::{Digest, Sha256};

use crate::models::Direction;

/// Collapse whitespace runs to a single space and uppercase, so cosmetic
/// spacing differences in the source workbook do not defeat deduplication.
pub fn normalize_description(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Deterministic content fingerprint of a movement's normalized fields.
/// This is the sole idempotency key: it is computed once per candidate row
/// and never recomputed after persistence.
pub fn fingerprint(
    date: &str,
    description: &str,
    direction: Direction,
    amount: f64,
    row_balance: Option<f64>,
    sheet_name: &str,
) -> String {
    let balance = row_balance.map(|b| format!("{b:.2}")).unwrap_or_default();
    let payload = format!(
        "{date}|{}|{}|{amount:.2}|{balance}|{sheet_name}",
        normalize_description(description),
        direction.as_str(),
    );
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}
