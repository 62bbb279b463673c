//! Document reference number format: `<PREFIX>-<yyyyMMddHHmmss>[-<n>]`.

use chrono::{DateTime, Utc};

pub const RECEIPT_PREFIX: &str = "RCV";
pub const DELIVERY_PREFIX: &str = "DLV";

/// Candidate number for the given attempt.
///
/// Attempt 0 is the bare timestamp form; attempt `n > 0` appends `-n`.
pub fn candidate(prefix: &str, at: DateTime<Utc>, attempt: u32) -> String {
    let stamp = at.format("%Y%m%d%H%M%S");
    if attempt == 0 {
        format!("{prefix}-{stamp}")
    } else {
        format!("{prefix}-{stamp}-{attempt}")
    }
}
