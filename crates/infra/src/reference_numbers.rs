use chrono::{DateTime, Utc};

use stockmaster_inventory::reference;

use crate::error::StockError;
use crate::store::StoreError;

/// Pick the first reference number for `at` that `taken` reports free.
///
/// Candidates are checked in order: the bare timestamp form, then `-1`,
/// `-2`, ... up to `max_suffix`. The store still enforces uniqueness at
/// commit; this only avoids the obvious collisions.
pub(crate) fn allocate(
    prefix: &str,
    at: DateTime<Utc>,
    max_suffix: u32,
    mut taken: impl FnMut(&str) -> Result<bool, StoreError>,
) -> Result<String, StockError> {
    for attempt in 0..=max_suffix {
        let candidate = reference::candidate(prefix, at, attempt);
        if !taken(&candidate)? {
            return Ok(candidate);
        }
    }
    Err(StockError::Conflict(format!(
        "all {} reference numbers for {prefix} at {} are taken",
        u64::from(max_suffix) + 1,
        at.format("%Y-%m-%d %H:%M:%S")
    )))
}
