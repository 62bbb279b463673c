//! Engine-level error.

use thiserror::Error;

use stockmaster_core::{DomainError, ErrorKind};

use crate::store::StoreError;

/// Error returned by every [`StockEngine`](crate::services::StockEngine) operation.
///
/// Domain failures keep their structured variant; store failures are reduced
/// to what a caller can act on. Whatever the variant, the unit of work that
/// produced it was rolled back.
#[derive(Debug, Error)]
pub enum StockError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The store could not be reached or timed out.
    #[error("stock store unavailable: {0}")]
    Unavailable(String),

    /// Concurrent writers kept invalidating the unit of work.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Stored data violates an engine invariant.
    #[error("internal error: {0}")]
    Internal(String),

    /// A retryable store rejection still inside the retry loop.
    #[error(transparent)]
    Retryable(StoreError),
}

impl From<StoreError> for StockError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Unavailable(msg) => StockError::Unavailable(msg),
            StoreError::Corrupt(msg) => StockError::Internal(msg),
            StoreError::Concurrency(_) | StoreError::UniqueViolation(_) => {
                StockError::Retryable(value)
            }
        }
    }
}

impl StockError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StockError::Domain(e) => e.kind(),
            StockError::Unavailable(_) => ErrorKind::Unavailable,
            StockError::Conflict(_) | StockError::Retryable(_) => ErrorKind::Conflict,
            StockError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, StockError::Retryable(_))
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StockError::Domain(DomainError::not_found(entity, id))
    }

    /// The wrapped domain error, if any.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            StockError::Domain(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_stable_kinds() {
        let cases = [
            (StoreError::Unavailable("timeout".into()), ErrorKind::Unavailable),
            (StoreError::Corrupt("bad row".into()), ErrorKind::Internal),
            (StoreError::Concurrency("v2 != v3".into()), ErrorKind::Conflict),
            (StoreError::UniqueViolation("RCV-1".into()), ErrorKind::Conflict),
        ];
        for (store, kind) in cases {
            assert_eq!(StockError::from(store).kind(), kind);
        }
    }

    #[test]
    fn only_concurrency_and_uniqueness_are_retryable() {
        assert!(StockError::from(StoreError::Concurrency("x".into())).is_retryable());
        assert!(StockError::from(StoreError::UniqueViolation("x".into())).is_retryable());
        assert!(!StockError::from(StoreError::Unavailable("x".into())).is_retryable());
        assert!(!StockError::from(DomainError::validation("x")).is_retryable());
    }

    #[test]
    fn domain_kind_passes_through() {
        let err = StockError::from(DomainError::InsufficientStock {
            product_id: "p".into(),
            warehouse_id: "w".into(),
            available: 1,
            requested: 2,
        });
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert!(err.to_string().contains("available 1, requested 2"));
    }
}
