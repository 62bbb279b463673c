//! Domain error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable classification of a failure, independent of its message.
///
/// Callers branch on the kind (retry, surface, reject input); the message is
/// for humans.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Referenced product, warehouse, document or balance is absent.
    NotFound,
    /// The operation is illegal in the entity's current state.
    InvalidState,
    /// A decrement would take a balance below zero.
    InsufficientStock,
    /// Concurrent modification could not be serialized within the retry budget.
    Conflict,
    /// Malformed input.
    Validation,
    /// The store could not be reached or timed out; nothing was applied.
    Unavailable,
    /// Stored data is inconsistent.
    Internal,
}

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A referenced entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A receipt or delivery was validated a second time.
    #[error("{document} {reference} is already validated")]
    AlreadyValidated {
        document: &'static str,
        reference: String,
    },

    /// A validated receipt or delivery cannot be deleted.
    #[error("cannot delete validated {document} {reference}")]
    CannotDeleteValidated {
        document: &'static str,
        reference: String,
    },

    /// A completed transfer is referenced by ledger entries and cannot be deleted.
    #[error("cannot delete completed transfer {id}")]
    CannotDeleteCompleted { id: String },

    /// Only draft transfers may be completed or cancelled.
    #[error("transfer {id} is {status}; only draft transfers can be {action}")]
    NotDraft {
        id: String,
        status: String,
        action: &'static str,
    },

    /// A transfer must move stock between two different warehouses.
    #[error("source and destination warehouse must differ (both are {warehouse_id})")]
    SameWarehouse { warehouse_id: String },

    /// A decrement would take a balance below zero.
    #[error(
        "insufficient stock for product {product_id} in warehouse {warehouse_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: String,
        warehouse_id: String,
        available: i64,
        requested: i64,
    },

    /// A conflict occurred (e.g. stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Validation(_) | DomainError::InvalidId(_) => ErrorKind::Validation,
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::AlreadyValidated { .. }
            | DomainError::CannotDeleteValidated { .. }
            | DomainError::CannotDeleteCompleted { .. }
            | DomainError::NotDraft { .. }
            | DomainError::SameWarehouse { .. } => ErrorKind::InvalidState,
            DomainError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            DomainError::Conflict(_) => ErrorKind::Conflict,
        }
    }
}
