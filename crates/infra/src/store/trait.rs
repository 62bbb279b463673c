use std::sync::Arc;

use thiserror::Error;

use stockmaster_core::{AggregateRoot, ExpectedVersion};
use stockmaster_inventory::{
    BalanceKey, Delivery, DeliveryId, InternalTransfer, LedgerEntry, NewLedgerEntry, Receipt,
    ReceiptId, StockBalance, TransferId,
};

use super::query::{BalanceFilter, DocumentFilter, LedgerFilter, TransferFilter};

/// Stock store operation error.
///
/// These are **infrastructure errors** as opposed to domain errors.
///
/// - **Concurrency**: a staged write's expected version no longer matches
/// - **UniqueViolation**: a document reference number is already taken
/// - **Unavailable**: the backend could not be reached or timed out
/// - **Corrupt**: stored data is unreadable or inconsistent
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt stored data: {0}")]
    Corrupt(String),
}

/// A balance row to write, with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceWrite {
    pub balance: StockBalance,
    pub expected: ExpectedVersion,
}

/// A document to write or remove, guarded by the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentWrite<D: AggregateRoot> {
    Upsert { document: D, expected: ExpectedVersion },
    Delete { id: D::Id, expected: ExpectedVersion },
}

/// Everything one unit of work wants to persist.
///
/// Applied by [`StockStore::commit`] as a whole or not at all.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub balances: Vec<BalanceWrite>,
    pub ledger: Vec<NewLedgerEntry>,
    pub receipts: Vec<DocumentWrite<Receipt>>,
    pub deliveries: Vec<DocumentWrite<Delivery>>,
    pub transfers: Vec<DocumentWrite<InternalTransfer>>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
            && self.ledger.is_empty()
            && self.receipts.is_empty()
            && self.deliveries.is_empty()
            && self.transfers.is_empty()
    }
}

/// Persistence boundary for balances, the ledger and stock documents.
///
/// ## Commit semantics
///
/// `commit()`:
/// - checks every balance and document write against its `ExpectedVersion`
///   (`Concurrency` on mismatch)
/// - rejects a new receipt/delivery whose reference number is taken
///   (`UniqueViolation`)
/// - stores each written balance at `expected + 1` (1 for a new row)
/// - assigns ledger sequence numbers after the current last one, in staging
///   order
/// - applies everything atomically (all or nothing)
///
/// Ledger entries are append-only: there is no update or delete.
pub trait StockStore: Send + Sync {
    fn balance(&self, key: BalanceKey) -> Result<Option<StockBalance>, StoreError>;

    fn balances(&self, filter: &BalanceFilter) -> Result<Vec<StockBalance>, StoreError>;

    /// Matching entries in sequence order.
    fn ledger(&self, filter: &LedgerFilter) -> Result<Vec<LedgerEntry>, StoreError>;

    fn receipt(&self, id: ReceiptId) -> Result<Option<Receipt>, StoreError>;

    fn receipts(&self, filter: &DocumentFilter) -> Result<Vec<Receipt>, StoreError>;

    fn receipt_number_exists(&self, number: &str) -> Result<bool, StoreError>;

    fn delivery(&self, id: DeliveryId) -> Result<Option<Delivery>, StoreError>;

    fn deliveries(&self, filter: &DocumentFilter) -> Result<Vec<Delivery>, StoreError>;

    fn delivery_number_exists(&self, number: &str) -> Result<bool, StoreError>;

    fn transfer(&self, id: TransferId) -> Result<Option<InternalTransfer>, StoreError>;

    fn transfers(&self, filter: &TransferFilter) -> Result<Vec<InternalTransfer>, StoreError>;

    /// Atomically apply a change set, returning the committed ledger entries.
    fn commit(&self, changes: ChangeSet) -> Result<Vec<LedgerEntry>, StoreError>;
}

impl<S> StockStore for Arc<S>
where
    S: StockStore + ?Sized,
{
    fn balance(&self, key: BalanceKey) -> Result<Option<StockBalance>, StoreError> {
        (**self).balance(key)
    }

    fn balances(&self, filter: &BalanceFilter) -> Result<Vec<StockBalance>, StoreError> {
        (**self).balances(filter)
    }

    fn ledger(&self, filter: &LedgerFilter) -> Result<Vec<LedgerEntry>, StoreError> {
        (**self).ledger(filter)
    }

    fn receipt(&self, id: ReceiptId) -> Result<Option<Receipt>, StoreError> {
        (**self).receipt(id)
    }

    fn receipts(&self, filter: &DocumentFilter) -> Result<Vec<Receipt>, StoreError> {
        (**self).receipts(filter)
    }

    fn receipt_number_exists(&self, number: &str) -> Result<bool, StoreError> {
        (**self).receipt_number_exists(number)
    }

    fn delivery(&self, id: DeliveryId) -> Result<Option<Delivery>, StoreError> {
        (**self).delivery(id)
    }

    fn deliveries(&self, filter: &DocumentFilter) -> Result<Vec<Delivery>, StoreError> {
        (**self).deliveries(filter)
    }

    fn delivery_number_exists(&self, number: &str) -> Result<bool, StoreError> {
        (**self).delivery_number_exists(number)
    }

    fn transfer(&self, id: TransferId) -> Result<Option<InternalTransfer>, StoreError> {
        (**self).transfer(id)
    }

    fn transfers(&self, filter: &TransferFilter) -> Result<Vec<InternalTransfer>, StoreError> {
        (**self).transfers(filter)
    }

    fn commit(&self, changes: ChangeSet) -> Result<Vec<LedgerEntry>, StoreError> {
        (**self).commit(changes)
    }
}
