//! Persistence boundary for balances, the ledger and stock documents.
//!
//! Defines the storage abstraction the engine commits through, without making
//! any storage assumptions, plus an in-memory implementation.

pub mod in_memory;
pub mod query;
pub mod r#trait;

pub use in_memory::InMemoryStockStore;
pub use query::{BalanceFilter, DocumentFilter, LedgerFilter, TransferFilter};
pub use r#trait::{BalanceWrite, ChangeSet, DocumentWrite, StockStore, StoreError};
