//! Stock domain module.
//!
//! This crate contains the business rules for stock balances, the stock
//! ledger and the receipt / delivery / transfer document lifecycles,
//! implemented purely as deterministic domain logic (no IO, no locking, no
//! storage).

pub mod balance;
pub mod catalog;
pub mod delivery;
pub mod document;
pub mod ledger;
pub mod low_stock;
pub mod receipt;
pub mod reference;
pub mod transfer;

pub use balance::{BalanceChange, BalanceId, BalanceKey, StockBalance};
pub use catalog::{Product, ProductId, Warehouse, WarehouseId};
pub use delivery::{
    CreateDelivery, DeleteDelivery, Delivery, DeliveryCommand, DeliveryCreated, DeliveryDeleted,
    DeliveryEvent, DeliveryId, DeliveryValidated, ValidateDelivery,
};
pub use document::{DocumentStatus, LineItem, RequestedLine, WarehouseRef};
pub use ledger::{
    ChangeType, LedgerEntry, LedgerEntryId, LedgerReference, NameSnapshot, NewLedgerEntry,
    ReferenceType, replay,
};
pub use low_stock::LowStockItem;
pub use receipt::{
    CreateReceipt, DeleteReceipt, Receipt, ReceiptCommand, ReceiptCreated, ReceiptDeleted,
    ReceiptEvent, ReceiptId, ReceiptValidated, ValidateReceipt,
};
pub use transfer::{
    CancelTransfer, CompleteTransfer, CreateTransfer, DeleteTransfer, InternalTransfer, ProductRef,
    TransferCancelled, TransferCommand, TransferCompleted, TransferCreated, TransferDeleted,
    TransferEvent, TransferId, TransferStatus,
};
