//! Filter criteria for store reads.
//!
//! Every field is optional; `None` means "don't filter on this". The
//! `Default` of each filter matches everything.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stockmaster_core::UserId;
use stockmaster_inventory::{
    ChangeType, Delivery, DocumentStatus, InternalTransfer, LedgerEntry, ProductId, Receipt,
    StockBalance, TransferStatus, WarehouseId,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceFilter {
    pub product_id: Option<ProductId>,
    pub warehouse_id: Option<WarehouseId>,
}

impl BalanceFilter {
    pub fn matches(&self, balance: &StockBalance) -> bool {
        self.product_id.is_none_or(|p| balance.product_id() == p)
            && self.warehouse_id.is_none_or(|w| balance.warehouse_id() == w)
    }
}

/// Ledger query criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerFilter {
    pub product_id: Option<ProductId>,
    pub warehouse_id: Option<WarehouseId>,
    pub change_type: Option<ChangeType>,
    pub user_id: Option<UserId>,
    pub reference_id: Option<Uuid>,
    /// Inclusive lower bound on `created_at`.
    pub created_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub created_to: Option<DateTime<Utc>>,
}

impl LedgerFilter {
    pub fn for_product(product_id: ProductId) -> Self {
        Self {
            product_id: Some(product_id),
            ..Self::default()
        }
    }

    pub fn for_warehouse(warehouse_id: WarehouseId) -> Self {
        Self {
            warehouse_id: Some(warehouse_id),
            ..Self::default()
        }
    }

    pub fn for_key(product_id: ProductId, warehouse_id: WarehouseId) -> Self {
        Self {
            product_id: Some(product_id),
            warehouse_id: Some(warehouse_id),
            ..Self::default()
        }
    }

    pub fn for_reference(reference_id: Uuid) -> Self {
        Self {
            reference_id: Some(reference_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        self.product_id.is_none_or(|p| entry.product_id == p)
            && self.warehouse_id.is_none_or(|w| entry.warehouse_id == w)
            && self.change_type.is_none_or(|c| entry.change_type == c)
            && self.user_id.is_none_or(|u| entry.user_id == u)
            && self.reference_id.is_none_or(|r| entry.reference_id == r)
            && self.created_from.is_none_or(|from| entry.created_at >= from)
            && self.created_to.is_none_or(|to| entry.created_at <= to)
    }
}

/// Receipt / delivery listing criteria.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFilter {
    pub status: Option<DocumentStatus>,
    pub warehouse_id: Option<WarehouseId>,
}

impl DocumentFilter {
    pub fn matches_receipt(&self, receipt: &Receipt) -> bool {
        self.status.is_none_or(|s| receipt.status() == s)
            && self.warehouse_id.is_none_or(|w| receipt.warehouse().id == w)
    }

    pub fn matches_delivery(&self, delivery: &Delivery) -> bool {
        self.status.is_none_or(|s| delivery.status() == s)
            && self.warehouse_id.is_none_or(|w| delivery.warehouse().id == w)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferFilter {
    pub status: Option<TransferStatus>,
    pub from_warehouse_id: Option<WarehouseId>,
    pub to_warehouse_id: Option<WarehouseId>,
    pub product_id: Option<ProductId>,
}

impl TransferFilter {
    pub fn matches(&self, transfer: &InternalTransfer) -> bool {
        self.status.is_none_or(|s| transfer.status() == s)
            && self
                .from_warehouse_id
                .is_none_or(|w| transfer.from_warehouse().is_some_and(|f| f.id == w))
            && self
                .to_warehouse_id
                .is_none_or(|w| transfer.to_warehouse().is_some_and(|t| t.id == w))
            && self
                .product_id
                .is_none_or(|p| transfer.product().is_some_and(|pr| pr.id == p))
    }
}
