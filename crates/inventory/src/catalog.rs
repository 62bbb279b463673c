//! Catalog records the stock engine reads but never writes.

use serde::{Deserialize, Serialize};

use stockmaster_core::typed_id;

typed_id!(
    /// Product identifier.
    ProductId
);

typed_id!(
    /// Warehouse identifier.
    WarehouseId
);

/// Product as resolved from the catalog store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    /// Balances strictly below this level are reported as low stock.
    pub reorder_level: i64,
    pub active: bool,
}

/// Warehouse as resolved from the catalog store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: WarehouseId,
    pub name: String,
    pub location: Option<String>,
    pub active: bool,
}
