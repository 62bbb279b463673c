//! Read access to products and warehouses.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use stockmaster_inventory::{Product, ProductId, Warehouse, WarehouseId};

use crate::store::StoreError;

/// Product / warehouse lookup consumed by the engine (never written by it).
pub trait Catalog: Send + Sync {
    fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    fn warehouse(&self, id: WarehouseId) -> Result<Option<Warehouse>, StoreError>;

    fn active_products(&self) -> Result<Vec<Product>, StoreError>;

    fn warehouses(&self) -> Result<Vec<Warehouse>, StoreError>;
}

impl<C> Catalog for Arc<C>
where
    C: Catalog + ?Sized,
{
    fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        (**self).product(id)
    }

    fn warehouse(&self, id: WarehouseId) -> Result<Option<Warehouse>, StoreError> {
        (**self).warehouse(id)
    }

    fn active_products(&self) -> Result<Vec<Product>, StoreError> {
        (**self).active_products()
    }

    fn warehouses(&self) -> Result<Vec<Warehouse>, StoreError> {
        (**self).warehouses()
    }
}

/// In-memory catalog for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<BTreeMap<ProductId, Product>>,
    warehouses: RwLock<BTreeMap<WarehouseId, Warehouse>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_product(&self, product: Product) {
        self.products.write().insert(product.id, product);
    }

    pub fn upsert_warehouse(&self, warehouse: Warehouse) {
        self.warehouses.write().insert(warehouse.id, warehouse);
    }

    /// Register an active product and return its id.
    pub fn add_product(&self, name: &str, sku: &str, reorder_level: i64) -> ProductId {
        let id = ProductId::generate();
        self.upsert_product(Product {
            id,
            name: name.to_string(),
            sku: sku.to_string(),
            reorder_level,
            active: true,
        });
        id
    }

    /// Register an active warehouse and return its id.
    pub fn add_warehouse(&self, name: &str) -> WarehouseId {
        let id = WarehouseId::generate();
        self.upsert_warehouse(Warehouse {
            id,
            name: name.to_string(),
            location: None,
            active: true,
        });
        id
    }
}

impl Catalog for InMemoryCatalog {
    fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.products.read().get(&id).cloned())
    }

    fn warehouse(&self, id: WarehouseId) -> Result<Option<Warehouse>, StoreError> {
        Ok(self.warehouses.read().get(&id).cloned())
    }

    fn active_products(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self
            .products
            .read()
            .values()
            .filter(|p| p.active)
            .cloned()
            .collect())
    }

    fn warehouses(&self) -> Result<Vec<Warehouse>, StoreError> {
        Ok(self.warehouses.read().values().cloned().collect())
    }
}
