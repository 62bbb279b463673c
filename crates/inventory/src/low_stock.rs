use serde::{Deserialize, Serialize};

use crate::balance::StockBalance;
use crate::catalog::{Product, ProductId, Warehouse, WarehouseId};

/// A balance row below its product's reorder level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: String,
    pub warehouse_id: WarehouseId,
    /// `None` when the warehouse no longer resolves in the catalog.
    pub warehouse_name: Option<String>,
    pub current_stock: i64,
    pub reorder_level: i64,
}

/// Flag every balance of an active product whose quantity is strictly below
/// the product's reorder level.
///
/// Output order follows `products`, then `balances`.
pub fn evaluate<'a>(
    products: &[Product],
    balances: &[StockBalance],
    warehouse: impl Fn(WarehouseId) -> Option<&'a Warehouse>,
) -> Vec<LowStockItem> {
    let mut items = Vec::new();
    for product in products.iter().filter(|p| p.active) {
        for balance in balances.iter().filter(|b| b.product_id() == product.id) {
            if balance.quantity() < product.reorder_level {
                items.push(LowStockItem {
                    product_id: product.id,
                    product_name: product.name.clone(),
                    sku: product.sku.clone(),
                    warehouse_id: balance.warehouse_id(),
                    warehouse_name: warehouse(balance.warehouse_id()).map(|w| w.name.clone()),
                    current_stock: balance.quantity(),
                    reorder_level: product.reorder_level,
                });
            }
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::{BalanceId, BalanceKey};
    use chrono::Utc;

    fn product(reorder_level: i64, active: bool) -> Product {
        Product {
            id: ProductId::generate(),
            name: "Widget".into(),
            sku: "W-1".into(),
            reorder_level,
            active,
        }
    }

    fn balance(product: &Product, warehouse: &Warehouse, quantity: i64) -> StockBalance {
        StockBalance::restore(
            BalanceId::generate(),
            BalanceKey::new(product.id, warehouse.id),
            quantity,
            None,
            Utc::now(),
            1,
        )
    }

    #[test]
    fn flags_rows_strictly_below_reorder_level() {
        let wh = Warehouse {
            id: WarehouseId::generate(),
            name: "Main".into(),
            location: None,
            active: true,
        };
        let p = product(10, true);
        let balances = vec![balance(&p, &wh, 9), balance(&p, &wh, 10)];

        let items = evaluate(std::slice::from_ref(&p), &balances, |id| {
            (id == wh.id).then_some(&wh)
        });
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].current_stock, 9);
        assert_eq!(items[0].warehouse_name.as_deref(), Some("Main"));
    }

    #[test]
    fn inactive_products_are_ignored() {
        let wh = Warehouse {
            id: WarehouseId::generate(),
            name: "Main".into(),
            location: None,
            active: true,
        };
        let p = product(10, false);
        let balances = vec![balance(&p, &wh, 0)];
        assert!(evaluate(&[p], &balances, |_| None).is_empty());
    }
}
