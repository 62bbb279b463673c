//! Read-only views over balances and the ledger.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use stockmaster_inventory::{
    BalanceKey, LedgerEntry, LowStockItem, ProductId, StockBalance, WarehouseId, ledger, low_stock,
};

use super::StockEngine;
use crate::catalog::Catalog;
use crate::error::StockError;
use crate::store::{BalanceFilter, LedgerFilter, StockStore};

/// A key whose stored balance disagrees with its ledger replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub key: BalanceKey,
    pub stored: i64,
    pub replayed: i64,
}

impl<S, C> StockEngine<S, C>
where
    S: StockStore,
    C: Catalog,
{
    pub fn balances_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<StockBalance>, StockError> {
        Ok(self.store().balances(&BalanceFilter {
            product_id: Some(product_id),
            ..BalanceFilter::default()
        })?)
    }

    pub fn balances_for_warehouse(
        &self,
        warehouse_id: WarehouseId,
    ) -> Result<Vec<StockBalance>, StockError> {
        Ok(self.store().balances(&BalanceFilter {
            warehouse_id: Some(warehouse_id),
            ..BalanceFilter::default()
        })?)
    }

    pub fn all_balances(&self) -> Result<Vec<StockBalance>, StockError> {
        Ok(self.store().balances(&BalanceFilter::default())?)
    }

    /// Sum of the product's quantity across all warehouses.
    pub fn total_for_product(&self, product_id: ProductId) -> Result<i64, StockError> {
        self.balances_for_product(product_id)?
            .iter()
            .try_fold(0i64, |total, balance| total.checked_add(balance.quantity()))
            .ok_or_else(|| {
                StockError::Internal(format!(
                    "total quantity of product {product_id} overflows across warehouses"
                ))
            })
    }

    /// Ledger entries matching `filter`, in sequence order.
    pub fn ledger(&self, filter: &LedgerFilter) -> Result<Vec<LedgerEntry>, StockError> {
        Ok(self.store().ledger(filter)?)
    }

    /// Balance rows of active products strictly below their reorder level.
    #[instrument(skip(self), err)]
    pub fn low_stock(&self) -> Result<Vec<LowStockItem>, StockError> {
        let products = self.catalog().active_products()?;
        let balances = self.all_balances()?;
        let warehouses: BTreeMap<WarehouseId, _> = self
            .catalog()
            .warehouses()?
            .into_iter()
            .map(|w| (w.id, w))
            .collect();

        Ok(low_stock::evaluate(&products, &balances, |id| warehouses.get(&id)))
    }

    /// Replay the ledger per key and report every balance it does not
    /// reproduce. Empty on a consistent store.
    ///
    /// Ledger and balances are read separately, so writes landing in between
    /// show up as discrepancies; run it while the engine is quiet.
    #[instrument(skip(self), err)]
    pub fn reconcile(&self) -> Result<Vec<Discrepancy>, StockError> {
        let entries = self.ledger(&LedgerFilter::default())?;
        let replayed = ledger::replay(&entries);
        let balances = self.all_balances()?;

        let mut discrepancies = Vec::new();
        for balance in &balances {
            let expected = replayed.get(&balance.key()).copied().unwrap_or(0);
            if expected != balance.quantity() {
                discrepancies.push(Discrepancy {
                    key: balance.key(),
                    stored: balance.quantity(),
                    replayed: expected,
                });
            }
        }
        // Ledger activity for a key with no balance row at all.
        for (key, quantity) in &replayed {
            if *quantity != 0 && !balances.iter().any(|b| b.key() == *key) {
                discrepancies.push(Discrepancy {
                    key: *key,
                    stored: 0,
                    replayed: *quantity,
                });
            }
        }

        for d in &discrepancies {
            warn!(
                key = %d.key,
                stored = d.stored,
                replayed = d.replayed,
                "ledger does not reproduce balance"
            );
        }
        Ok(discrepancies)
    }
}
