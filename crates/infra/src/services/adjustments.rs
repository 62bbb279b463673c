use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use stockmaster_core::{DomainError, UserId};
use stockmaster_inventory::{
    BalanceKey, ChangeType, LedgerReference, ProductId, ReferenceType, StockBalance, WarehouseId,
};

use super::{StockEngine, names};
use crate::catalog::Catalog;
use crate::error::StockError;
use crate::store::StockStore;
use crate::unit_of_work::Posting;

/// Outcome of recording a physical count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockCount {
    pub previous: i64,
    pub counted: i64,
    /// Posted adjustment; 0 when the count matched and nothing was written.
    pub delta: i64,
}

impl<S, C> StockEngine<S, C>
where
    S: StockStore,
    C: Catalog,
{
    /// Post a manual signed adjustment and return the new quantity.
    ///
    /// The ADJUSTMENT entry references the balance row it changed.
    #[instrument(
        skip(self, reason),
        fields(product_id = %product_id, warehouse_id = %warehouse_id),
        err
    )]
    pub fn adjust(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        delta: i64,
        user: UserId,
        reason: Option<&str>,
    ) -> Result<i64, StockError> {
        if delta == 0 {
            return Err(DomainError::validation("adjustment delta cannot be zero").into());
        }
        let product = self.require_product(product_id)?;
        let warehouse = self.require_warehouse(warehouse_id)?;
        let key = BalanceKey::new(product_id, warehouse_id);
        let notes = self.adjustment_note(reason);

        let committed = self.run_unit("stock.adjust", &[key], |unit| {
            let row = unit.balance(key)?;
            let change = unit.post(Posting {
                key,
                names: names(&product.name, &product.sku, &warehouse.name),
                change_type: ChangeType::Adjustment,
                delta,
                reference: LedgerReference {
                    id: *row.id().as_uuid(),
                    kind: ReferenceType::Adjustment,
                },
                user_id: user,
                notes: notes.clone(),
            })?;
            Ok(change.after)
        })?;

        info!(%key, delta, quantity = committed.value, "stock adjusted");
        Ok(committed.value)
    }

    /// Record a physical count: post `counted - current` as an adjustment.
    ///
    /// The difference is computed under the key lock, so concurrent
    /// movements are never overwritten. A matching count writes nothing.
    #[instrument(
        skip(self, reason),
        fields(product_id = %product_id, warehouse_id = %warehouse_id),
        err
    )]
    pub fn record_count(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        counted: i64,
        user: UserId,
        reason: Option<&str>,
    ) -> Result<StockCount, StockError> {
        if counted < 0 {
            return Err(DomainError::validation(format!(
                "counted quantity cannot be negative, got {counted}"
            ))
            .into());
        }
        let product = self.require_product(product_id)?;
        let warehouse = self.require_warehouse(warehouse_id)?;
        let key = BalanceKey::new(product_id, warehouse_id);
        let notes = self.adjustment_note(reason);

        let committed = self.run_unit("stock.count", &[key], |unit| {
            let row = unit.balance(key)?;
            let delta = counted - row.quantity();
            if delta != 0 {
                unit.post(Posting {
                    key,
                    names: names(&product.name, &product.sku, &warehouse.name),
                    change_type: ChangeType::Adjustment,
                    delta,
                    reference: LedgerReference {
                        id: *row.id().as_uuid(),
                        kind: ReferenceType::Adjustment,
                    },
                    user_id: user,
                    notes: notes.clone(),
                })?;
            }
            Ok(StockCount {
                previous: row.quantity(),
                counted,
                delta,
            })
        })?;

        info!(%key, delta = committed.value.delta, counted, "stock count recorded");
        Ok(committed.value)
    }

    /// Set or clear the location label of an existing balance row.
    #[instrument(skip(self), fields(product_id = %product_id, warehouse_id = %warehouse_id), err)]
    pub fn set_location(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        location: Option<String>,
    ) -> Result<StockBalance, StockError> {
        let key = BalanceKey::new(product_id, warehouse_id);
        self.run_unit("stock.set_location", &[key], |unit| {
            unit.set_location(key, location.clone())
        })?;
        self.store()
            .balance(key)?
            .ok_or_else(|| StockError::not_found("stock balance", key))
    }

    fn adjustment_note(&self, reason: Option<&str>) -> String {
        match reason.map(str::trim) {
            Some(reason) if !reason.is_empty() => reason.to_string(),
            _ => self.config().default_adjustment_note.clone(),
        }
    }
}
