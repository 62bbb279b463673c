use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use stockmaster_core::{AggregateRoot, ExpectedVersion, UserId};
use stockmaster_inventory::{
    BalanceId, BalanceKey, ChangeType, CreateDelivery, DeleteDelivery, Delivery, DeliveryCommand,
    DeliveryEvent, DeliveryId, LedgerReference, LineItem, ReferenceType, RequestedLine,
    StockBalance, ValidateDelivery, WarehouseId, WarehouseRef, document,
};

use super::{StockEngine, decide, names};
use crate::catalog::Catalog;
use crate::error::StockError;
use crate::reference_numbers;
use crate::store::{DocumentFilter, DocumentWrite, StockStore};
use crate::unit_of_work::Posting;

const DELIVERY_NOTE: &str = "Stock decreased via delivery validation";

/// Input for a new draft delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDelivery {
    pub customer: String,
    pub warehouse_id: WarehouseId,
    pub lines: Vec<RequestedLine>,
    pub notes: Option<String>,
}

impl<S, C> StockEngine<S, C>
where
    S: StockStore,
    C: Catalog,
{
    /// Create a DRAFT delivery.
    ///
    /// Availability is checked here on a best-effort basis (no locks held);
    /// validation re-checks it authoritatively.
    #[instrument(
        skip(self, request),
        fields(warehouse_id = %request.warehouse_id, lines = request.lines.len()),
        err
    )]
    pub fn create_delivery(&self, request: NewDelivery, user: UserId) -> Result<Delivery, StockError> {
        document::validate_requested_lines(&request.lines)?;
        let warehouse = self.require_warehouse(request.warehouse_id)?;
        let lines = request
            .lines
            .iter()
            .map(|line| {
                let product = self.require_product(line.product_id)?;
                Ok(LineItem::for_product(&product, line.quantity))
            })
            .collect::<Result<Vec<_>, StockError>>()?;

        for (product_id, requested) in document::quantities_by_product(&request.lines)? {
            let key = BalanceKey::new(product_id, warehouse.id);
            let balance = self
                .store()
                .balance(key)?
                .unwrap_or_else(|| StockBalance::open(BalanceId::generate(), key, self.clock.now()));
            if let Err(err) = balance.ensure_available(requested) {
                debug!(%key, available = balance.quantity(), requested, "delivery rejected at creation");
                return Err(err.into());
            }
        }

        let delivery_id = DeliveryId::generate();
        let committed = self.run_unit("delivery.create", &[], |unit| {
            let store = unit.store();
            let number = reference_numbers::allocate(
                &self.config().delivery_prefix,
                unit.now(),
                self.config().max_reference_suffix,
                |candidate| store.delivery_number_exists(candidate),
            )?;

            let mut delivery = Delivery::empty(delivery_id);
            decide(
                &mut delivery,
                &DeliveryCommand::CreateDelivery(CreateDelivery {
                    delivery_id,
                    number,
                    customer: request.customer.clone(),
                    warehouse: WarehouseRef::from(&warehouse),
                    lines: lines.clone(),
                    notes: request.notes.clone(),
                    created_by: user,
                    occurred_at: unit.now(),
                }),
            )?;

            unit.write_delivery(DocumentWrite::Upsert {
                document: delivery.clone(),
                expected: ExpectedVersion::Absent,
            });
            Ok(delivery)
        })?;

        info!(
            delivery_id = %delivery_id,
            number = committed.value.number(),
            "delivery created"
        );
        Ok(committed.value)
    }

    /// Validate a DRAFT delivery: remove every line from the warehouse and
    /// record one DELIVERY ledger entry per line, atomically.
    ///
    /// Fails with `InsufficientStock` (nothing applied) if any line would
    /// take its balance below zero.
    #[instrument(skip(self), fields(delivery_id = %delivery_id), err)]
    pub fn validate_delivery(
        &self,
        delivery_id: DeliveryId,
        user: UserId,
    ) -> Result<Delivery, StockError> {
        let current = self.delivery(delivery_id)?;
        let keys: Vec<BalanceKey> = current
            .lines()
            .iter()
            .map(|line| BalanceKey::new(line.product_id, current.warehouse().id))
            .collect();

        let committed = self.run_unit("delivery.validate", &keys, |unit| {
            let mut delivery = unit
                .store()
                .delivery(delivery_id)?
                .ok_or_else(|| StockError::not_found("delivery", delivery_id))?;
            let expected = ExpectedVersion::Exact(delivery.version());

            let events = decide(
                &mut delivery,
                &DeliveryCommand::ValidateDelivery(ValidateDelivery {
                    delivery_id,
                    validated_by: user,
                    occurred_at: unit.now(),
                }),
            )?;

            for event in &events {
                let DeliveryEvent::DeliveryValidated(validated) = event else {
                    continue;
                };
                for line in &validated.lines {
                    unit.post(Posting {
                        key: BalanceKey::new(line.product_id, validated.warehouse.id),
                        names: names(
                            &line.product_name,
                            &line.product_sku,
                            &validated.warehouse.name,
                        ),
                        change_type: ChangeType::Delivery,
                        delta: -line.quantity,
                        reference: LedgerReference {
                            id: *delivery_id.as_uuid(),
                            kind: ReferenceType::Delivery,
                        },
                        user_id: user,
                        notes: DELIVERY_NOTE.to_string(),
                    })?;
                }
            }

            unit.write_delivery(DocumentWrite::Upsert {
                document: delivery.clone(),
                expected,
            });
            Ok(delivery)
        })?;

        info!(
            delivery_id = %delivery_id,
            number = committed.value.number(),
            ledger_entries = committed.ledger.len(),
            "delivery validated"
        );
        Ok(committed.value)
    }

    #[instrument(skip(self), fields(delivery_id = %delivery_id), err)]
    pub fn delete_delivery(&self, delivery_id: DeliveryId) -> Result<(), StockError> {
        self.run_unit("delivery.delete", &[], |unit| {
            let mut delivery = unit
                .store()
                .delivery(delivery_id)?
                .ok_or_else(|| StockError::not_found("delivery", delivery_id))?;
            let expected = ExpectedVersion::Exact(delivery.version());

            decide(
                &mut delivery,
                &DeliveryCommand::DeleteDelivery(DeleteDelivery {
                    delivery_id,
                    occurred_at: unit.now(),
                }),
            )?;

            unit.write_delivery(DocumentWrite::Delete {
                id: delivery_id,
                expected,
            });
            Ok(())
        })?;

        info!(delivery_id = %delivery_id, "delivery deleted");
        Ok(())
    }

    pub fn delivery(&self, delivery_id: DeliveryId) -> Result<Delivery, StockError> {
        self.store()
            .delivery(delivery_id)?
            .ok_or_else(|| StockError::not_found("delivery", delivery_id))
    }

    pub fn deliveries(&self, filter: &DocumentFilter) -> Result<Vec<Delivery>, StockError> {
        Ok(self.store().deliveries(filter)?)
    }
}
