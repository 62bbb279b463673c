use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use stockmaster_core::{AggregateRoot, ExpectedVersion, UserId};
use stockmaster_inventory::{
    BalanceKey, CancelTransfer, ChangeType, CompleteTransfer, CreateTransfer, DeleteTransfer,
    InternalTransfer, LedgerReference, ProductId, ProductRef, ReferenceType, TransferCommand,
    TransferEvent, TransferId, WarehouseId, WarehouseRef,
};

use super::{StockEngine, decide, names};
use crate::catalog::Catalog;
use crate::error::StockError;
use crate::store::{DocumentWrite, StockStore, TransferFilter};
use crate::unit_of_work::{Posting, UnitOfWork};

/// Input for a new draft transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransfer {
    pub product_id: ProductId,
    pub from_warehouse_id: WarehouseId,
    pub to_warehouse_id: WarehouseId,
    pub quantity: i64,
    pub notes: Option<String>,
}

impl<S, C> StockEngine<S, C>
where
    S: StockStore,
    C: Catalog,
{
    #[instrument(
        skip(self, request),
        fields(
            product_id = %request.product_id,
            from = %request.from_warehouse_id,
            to = %request.to_warehouse_id,
            quantity = request.quantity
        ),
        err
    )]
    pub fn create_transfer(
        &self,
        request: NewTransfer,
        user: UserId,
    ) -> Result<InternalTransfer, StockError> {
        let product = self.require_product(request.product_id)?;
        let from = self.require_warehouse(request.from_warehouse_id)?;
        let to = self.require_warehouse(request.to_warehouse_id)?;

        let transfer_id = TransferId::generate();
        let committed = self.run_unit("transfer.create", &[], |unit| {
            let mut transfer = InternalTransfer::empty(transfer_id);
            decide(
                &mut transfer,
                &TransferCommand::CreateTransfer(CreateTransfer {
                    transfer_id,
                    product: ProductRef {
                        id: product.id,
                        name: product.name.clone(),
                        sku: product.sku.clone(),
                    },
                    from: WarehouseRef::from(&from),
                    to: WarehouseRef::from(&to),
                    quantity: request.quantity,
                    notes: request.notes.clone(),
                    created_by: user,
                    occurred_at: unit.now(),
                }),
            )?;

            unit.write_transfer(DocumentWrite::Upsert {
                document: transfer.clone(),
                expected: ExpectedVersion::Absent,
            });
            Ok(transfer)
        })?;

        info!(transfer_id = %transfer_id, "transfer created");
        Ok(committed.value)
    }

    /// Complete a DRAFT transfer: move the quantity out of the source and into
    /// the destination with a TRANSFER_OUT / TRANSFER_IN entry pair, in one
    /// unit over both keys.
    ///
    /// On any failure the transfer stays DRAFT and neither balance nor the
    /// ledger changes.
    #[instrument(skip(self), fields(transfer_id = %transfer_id), err)]
    pub fn complete_transfer(
        &self,
        transfer_id: TransferId,
        user: UserId,
    ) -> Result<InternalTransfer, StockError> {
        let current = self.transfer(transfer_id)?;
        let keys = match (current.product(), current.from_warehouse(), current.to_warehouse()) {
            (Some(product), Some(from), Some(to)) => vec![
                BalanceKey::new(product.id, from.id),
                BalanceKey::new(product.id, to.id),
            ],
            _ => return Err(StockError::not_found("transfer", transfer_id)),
        };

        let committed = self.run_unit("transfer.complete", &keys, |unit| {
            let command = TransferCommand::CompleteTransfer(CompleteTransfer {
                transfer_id,
                completed_by: user,
                occurred_at: unit.now(),
            });
            self.transition_transfer(unit, transfer_id, command)
        })?;

        info!(
            transfer_id = %transfer_id,
            ledger_entries = committed.ledger.len(),
            "transfer completed"
        );
        Ok(committed.value)
    }

    /// Cancel a DRAFT transfer. No stock effect.
    #[instrument(skip(self), fields(transfer_id = %transfer_id), err)]
    pub fn cancel_transfer(
        &self,
        transfer_id: TransferId,
        user: UserId,
    ) -> Result<InternalTransfer, StockError> {
        let committed = self.run_unit("transfer.cancel", &[], |unit| {
            let command = TransferCommand::CancelTransfer(CancelTransfer {
                transfer_id,
                cancelled_by: user,
                occurred_at: unit.now(),
            });
            self.transition_transfer(unit, transfer_id, command)
        })?;

        info!(transfer_id = %transfer_id, "transfer cancelled");
        Ok(committed.value)
    }

    /// Delete a DRAFT or CANCELLED transfer.
    #[instrument(skip(self), fields(transfer_id = %transfer_id), err)]
    pub fn delete_transfer(&self, transfer_id: TransferId) -> Result<(), StockError> {
        self.run_unit("transfer.delete", &[], |unit| {
            let mut transfer = self.load_transfer(unit, transfer_id)?;
            let expected = ExpectedVersion::Exact(transfer.version());

            decide(
                &mut transfer,
                &TransferCommand::DeleteTransfer(DeleteTransfer {
                    transfer_id,
                    occurred_at: unit.now(),
                }),
            )?;

            unit.write_transfer(DocumentWrite::Delete {
                id: transfer_id,
                expected,
            });
            Ok(())
        })?;

        info!(transfer_id = %transfer_id, "transfer deleted");
        Ok(())
    }

    pub fn transfer(&self, transfer_id: TransferId) -> Result<InternalTransfer, StockError> {
        self.store()
            .transfer(transfer_id)?
            .ok_or_else(|| StockError::not_found("transfer", transfer_id))
    }

    pub fn transfers(&self, filter: &TransferFilter) -> Result<Vec<InternalTransfer>, StockError> {
        Ok(self.store().transfers(filter)?)
    }

    fn load_transfer(
        &self,
        unit: &UnitOfWork<'_, S>,
        transfer_id: TransferId,
    ) -> Result<InternalTransfer, StockError> {
        unit.store()
            .transfer(transfer_id)?
            .ok_or_else(|| StockError::not_found("transfer", transfer_id))
    }

    /// Apply a state-changing command and the stock movements its events imply.
    fn transition_transfer(
        &self,
        unit: &mut UnitOfWork<'_, S>,
        transfer_id: TransferId,
        command: TransferCommand,
    ) -> Result<InternalTransfer, StockError> {
        let mut transfer = self.load_transfer(unit, transfer_id)?;
        let expected = ExpectedVersion::Exact(transfer.version());
        let events = decide(&mut transfer, &command)?;

        for event in &events {
            let TransferEvent::TransferCompleted(completed) = event else {
                continue;
            };
            let reference = LedgerReference {
                id: *transfer_id.as_uuid(),
                kind: ReferenceType::Transfer,
            };
            let product = &completed.product;

            unit.post(Posting {
                key: BalanceKey::new(product.id, completed.from.id),
                names: names(&product.name, &product.sku, &completed.from.name),
                change_type: ChangeType::TransferOut,
                delta: -completed.quantity,
                reference,
                user_id: completed.completed_by,
                notes: format!("Stock transferred out to {}", completed.to.name),
            })?;
            unit.post(Posting {
                key: BalanceKey::new(product.id, completed.to.id),
                names: names(&product.name, &product.sku, &completed.to.name),
                change_type: ChangeType::TransferIn,
                delta: completed.quantity,
                reference,
                user_id: completed.completed_by,
                notes: format!("Stock transferred in from {}", completed.from.name),
            })?;
        }

        unit.write_transfer(DocumentWrite::Upsert {
            document: transfer.clone(),
            expected,
        });
        Ok(transfer)
    }
}
