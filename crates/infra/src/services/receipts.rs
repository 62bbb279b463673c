use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use stockmaster_core::{AggregateRoot, ExpectedVersion, UserId};
use stockmaster_inventory::{
    BalanceKey, ChangeType, CreateReceipt, DeleteReceipt, LedgerReference, LineItem, Receipt,
    ReceiptCommand, ReceiptEvent, ReceiptId, ReferenceType, RequestedLine, ValidateReceipt,
    WarehouseId, WarehouseRef, document,
};

use super::{StockEngine, decide, names};
use crate::catalog::Catalog;
use crate::error::StockError;
use crate::reference_numbers;
use crate::store::{DocumentFilter, DocumentWrite, StockStore};
use crate::unit_of_work::Posting;

const RECEIPT_NOTE: &str = "Stock increased via receipt validation";

/// Input for a new draft receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReceipt {
    pub supplier: String,
    pub warehouse_id: WarehouseId,
    pub lines: Vec<RequestedLine>,
    pub notes: Option<String>,
}

impl<S, C> StockEngine<S, C>
where
    S: StockStore,
    C: Catalog,
{
    /// Create a DRAFT receipt. No stock effect.
    #[instrument(
        skip(self, request),
        fields(warehouse_id = %request.warehouse_id, lines = request.lines.len()),
        err
    )]
    pub fn create_receipt(&self, request: NewReceipt, user: UserId) -> Result<Receipt, StockError> {
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

        let receipt_id = ReceiptId::generate();
        let committed = self.run_unit("receipt.create", &[], |unit| {
            let store = unit.store();
            let number = reference_numbers::allocate(
                &self.config().receipt_prefix,
                unit.now(),
                self.config().max_reference_suffix,
                |candidate| store.receipt_number_exists(candidate),
            )?;

            let mut receipt = Receipt::empty(receipt_id);
            decide(
                &mut receipt,
                &ReceiptCommand::CreateReceipt(CreateReceipt {
                    receipt_id,
                    number,
                    supplier: request.supplier.clone(),
                    warehouse: WarehouseRef::from(&warehouse),
                    lines: lines.clone(),
                    notes: request.notes.clone(),
                    created_by: user,
                    occurred_at: unit.now(),
                }),
            )?;

            unit.write_receipt(DocumentWrite::Upsert {
                document: receipt.clone(),
                expected: ExpectedVersion::Absent,
            });
            Ok(receipt)
        })?;

        info!(
            receipt_id = %receipt_id,
            number = committed.value.number(),
            "receipt created"
        );
        Ok(committed.value)
    }

    /// Validate a DRAFT receipt: add every line to the receipt's warehouse and
    /// record one RECEIPT ledger entry per line, atomically.
    #[instrument(skip(self), fields(receipt_id = %receipt_id), err)]
    pub fn validate_receipt(&self, receipt_id: ReceiptId, user: UserId) -> Result<Receipt, StockError> {
        let current = self.receipt(receipt_id)?;
        let keys: Vec<BalanceKey> = current
            .lines()
            .iter()
            .map(|line| BalanceKey::new(line.product_id, current.warehouse().id))
            .collect();

        let committed = self.run_unit("receipt.validate", &keys, |unit| {
            let mut receipt = unit
                .store()
                .receipt(receipt_id)?
                .ok_or_else(|| StockError::not_found("receipt", receipt_id))?;
            let expected = ExpectedVersion::Exact(receipt.version());

            let events = decide(
                &mut receipt,
                &ReceiptCommand::ValidateReceipt(ValidateReceipt {
                    receipt_id,
                    validated_by: user,
                    occurred_at: unit.now(),
                }),
            )?;

            for event in &events {
                if let ReceiptEvent::ReceiptValidated(validated) = event {
                    for line in &validated.lines {
                        unit.post(Posting {
                            key: BalanceKey::new(line.product_id, validated.warehouse.id),
                            names: names(
                                &line.product_name,
                                &line.product_sku,
                                &validated.warehouse.name,
                            ),
                            change_type: ChangeType::Receipt,
                            delta: line.quantity,
                            reference: LedgerReference {
                                id: *receipt_id.as_uuid(),
                                kind: ReferenceType::Receipt,
                            },
                            user_id: user,
                            notes: RECEIPT_NOTE.to_string(),
                        })?;
                    }
                }
            }

            unit.write_receipt(DocumentWrite::Upsert {
                document: receipt.clone(),
                expected,
            });
            Ok(receipt)
        })?;

        info!(
            receipt_id = %receipt_id,
            number = committed.value.number(),
            ledger_entries = committed.ledger.len(),
            "receipt validated"
        );
        Ok(committed.value)
    }

    /// Delete a DRAFT receipt.
    #[instrument(skip(self), fields(receipt_id = %receipt_id), err)]
    pub fn delete_receipt(&self, receipt_id: ReceiptId) -> Result<(), StockError> {
        self.run_unit("receipt.delete", &[], |unit| {
            let mut receipt = unit
                .store()
                .receipt(receipt_id)?
                .ok_or_else(|| StockError::not_found("receipt", receipt_id))?;
            let expected = ExpectedVersion::Exact(receipt.version());

            decide(
                &mut receipt,
                &ReceiptCommand::DeleteReceipt(DeleteReceipt {
                    receipt_id,
                    occurred_at: unit.now(),
                }),
            )?;

            unit.write_receipt(DocumentWrite::Delete {
                id: receipt_id,
                expected,
            });
            Ok(())
        })?;

        info!(receipt_id = %receipt_id, "receipt deleted");
        Ok(())
    }

    pub fn receipt(&self, receipt_id: ReceiptId) -> Result<Receipt, StockError> {
        self.store()
            .receipt(receipt_id)?
            .ok_or_else(|| StockError::not_found("receipt", receipt_id))
    }

    pub fn receipts(&self, filter: &DocumentFilter) -> Result<Vec<Receipt>, StockError> {
        Ok(self.store().receipts(filter)?)
    }
}
