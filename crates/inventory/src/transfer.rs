use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockmaster_core::{Aggregate, AggregateRoot, DomainError, Event, UserId, typed_id};

use crate::catalog::ProductId;
use crate::document::WarehouseRef;

typed_id!(
    /// Internal transfer identifier.
    TransferId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    Draft,
    Completed,
    Cancelled,
}

impl TransferStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TransferStatus::Draft => "DRAFT",
            TransferStatus::Completed => "COMPLETED",
            TransferStatus::Cancelled => "CANCELLED",
        }
    }
}

/// Product identity and names as of transfer creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
}

/// Aggregate root: InternalTransfer (one product between two warehouses).
///
/// Only a DRAFT transfer may change state. Completion moves stock out of
/// `from` and into `to`; cancellation has no stock effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalTransfer {
    id: TransferId,
    product: Option<ProductRef>,
    from: Option<WarehouseRef>,
    to: Option<WarehouseRef>,
    quantity: i64,
    notes: Option<String>,
    status: TransferStatus,
    created_by: Option<UserId>,
    created_at: Option<DateTime<Utc>>,
    completed_by: Option<UserId>,
    completed_at: Option<DateTime<Utc>>,
    cancelled_by: Option<UserId>,
    cancelled_at: Option<DateTime<Utc>>,
    version: u64,
    deleted: bool,
}

impl InternalTransfer {
    pub fn empty(id: TransferId) -> Self {
        Self {
            id,
            product: None,
            from: None,
            to: None,
            quantity: 0,
            notes: None,
            status: TransferStatus::Draft,
            created_by: None,
            created_at: None,
            completed_by: None,
            completed_at: None,
            cancelled_by: None,
            cancelled_at: None,
            version: 0,
            deleted: false,
        }
    }

    pub fn id_typed(&self) -> TransferId {
        self.id
    }

    pub fn product(&self) -> Option<&ProductRef> {
        self.product.as_ref()
    }

    pub fn from_warehouse(&self) -> Option<&WarehouseRef> {
        self.from.as_ref()
    }

    pub fn to_warehouse(&self) -> Option<&WarehouseRef> {
        self.to.as_ref()
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn status(&self) -> TransferStatus {
        self.status
    }

    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn completed_by(&self) -> Option<UserId> {
        self.completed_by
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn cancelled_by(&self) -> Option<UserId> {
        self.cancelled_by
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn is_created(&self) -> bool {
        self.product.is_some()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

impl AggregateRoot for InternalTransfer {
    type Id = TransferId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTransfer {
    pub transfer_id: TransferId,
    pub product: ProductRef,
    pub from: WarehouseRef,
    pub to: WarehouseRef,
    pub quantity: i64,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteTransfer {
    pub transfer_id: TransferId,
    pub completed_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelTransfer {
    pub transfer_id: TransferId,
    pub cancelled_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteTransfer {
    pub transfer_id: TransferId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferCommand {
    CreateTransfer(CreateTransfer),
    CompleteTransfer(CompleteTransfer),
    CancelTransfer(CancelTransfer),
    DeleteTransfer(DeleteTransfer),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferCreated {
    pub transfer_id: TransferId,
    pub product: ProductRef,
    pub from: WarehouseRef,
    pub to: WarehouseRef,
    pub quantity: i64,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransferCompleted.
///
/// The engine derives the paired TRANSFER_OUT / TRANSFER_IN movements from
/// this event and commits them together with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferCompleted {
    pub transfer_id: TransferId,
    pub product: ProductRef,
    pub from: WarehouseRef,
    pub to: WarehouseRef,
    pub quantity: i64,
    pub completed_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferCancelled {
    pub transfer_id: TransferId,
    pub cancelled_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDeleted {
    pub transfer_id: TransferId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferEvent {
    TransferCreated(TransferCreated),
    TransferCompleted(TransferCompleted),
    TransferCancelled(TransferCancelled),
    TransferDeleted(TransferDeleted),
}

impl Event for TransferEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TransferEvent::TransferCreated(_) => "inventory.transfer.created",
            TransferEvent::TransferCompleted(_) => "inventory.transfer.completed",
            TransferEvent::TransferCancelled(_) => "inventory.transfer.cancelled",
            TransferEvent::TransferDeleted(_) => "inventory.transfer.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            TransferEvent::TransferCreated(e) => e.occurred_at,
            TransferEvent::TransferCompleted(e) => e.occurred_at,
            TransferEvent::TransferCancelled(e) => e.occurred_at,
            TransferEvent::TransferDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for InternalTransfer {
    type Command = TransferCommand;
    type Event = TransferEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            TransferEvent::TransferCreated(e) => {
                self.id = e.transfer_id;
                self.product = Some(e.product.clone());
                self.from = Some(e.from.clone());
                self.to = Some(e.to.clone());
                self.quantity = e.quantity;
                self.notes = e.notes.clone();
                self.status = TransferStatus::Draft;
                self.created_by = Some(e.created_by);
                self.created_at = Some(e.occurred_at);
            }
            TransferEvent::TransferCompleted(e) => {
                self.status = TransferStatus::Completed;
                self.completed_by = Some(e.completed_by);
                self.completed_at = Some(e.occurred_at);
            }
            TransferEvent::TransferCancelled(e) => {
                self.status = TransferStatus::Cancelled;
                self.cancelled_by = Some(e.cancelled_by);
                self.cancelled_at = Some(e.occurred_at);
            }
            TransferEvent::TransferDeleted(_) => {
                self.deleted = true;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            TransferCommand::CreateTransfer(cmd) => self.handle_create(cmd),
            TransferCommand::CompleteTransfer(cmd) => self.handle_complete(cmd),
            TransferCommand::CancelTransfer(cmd) => self.handle_cancel(cmd),
            TransferCommand::DeleteTransfer(cmd) => self.handle_delete(cmd),
        }
    }
}

impl InternalTransfer {
    fn ensure_exists(&self, transfer_id: TransferId) -> Result<(), DomainError> {
        if !self.is_created() || self.deleted {
            return Err(DomainError::not_found("transfer", transfer_id));
        }
        if self.id != transfer_id {
            return Err(DomainError::conflict("transfer_id mismatch"));
        }
        Ok(())
    }

    fn ensure_draft(&self, action: &'static str) -> Result<(), DomainError> {
        if self.status != TransferStatus::Draft {
            return Err(DomainError::NotDraft {
                id: self.id.to_string(),
                status: self.status.as_str().to_string(),
                action,
            });
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateTransfer) -> Result<Vec<TransferEvent>, DomainError> {
        if self.is_created() {
            return Err(DomainError::conflict(format!(
                "transfer {} already exists",
                cmd.transfer_id
            )));
        }
        if cmd.from.id == cmd.to.id {
            return Err(DomainError::SameWarehouse {
                warehouse_id: cmd.from.id.to_string(),
            });
        }
        if cmd.quantity <= 0 {
            return Err(DomainError::validation(format!(
                "transfer quantity must be positive, got {}",
                cmd.quantity
            )));
        }

        Ok(vec![TransferEvent::TransferCreated(TransferCreated {
            transfer_id: cmd.transfer_id,
            product: cmd.product.clone(),
            from: cmd.from.clone(),
            to: cmd.to.clone(),
            quantity: cmd.quantity,
            notes: cmd.notes.clone(),
            created_by: cmd.created_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_complete(&self, cmd: &CompleteTransfer) -> Result<Vec<TransferEvent>, DomainError> {
        self.ensure_exists(cmd.transfer_id)?;
        self.ensure_draft("completed")?;

        let (Some(product), Some(from), Some(to)) = (&self.product, &self.from, &self.to) else {
            return Err(DomainError::not_found("transfer", cmd.transfer_id));
        };

        Ok(vec![TransferEvent::TransferCompleted(TransferCompleted {
            transfer_id: cmd.transfer_id,
            product: product.clone(),
            from: from.clone(),
            to: to.clone(),
            quantity: self.quantity,
            completed_by: cmd.completed_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelTransfer) -> Result<Vec<TransferEvent>, DomainError> {
        self.ensure_exists(cmd.transfer_id)?;
        self.ensure_draft("cancelled")?;

        Ok(vec![TransferEvent::TransferCancelled(TransferCancelled {
            transfer_id: cmd.transfer_id,
            cancelled_by: cmd.cancelled_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteTransfer) -> Result<Vec<TransferEvent>, DomainError> {
        self.ensure_exists(cmd.transfer_id)?;

        // Completed transfers are referenced by ledger entries.
        if self.status == TransferStatus::Completed {
            return Err(DomainError::CannotDeleteCompleted {
                id: cmd.transfer_id.to_string(),
            });
        }

        Ok(vec![TransferEvent::TransferDeleted(TransferDeleted {
            transfer_id: cmd.transfer_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::WarehouseId;
    use stockmaster_core::execute;

    fn warehouse(name: &str) -> WarehouseRef {
        WarehouseRef {
            id: WarehouseId::generate(),
            name: name.into(),
        }
    }

    fn create_cmd(transfer_id: TransferId, quantity: i64) -> CreateTransfer {
        CreateTransfer {
            transfer_id,
            product: ProductRef {
                id: ProductId::generate(),
                name: "Widget".into(),
                sku: "W-1".into(),
            },
            from: warehouse("WH-A"),
            to: warehouse("WH-B"),
            quantity,
            notes: None,
            created_by: UserId::new(),
            occurred_at: Utc::now(),
        }
    }

    fn draft_transfer() -> InternalTransfer {
        let id = TransferId::generate();
        let mut transfer = InternalTransfer::empty(id);
        execute(&mut transfer, &TransferCommand::CreateTransfer(create_cmd(id, 5))).unwrap();
        transfer
    }

    fn complete_cmd(transfer: &InternalTransfer) -> TransferCommand {
        TransferCommand::CompleteTransfer(CompleteTransfer {
            transfer_id: transfer.id_typed(),
            completed_by: UserId::new(),
            occurred_at: Utc::now(),
        })
    }

    fn cancel_cmd(transfer: &InternalTransfer) -> TransferCommand {
        TransferCommand::CancelTransfer(CancelTransfer {
            transfer_id: transfer.id_typed(),
            cancelled_by: UserId::new(),
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn same_warehouse_is_rejected() {
        let id = TransferId::generate();
        let mut cmd = create_cmd(id, 5);
        cmd.to = cmd.from.clone();

        let err = InternalTransfer::empty(id)
            .handle(&TransferCommand::CreateTransfer(cmd))
            .unwrap_err();
        assert!(matches!(err, DomainError::SameWarehouse { .. }));
        assert_eq!(err.kind(), stockmaster_core::ErrorKind::InvalidState);
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let id = TransferId::generate();
        let err = InternalTransfer::empty(id)
            .handle(&TransferCommand::CreateTransfer(create_cmd(id, 0)))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn complete_carries_both_warehouses() {
        let mut transfer = draft_transfer();
        let cmd = complete_cmd(&transfer);
        let events = execute(&mut transfer, &cmd).unwrap();

        match &events[0] {
            TransferEvent::TransferCompleted(e) => {
                assert_eq!(e.from.name, "WH-A");
                assert_eq!(e.to.name, "WH-B");
                assert_eq!(e.quantity, 5);
            }
            other => panic!("expected TransferCompleted, got {other:?}"),
        }
        assert_eq!(transfer.status(), TransferStatus::Completed);
        assert!(transfer.completed_at().is_some());
    }

    #[test]
    fn completed_transfer_is_terminal() {
        let mut transfer = draft_transfer();
        let cmd = complete_cmd(&transfer);
        execute(&mut transfer, &cmd).unwrap();

        let err = transfer.handle(&complete_cmd(&transfer)).unwrap_err();
        assert!(matches!(err, DomainError::NotDraft { action: "completed", .. }));
        let err = transfer.handle(&cancel_cmd(&transfer)).unwrap_err();
        assert!(matches!(err, DomainError::NotDraft { action: "cancelled", .. }));
    }

    #[test]
    fn cancelled_transfer_cannot_be_completed() {
        let mut transfer = draft_transfer();
        let cmd = cancel_cmd(&transfer);
        execute(&mut transfer, &cmd).unwrap();
        assert_eq!(transfer.status(), TransferStatus::Cancelled);
        assert!(transfer.cancelled_by().is_some());

        let err = transfer.handle(&complete_cmd(&transfer)).unwrap_err();
        assert!(err.to_string().contains("CANCELLED"));
    }

    #[test]
    fn delete_rules_follow_status() {
        let delete = |t: &InternalTransfer| {
            TransferCommand::DeleteTransfer(DeleteTransfer {
                transfer_id: t.id_typed(),
                occurred_at: Utc::now(),
            })
        };

        let mut cancelled = draft_transfer();
        let cmd = cancel_cmd(&cancelled);
        execute(&mut cancelled, &cmd).unwrap();
        assert!(cancelled.handle(&delete(&cancelled)).is_ok());

        let mut completed = draft_transfer();
        let cmd = complete_cmd(&completed);
        execute(&mut completed, &cmd).unwrap();
        let err = completed.handle(&delete(&completed)).unwrap_err();
        assert!(matches!(err, DomainError::CannotDeleteCompleted { .. }));
    }
}
