use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockmaster_core::{Aggregate, AggregateRoot, DomainError, Event, UserId, typed_id};

use crate::document::{
    DocumentStatus, LineItem, WarehouseRef, ensure_deletable, ensure_not_validated, validate_lines,
};

typed_id!(
    /// Receipt identifier.
    ReceiptId
);

/// Aggregate root: Receipt (incoming goods from a supplier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    id: ReceiptId,
    number: String,
    supplier: String,
    warehouse: WarehouseRef,
    lines: Vec<LineItem>,
    notes: Option<String>,
    status: DocumentStatus,
    created_by: UserId,
    created_at: DateTime<Utc>,
    validated_by: Option<UserId>,
    validated_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
    deleted: bool,
}

impl Receipt {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: ReceiptId) -> Self {
        Self {
            id,
            number: String::new(),
            supplier: String::new(),
            warehouse: WarehouseRef {
                id: crate::catalog::WarehouseId::generate(),
                name: String::new(),
            },
            lines: Vec::new(),
            notes: None,
            status: DocumentStatus::Draft,
            created_by: UserId::new(),
            created_at: DateTime::<Utc>::MIN_UTC,
            validated_by: None,
            validated_at: None,
            version: 0,
            created: false,
            deleted: false,
        }
    }

    pub fn id_typed(&self) -> ReceiptId {
        self.id
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn supplier(&self) -> &str {
        &self.supplier
    }

    pub fn warehouse(&self) -> &WarehouseRef {
        &self.warehouse
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn status(&self) -> DocumentStatus {
        self.status
    }

    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn validated_by(&self) -> Option<UserId> {
        self.validated_by
    }

    pub fn validated_at(&self) -> Option<DateTime<Utc>> {
        self.validated_at
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

impl AggregateRoot for Receipt {
    type Id = ReceiptId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateReceipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateReceipt {
    pub receipt_id: ReceiptId,
    pub number: String,
    pub supplier: String,
    pub warehouse: WarehouseRef,
    pub lines: Vec<LineItem>,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ValidateReceipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateReceipt {
    pub receipt_id: ReceiptId,
    pub validated_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteReceipt (draft only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReceipt {
    pub receipt_id: ReceiptId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptCommand {
    CreateReceipt(CreateReceipt),
    ValidateReceipt(ValidateReceipt),
    DeleteReceipt(DeleteReceipt),
}

/// Event: ReceiptCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptCreated {
    pub receipt_id: ReceiptId,
    pub number: String,
    pub supplier: String,
    pub warehouse: WarehouseRef,
    pub lines: Vec<LineItem>,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReceiptValidated.
///
/// Carries the lines whose quantities must be added to the receipt's
/// warehouse in the same unit of work that persists this event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptValidated {
    pub receipt_id: ReceiptId,
    pub warehouse: WarehouseRef,
    pub lines: Vec<LineItem>,
    pub validated_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReceiptDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptDeleted {
    pub receipt_id: ReceiptId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptEvent {
    ReceiptCreated(ReceiptCreated),
    ReceiptValidated(ReceiptValidated),
    ReceiptDeleted(ReceiptDeleted),
}

impl Event for ReceiptEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ReceiptEvent::ReceiptCreated(_) => "inventory.receipt.created",
            ReceiptEvent::ReceiptValidated(_) => "inventory.receipt.validated",
            ReceiptEvent::ReceiptDeleted(_) => "inventory.receipt.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ReceiptEvent::ReceiptCreated(e) => e.occurred_at,
            ReceiptEvent::ReceiptValidated(e) => e.occurred_at,
            ReceiptEvent::ReceiptDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Receipt {
    type Command = ReceiptCommand;
    type Event = ReceiptEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ReceiptEvent::ReceiptCreated(e) => {
                self.id = e.receipt_id;
                self.number = e.number.clone();
                self.supplier = e.supplier.clone();
                self.warehouse = e.warehouse.clone();
                self.lines = e.lines.clone();
                self.notes = e.notes.clone();
                self.status = DocumentStatus::Draft;
                self.created_by = e.created_by;
                self.created_at = e.occurred_at;
                self.created = true;
            }
            ReceiptEvent::ReceiptValidated(e) => {
                self.status = DocumentStatus::Validated;
                self.validated_by = Some(e.validated_by);
                self.validated_at = Some(e.occurred_at);
            }
            ReceiptEvent::ReceiptDeleted(_) => {
                self.deleted = true;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ReceiptCommand::CreateReceipt(cmd) => self.handle_create(cmd),
            ReceiptCommand::ValidateReceipt(cmd) => self.handle_validate(cmd),
            ReceiptCommand::DeleteReceipt(cmd) => self.handle_delete(cmd),
        }
    }
}

impl Receipt {
    fn ensure_exists(&self, receipt_id: ReceiptId) -> Result<(), DomainError> {
        if !self.created || self.deleted {
            return Err(DomainError::not_found("receipt", receipt_id));
        }
        if self.id != receipt_id {
            return Err(DomainError::conflict("receipt_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateReceipt) -> Result<Vec<ReceiptEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict(format!(
                "receipt {} already exists",
                cmd.receipt_id
            )));
        }
        if cmd.number.trim().is_empty() {
            return Err(DomainError::validation("receipt number cannot be empty"));
        }
        validate_lines(&cmd.lines)?;

        Ok(vec![ReceiptEvent::ReceiptCreated(ReceiptCreated {
            receipt_id: cmd.receipt_id,
            number: cmd.number.clone(),
            supplier: cmd.supplier.clone(),
            warehouse: cmd.warehouse.clone(),
            lines: cmd.lines.clone(),
            notes: cmd.notes.clone(),
            created_by: cmd.created_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_validate(&self, cmd: &ValidateReceipt) -> Result<Vec<ReceiptEvent>, DomainError> {
        self.ensure_exists(cmd.receipt_id)?;

        ensure_not_validated("receipt", self.status, &self.number)?;

        Ok(vec![ReceiptEvent::ReceiptValidated(ReceiptValidated {
            receipt_id: cmd.receipt_id,
            warehouse: self.warehouse.clone(),
            lines: self.lines.clone(),
            validated_by: cmd.validated_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteReceipt) -> Result<Vec<ReceiptEvent>, DomainError> {
        self.ensure_exists(cmd.receipt_id)?;

        ensure_deletable("receipt", self.status, &self.number)?;

        Ok(vec![ReceiptEvent::ReceiptDeleted(ReceiptDeleted {
            receipt_id: cmd.receipt_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
