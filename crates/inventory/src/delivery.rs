use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockmaster_core::{Aggregate, AggregateRoot, DomainError, Event, UserId, typed_id};

use crate::document::{
    DocumentStatus, LineItem, WarehouseRef, ensure_deletable, ensure_not_validated, validate_lines,
};

typed_id!(
    /// Delivery identifier.
    DeliveryId
);

/// Aggregate root: Delivery (outgoing goods to a customer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    id: DeliveryId,
    number: String,
    customer: String,
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

impl Delivery {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: DeliveryId) -> Self {
        Self {
            id,
            number: String::new(),
            customer: String::new(),
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

    pub fn id_typed(&self) -> DeliveryId {
        self.id
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn customer(&self) -> &str {
        &self.customer
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

impl AggregateRoot for Delivery {
    type Id = DeliveryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateDelivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDelivery {
    pub delivery_id: DeliveryId,
    pub number: String,
    pub customer: String,
    pub warehouse: WarehouseRef,
    pub lines: Vec<LineItem>,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ValidateDelivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateDelivery {
    pub delivery_id: DeliveryId,
    pub validated_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteDelivery (draft only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteDelivery {
    pub delivery_id: DeliveryId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryCommand {
    CreateDelivery(CreateDelivery),
    ValidateDelivery(ValidateDelivery),
    DeleteDelivery(DeleteDelivery),
}

/// Event: DeliveryCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryCreated {
    pub delivery_id: DeliveryId,
    pub number: String,
    pub customer: String,
    pub warehouse: WarehouseRef,
    pub lines: Vec<LineItem>,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DeliveryValidated.
///
/// Carries the lines whose quantities must be removed from the delivery's
/// warehouse in the same unit of work that persists this event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryValidated {
    pub delivery_id: DeliveryId,
    pub warehouse: WarehouseRef,
    pub lines: Vec<LineItem>,
    pub validated_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DeliveryDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDeleted {
    pub delivery_id: DeliveryId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryEvent {
    DeliveryCreated(DeliveryCreated),
    DeliveryValidated(DeliveryValidated),
    DeliveryDeleted(DeliveryDeleted),
}

impl Event for DeliveryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DeliveryEvent::DeliveryCreated(_) => "inventory.delivery.created",
            DeliveryEvent::DeliveryValidated(_) => "inventory.delivery.validated",
            DeliveryEvent::DeliveryDeleted(_) => "inventory.delivery.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DeliveryEvent::DeliveryCreated(e) => e.occurred_at,
            DeliveryEvent::DeliveryValidated(e) => e.occurred_at,
            DeliveryEvent::DeliveryDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Delivery {
    type Command = DeliveryCommand;
    type Event = DeliveryEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            DeliveryEvent::DeliveryCreated(e) => {
                self.id = e.delivery_id;
                self.number = e.number.clone();
                self.customer = e.customer.clone();
                self.warehouse = e.warehouse.clone();
                self.lines = e.lines.clone();
                self.notes = e.notes.clone();
                self.status = DocumentStatus::Draft;
                self.created_by = e.created_by;
                self.created_at = e.occurred_at;
                self.created = true;
            }
            DeliveryEvent::DeliveryValidated(e) => {
                self.status = DocumentStatus::Validated;
                self.validated_by = Some(e.validated_by);
                self.validated_at = Some(e.occurred_at);
            }
            DeliveryEvent::DeliveryDeleted(_) => {
                self.deleted = true;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            DeliveryCommand::CreateDelivery(cmd) => self.handle_create(cmd),
            DeliveryCommand::ValidateDelivery(cmd) => self.handle_validate(cmd),
            DeliveryCommand::DeleteDelivery(cmd) => self.handle_delete(cmd),
        }
    }
}

impl Delivery {
    fn ensure_exists(&self, delivery_id: DeliveryId) -> Result<(), DomainError> {
        if !self.created || self.deleted {
            return Err(DomainError::not_found("delivery", delivery_id));
        }
        if self.id != delivery_id {
            return Err(DomainError::conflict("delivery_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateDelivery) -> Result<Vec<DeliveryEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict(format!(
                "delivery {} already exists",
                cmd.delivery_id
            )));
        }
        if cmd.number.trim().is_empty() {
            return Err(DomainError::validation("delivery number cannot be empty"));
        }
        validate_lines(&cmd.lines)?;

        Ok(vec![DeliveryEvent::DeliveryCreated(DeliveryCreated {
            delivery_id: cmd.delivery_id,
            number: cmd.number.clone(),
            customer: cmd.customer.clone(),
            warehouse: cmd.warehouse.clone(),
            lines: cmd.lines.clone(),
            notes: cmd.notes.clone(),
            created_by: cmd.created_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_validate(&self, cmd: &ValidateDelivery) -> Result<Vec<DeliveryEvent>, DomainError> {
        self.ensure_exists(cmd.delivery_id)?;

        ensure_not_validated("delivery", self.status, &self.number)?;

        Ok(vec![DeliveryEvent::DeliveryValidated(DeliveryValidated {
            delivery_id: cmd.delivery_id,
            warehouse: self.warehouse.clone(),
            lines: self.lines.clone(),
            validated_by: cmd.validated_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteDelivery) -> Result<Vec<DeliveryEvent>, DomainError> {
        self.ensure_exists(cmd.delivery_id)?;

        ensure_deletable("delivery", self.status, &self.number)?;

        Ok(vec![DeliveryEvent::DeliveryDeleted(DeliveryDeleted {
            delivery_id: cmd.delivery_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
