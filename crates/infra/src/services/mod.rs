//! Stock engine: lifecycle operations over documents, balances and the ledger.
//!
//! Every state-changing operation runs through [`StockEngine::run_unit`]:
//!
//! ```text
//! operation
//!   ↓
//! 1. Acquire the (product, warehouse) keys it touches (all at once)
//!   ↓
//! 2. Run the body against a fresh UnitOfWork (reads see staged writes)
//!   ↓
//! 3. Commit the change set atomically (versions + unique numbers re-checked)
//!   ↓
//! 4. Release the keys
//! ```
//!
//! A retryable commit failure (`Concurrency`, `UniqueViolation`) re-runs the
//! whole unit from step 1, at most `max_conflict_retries` times, after which
//! the caller sees `Conflict`. Every other failure surfaces as-is, with
//! nothing applied.

use std::sync::Arc;

use tracing::{debug, info, warn};

use stockmaster_core::{Aggregate, DomainError, Event, execute};
use stockmaster_inventory::{
    BalanceKey, LedgerEntry, NameSnapshot, Product, ProductId, Warehouse, WarehouseId,
};

use crate::catalog::Catalog;
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::StockError;
use crate::locks::KeyLocks;
use crate::store::StockStore;
use crate::unit_of_work::UnitOfWork;

pub mod adjustments;
pub mod deliveries;
pub mod receipts;
pub mod reports;
pub mod transfers;

pub use adjustments::StockCount;
pub use deliveries::NewDelivery;
pub use receipts::NewReceipt;
pub use reports::Discrepancy;
pub use transfers::NewTransfer;

/// Result of a committed unit of work.
#[derive(Debug, Clone)]
pub struct Committed<T> {
    pub value: T,
    /// Ledger entries appended by the unit, with their sequence numbers.
    pub ledger: Vec<LedgerEntry>,
}

/// Entry point for every stock operation.
///
/// ## Generic Parameters
///
/// - `S`: balance / ledger / document store
/// - `C`: product and warehouse catalog
pub struct StockEngine<S, C> {
    store: S,
    catalog: C,
    clock: Arc<dyn Clock>,
    locks: KeyLocks,
    config: EngineConfig,
}

impl<S, C> StockEngine<S, C> {
    pub fn new(store: S, catalog: C) -> Self {
        Self {
            store,
            catalog,
            clock: Arc::new(SystemClock),
            locks: KeyLocks::new(),
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl<S, C> StockEngine<S, C>
where
    S: StockStore,
    C: Catalog,
{
    /// Run `body` as one unit of work over `keys`, retrying on write conflicts.
    ///
    /// `body` may run more than once and must derive everything it writes from
    /// what it reads through the unit.
    pub fn run_unit<T>(
        &self,
        operation: &'static str,
        keys: &[BalanceKey],
        mut body: impl FnMut(&mut UnitOfWork<'_, S>) -> Result<T, StockError>,
    ) -> Result<Committed<T>, StockError> {
        let mut retries = 0u32;
        loop {
            let guard = self.locks.acquire(keys.iter().copied());
            let mut unit = UnitOfWork::new(&self.store, guard, self.clock.now());

            let outcome = body(&mut unit)
                .and_then(|value| unit.commit().map(|ledger| Committed { value, ledger }));

            match outcome {
                Ok(committed) => {
                    info!(
                        operation,
                        keys = keys.len(),
                        ledger_entries = committed.ledger.len(),
                        retries,
                        "stock unit committed"
                    );
                    return Ok(committed);
                }
                Err(err) if err.is_retryable() && retries < self.config.max_conflict_retries => {
                    retries += 1;
                    warn!(operation, retries, error = %err, "stock unit conflicted; retrying");
                }
                Err(err) if err.is_retryable() => {
                    warn!(operation, retries, error = %err, "stock unit conflicted; giving up");
                    return Err(StockError::Conflict(format!(
                        "{operation} failed after {} attempts: {err}",
                        retries + 1
                    )));
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub(crate) fn require_product(&self, id: ProductId) -> Result<Product, StockError> {
        self.catalog
            .product(id)?
            .ok_or_else(|| StockError::not_found("product", id))
    }

    pub(crate) fn require_warehouse(&self, id: WarehouseId) -> Result<Warehouse, StockError> {
        self.catalog
            .warehouse(id)?
            .ok_or_else(|| StockError::not_found("warehouse", id))
    }

    /// On-hand quantity; 0 when no balance row exists.
    pub fn quantity_on_hand(&self, key: BalanceKey) -> Result<i64, StockError> {
        Ok(self
            .store
            .balance(key)?
            .map(|b| b.quantity())
            .unwrap_or(0))
    }
}

pub(crate) fn names(product_name: &str, product_sku: &str, warehouse_name: &str) -> NameSnapshot {
    NameSnapshot {
        product_name: product_name.to_string(),
        product_sku: product_sku.to_string(),
        warehouse_name: warehouse_name.to_string(),
    }
}

/// Run `command` against `aggregate` and trace the events it produced.
pub(crate) fn decide<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, StockError>
where
    A: Aggregate<Error = DomainError>,
    A::Event: Event,
{
    let events = execute(aggregate, command)?;
    for event in &events {
        debug!(
            event_type = event.event_type(),
            schema = event.version(),
            occurred_at = %event.occurred_at(),
            "document event applied"
        );
    }
    Ok(events)
}
