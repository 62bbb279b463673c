//! Transactional scope for one stock operation.
//!
//! A [`UnitOfWork`] holds the key guard for every balance it may touch, reads
//! through its own staged writes, and collects balance rows, ledger entries
//! and document writes into a single [`ChangeSet`]. Nothing reaches the store
//! until [`UnitOfWork::commit`]; dropping the unit instead is a rollback.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use stockmaster_core::{ExpectedVersion, UserId};
use stockmaster_inventory::{
    BalanceChange, BalanceId, BalanceKey, ChangeType, Delivery, InternalTransfer, LedgerEntry,
    LedgerEntryId, LedgerReference, NameSnapshot, NewLedgerEntry, Receipt, StockBalance,
};

use crate::error::StockError;
use crate::locks::KeyGuard;
use crate::store::{BalanceWrite, ChangeSet, DocumentWrite, StockStore};

#[derive(Debug)]
struct StagedBalance {
    balance: StockBalance,
    expected: ExpectedVersion,
    dirty: bool,
}

/// One ledger-recorded balance movement.
#[derive(Debug, Clone)]
pub struct Posting {
    pub key: BalanceKey,
    pub names: NameSnapshot,
    pub change_type: ChangeType,
    pub delta: i64,
    pub reference: LedgerReference,
    pub user_id: UserId,
    pub notes: String,
}

pub struct UnitOfWork<'a, S> {
    store: &'a S,
    guard: KeyGuard<'a>,
    now: DateTime<Utc>,
    balances: BTreeMap<BalanceKey, StagedBalance>,
    changes: ChangeSet,
}

impl<'a, S: StockStore> UnitOfWork<'a, S> {
    pub(crate) fn new(store: &'a S, guard: KeyGuard<'a>, now: DateTime<Utc>) -> Self {
        Self {
            store,
            guard,
            now,
            balances: BTreeMap::new(),
            changes: ChangeSet::default(),
        }
    }

    /// Timestamp shared by every write in this unit.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Store handle for document reads.
    pub fn store(&self) -> &'a S {
        self.store
    }

    fn staged(&mut self, key: BalanceKey) -> Result<&mut StagedBalance, StockError> {
        if !self.guard.covers(&key) {
            return Err(StockError::Internal(format!(
                "balance {key} used outside the keys locked by this unit"
            )));
        }

        if !self.balances.contains_key(&key) {
            let staged = match self.store.balance(key)? {
                Some(balance) => StagedBalance {
                    expected: ExpectedVersion::Exact(balance.version()),
                    balance,
                    dirty: false,
                },
                None => StagedBalance {
                    balance: StockBalance::open(BalanceId::generate(), key, self.now),
                    expected: ExpectedVersion::Absent,
                    dirty: false,
                },
            };
            self.balances.insert(key, staged);
        }

        self.balances
            .get_mut(&key)
            .ok_or_else(|| StockError::Internal(format!("balance {key} vanished from the unit")))
    }

    /// Current balance of a locked key, including this unit's staged writes.
    pub fn balance(&mut self, key: BalanceKey) -> Result<StockBalance, StockError> {
        Ok(self.staged(key)?.balance.clone())
    }

    /// The single mutation path for quantities.
    ///
    /// Creates the row on first use; rejects any delta that would leave it
    /// negative with `InsufficientStock`.
    pub fn apply_delta(&mut self, key: BalanceKey, delta: i64) -> Result<BalanceChange, StockError> {
        let now = self.now;
        let staged = self.staged(key)?;
        let change = staged.balance.apply_delta(delta, now)?;
        staged.dirty = true;
        Ok(change)
    }

    /// Stage a ledger entry; the store assigns its sequence number at commit.
    pub fn record(&mut self, entry: NewLedgerEntry) -> LedgerEntryId {
        let id = entry.id;
        self.changes.ledger.push(entry);
        id
    }

    /// `apply_delta` followed by the matching ledger entry.
    pub fn post(&mut self, posting: Posting) -> Result<BalanceChange, StockError> {
        let change = self.apply_delta(posting.key, posting.delta)?;
        self.record(NewLedgerEntry::from_change(
            posting.key,
            posting.names,
            posting.change_type,
            change,
            posting.reference,
            posting.user_id,
            posting.notes,
            self.now,
        ));
        Ok(change)
    }

    /// Relabel an existing balance row.
    pub fn set_location(
        &mut self,
        key: BalanceKey,
        location: Option<String>,
    ) -> Result<StockBalance, StockError> {
        let now = self.now;
        let staged = self.staged(key)?;
        if !staged.balance.is_persisted() && !staged.dirty {
            return Err(StockError::not_found("stock balance", key));
        }
        staged.balance.set_location(location, now);
        staged.dirty = true;
        Ok(staged.balance.clone())
    }

    pub fn write_receipt(&mut self, write: DocumentWrite<Receipt>) {
        self.changes.receipts.push(write);
    }

    pub fn write_delivery(&mut self, write: DocumentWrite<Delivery>) {
        self.changes.deliveries.push(write);
    }

    pub fn write_transfer(&mut self, write: DocumentWrite<InternalTransfer>) {
        self.changes.transfers.push(write);
    }

    /// Persist everything staged, then release the keys.
    pub(crate) fn commit(mut self) -> Result<Vec<LedgerEntry>, StockError> {
        for staged in std::mem::take(&mut self.balances).into_values() {
            if staged.dirty {
                self.changes.balances.push(BalanceWrite {
                    balance: staged.balance,
                    expected: staged.expected,
                });
            }
        }
        let changes = std::mem::take(&mut self.changes);
        Ok(self.store.commit(changes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locks::KeyLocks;
    use crate::store::{InMemoryStockStore, LedgerFilter};
    use stockmaster_inventory::{ProductId, ReferenceType, WarehouseId};

    fn key() -> BalanceKey {
        BalanceKey::new(ProductId::generate(), WarehouseId::generate())
    }

    fn posting(key: BalanceKey, delta: i64) -> Posting {
        Posting {
            key,
            names: NameSnapshot {
                product_name: "Widget".into(),
                product_sku: "W-1".into(),
                warehouse_name: "Main".into(),
            },
            change_type: ChangeType::Adjustment,
            delta,
            reference: LedgerReference {
                id: uuid::Uuid::now_v7(),
                kind: ReferenceType::Adjustment,
            },
            user_id: UserId::new(),
            notes: "count".into(),
        }
    }

    #[test]
    fn reads_see_staged_writes() {
        let store = InMemoryStockStore::new();
        let locks = KeyLocks::new();
        let k = key();

        let mut uow = UnitOfWork::new(&store, locks.acquire([k]), Utc::now());
        uow.post(posting(k, 10)).unwrap();
        let change = uow.post(posting(k, -4)).unwrap();
        assert_eq!((change.before, change.after), (10, 6));
        assert_eq!(uow.balance(k).unwrap().quantity(), 6);

        let committed = uow.commit().unwrap();
        assert_eq!(committed.len(), 2);
        assert_eq!(store.balance(k).unwrap().unwrap().quantity(), 6);
        assert_eq!(locks.held_count(), 0);
    }

    #[test]
    fn dropping_the_unit_discards_everything() {
        let store = InMemoryStockStore::new();
        let locks = KeyLocks::new();
        let k = key();
        {
            let mut uow = UnitOfWork::new(&store, locks.acquire([k]), Utc::now());
            uow.post(posting(k, 10)).unwrap();
        }
        assert!(store.balance(k).unwrap().is_none());
        assert!(store.ledger(&LedgerFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn unlocked_key_is_refused() {
        let store = InMemoryStockStore::new();
        let locks = KeyLocks::new();
        let mut uow = UnitOfWork::new(&store, locks.acquire([key()]), Utc::now());
        let err = uow.apply_delta(key(), 1).unwrap_err();
        assert!(matches!(err, StockError::Internal(_)));
    }

    #[test]
    fn location_requires_an_existing_row() {
        let store = InMemoryStockStore::new();
        let locks = KeyLocks::new();
        let k = key();
        let mut uow = UnitOfWork::new(&store, locks.acquire([k]), Utc::now());
        let err = uow.set_location(k, Some("A-01".into())).unwrap_err();
        assert_eq!(err.kind(), stockmaster_core::ErrorKind::NotFound);
    }
}
