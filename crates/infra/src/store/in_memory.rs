use std::collections::BTreeMap;

use parking_lot::RwLock;

use stockmaster_core::{AggregateRoot, ExpectedVersion};
use stockmaster_inventory::{
    BalanceKey, Delivery, DeliveryId, InternalTransfer, LedgerEntry, Receipt, ReceiptId,
    StockBalance, TransferId,
};

use super::query::{BalanceFilter, DocumentFilter, LedgerFilter, TransferFilter};
use super::r#trait::{ChangeSet, DocumentWrite, StockStore, StoreError};

#[derive(Debug, Default)]
struct State {
    balances: BTreeMap<BalanceKey, StockBalance>,
    ledger: Vec<LedgerEntry>,
    receipts: BTreeMap<ReceiptId, Receipt>,
    deliveries: BTreeMap<DeliveryId, Delivery>,
    transfers: BTreeMap<TransferId, InternalTransfer>,
}

impl State {
    fn last_sequence(&self) -> u64 {
        self.ledger.last().map(|e| e.sequence).unwrap_or(0)
    }
}

/// In-memory stock store.
///
/// Intended for tests, embedding and as the reference for durable backends.
/// A single lock guards all tables, so a commit is trivially atomic.
#[derive(Debug, Default)]
pub struct InMemoryStockStore {
    state: RwLock<State>,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_versions<D>(
    table: &BTreeMap<D::Id, D>,
    writes: &[DocumentWrite<D>],
    entity: &str,
) -> Result<(), StoreError>
where
    D: AggregateRoot,
    D::Id: Ord + core::fmt::Display,
{
    for write in writes {
        let (id, expected) = match write {
            DocumentWrite::Upsert { document, expected } => (document.id(), *expected),
            DocumentWrite::Delete { id, expected } => (id, *expected),
        };
        let current = table.get(id).map(|d| d.version());
        if !expected.matches(current) {
            return Err(StoreError::Concurrency(format!(
                "{entity} {id}: expected {expected:?}, found {current:?}"
            )));
        }
    }
    Ok(())
}

fn check_unique_numbers<D>(
    table: &BTreeMap<D::Id, D>,
    writes: &[DocumentWrite<D>],
    number: impl Fn(&D) -> &str,
    entity: &str,
) -> Result<(), StoreError>
where
    D: AggregateRoot,
    D::Id: Ord,
{
    for write in writes {
        if let DocumentWrite::Upsert { document, .. } = write {
            let clash = table
                .values()
                .any(|d| d.id() != document.id() && number(d) == number(document));
            if clash {
                return Err(StoreError::UniqueViolation(format!(
                    "{entity} number {} already exists",
                    number(document)
                )));
            }
        }
    }
    Ok(())
}

fn apply_documents<D>(table: &mut BTreeMap<D::Id, D>, writes: Vec<DocumentWrite<D>>)
where
    D: AggregateRoot,
    D::Id: Ord,
{
    for write in writes {
        match write {
            DocumentWrite::Upsert { document, .. } => {
                table.insert(document.id().clone(), document);
            }
            DocumentWrite::Delete { id, .. } => {
                table.remove(&id);
            }
        }
    }
}

impl StockStore for InMemoryStockStore {
    fn balance(&self, key: BalanceKey) -> Result<Option<StockBalance>, StoreError> {
        Ok(self.state.read().balances.get(&key).cloned())
    }

    fn balances(&self, filter: &BalanceFilter) -> Result<Vec<StockBalance>, StoreError> {
        let state = self.state.read();
        Ok(state
            .balances
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect())
    }

    fn ledger(&self, filter: &LedgerFilter) -> Result<Vec<LedgerEntry>, StoreError> {
        let state = self.state.read();
        Ok(state
            .ledger
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    fn receipt(&self, id: ReceiptId) -> Result<Option<Receipt>, StoreError> {
        Ok(self.state.read().receipts.get(&id).cloned())
    }

    fn receipts(&self, filter: &DocumentFilter) -> Result<Vec<Receipt>, StoreError> {
        let state = self.state.read();
        Ok(state
            .receipts
            .values()
            .filter(|r| filter.matches_receipt(r))
            .cloned()
            .collect())
    }

    fn receipt_number_exists(&self, number: &str) -> Result<bool, StoreError> {
        Ok(self
            .state
            .read()
            .receipts
            .values()
            .any(|r| r.number() == number))
    }

    fn delivery(&self, id: DeliveryId) -> Result<Option<Delivery>, StoreError> {
        Ok(self.state.read().deliveries.get(&id).cloned())
    }

    fn deliveries(&self, filter: &DocumentFilter) -> Result<Vec<Delivery>, StoreError> {
        let state = self.state.read();
        Ok(state
            .deliveries
            .values()
            .filter(|d| filter.matches_delivery(d))
            .cloned()
            .collect())
    }

    fn delivery_number_exists(&self, number: &str) -> Result<bool, StoreError> {
        Ok(self
            .state
            .read()
            .deliveries
            .values()
            .any(|d| d.number() == number))
    }

    fn transfer(&self, id: TransferId) -> Result<Option<InternalTransfer>, StoreError> {
        Ok(self.state.read().transfers.get(&id).cloned())
    }

    fn transfers(&self, filter: &TransferFilter) -> Result<Vec<InternalTransfer>, StoreError> {
        let state = self.state.read();
        Ok(state
            .transfers
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    fn commit(&self, changes: ChangeSet) -> Result<Vec<LedgerEntry>, StoreError> {
        if changes.is_empty() {
            return Ok(vec![]);
        }

        let mut state = self.state.write();

        // Validate everything before touching any table.
        for write in &changes.balances {
            let key = write.balance.key();
            let current = state.balances.get(&key).map(|b| b.version());
            if !write.expected.matches(current) {
                return Err(StoreError::Concurrency(format!(
                    "balance {key}: expected {:?}, found {current:?}",
                    write.expected
                )));
            }
        }
        check_versions(&state.receipts, &changes.receipts, "receipt")?;
        check_versions(&state.deliveries, &changes.deliveries, "delivery")?;
        check_versions(&state.transfers, &changes.transfers, "transfer")?;
        check_unique_numbers(&state.receipts, &changes.receipts, Receipt::number, "receipt")?;
        check_unique_numbers(
            &state.deliveries,
            &changes.deliveries,
            Delivery::number,
            "delivery",
        )?;
        if let Some(bad) = changes.ledger.iter().find(|e| {
            e.change.before.checked_add(e.change.delta) != Some(e.change.after)
        }) {
            return Err(StoreError::Corrupt(format!(
                "ledger entry {} does not add up ({} + {} != {})",
                bad.id, bad.change.before, bad.change.delta, bad.change.after
            )));
        }

        for write in changes.balances {
            let next = match write.expected {
                ExpectedVersion::Exact(v) => v + 1,
                _ => state
                    .balances
                    .get(&write.balance.key())
                    .map(|b| b.version() + 1)
                    .unwrap_or(1),
            };
            let balance = write.balance.with_version(next);
            state.balances.insert(balance.key(), balance);
        }

        apply_documents(&mut state.receipts, changes.receipts);
        apply_documents(&mut state.deliveries, changes.deliveries);
        apply_documents(&mut state.transfers, changes.transfers);

        let mut sequence = state.last_sequence();
        let mut committed = Vec::with_capacity(changes.ledger.len());
        for entry in changes.ledger {
            sequence += 1;
            let entry = entry.commit(sequence);
            state.ledger.push(entry.clone());
            committed.push(entry);
        }

        Ok(committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::BalanceWrite;
    use chrono::Utc;
    use stockmaster_core::UserId;
    use stockmaster_inventory::{
        BalanceId, ChangeType, LedgerReference, NameSnapshot, NewLedgerEntry, ProductId,
        ReferenceType, WarehouseId,
    };

    fn key() -> BalanceKey {
        BalanceKey::new(ProductId::generate(), WarehouseId::generate())
    }

    fn staged(
        key: BalanceKey,
        delta: i64,
        base: Option<StockBalance>,
    ) -> (BalanceWrite, NewLedgerEntry) {
        let expected = match &base {
            Some(b) => ExpectedVersion::Exact(b.version()),
            None => ExpectedVersion::Absent,
        };
        let mut balance =
            base.unwrap_or_else(|| StockBalance::open(BalanceId::generate(), key, Utc::now()));
        let change = balance.apply_delta(delta, Utc::now()).unwrap();
        let entry = NewLedgerEntry::from_change(
            key,
            NameSnapshot {
                product_name: "Widget".into(),
                product_sku: "W-1".into(),
                warehouse_name: "Main".into(),
            },
            ChangeType::Adjustment,
            change,
            LedgerReference {
                id: *balance.id().as_uuid(),
                kind: ReferenceType::Adjustment,
            },
            UserId::new(),
            "adjust",
            Utc::now(),
        );
        (BalanceWrite { balance, expected }, entry)
    }

    #[test]
    fn commit_assigns_versions_and_sequences() {
        let store = InMemoryStockStore::new();
        let k = key();

        let (write, entry) = staged(k, 5, None);
        let committed = store
            .commit(ChangeSet {
                balances: vec![write],
                ledger: vec![entry],
                ..ChangeSet::default()
            })
            .unwrap();
        assert_eq!(committed[0].sequence, 1);

        let stored = store.balance(k).unwrap().unwrap();
        assert_eq!(stored.version(), 1);
        assert_eq!(stored.quantity(), 5);

        let (write, entry) = staged(k, -2, Some(stored));
        let committed = store
            .commit(ChangeSet {
                balances: vec![write],
                ledger: vec![entry],
                ..ChangeSet::default()
            })
            .unwrap();
        assert_eq!(committed[0].sequence, 2);
        assert_eq!(store.balance(k).unwrap().unwrap().version(), 2);
    }

    #[test]
    fn stale_write_rejects_the_whole_change_set() {
        let store = InMemoryStockStore::new();
        let k = key();
        let (first, _) = staged(k, 5, None);
        store
            .commit(ChangeSet {
                balances: vec![first],
                ..ChangeSet::default()
            })
            .unwrap();

        // Second writer also believes the row is absent.
        let other = key();
        let (fresh, fresh_entry) = staged(other, 1, None);
        let (stale, stale_entry) = staged(k, 3, None);
        let err = store
            .commit(ChangeSet {
                balances: vec![fresh, stale],
                ledger: vec![fresh_entry, stale_entry],
                ..ChangeSet::default()
            })
            .unwrap_err();

        assert!(matches!(err, StoreError::Concurrency(_)));
        assert!(store.balance(other).unwrap().is_none());
        assert!(store.ledger(&LedgerFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn ledger_filter_selects_by_key() {
        let store = InMemoryStockStore::new();
        let a = key();
        let b = key();
        for k in [a, b, a] {
            let base = store.balance(k).unwrap();
            let (write, entry) = staged(k, 1, base);
            store
                .commit(ChangeSet {
                    balances: vec![write],
                    ledger: vec![entry],
                    ..ChangeSet::default()
                })
                .unwrap();
        }

        let entries = store
            .ledger(&LedgerFilter::for_key(a.product_id, a.warehouse_id))
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].sequence < entries[1].sequence);
        assert_eq!(entries[1].quantity_after, 2);
    }
}
