//! Append-only stock ledger entries.
//!
//! A [`NewLedgerEntry`] is what the engine stages inside a unit of work; the
//! store turns it into a [`LedgerEntry`] by assigning the next sequence number
//! at commit. Entries are never updated or deleted.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stockmaster_core::{UserId, typed_id};

use crate::balance::{BalanceChange, BalanceKey};
use crate::catalog::{ProductId, WarehouseId};

typed_id!(
    /// Ledger entry identifier.
    LedgerEntryId
);

/// What kind of movement produced an entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    Receipt,
    Delivery,
    Adjustment,
    TransferIn,
    TransferOut,
}

impl ChangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeType::Receipt => "RECEIPT",
            ChangeType::Delivery => "DELIVERY",
            ChangeType::Adjustment => "ADJUSTMENT",
            ChangeType::TransferIn => "TRANSFER_IN",
            ChangeType::TransferOut => "TRANSFER_OUT",
        }
    }
}

/// Kind of record an entry's `reference_id` points at.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceType {
    Receipt,
    Delivery,
    Transfer,
    /// Adjustments reference the balance row they changed.
    Adjustment,
}

/// Link from an entry to the record that caused it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerReference {
    pub id: Uuid,
    pub kind: ReferenceType,
}

/// Names captured when the entry is written. Never re-resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameSnapshot {
    pub product_name: String,
    pub product_sku: String,
    pub warehouse_name: String,
}

/// An entry staged for append (not yet assigned a sequence number).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLedgerEntry {
    pub id: LedgerEntryId,
    pub key: BalanceKey,
    pub names: NameSnapshot,
    pub change_type: ChangeType,
    pub change: BalanceChange,
    pub reference: LedgerReference,
    pub user_id: UserId,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl NewLedgerEntry {
    /// Build an entry from the change a balance actually underwent.
    pub fn from_change(
        key: BalanceKey,
        names: NameSnapshot,
        change_type: ChangeType,
        change: BalanceChange,
        reference: LedgerReference,
        user_id: UserId,
        notes: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LedgerEntryId::generate(),
            key,
            names,
            change_type,
            change,
            reference,
            user_id,
            notes: notes.into(),
            created_at,
        }
    }

    /// Freeze the entry at its store-assigned position.
    pub fn commit(self, sequence: u64) -> LedgerEntry {
        LedgerEntry {
            id: self.id,
            sequence,
            product_id: self.key.product_id,
            product_name: self.names.product_name,
            product_sku: self.names.product_sku,
            warehouse_id: self.key.warehouse_id,
            warehouse_name: self.names.warehouse_name,
            change_type: self.change_type,
            quantity_before: self.change.before,
            quantity_change: self.change.delta,
            quantity_after: self.change.after,
            reference_id: self.reference.id,
            reference_type: self.reference.kind,
            user_id: self.user_id,
            notes: self.notes,
            created_at: self.created_at,
        }
    }
}

/// Immutable audit record of one quantity change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    /// Monotonically increasing position in the ledger (creation order).
    pub sequence: u64,

    pub product_id: ProductId,
    pub product_name: String,
    pub product_sku: String,
    pub warehouse_id: WarehouseId,
    pub warehouse_name: String,

    pub change_type: ChangeType,
    pub quantity_before: i64,
    pub quantity_change: i64,
    pub quantity_after: i64,

    pub reference_id: Uuid,
    pub reference_type: ReferenceType,

    pub user_id: UserId,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn key(&self) -> BalanceKey {
        BalanceKey::new(self.product_id, self.warehouse_id)
    }

    pub fn is_consistent(&self) -> bool {
        self.quantity_before.checked_add(self.quantity_change) == Some(self.quantity_after)
    }
}

/// Replay entries from zero, in sequence order, into per-key quantities.
pub fn replay<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> BTreeMap<BalanceKey, i64> {
    let mut sorted: Vec<&LedgerEntry> = entries.into_iter().collect();
    sorted.sort_by_key(|e| e.sequence);

    let mut quantities = BTreeMap::new();
    for entry in sorted {
        *quantities.entry(entry.key()).or_insert(0) += entry.quantity_change;
    }
    quantities
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::{BalanceId, StockBalance};
    use proptest::prelude::*;

    fn names() -> NameSnapshot {
        NameSnapshot {
            product_name: "Widget".into(),
            product_sku: "W-1".into(),
            warehouse_name: "Main".into(),
        }
    }

    #[test]
    fn change_types_serialize_in_screaming_case() {
        let json = serde_json::to_string(&ChangeType::TransferOut).unwrap();
        assert_eq!(json, "\"TRANSFER_OUT\"");
        assert_eq!(ChangeType::TransferOut.as_str(), "TRANSFER_OUT");
        let json = serde_json::to_string(&ReferenceType::Adjustment).unwrap();
        assert_eq!(json, "\"ADJUSTMENT\"");
    }

    #[test]
    fn committed_entry_copies_the_balance_change() {
        let key = BalanceKey::new(ProductId::generate(), WarehouseId::generate());
        let change = BalanceChange {
            before: 10,
            delta: 5,
            after: 15,
        };
        let entry = NewLedgerEntry::from_change(
            key,
            names(),
            ChangeType::Receipt,
            change,
            LedgerReference {
                id: Uuid::now_v7(),
                kind: ReferenceType::Receipt,
            },
            UserId::new(),
            "received",
            Utc::now(),
        )
        .commit(7);

        assert_eq!(entry.sequence, 7);
        assert_eq!(entry.quantity_before, 10);
        assert_eq!(entry.quantity_change, 5);
        assert_eq!(entry.quantity_after, 15);
        assert_eq!(entry.key(), key);
        assert!(entry.is_consistent());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: recording an entry for every accepted delta lets a replay
        /// from zero reproduce the final balance of every key.
        #[test]
        fn replay_reproduces_balances(
            ops in prop::collection::vec((0usize..3, -20i64..40i64), 1..80)
        ) {
            let keys: Vec<BalanceKey> = (0..3)
                .map(|_| BalanceKey::new(ProductId::generate(), WarehouseId::generate()))
                .collect();
            let mut balances: Vec<StockBalance> = keys
                .iter()
                .map(|k| StockBalance::open(BalanceId::generate(), *k, Utc::now()))
                .collect();

            let mut entries = Vec::new();
            let mut seq = 0u64;
            for (idx, delta) in ops {
                if let Ok(change) = balances[idx].apply_delta(delta, Utc::now()) {
                    seq += 1;
                    let entry = NewLedgerEntry::from_change(
                        keys[idx],
                        names(),
                        ChangeType::Adjustment,
                        change,
                        LedgerReference {
                            id: *balances[idx].id().as_uuid(),
                            kind: ReferenceType::Adjustment,
                        },
                        UserId::new(),
                        "adjust",
                        Utc::now(),
                    )
                    .commit(seq);
                    prop_assert!(entry.is_consistent());
                    entries.push(entry);
                }
            }

            // Replay must not depend on the order entries are handed in.
            entries.reverse();
            let replayed = replay(&entries);
            for balance in &balances {
                let expected = balance.quantity();
                let actual = replayed.get(&balance.key()).copied().unwrap_or(0);
                prop_assert_eq!(actual, expected);
            }
        }
    }
}
