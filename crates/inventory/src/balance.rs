use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockmaster_core::{DomainError, typed_id};

use crate::catalog::{ProductId, WarehouseId};

typed_id!(
    /// Identifier of a stock balance row.
    BalanceId
);

/// Unique key of a stock balance: one product in one warehouse.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BalanceKey {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
}

impl BalanceKey {
    pub fn new(product_id: ProductId, warehouse_id: WarehouseId) -> Self {
        Self {
            product_id,
            warehouse_id,
        }
    }
}

impl core::fmt::Display for BalanceKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}@{}", self.product_id, self.warehouse_id)
    }
}

/// Outcome of applying one delta to a balance.
///
/// `after == before + delta` holds for every value this module hands out.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceChange {
    pub before: i64,
    pub delta: i64,
    pub after: i64,
}

/// Current on-hand quantity of one product in one warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBalance {
    id: BalanceId,
    key: BalanceKey,
    quantity: i64,
    location: Option<String>,
    updated_at: DateTime<Utc>,
    version: u64,
}

impl StockBalance {
    /// A not-yet-persisted zero balance (absence is quantity 0).
    pub fn open(id: BalanceId, key: BalanceKey, now: DateTime<Utc>) -> Self {
        Self {
            id,
            key,
            quantity: 0,
            location: None,
            updated_at: now,
            version: 0,
        }
    }

    /// Rebuild a balance from stored fields.
    pub fn restore(
        id: BalanceId,
        key: BalanceKey,
        quantity: i64,
        location: Option<String>,
        updated_at: DateTime<Utc>,
        version: u64,
    ) -> Self {
        Self {
            id,
            key,
            quantity,
            location,
            updated_at,
            version,
        }
    }

    pub fn id(&self) -> BalanceId {
        self.id
    }

    pub fn key(&self) -> BalanceKey {
        self.key
    }

    pub fn product_id(&self) -> ProductId {
        self.key.product_id
    }

    pub fn warehouse_id(&self) -> WarehouseId {
        self.key.warehouse_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Stored version; 0 means the row has never been persisted.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_persisted(&self) -> bool {
        self.version > 0
    }

    /// Apply a signed delta.
    ///
    /// Rejects any delta that would leave the balance negative, leaving `self`
    /// untouched. The version is bumped by the store on write, not here.
    pub fn apply_delta(
        &mut self,
        delta: i64,
        now: DateTime<Utc>,
    ) -> Result<BalanceChange, DomainError> {
        let before = self.quantity;
        let after = before.checked_add(delta).ok_or_else(|| {
            DomainError::validation(format!("quantity overflow applying {delta} to {}", self.key))
        })?;

        if after < 0 {
            return Err(DomainError::InsufficientStock {
                product_id: self.key.product_id.to_string(),
                warehouse_id: self.key.warehouse_id.to_string(),
                available: before,
                requested: delta.saturating_neg(),
            });
        }

        self.quantity = after;
        self.updated_at = now;
        Ok(BalanceChange {
            before,
            delta,
            after,
        })
    }

    pub fn set_location(&mut self, location: Option<String>, now: DateTime<Utc>) {
        self.location = location;
        self.updated_at = now;
    }

    /// Best-effort availability check (no mutation).
    pub fn ensure_available(&self, requested: i64) -> Result<(), DomainError> {
        if self.quantity < requested {
            return Err(DomainError::InsufficientStock {
                product_id: self.key.product_id.to_string(),
                warehouse_id: self.key.warehouse_id.to_string(),
                available: self.quantity,
                requested,
            });
        }
        Ok(())
    }

    /// Copy of this balance as persisted at `version`.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_key() -> BalanceKey {
        BalanceKey::new(ProductId::generate(), WarehouseId::generate())
    }

    fn test_balance() -> StockBalance {
        StockBalance::open(BalanceId::generate(), test_key(), Utc::now())
    }

    #[test]
    fn increment_from_absent_starts_at_zero() {
        let mut balance = test_balance();
        let change = balance.apply_delta(5, Utc::now()).unwrap();
        assert_eq!(
            change,
            BalanceChange {
                before: 0,
                delta: 5,
                after: 5
            }
        );
        assert_eq!(balance.quantity(), 5);
    }

    #[test]
    fn decrement_below_zero_is_rejected_without_mutation() {
        let mut balance = test_balance();
        balance.apply_delta(10, Utc::now()).unwrap();

        let err = balance.apply_delta(-12, Utc::now()).unwrap_err();
        match err {
            DomainError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 10);
                assert_eq!(requested, 12);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        assert_eq!(balance.quantity(), 10);
    }

    #[test]
    fn decrement_to_exactly_zero_is_allowed() {
        let mut balance = test_balance();
        balance.apply_delta(5, Utc::now()).unwrap();
        let change = balance.apply_delta(-5, Utc::now()).unwrap();
        assert_eq!(change.after, 0);
    }

    #[test]
    fn overflow_is_a_validation_error() {
        let mut balance = test_balance();
        balance.apply_delta(i64::MAX, Utc::now()).unwrap();
        let err = balance.apply_delta(1, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(balance.quantity(), i64::MAX);
    }

    #[test]
    fn most_negative_delta_is_a_shortfall_not_a_panic() {
        let mut balance = test_balance();
        balance.apply_delta(5, Utc::now()).unwrap();

        let err = balance.apply_delta(i64::MIN, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InsufficientStock {
                available: 5,
                requested: i64::MAX,
                ..
            }
        ));
        assert_eq!(balance.quantity(), 5);
    }

    #[test]
    fn ensure_available_reports_shortfall() {
        let mut balance = test_balance();
        balance.apply_delta(3, Utc::now()).unwrap();
        assert!(balance.ensure_available(3).is_ok());
        assert!(matches!(
            balance.ensure_available(4),
            Err(DomainError::InsufficientStock { available: 3, requested: 4, .. })
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: after any sequence of deltas, the quantity equals the sum
        /// of the accepted deltas and is never negative.
        #[test]
        fn quantity_is_sum_of_accepted_deltas(
            deltas in prop::collection::vec(-50i64..50i64, 0..64)
        ) {
            let mut balance = test_balance();
            let mut accepted_sum = 0i64;

            for delta in deltas {
                match balance.apply_delta(delta, Utc::now()) {
                    Ok(change) => {
                        prop_assert_eq!(change.after, change.before + change.delta);
                        accepted_sum += delta;
                    }
                    Err(DomainError::InsufficientStock { .. }) => {
                        prop_assert!(accepted_sum + delta < 0);
                    }
                    Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                }
                prop_assert!(balance.quantity() >= 0);
                prop_assert_eq!(balance.quantity(), accepted_sum);
            }
        }
    }
}
