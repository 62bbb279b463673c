//! Pieces shared by receipts and deliveries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use stockmaster_core::DomainError;

use crate::catalog::{Product, ProductId, Warehouse, WarehouseId};

/// Receipt / delivery status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Draft,
    Validated,
}

/// One product line of a receipt or delivery.
///
/// Name and SKU are captured when the document is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: i64,
    pub product_name: String,
    pub product_sku: String,
}

impl LineItem {
    pub fn for_product(product: &Product, quantity: i64) -> Self {
        Self {
            product_id: product.id,
            quantity,
            product_name: product.name.clone(),
            product_sku: product.sku.clone(),
        }
    }
}

/// A requested line before catalog resolution.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Warehouse identity and name as of document creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseRef {
    pub id: WarehouseId,
    pub name: String,
}

impl From<&Warehouse> for WarehouseRef {
    fn from(value: &Warehouse) -> Self {
        Self {
            id: value.id,
            name: value.name.clone(),
        }
    }
}

/// Reject empty documents and non-positive quantities.
pub fn validate_requested_lines(lines: &[RequestedLine]) -> Result<(), DomainError> {
    if lines.is_empty() {
        return Err(DomainError::validation("document must have at least one item"));
    }
    for (idx, line) in lines.iter().enumerate() {
        if line.quantity <= 0 {
            return Err(DomainError::validation(format!(
                "item {} (product {}) quantity must be positive, got {}",
                idx + 1,
                line.product_id,
                line.quantity
            )));
        }
    }
    Ok(())
}

pub(crate) fn validate_lines(lines: &[LineItem]) -> Result<(), DomainError> {
    let requested: Vec<RequestedLine> = lines
        .iter()
        .map(|l| RequestedLine {
            product_id: l.product_id,
            quantity: l.quantity,
        })
        .collect();
    validate_requested_lines(&requested)
}

/// Total requested quantity per product (lines may repeat a product).
pub fn quantities_by_product(
    lines: &[RequestedLine],
) -> Result<BTreeMap<ProductId, i64>, DomainError> {
    let mut totals = BTreeMap::new();
    for line in lines {
        let total = totals.entry(line.product_id).or_insert(0i64);
        *total = total.checked_add(line.quantity).ok_or_else(|| {
            DomainError::validation(format!(
                "total quantity for product {} overflows",
                line.product_id
            ))
        })?;
    }
    Ok(totals)
}

/// A validated document cannot be validated again.
pub(crate) fn ensure_not_validated(
    document: &'static str,
    status: DocumentStatus,
    number: &str,
) -> Result<(), DomainError> {
    match status {
        DocumentStatus::Validated => Err(DomainError::AlreadyValidated {
            document,
            reference: number.to_string(),
        }),
        DocumentStatus::Draft => Ok(()),
    }
}

/// Only drafts may be deleted; validated documents back ledger entries.
pub(crate) fn ensure_deletable(
    document: &'static str,
    status: DocumentStatus,
    number: &str,
) -> Result<(), DomainError> {
    match status {
        DocumentStatus::Validated => Err(DomainError::CannotDeleteValidated {
            document,
            reference: number.to_string(),
        }),
        DocumentStatus::Draft => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_lines_are_rejected() {
        let err = validate_requested_lines(&[]).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let lines = [RequestedLine {
            product_id: ProductId::generate(),
            quantity: 0,
        }];
        assert!(validate_requested_lines(&lines).is_err());
    }

    #[test]
    fn repeated_products_are_summed() {
        let p = ProductId::generate();
        let q = ProductId::generate();
        let lines = [
            RequestedLine {
                product_id: p,
                quantity: 2,
            },
            RequestedLine {
                product_id: q,
                quantity: 1,
            },
            RequestedLine {
                product_id: p,
                quantity: 3,
            },
        ];
        let totals = quantities_by_product(&lines).unwrap();
        assert_eq!(totals[&p], 5);
        assert_eq!(totals[&q], 1);
    }

    #[test]
    fn overflowing_totals_are_rejected() {
        let p = ProductId::generate();
        let lines = [
            RequestedLine {
                product_id: p,
                quantity: i64::MAX,
            },
            RequestedLine {
                product_id: p,
                quantity: i64::MAX,
            },
        ];
        let err = quantities_by_product(&lines).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn status_rules_name_the_document() {
        assert!(ensure_not_validated("receipt", DocumentStatus::Draft, "RCV-1").is_ok());
        assert!(matches!(
            ensure_not_validated("receipt", DocumentStatus::Validated, "RCV-1"),
            Err(DomainError::AlreadyValidated { document: "receipt", .. })
        ));
        assert!(ensure_deletable("delivery", DocumentStatus::Draft, "DLV-1").is_ok());
        let err = ensure_deletable("delivery", DocumentStatus::Validated, "DLV-1").unwrap_err();
        assert!(err.to_string().contains("DLV-1"));
    }
}
