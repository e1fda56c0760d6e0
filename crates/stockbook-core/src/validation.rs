//! # Validation Module
//!
//! Input validation utilities for Stockbook.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (forms/UI, out of scope here)                         │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Field rules checked before any read or write                      │
//! │  └── Typed ValidationError, never a partial mutation                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Engine sufficiency checks                                    │
//! │  └── Stock/component availability against snapshot reads               │
//! │                                                                         │
//! │  Defense in depth: every layer catches different mistakes              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockbook_core::validation::{validate_product_name, validate_quantity};
//!
//! validate_product_name("Scented Candle").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::{ValidationError, ValidationResult};
use crate::types::BomLine;
use crate::{MAX_LINE_ITEMS, MAX_LINE_QUANTITY, MAX_PRICE_CENTS};
use std::collections::HashSet;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 50 characters
/// - Should contain only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use stockbook_core::validation::validate_sku;
///
/// assert!(validate_sku("CNDL-01").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates an owner id is present.
pub fn validate_owner_id(owner_id: &str) -> ValidationResult<()> {
    if owner_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "ownerId".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (10,000)
///
/// The upper bound exists to catch fat-finger entries (10000 typed instead
/// of 100), not as a business limit.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items, informational records)
/// - Must not exceed MAX_PRICE_CENTS ($10M per unit)
///
/// The ceiling catches fat-finger entries and keeps every total a draft
/// can produce inside i64.
///
/// ## Example
/// ```rust
/// use stockbook_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());  // $10.99
/// assert!(validate_price_cents(0).is_ok());     // Free item
/// assert!(validate_price_cents(-100).is_err()); // Invalid
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 || cents > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a discount against the transaction total.
///
/// ## Rules
/// - Must be non-negative
/// - Must not exceed the total (net totals never go negative)
pub fn validate_discount_cents(discount: i64, total: i64) -> ValidationResult<()> {
    if discount < 0 || discount > total {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: total,
        });
    }

    Ok(())
}

/// Validates an initial stock level.
///
/// ## Rules
/// - Must be non-negative (products are created with on-hand stock, never debt)
pub fn validate_initial_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::OutOfRange {
            field: "currentStock".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates min/max stock bounds.
///
/// ## Rules
/// - Both non-negative
/// - min_stock must not exceed max_stock
pub fn validate_stock_bounds(min_stock: i64, max_stock: i64) -> ValidationResult<()> {
    if min_stock < 0 {
        return Err(ValidationError::OutOfRange {
            field: "minStock".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    if max_stock < min_stock {
        return Err(ValidationError::OutOfRange {
            field: "maxStock".to_string(),
            min: min_stock,
            max: i64::MAX,
        });
    }
    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines in a draft.
///
/// ## Rules
/// - At least one line
/// - Must not exceed MAX_LINE_ITEMS (100)
pub fn validate_line_count(lines: usize) -> ValidationResult<()> {
    if lines == 0 {
        return Err(ValidationError::Required {
            field: "lines".to_string(),
        });
    }

    if lines > MAX_LINE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "lines".to_string(),
            min: 1,
            max: MAX_LINE_ITEMS as i64,
        });
    }

    Ok(())
}

/// Validates the shape of a bill of materials.
///
/// An empty BOM is legal (the product's stock is tracked directly). When
/// entries are present, each must name a component, each quantity must be
/// strictly positive and within the per-line ceiling, and no component may
/// appear twice. The engine re-checks this on shortfall sales and
/// assemblies so documents seeded around the catalog cannot consume zero
/// components.
pub fn validate_bom(bom: &[BomLine]) -> ValidationResult<()> {
    let mut seen = HashSet::new();

    for line in bom {
        if line.component_product_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "componentProductId".to_string(),
            });
        }

        if line.quantity_per_unit <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantityPerUnit".to_string(),
            });
        }

        if line.quantity_per_unit > MAX_LINE_QUANTITY {
            return Err(ValidationError::OutOfRange {
                field: "quantityPerUnit".to_string(),
                min: 1,
                max: MAX_LINE_QUANTITY,
            });
        }

        if !seen.insert(line.component_product_id.as_str()) {
            return Err(ValidationError::DuplicateComponent {
                product_id: line.component_product_id.clone(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Rules
/// - Must be a valid UUID format
/// - 36 characters with hyphens: xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(component: &str, per_unit: i64) -> BomLine {
        BomLine {
            component_product_id: component.to_string(),
            quantity_per_unit: per_unit,
        }
    }

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("CNDL-01").is_ok());
        assert!(validate_sku("ABC123").is_ok());
        assert!(validate_sku("product_1").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Scented Candle 200g").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(100).is_ok());
        assert!(validate_quantity(10_000).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(10_001).is_err());
    }

    #[test]
    fn test_validate_price_cents() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(1099).is_ok());
        assert!(validate_price_cents(MAX_PRICE_CENTS).is_ok());

        assert!(validate_price_cents(-100).is_err());
        assert!(validate_price_cents(MAX_PRICE_CENTS + 1).is_err());
        assert!(validate_price_cents(i64::MAX).is_err());
    }

    #[test]
    fn test_validate_discount_bounds() {
        assert!(validate_discount_cents(0, 1000).is_ok());
        assert!(validate_discount_cents(1000, 1000).is_ok());
        assert!(validate_discount_cents(-1, 1000).is_err());
        assert!(validate_discount_cents(1001, 1000).is_err());
    }

    #[test]
    fn test_validate_stock_bounds() {
        assert!(validate_stock_bounds(0, 0).is_ok());
        assert!(validate_stock_bounds(2, 20).is_ok());
        assert!(validate_stock_bounds(-1, 20).is_err());
        assert!(validate_stock_bounds(30, 20).is_err());
    }

    #[test]
    fn test_validate_line_count() {
        assert!(validate_line_count(1).is_ok());
        assert!(validate_line_count(100).is_ok());
        assert!(validate_line_count(0).is_err());
        assert!(validate_line_count(101).is_err());
    }

    #[test]
    fn test_validate_bom_accepts_empty_and_well_formed() {
        assert!(validate_bom(&[]).is_ok());
        assert!(validate_bom(&[line("wax", 2), line("wick", 1)]).is_ok());
    }

    #[test]
    fn test_validate_bom_rejects_bad_entries() {
        assert!(validate_bom(&[line("", 2)]).is_err());
        assert!(validate_bom(&[line("wax", 0)]).is_err());
        assert!(validate_bom(&[line("wax", -2)]).is_err());
        assert!(validate_bom(&[line("wax", MAX_LINE_QUANTITY + 1)]).is_err());

        let duplicate = validate_bom(&[line("wax", 2), line("wax", 3)]);
        assert!(matches!(
            duplicate,
            Err(ValidationError::DuplicateComponent { .. })
        ));
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
        assert!(validate_uuid("123").is_err());
    }
}
