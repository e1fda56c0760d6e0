//! # Domain Types
//!
//! Core domain types used throughout Stockbook.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │  Transaction    │   │ TransactionItem │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  current_stock  │   │  kind (IN/OUT)  │   │  product_name   │       │
//! │  │  bom: [BomLine] │   │  status         │   │  quantity       │       │
//! │  │  cost/sale ¢    │   │  net_total ¢    │   │  stock_delta    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────┐  ┌─────────────────┐       │
//! │  │  ProductKind    │   │TransactionStatus │  │    ItemRole     │       │
//! │  │  ─────────────  │   │  ──────────────  │  │  ─────────────  │       │
//! │  │  Finished FINAL │   │  Completed       │  │  Line           │       │
//! │  │  Component      │   │  PendingPayment  │  │  Consumption    │       │
//! │  │       INSUMO    │   │  Cancelled       │  │  Output         │       │
//! │  └─────────────────┘   └──────────────────┘  └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! Documents serialize as camelCase JSON with the legacy tag values
//! (`FINAL`/`INSUMO`, `IN`/`OUT`/`ASSEMBLY`, `COMPLETED`/`CANCELLED`/
//! `PENDING_PAYMENT`) that downstream reporting already depends on. Rust
//! code reads the unambiguous enum names; serde does the translation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Product Kind
// =============================================================================

/// How a product's stock is sourced.
///
/// ## Legacy Wire Tags
/// Stored data uses `FINAL` for finished goods and `INSUMO` for raw
/// components (the original operator-facing vocabulary). Code reads
/// `Finished`/`Component`; serde preserves the stored tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductKind {
    /// Sellable finished good; may carry a bill of materials.
    #[serde(rename = "FINAL")]
    Finished,
    /// Raw material consumed by assemblies and shortfall sales.
    #[serde(rename = "INSUMO")]
    Component,
}

// =============================================================================
// Bill of Materials
// =============================================================================

/// One component requirement in a bill of materials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BomLine {
    /// Product id of the component consumed.
    pub component_product_id: String,
    /// Units of the component needed per assembled unit. Must be ≥ 1;
    /// the virtual stock calculator treats anything else as a malformed
    /// BOM and reports zero producible units.
    pub quantity_per_unit: i64,
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product: either a directly-stocked item or a finished good
/// assembled from components.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Owner (business) this product belongs to.
    pub owner_id: String,

    /// Optional stock keeping unit, denormalized onto transaction items.
    pub sku: Option<String>,

    /// Display name, frozen onto transaction items at commit time.
    pub name: String,

    /// Finished good (`FINAL`) or raw component (`INSUMO`).
    #[serde(rename = "type")]
    pub kind: ProductKind,

    /// On-hand stock level in units. Written only by the ledger engine.
    pub current_stock: i64,

    /// Reorder threshold for low-stock surfacing.
    pub min_stock: i64,

    /// Stock ceiling used by replenishment suggestions.
    pub max_stock: i64,

    /// Unit cost basis in cents. Last-cost-wins: each purchase overwrites it.
    pub cost_price_cents: i64,

    /// Unit sale price in cents.
    pub sale_price_cents: i64,

    /// Supplier that last provided this product (set by purchases).
    pub supplier_id: Option<String>,

    /// Bill of materials: component requirements per assembled unit.
    /// Empty means stock is tracked directly, never derived.
    #[serde(default)]
    pub bom: Vec<BomLine>,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the unit cost basis as Money.
    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }

    /// Returns the unit sale price as Money.
    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }

    /// True when the product carries a non-empty bill of materials.
    #[inline]
    pub fn has_bom(&self) -> bool {
        !self.bom.is_empty()
    }

    /// True when on-hand stock is at or below the reorder threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.min_stock
    }
}

// =============================================================================
// Transaction Kind
// =============================================================================

/// The business meaning of a transaction.
///
/// ## Legacy Wire Tags (deliberately asymmetric)
/// The stored tags predate this codebase and are inverted from intuitive
/// stock direction: a sale is stored as `IN` (revenue coming IN) and a
/// purchase as `OUT` (money going OUT), even though a sale decreases stock
/// and a purchase increases it. Downstream reporting keys off these exact
/// tags, so the serde layer preserves them while code reads
/// `Sale`/`Purchase`/`Assembly`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Revenue event: goods leave stock, money comes in. Wire tag `IN`.
    #[serde(rename = "IN")]
    Sale,
    /// Expense event: goods enter stock, money goes out. Wire tag `OUT`.
    #[serde(rename = "OUT")]
    Purchase,
    /// Internal production: components become finished stock. Wire tag
    /// `ASSEMBLY`.
    #[serde(rename = "ASSEMBLY")]
    Assembly,
}

// =============================================================================
// Transaction Status
// =============================================================================

/// The status of a recorded transaction.
///
/// State machine: `PendingPayment | Completed → Cancelled`. Cancelled is a
/// persisted terminal state: reversal flips the status in place and keeps
/// the record as audit history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Committed and settled.
    Completed,
    /// Committed, stock applied, payment still owed by the client.
    PendingPayment,
    /// Reverted; stock adjustments have been undone.
    Cancelled,
}

impl Default for TransactionStatus {
    fn default() -> Self {
        TransactionStatus::Completed
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A committed ledger event: one sale, purchase, assembly, or its reversal
/// trace. Created once, atomically, together with its items; immutable
/// afterwards except for the status flip to Cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub owner_id: String,
    /// Business meaning; see [`TransactionKind`] for the wire-tag mapping.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    /// Business date of the event (operators may backdate).
    pub date: DateTime<Utc>,
    /// Gross value in cents before discount.
    pub total_cents: i64,
    /// Absolute discount in cents.
    pub discount_cents: i64,
    /// `total_cents - discount_cents`, denormalized for reporting.
    pub net_total_cents: i64,
    pub supplier_id: Option<String>,
    pub client_id: Option<String>,
    pub client_name: Option<String>,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    /// When the record was committed (distinct from the business `date`).
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Returns the net total as Money.
    #[inline]
    pub fn net_total(&self) -> Money {
        Money::from_cents(self.net_total_cents)
    }

    /// True once the transaction has been reverted.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.status == TransactionStatus::Cancelled
    }
}

// =============================================================================
// Item Role
// =============================================================================

/// What a transaction item records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemRole {
    /// A quantity the caller explicitly sold or purchased.
    Line,
    /// Implicit component consumption backing a shortfall or an assembly.
    Consumption,
    /// Informational record of assembled output (zero price).
    Output,
}

// =============================================================================
// Transaction Item
// =============================================================================

/// A line item frozen at commit time.
///
/// Uses the snapshot pattern: product name and SKU are copied onto the item
/// so history stays readable after the product is renamed or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionItem {
    pub id: String,
    pub transaction_id: String,
    pub product_id: String,
    /// Product name at commit time (frozen).
    pub product_name: String,
    /// SKU at commit time (frozen).
    pub sku: Option<String>,
    /// Units this item accounts for: sold/purchased quantity on LINE items,
    /// consumed units on CONSUMPTION items, assembled units on OUTPUT items.
    pub quantity: i64,
    /// Unit price in cents at commit time: sale price on sale lines, unit
    /// cost on purchase lines and consumption records, zero on output
    /// records.
    pub price_cents: i64,
    /// Unit cost basis in cents at commit time, used for profit reporting.
    pub cost_price_cents: i64,
    /// What this item records.
    pub role: ItemRole,
    /// Exact signed stock change this item applied to its product.
    /// Reversal applies the negation. Distinct from `quantity` on sale
    /// lines partly assembled on demand: only the from-stock portion was
    /// ever decremented, so only that portion is restored.
    pub stock_delta: i64,
    pub created_at: DateTime<Utc>,
}

impl TransactionItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns `price × quantity` as Money, saturating at the i64 bounds.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.price().multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_product() -> Product {
        Product {
            id: "p-1".to_string(),
            owner_id: "owner-1".to_string(),
            sku: Some("TBL-01".to_string()),
            name: "Oak Table".to_string(),
            kind: ProductKind::Finished,
            current_stock: 4,
            min_stock: 2,
            max_stock: 20,
            cost_price_cents: 4_000,
            sale_price_cents: 9_900,
            supplier_id: None,
            bom: vec![BomLine {
                component_product_id: "c-1".to_string(),
                quantity_per_unit: 4,
            }],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_product_kind_wire_tags() {
        assert_eq!(
            serde_json::to_string(&ProductKind::Finished).unwrap(),
            "\"FINAL\""
        );
        assert_eq!(
            serde_json::to_string(&ProductKind::Component).unwrap(),
            "\"INSUMO\""
        );
        let parsed: ProductKind = serde_json::from_str("\"INSUMO\"").unwrap();
        assert_eq!(parsed, ProductKind::Component);
    }

    #[test]
    fn test_transaction_kind_preserves_inverted_tags() {
        // Sales serialize as IN and purchases as OUT; reporting depends on it.
        assert_eq!(
            serde_json::to_string(&TransactionKind::Sale).unwrap(),
            "\"IN\""
        );
        assert_eq!(
            serde_json::to_string(&TransactionKind::Purchase).unwrap(),
            "\"OUT\""
        );
        assert_eq!(
            serde_json::to_string(&TransactionKind::Assembly).unwrap(),
            "\"ASSEMBLY\""
        );
        let parsed: TransactionKind = serde_json::from_str("\"IN\"").unwrap();
        assert_eq!(parsed, TransactionKind::Sale);
    }

    #[test]
    fn test_status_wire_tags() {
        assert_eq!(
            serde_json::to_string(&TransactionStatus::PendingPayment).unwrap(),
            "\"PENDING_PAYMENT\""
        );
        assert_eq!(
            serde_json::to_string(&TransactionStatus::Cancelled).unwrap(),
            "\"CANCELLED\""
        );
        assert_eq!(TransactionStatus::default(), TransactionStatus::Completed);
    }

    #[test]
    fn test_product_serializes_camel_case() {
        let json = serde_json::to_value(sample_product()).unwrap();
        assert_eq!(json["ownerId"], "owner-1");
        assert_eq!(json["type"], "FINAL");
        assert_eq!(json["currentStock"], 4);
        assert_eq!(json["bom"][0]["componentProductId"], "c-1");
        assert_eq!(json["bom"][0]["quantityPerUnit"], 4);
    }

    #[test]
    fn test_product_bom_defaults_to_empty() {
        // Documents written before BOM support carry no bom field at all.
        let json = r#"{
            "id": "p-2", "ownerId": "owner-1", "sku": null,
            "name": "Chair", "type": "INSUMO",
            "currentStock": 10, "minStock": 0, "maxStock": 50,
            "costPriceCents": 500, "salePriceCents": 900,
            "supplierId": null,
            "createdAt": "2024-03-01T00:00:00Z",
            "updatedAt": "2024-03-01T00:00:00Z"
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert!(!product.has_bom());
        assert!(product.bom.is_empty());
    }

    #[test]
    fn test_product_helpers() {
        let product = sample_product();
        assert!(product.has_bom());
        assert!(!product.is_low_stock());
        assert_eq!(product.sale_price().cents(), 9_900);
    }

    #[test]
    fn test_item_line_total() {
        let item = TransactionItem {
            id: "i-1".to_string(),
            transaction_id: "t-1".to_string(),
            product_id: "p-1".to_string(),
            product_name: "Oak Table".to_string(),
            sku: None,
            quantity: 3,
            price_cents: 5_000,
            cost_price_cents: 2_000,
            role: ItemRole::Line,
            stock_delta: -3,
            created_at: Utc::now(),
        };
        assert_eq!(item.line_total().cents(), 15_000);
    }
}
