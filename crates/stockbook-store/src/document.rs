//! # Document Model
//!
//! The store persists JSON documents grouped into named collections. Every
//! document carries a version number the store maintains; callers never set
//! it directly.
//!
//! ## Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Document Anatomy                                  │
//! │                                                                         │
//! │  collection: "products"                                                 │
//! │  id:         "3f2a..."      ← doc_id(), stable for the document's life  │
//! │  version:    4              ← starts at 1, +1 on every committed write  │
//! │  body:       { "id": "3f2a...", "ownerId": ..., "currentStock": 7 }    │
//! │                                                                         │
//! │  The id appears both as the row key and inside the body so that query   │
//! │  results are self-describing.                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde_json::Value;
use stockbook_core::{Product, Transaction, TransactionItem};

// =============================================================================
// Collection and Field Names
// =============================================================================

/// Collection names used by Stockbook.
pub mod collections {
    pub const PRODUCTS: &str = "products";
    pub const TRANSACTIONS: &str = "transactions";
    pub const TRANSACTION_ITEMS: &str = "transaction_items";
}

/// Wire-level field names used in query filters and patches.
///
/// Bodies serialize camelCase, so these constants are camelCase too. Using
/// them instead of string literals keeps patches and filters aligned with
/// the serde renames on the core types.
pub mod fields {
    pub const OWNER_ID: &str = "ownerId";
    pub const TRANSACTION_ID: &str = "transactionId";
    pub const STATUS: &str = "status";
    pub const KIND: &str = "type";
    pub const SUPPLIER_ID: &str = "supplierId";
    pub const CURRENT_STOCK: &str = "currentStock";
    pub const COST_PRICE: &str = "costPriceCents";
    pub const UPDATED_AT: &str = "updatedAt";
}

// =============================================================================
// Document Trait
// =============================================================================

/// A domain type that lives in a store collection.
///
/// Implementations pin the collection name and expose the document ID so
/// typed reads and writes never spell either as a string literal.
pub trait Document {
    /// The collection this type is stored in.
    const COLLECTION: &'static str;

    /// The document's ID within the collection.
    fn doc_id(&self) -> &str;
}

impl Document for Product {
    const COLLECTION: &'static str = collections::PRODUCTS;

    fn doc_id(&self) -> &str {
        &self.id
    }
}

impl Document for Transaction {
    const COLLECTION: &'static str = collections::TRANSACTIONS;

    fn doc_id(&self) -> &str {
        &self.id
    }
}

impl Document for TransactionItem {
    const COLLECTION: &'static str = collections::TRANSACTION_ITEMS;

    fn doc_id(&self) -> &str {
        &self.id
    }
}

// =============================================================================
// Raw Documents
// =============================================================================

/// A document as the store returns it: untyped body plus its version.
///
/// Typed access goes through [`crate::StoreHandle`], which deserializes the
/// body and carries the version alongside for precondition building.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub id: String,
    pub body: Value,
    pub version: u64,
}

// =============================================================================
// Query Filters
// =============================================================================

/// An equality filter on a top-level body field.
///
/// Filters combine with AND. Nested paths are not supported; the engine
/// only ever queries flat fields (ownerId, transactionId, status, type).
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    /// Builds an equality filter.
    ///
    /// ## Example
    /// ```rust
    /// use stockbook_store::{fields, Filter};
    ///
    /// let f = Filter::eq(fields::OWNER_ID, "owner-1");
    /// assert_eq!(f.field, "ownerId");
    /// ```
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter {
            field: field.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stockbook_core::{ProductKind, DEFAULT_OWNER_ID};

    #[test]
    fn test_collection_bindings() {
        assert_eq!(Product::COLLECTION, "products");
        assert_eq!(Transaction::COLLECTION, "transactions");
        assert_eq!(TransactionItem::COLLECTION, "transaction_items");
    }

    #[test]
    fn test_doc_id_is_the_domain_id() {
        let product = Product {
            id: "p-1".to_string(),
            owner_id: DEFAULT_OWNER_ID.to_string(),
            sku: None,
            name: "Widget".to_string(),
            kind: ProductKind::Finished,
            current_stock: 0,
            min_stock: 0,
            max_stock: 0,
            cost_price_cents: 0,
            sale_price_cents: 0,
            supplier_id: None,
            bom: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(product.doc_id(), "p-1");
    }

    #[test]
    fn test_filter_builder() {
        let f = Filter::eq(fields::STATUS, "CANCELLED");
        assert_eq!(f.field, "status");
        assert_eq!(f.value, Value::String("CANCELLED".to_string()));

        let f = Filter::eq(fields::CURRENT_STOCK, 5);
        assert_eq!(f.value, serde_json::json!(5));
    }
}
