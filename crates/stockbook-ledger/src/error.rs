//! # Ledger Error Types
//!
//! Errors returned by engine, catalog, and record operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  ValidationError (stockbook-core)     StoreError (stockbook-store)     │
//! │       │                                    │                            │
//! │       └──────────────┬─────────────────────┘                            │
//! │                      ▼                                                  │
//! │  LedgerError (this module) ← adds sufficiency and lookup failures      │
//! │                      │                                                  │
//! │                      ▼                                                  │
//! │  Caller displays the message; every variant names the specific         │
//! │  product or transaction involved                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sufficiency errors carry product **names**, not ids: they exist to be
//! shown to the person at the counter.

use stockbook_core::ValidationError;
use stockbook_store::StoreError;
use thiserror::Error;

/// Errors from ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Product does not exist, or belongs to a different owner.
    ///
    /// ## When This Occurs
    /// - Draft line names an unknown product id
    /// - BOM references a product that was deleted
    /// - Cross-owner access (reported identically, existence not leaked)
    #[error("product not found: {id}")]
    ProductNotFound { id: String },

    /// Transaction does not exist, or belongs to a different owner.
    #[error("transaction not found: {id}")]
    TransactionNotFound { id: String },

    /// Not enough on-hand stock and no BOM to assemble the difference.
    ///
    /// ## When This Occurs
    /// - Sale quantity exceeds `currentStock` on a product with no BOM
    #[error("insufficient stock for '{product}': requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: i64,
        available: i64,
    },

    /// Not enough component stock to cover a shortfall or an assembly.
    #[error(
        "insufficient stock of component '{component}': required {required}, available {available}"
    )]
    InsufficientComponentStock {
        component: String,
        required: i64,
        available: i64,
    },

    /// Assembly requested on a product with an empty bill of materials.
    #[error("'{product}' has no bill of materials, cannot assemble")]
    NoBomDefined { product: String },

    /// Reversal requested on a transaction that is already cancelled.
    ///
    /// ## When This Occurs
    /// - Double-click on a cancel action
    /// - Replayed request after a successful reversal
    #[error("transaction {transaction_id} is already cancelled")]
    AlreadyCancelled { transaction_id: String },

    /// Input failed validation before any read or write.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The store failed. Distinct from validation: the reversal fallback
    /// only triggers on this variant.
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl LedgerError {
    pub fn product_not_found(id: impl Into<String>) -> Self {
        LedgerError::ProductNotFound { id: id.into() }
    }

    pub fn transaction_not_found(id: impl Into<String>) -> Self {
        LedgerError::TransactionNotFound { id: id.into() }
    }

    /// True when the underlying cause is a lost optimistic-concurrency race.
    ///
    /// The engine's retry loops re-run the whole read-validate-build cycle
    /// on these and only these.
    pub fn is_conflict(&self) -> bool {
        matches!(self, LedgerError::Storage(err) if err.is_conflict())
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
