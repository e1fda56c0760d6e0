//! # stockbook-core: Pure Business Logic for Stockbook
//!
//! This crate is the **heart** of Stockbook. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockbook Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    stockbook-ledger (Engine)                    │   │
//! │  │    record_sale ──► record_purchase ──► process_assembly        │   │
//! │  │                     ──► revert_transaction                      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ stockbook-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │    bom    │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │  virtual  │  │   rules   │  │   │
//! │  │   │   Txn     │  │   cents   │  │   stock   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 stockbook-store (Document Store)                │   │
//! │  │          versioned documents, batches, SQLite adapter           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Transaction, TransactionItem, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`bom`] - Bill-of-materials math: virtual stock, requirements, costing
//! - [`error`] - Domain error types
//! - [`validation`] - Field and business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use stockbook_core::money::Money;
//!
//! // Create money from cents (never from floats!)
//! let wax = Money::from_cents(150);  // $1.50 per unit of wax
//! let wick = Money::from_cents(50);  // $0.50 per wick
//!
//! // A candle consumes 2 wax + 1 wick
//! let assembled = wax.multiply_quantity(2) + wick;
//! assert_eq!(assembled.cents(), 350); // $3.50 to build one
//!
//! // A blended cost for 3 units totalling $10.00 rounds per unit
//! assert_eq!(Money::from_cents(1000).per_unit(3).cents(), 333);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod bom;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use stockbook_core::Money` instead of
// `use stockbook_core::money::Money`

pub use bom::{assembled_unit_cost, assembly_requirements, virtual_stock, ComponentRequirement};
pub use error::{ValidationError, ValidationResult};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default owner ID for v0.1 (single-owner runtime with multi-owner schema)
///
/// ## Why a constant?
/// v0.1 serves one business, but every document carries an ownerId for future
/// multi-account hosting. This constant is used throughout the codebase and
/// will be replaced with dynamic owner resolution later.
pub const DEFAULT_OWNER_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Maximum line items allowed in a single sale or purchase draft
///
/// ## Business Reason
/// Prevents runaway drafts and keeps commit batches a reasonable size.
pub const MAX_LINE_ITEMS: usize = 100;

/// Maximum quantity of a single line item
///
/// ## Business Reason
/// Prevents accidental over-entry (e.g., typing 100000 instead of 100).
pub const MAX_LINE_QUANTITY: i64 = 10_000;

/// Maximum unit price or cost in cents ($10,000,000.00)
///
/// ## Business Reason
/// Same fat-finger guard as [`MAX_LINE_QUANTITY`], and it keeps every
/// total a draft can produce far inside i64: the largest line is
/// `MAX_PRICE_CENTS * MAX_LINE_QUANTITY`, four orders of magnitude below
/// `i64::MAX` even summed over [`MAX_LINE_ITEMS`] lines.
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;
