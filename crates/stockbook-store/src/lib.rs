//! # stockbook-store: Document Store for Stockbook
//!
//! This crate provides persistence for Stockbook as a versioned document
//! store. Domain types serialize to JSON bodies; all mutations travel in
//! atomic write batches with optional version preconditions.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Stockbook Data Flow                               │
//! │                                                                         │
//! │  Ledger operation (record_sale)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  stockbook-store (THIS CRATE)                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │  StoreHandle  │    │  WriteBatch   │    │  Migrations  │  │   │
//! │  │   │  typed reads  │    │ Set / Update  │    │  (embedded)  │  │   │
//! │  │   │               │    │   / Delete    │    │              │  │   │
//! │  │   │ get / find_by │◄───│ preconditions │    │ 001_docs.sql │  │   │
//! │  │   └───────┬───────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │           │                    │                               │   │
//! │  │           ▼                    ▼                               │   │
//! │  │   ┌─────────────────────────────────────┐                     │   │
//! │  │   │        DocumentStore trait          │                     │   │
//! │  │   │   SqliteStore    │    MemoryStore   │                     │   │
//! │  │   └─────────────────────────────────────┘                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite: documents(collection, id, body, version, updated_at)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - The [`DocumentStore`] trait and typed [`StoreHandle`]
//! - [`batch`] - Write batches, field patches, version preconditions
//! - [`document`] - Document trait, collection/field names, filters
//! - [`sqlite`] - Production SQLite adapter with pooling and WAL
//! - [`memory`] - In-memory adapter for tests
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Store error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockbook_store::{SqliteStore, StoreConfig, StoreHandle, WriteBatch};
//!
//! let store = SqliteStore::connect(StoreConfig::new("stockbook.db")).await?;
//! let handle = StoreHandle::new(Arc::new(store));
//!
//! let (product, version) = handle.get_required::<Product>("p-1").await?;
//!
//! let mut batch = WriteBatch::new();
//! batch.update(
//!     Product::COLLECTION,
//!     &product.id,
//!     Patch::new().increment(fields::CURRENT_STOCK, -2),
//! );
//! batch.require_version(Product::COLLECTION, &product.id, version);
//! handle.commit(batch).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod batch;
pub mod document;
pub mod error;
pub mod memory;
pub mod migrations;
pub mod sqlite;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use batch::{FieldOp, Patch, Precondition, WriteBatch, WriteOp};
pub use document::{collections, fields, Document, Filter, RawDocument};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use sqlite::{SqliteStore, StoreConfig};
pub use store::{to_document_body, DocumentStore, StoreHandle};
