//! # Stockbook Ledger
//!
//! Inventory, sales and purchasing for a small manufacturing business,
//! built around one idea: **stock only ever changes through a recorded
//! transaction**. Nobody edits `currentStock` by hand; sales, purchases,
//! assemblies and reversals are the only writers, and each of them commits
//! its stock movement, its transaction row and its line items in a single
//! atomic batch.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              Stockbook                                  │
//! │                                                                         │
//! │   ┌───────────────┐   ┌────────────────┐   ┌─────────────────────┐     │
//! │   │    Catalog    │   │  StockLedger   │   │ TransactionRecords  │     │
//! │   │               │   │                │   │                     │     │
//! │   │ products CRUD │   │ sales          │   │ history queries     │     │
//! │   │ BOM upkeep    │   │ purchases      │   │ (read-only)         │     │
//! │   │ virtual stock │   │ assemblies     │   │                     │     │
//! │   │               │   │ reversals      │   │                     │     │
//! │   └───────┬───────┘   └───────┬────────┘   └──────────┬──────────┘     │
//! │           │                   │                       │                │
//! │           └───────────────────┼───────────────────────┘                │
//! │                               ▼                                        │
//! │                         StoreHandle                                    │
//! │              (versioned documents, atomic batches)                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Writers race optimistically: every stock-affecting commit carries the
//! version of each product it read, and a commit that lost the race is
//! retried from a fresh snapshot. The retry re-validates, so overselling
//! loses the race instead of going negative.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use stockbook_ledger::{SaleDraft, Stockbook};
//! use stockbook_store::MemoryStore;
//!
//! # async fn demo() -> Result<(), stockbook_ledger::LedgerError> {
//! let book = Stockbook::new(Arc::new(MemoryStore::new()));
//!
//! let sale = book
//!     .ledger()
//!     .record_sale(SaleDraft::simple("owner-1", "product-1", 2))
//!     .await?;
//! println!("sold for {} cents", sale.net_total_cents);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use stockbook_store::{DocumentStore, StoreHandle};

pub mod catalog;
pub mod engine;
pub mod error;
pub mod records;

pub use catalog::{Catalog, NewProduct, ProductUpdate};
pub use engine::{
    PurchaseDraft, PurchaseLine, ReversalOutcome, SaleDraft, SaleLine, StockLedger,
};
pub use error::{LedgerError, LedgerResult};
pub use records::TransactionRecords;

/// How many times a guarded commit is retried after losing a version race
/// before the conflict surfaces to the caller.
pub const MAX_COMMIT_ATTEMPTS: u32 = 5;

/// Everything wired to one store: the usual entry point for applications.
#[derive(Clone)]
pub struct Stockbook {
    catalog: Catalog,
    ledger: StockLedger,
    records: TransactionRecords,
}

impl Stockbook {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let handle = StoreHandle::new(store);
        Stockbook {
            catalog: Catalog::new(handle.clone()),
            ledger: StockLedger::new(handle.clone()),
            records: TransactionRecords::new(handle),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn ledger(&self) -> &StockLedger {
        &self.ledger
    }

    pub fn records(&self) -> &TransactionRecords {
        &self.records
    }
}
