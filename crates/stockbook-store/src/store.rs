//! # Store Contract
//!
//! [`DocumentStore`] is the seam between the ledger engine and persistence.
//! The engine only ever reads documents, queries by equality filters, and
//! commits write batches; everything else (SQL, pooling, versions on disk)
//! is an adapter concern.
//!
//! [`StoreHandle`] wraps a store with typed reads so engine code works with
//! domain structs and versions instead of raw JSON bodies.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::batch::WriteBatch;
use crate::document::{Document, Filter, RawDocument};
use crate::error::{StoreError, StoreResult};

// =============================================================================
// DocumentStore Trait
// =============================================================================

/// Versioned document persistence.
///
/// Implementations must guarantee:
/// - `commit` is atomic: all operations land or none do
/// - version preconditions are checked against committed state, and a
///   mismatch fails the batch with [`StoreError::VersionConflict`]
/// - document versions start at 1 and increase by 1 per committed write
/// - `query_raw` results are sorted by document ID
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads a single document, or `None` when it does not exist.
    async fn get_raw(&self, collection: &str, id: &str) -> StoreResult<Option<RawDocument>>;

    /// Reads all documents in a collection matching every filter (AND).
    async fn query_raw(&self, collection: &str, filters: &[Filter])
        -> StoreResult<Vec<RawDocument>>;

    /// Atomically applies a write batch.
    async fn commit(&self, batch: WriteBatch) -> StoreResult<()>;
}

/// Serializes a domain value into a document body.
pub fn to_document_body<T: Serialize>(doc: &T) -> StoreResult<Value> {
    Ok(serde_json::to_value(doc)?)
}

// =============================================================================
// StoreHandle
// =============================================================================

/// A cloneable, typed view over a [`DocumentStore`].
///
/// ## Usage
/// ```rust,ignore
/// let handle = StoreHandle::new(Arc::new(MemoryStore::new()));
///
/// let (product, version) = handle.get_required::<Product>("p-1").await?;
/// let mut batch = WriteBatch::new();
/// batch.require_version(Product::COLLECTION, "p-1", version);
/// handle.commit(batch).await?;
/// ```
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<dyn DocumentStore>,
}

impl StoreHandle {
    pub fn new(inner: Arc<dyn DocumentStore>) -> Self {
        StoreHandle { inner }
    }

    /// Reads and deserializes a document, returning it with its version.
    pub async fn get<T>(&self, id: &str) -> StoreResult<Option<(T, u64)>>
    where
        T: Document + DeserializeOwned,
    {
        match self.inner.get_raw(T::COLLECTION, id).await? {
            None => Ok(None),
            Some(raw) => {
                let doc: T = serde_json::from_value(raw.body)?;
                Ok(Some((doc, raw.version)))
            }
        }
    }

    /// Like [`StoreHandle::get`], but a missing document is an error.
    pub async fn get_required<T>(&self, id: &str) -> StoreResult<(T, u64)>
    where
        T: Document + DeserializeOwned,
    {
        self.get(id)
            .await?
            .ok_or_else(|| StoreError::not_found(T::COLLECTION, id))
    }

    /// Queries a collection and deserializes every match.
    pub async fn find_by<T>(&self, filters: &[Filter]) -> StoreResult<Vec<(T, u64)>>
    where
        T: Document + DeserializeOwned,
    {
        let raws = self.inner.query_raw(T::COLLECTION, filters).await?;
        let mut docs = Vec::with_capacity(raws.len());
        for raw in raws {
            let doc: T = serde_json::from_value(raw.body)?;
            docs.push((doc, raw.version));
        }
        Ok(docs)
    }

    /// Passes a batch through to the underlying store.
    pub async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        self.inner.commit(batch).await
    }

    /// Raw read for callers that need to inspect bodies without a type.
    pub async fn get_raw(&self, collection: &str, id: &str) -> StoreResult<Option<RawDocument>> {
        self.inner.get_raw(collection, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{collections, fields};
    use crate::memory::MemoryStore;
    use chrono::Utc;
    use stockbook_core::{Product, ProductKind, DEFAULT_OWNER_ID};

    fn sample_product(id: &str, owner: &str) -> Product {
        Product {
            id: id.to_string(),
            owner_id: owner.to_string(),
            sku: Some("SKU-1".to_string()),
            name: "Widget".to_string(),
            kind: ProductKind::Finished,
            current_stock: 10,
            min_stock: 2,
            max_stock: 50,
            cost_price_cents: 300,
            sale_price_cents: 999,
            supplier_id: None,
            bom: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_typed_roundtrip() {
        let handle = StoreHandle::new(Arc::new(MemoryStore::new()));
        let product = sample_product("p-1", DEFAULT_OWNER_ID);

        let mut batch = WriteBatch::new();
        batch.set(
            collections::PRODUCTS,
            "p-1",
            to_document_body(&product).unwrap(),
        );
        handle.commit(batch).await.unwrap();

        let (loaded, version) = handle.get_required::<Product>("p-1").await.unwrap();
        assert_eq!(loaded.name, "Widget");
        assert_eq!(loaded.current_stock, 10);
        assert_eq!(version, 1);
    }

    #[tokio::test]
    async fn test_get_required_missing_is_not_found() {
        let handle = StoreHandle::new(Arc::new(MemoryStore::new()));

        let err = handle.get_required::<Product>("nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_find_by_owner_filter() {
        let handle = StoreHandle::new(Arc::new(MemoryStore::new()));

        let mut batch = WriteBatch::new();
        for (id, owner) in [("p-1", "owner-a"), ("p-2", "owner-a"), ("p-3", "owner-b")] {
            let product = sample_product(id, owner);
            batch.set(
                collections::PRODUCTS,
                id,
                to_document_body(&product).unwrap(),
            );
        }
        handle.commit(batch).await.unwrap();

        let found = handle
            .find_by::<Product>(&[Filter::eq(fields::OWNER_ID, "owner-a")])
            .await
            .unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].0.id, "p-1");
        assert_eq!(found[1].0.id, "p-2");
    }
}
