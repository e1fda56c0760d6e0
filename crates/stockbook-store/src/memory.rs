//! # In-Memory Store
//!
//! A [`DocumentStore`] backed by a `HashMap` behind an async `RwLock`.
//! Used by unit tests and the engine's concurrency tests; semantics match
//! the SQLite adapter exactly (same patch helper, same version rules).

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::batch::{apply_patch, WriteBatch, WriteOp};
use crate::document::{Filter, RawDocument};
use crate::error::{StoreError, StoreResult};
use crate::store::DocumentStore;

type Key = (String, String);

/// In-memory versioned document store.
#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<HashMap<Key, (Value, u64)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Number of documents currently stored, across all collections.
    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }
}

fn key(collection: &str, id: &str) -> Key {
    (collection.to_string(), id.to_string())
}

fn matches(body: &Value, filters: &[Filter]) -> bool {
    filters
        .iter()
        .all(|f| body.get(&f.field) == Some(&f.value))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_raw(&self, collection: &str, id: &str) -> StoreResult<Option<RawDocument>> {
        let docs = self.docs.read().await;
        Ok(docs.get(&key(collection, id)).map(|(body, version)| {
            RawDocument {
                id: id.to_string(),
                body: body.clone(),
                version: *version,
            }
        }))
    }

    async fn query_raw(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> StoreResult<Vec<RawDocument>> {
        let docs = self.docs.read().await;
        let mut results: Vec<RawDocument> = docs
            .iter()
            .filter(|((c, _), (body, _))| c == collection && matches(body, filters))
            .map(|((_, id), (body, version))| RawDocument {
                id: id.clone(),
                body: body.clone(),
                version: *version,
            })
            .collect();

        results.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(results)
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut docs = self.docs.write().await;

        // Guards first: a failed precondition writes nothing.
        for pre in &batch.preconditions {
            let actual = docs
                .get(&key(&pre.collection, &pre.id))
                .map(|(_, v)| *v)
                .unwrap_or(0);
            if actual != pre.version {
                return Err(StoreError::VersionConflict {
                    collection: pre.collection.clone(),
                    id: pre.id.clone(),
                    expected: pre.version,
                    actual,
                });
            }
        }

        // Stage into an overlay so a failing op mid-batch leaves the map
        // untouched. Later ops in the batch see earlier ops' effects.
        let mut staged: HashMap<Key, Option<(Value, u64)>> = HashMap::new();

        for op in &batch.ops {
            let k = key(op.collection(), op.id());
            let current: Option<(Value, u64)> = match staged.get(&k) {
                Some(entry) => entry.clone(),
                None => docs.get(&k).cloned(),
            };

            match op {
                WriteOp::Set { body, .. } => {
                    let next = current.map(|(_, v)| v + 1).unwrap_or(1);
                    staged.insert(k, Some((body.clone(), next)));
                }
                WriteOp::Update {
                    collection,
                    id,
                    patch,
                } => {
                    let (mut body, version) =
                        current.ok_or_else(|| StoreError::not_found(collection, id))?;
                    apply_patch(collection, id, &mut body, patch)?;
                    staged.insert(k, Some((body, version + 1)));
                }
                WriteOp::Delete { .. } => {
                    staged.insert(k, None);
                }
            }
        }

        for (k, entry) in staged {
            match entry {
                Some(doc) => {
                    docs.insert(k, doc);
                }
                None => {
                    docs.remove(&k);
                }
            }
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
