//! # Write Batches
//!
//! All mutations go through a [`WriteBatch`]: an ordered list of write
//! operations plus the version preconditions that must hold for the batch
//! to commit. A batch is atomic: every operation lands or none do.
//!
//! ## Commit Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Batch Commit                                      │
//! │                                                                         │
//! │  1. Check every precondition against current versions                  │
//! │       └── any mismatch → VersionConflict, nothing written              │
//! │  2. Apply operations in order                                          │
//! │       ├── Set     → insert or replace body, version+1 (new docs: 1)    │
//! │       ├── Update  → patch fields, version+1 (missing doc → NotFound,   │
//! │       │             whole batch aborts)                                │
//! │       └── Delete  → remove document (idempotent)                       │
//! │  3. Commit                                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Increments are applied inside the store, so two unguarded batches that
//! both bump `currentStock` never lose an update even without preconditions.

use serde_json::Value;

use crate::error::{StoreError, StoreResult};

// =============================================================================
// Field Patches
// =============================================================================

/// A single field mutation inside an Update operation.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    /// Replace the field with a value (creates it if absent).
    Set(Value),
    /// Add a signed delta to an integer field. A missing field counts as 0.
    Increment(i64),
}

/// An ordered set of field mutations applied to one document body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    pub ops: Vec<(String, FieldOp)>,
}

impl Patch {
    pub fn new() -> Self {
        Patch::default()
    }

    /// Replaces a top-level field.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push((field.into(), FieldOp::Set(value.into())));
        self
    }

    /// Adds a delta to a top-level integer field.
    pub fn increment(mut self, field: impl Into<String>, delta: i64) -> Self {
        self.ops.push((field.into(), FieldOp::Increment(delta)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Applies a patch to a document body in place.
///
/// Shared by both store adapters so patch semantics cannot drift between
/// them. Collection and id are only used for error context.
pub fn apply_patch(
    collection: &str,
    id: &str,
    body: &mut Value,
    patch: &Patch,
) -> StoreResult<()> {
    let map = body
        .as_object_mut()
        .ok_or_else(|| StoreError::corrupted(collection, id, "body is not a JSON object"))?;

    for (field, op) in &patch.ops {
        match op {
            FieldOp::Set(value) => {
                map.insert(field.clone(), value.clone());
            }
            FieldOp::Increment(delta) => {
                let base = match map.get(field) {
                    None | Some(Value::Null) => 0,
                    Some(Value::Number(n)) => n.as_i64().ok_or_else(|| {
                        StoreError::corrupted(
                            collection,
                            id,
                            format!("increment target '{field}' is not an integer"),
                        )
                    })?,
                    Some(_) => {
                        return Err(StoreError::corrupted(
                            collection,
                            id,
                            format!("increment target '{field}' is not an integer"),
                        ));
                    }
                };
                map.insert(field.clone(), Value::from(base.saturating_add(*delta)));
            }
        }
    }

    Ok(())
}

// =============================================================================
// Write Operations
// =============================================================================

/// A single document write inside a batch.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Insert or fully replace a document body.
    Set {
        collection: String,
        id: String,
        body: Value,
    },
    /// Patch fields on an existing document. Missing document fails the batch.
    Update {
        collection: String,
        id: String,
        patch: Patch,
    },
    /// Remove a document. Deleting a missing document is not an error.
    Delete { collection: String, id: String },
}

impl WriteOp {
    pub fn collection(&self) -> &str {
        match self {
            WriteOp::Set { collection, .. }
            | WriteOp::Update { collection, .. }
            | WriteOp::Delete { collection, .. } => collection,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            WriteOp::Set { id, .. } | WriteOp::Update { id, .. } | WriteOp::Delete { id, .. } => id,
        }
    }
}

/// A version the store must observe for the batch to commit.
///
/// Version 0 means "the document must not exist".
#[derive(Debug, Clone, PartialEq)]
pub struct Precondition {
    pub collection: String,
    pub id: String,
    pub version: u64,
}

// =============================================================================
// Write Batch
// =============================================================================

/// An atomic, ordered group of writes with optional version guards.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    pub ops: Vec<WriteOp>,
    pub preconditions: Vec<Precondition>,
}

impl WriteBatch {
    pub fn new() -> Self {
        WriteBatch::default()
    }

    /// Queues an insert-or-replace of a full document body.
    pub fn set(&mut self, collection: impl Into<String>, id: impl Into<String>, body: Value) {
        self.ops.push(WriteOp::Set {
            collection: collection.into(),
            id: id.into(),
            body,
        });
    }

    /// Queues a field patch against an existing document.
    pub fn update(&mut self, collection: impl Into<String>, id: impl Into<String>, patch: Patch) {
        self.ops.push(WriteOp::Update {
            collection: collection.into(),
            id: id.into(),
            patch,
        });
    }

    /// Queues a document removal.
    pub fn delete(&mut self, collection: impl Into<String>, id: impl Into<String>) {
        self.ops.push(WriteOp::Delete {
            collection: collection.into(),
            id: id.into(),
        });
    }

    /// Requires the document to still be at `version` when the batch commits.
    pub fn require_version(
        &mut self,
        collection: impl Into<String>,
        id: impl Into<String>,
        version: u64,
    ) {
        self.preconditions.push(Precondition {
            collection: collection.into(),
            id: id.into(),
            version,
        });
    }

    /// True when the batch carries version preconditions.
    pub fn is_guarded(&self) -> bool {
        !self.preconditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_patch_set_and_increment() {
        let mut body = json!({ "name": "Widget", "currentStock": 10 });
        let patch = Patch::new()
            .set("name", "Gadget")
            .increment("currentStock", -3);

        apply_patch("products", "p-1", &mut body, &patch).unwrap();

        assert_eq!(body["name"], "Gadget");
        assert_eq!(body["currentStock"], 7);
    }

    #[test]
    fn test_increment_missing_field_starts_at_zero() {
        let mut body = json!({ "name": "Widget" });
        let patch = Patch::new().increment("currentStock", 5);

        apply_patch("products", "p-1", &mut body, &patch).unwrap();

        assert_eq!(body["currentStock"], 5);
    }

    #[test]
    fn test_increment_null_field_starts_at_zero() {
        let mut body = json!({ "currentStock": null });
        let patch = Patch::new().increment("currentStock", -2);

        apply_patch("products", "p-1", &mut body, &patch).unwrap();

        assert_eq!(body["currentStock"], -2);
    }

    #[test]
    fn test_increment_non_integer_field_is_corrupted() {
        let mut body = json!({ "currentStock": "lots" });
        let patch = Patch::new().increment("currentStock", 1);

        let err = apply_patch("products", "p-1", &mut body, &patch).unwrap_err();
        assert!(matches!(err, StoreError::Corrupted { .. }));
    }

    #[test]
    fn test_patch_rejects_non_object_body() {
        let mut body = json!([1, 2, 3]);
        let patch = Patch::new().set("name", "x");

        let err = apply_patch("products", "p-1", &mut body, &patch).unwrap_err();
        assert!(matches!(err, StoreError::Corrupted { .. }));
    }

    #[test]
    fn test_patch_ops_apply_in_order() {
        let mut body = json!({});
        let patch = Patch::new()
            .set("n", 10)
            .increment("n", 5)
            .set("n", 1)
            .increment("n", 1);

        apply_patch("t", "x", &mut body, &patch).unwrap();
        assert_eq!(body["n"], 2);
    }

    #[test]
    fn test_batch_builder() {
        let mut batch = WriteBatch::new();
        assert!(batch.is_empty());
        assert!(!batch.is_guarded());

        batch.set("transactions", "t-1", json!({ "id": "t-1" }));
        batch.update("products", "p-1", Patch::new().increment("currentStock", -1));
        batch.delete("products", "p-2");
        batch.require_version("products", "p-1", 4);

        assert_eq!(batch.len(), 3);
        assert!(batch.is_guarded());
        assert_eq!(batch.ops[0].collection(), "transactions");
        assert_eq!(batch.ops[1].id(), "p-1");
        assert_eq!(
            batch.preconditions[0],
            Precondition {
                collection: "products".to_string(),
                id: "p-1".to_string(),
                version: 4,
            }
        );
    }
}
