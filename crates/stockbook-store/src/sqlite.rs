//! # SQLite Store Adapter
//!
//! The production [`DocumentStore`]: one `documents` table keyed by
//! (collection, id), bodies stored as JSON text, versions maintained by
//! the store itself.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      SQLite Document Store                              │
//! │                                                                         │
//! │  StoreConfig::new(path) ← Configure pool settings                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SqliteStore::connect(config).await ← Create pool + run migrations     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  documents(collection, id, body, version, updated_at)                   │
//! │       └── queries filter with json_extract on the body                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled for:
//! - Better concurrent read performance
//! - Readers don't block writers
//! - Writers don't block readers
//! - Better crash recovery

use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Row, Sqlite, SqlitePool};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::batch::{apply_patch, WriteBatch, WriteOp};
use crate::document::{Filter, RawDocument};
use crate::error::{StoreError, StoreResult};
use crate::migrations;
use crate::store::DocumentStore;

// =============================================================================
// Configuration
// =============================================================================

/// Store configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = StoreConfig::new("/path/to/stockbook.db")
///     .max_connections(5)
///     .min_connections(1);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5 (sufficient for a local single-business app)
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// How long a connection waits on a locked database before failing.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl StoreConfig {
    /// Creates a new store configuration with the given path.
    ///
    /// The database file will be created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let config = StoreConfig::in_memory();
    /// let store = SqliteStore::connect(config).await?;
    /// // Database is isolated, perfect for tests
    /// ```
    pub fn in_memory() -> Self {
        StoreConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            busy_timeout: Duration::from_secs(1),
            run_migrations: true,
        }
    }
}

// =============================================================================
// SqliteStore
// =============================================================================

/// SQLite-backed document store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    /// The SQLite connection pool.
    pool: SqlitePool,
}

impl SqliteStore {
    /// Creates a new store over a SQLite connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite for a local transactional workload:
    ///    - WAL mode for concurrent reads
    ///    - NORMAL synchronous (balance of safety/speed)
    ///    - Foreign keys enabled
    ///    - Busy timeout so writers wait instead of failing instantly
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn connect(config: StoreConfig) -> StoreResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing document store"
        );

        // sqlite://path with mode=rwc creates the file if not exists
        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Document store pool created"
        );

        let store = SqliteStore { pool };

        if config.run_migrations {
            store.run_migrations().await?;
        }

        Ok(store)
    }

    /// Runs database migrations.
    ///
    /// Automatically called by `connect()` unless disabled in the config.
    pub async fn run_migrations(&self) -> StoreResult<()> {
        info!("Running store migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    ///
    /// For diagnostics and one-off queries; normal access goes through the
    /// [`DocumentStore`] methods.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes the connection pool. Call on shutdown.
    pub async fn close(&self) {
        info!("Closing document store pool");
        self.pool.close().await;
    }

    /// Checks if the store is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Query Helpers
// =============================================================================

/// Filter fields are interpolated into json_extract paths, so they must be
/// plain identifiers. Values are always bound.
fn valid_filter_field(field: &str) -> bool {
    !field.is_empty() && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn bind_filter_value<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::String(s) => query.bind(s.clone()),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.to_string()),
        },
        Value::Bool(b) => query.bind(*b),
        other => query.bind(other.to_string()),
    }
}

fn parse_body(collection: &str, id: &str, text: &str) -> StoreResult<Value> {
    serde_json::from_str(text).map_err(|e| StoreError::corrupted(collection, id, e.to_string()))
}

fn now_text() -> String {
    chrono::Utc::now().to_rfc3339()
}

// =============================================================================
// DocumentStore Implementation
// =============================================================================

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get_raw(&self, collection: &str, id: &str) -> StoreResult<Option<RawDocument>> {
        let row = sqlx::query("SELECT body, version FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            None => Ok(None),
            Some(row) => {
                let text: String = row.get("body");
                let version: i64 = row.get("version");
                Ok(Some(RawDocument {
                    id: id.to_string(),
                    body: parse_body(collection, id, &text)?,
                    version: version as u64,
                }))
            }
        }
    }

    async fn query_raw(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> StoreResult<Vec<RawDocument>> {
        let mut sql = String::from("SELECT id, body, version FROM documents WHERE collection = ?");
        for filter in filters {
            if !valid_filter_field(&filter.field) {
                return Err(StoreError::QueryFailed(format!(
                    "invalid filter field: {:?}",
                    filter.field
                )));
            }
            sql.push_str(&format!(
                " AND json_extract(body, '$.{}') = ?",
                filter.field
            ));
        }
        sql.push_str(" ORDER BY id");

        let mut query = sqlx::query(&sql).bind(collection);
        for filter in filters {
            query = bind_filter_value(query, &filter.value);
        }

        let rows = query.fetch_all(&self.pool).await?;

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get("id");
            let text: String = row.get("body");
            let version: i64 = row.get("version");
            results.push(RawDocument {
                body: parse_body(collection, &id, &text)?,
                id,
                version: version as u64,
            });
        }
        Ok(results)
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        debug!(
            ops = batch.len(),
            guarded = batch.is_guarded(),
            "Committing write batch"
        );

        // Dropping the transaction on any error path rolls everything back.
        let mut tx = self.pool.begin().await?;

        for pre in &batch.preconditions {
            let actual: Option<i64> =
                sqlx::query_scalar("SELECT version FROM documents WHERE collection = ? AND id = ?")
                    .bind(&pre.collection)
                    .bind(&pre.id)
                    .fetch_optional(&mut *tx)
                    .await?;
            let actual = actual.unwrap_or(0) as u64;

            if actual != pre.version {
                return Err(StoreError::VersionConflict {
                    collection: pre.collection.clone(),
                    id: pre.id.clone(),
                    expected: pre.version,
                    actual,
                });
            }
        }

        for op in &batch.ops {
            match op {
                WriteOp::Set {
                    collection,
                    id,
                    body,
                } => {
                    sqlx::query(
                        "INSERT INTO documents (collection, id, body, version, updated_at) \
                         VALUES (?, ?, ?, 1, ?) \
                         ON CONFLICT(collection, id) DO UPDATE SET \
                           body = excluded.body, \
                           version = documents.version + 1, \
                           updated_at = excluded.updated_at",
                    )
                    .bind(collection)
                    .bind(id)
                    .bind(serde_json::to_string(body)?)
                    .bind(now_text())
                    .execute(&mut *tx)
                    .await?;
                }

                WriteOp::Update {
                    collection,
                    id,
                    patch,
                } => {
                    let row =
                        sqlx::query("SELECT body FROM documents WHERE collection = ? AND id = ?")
                            .bind(collection)
                            .bind(id)
                            .fetch_optional(&mut *tx)
                            .await?
                            .ok_or_else(|| StoreError::not_found(collection, id))?;

                    let text: String = row.get("body");
                    let mut body = parse_body(collection, id, &text)?;
                    apply_patch(collection, id, &mut body, patch)?;

                    sqlx::query(
                        "UPDATE documents SET body = ?, version = version + 1, updated_at = ? \
                         WHERE collection = ? AND id = ?",
                    )
                    .bind(serde_json::to_string(&body)?)
                    .bind(now_text())
                    .bind(collection)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                }

                WriteOp::Delete { collection, id } => {
                    sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
                        .bind(collection)
                        .bind(id)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::Patch;
    use serde_json::json;

    async fn store() -> SqliteStore {
        SqliteStore::connect(StoreConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_connect_in_memory() {
        let store = store().await;
        assert!(store.health_check().await);

        let (total, applied) = migrations::migration_status(store.pool()).await.unwrap();
        assert_eq!(total, applied);
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = StoreConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
    }

    #[tokio::test]
    async fn test_set_then_get_roundtrip() {
        let store = store().await;

        let mut batch = WriteBatch::new();
        batch.set("products", "p-1", json!({ "id": "p-1", "currentStock": 7 }));
        store.commit(batch).await.unwrap();

        let raw = store.get_raw("products", "p-1").await.unwrap().unwrap();
        assert_eq!(raw.version, 1);
        assert_eq!(raw.body["currentStock"], 7);

        // Replacing bumps the version.
        let mut batch = WriteBatch::new();
        batch.set("products", "p-1", json!({ "id": "p-1", "currentStock": 9 }));
        store.commit(batch).await.unwrap();

        let raw = store.get_raw("products", "p-1").await.unwrap().unwrap();
        assert_eq!(raw.version, 2);
        assert_eq!(raw.body["currentStock"], 9);
    }

    #[tokio::test]
    async fn test_update_patches_and_bumps_version() {
        let store = store().await;

        let mut batch = WriteBatch::new();
        batch.set("products", "p-1", json!({ "currentStock": 10, "name": "Widget" }));
        store.commit(batch).await.unwrap();

        let mut batch = WriteBatch::new();
        batch.update(
            "products",
            "p-1",
            Patch::new().increment("currentStock", -4).set("name", "Gadget"),
        );
        store.commit(batch).await.unwrap();

        let raw = store.get_raw("products", "p-1").await.unwrap().unwrap();
        assert_eq!(raw.body["currentStock"], 6);
        assert_eq!(raw.body["name"], "Gadget");
        assert_eq!(raw.version, 2);
    }

    #[tokio::test]
    async fn test_update_missing_rolls_back_batch() {
        let store = store().await;

        let mut batch = WriteBatch::new();
        batch.set("transactions", "t-1", json!({ "id": "t-1" }));
        batch.update("products", "ghost", Patch::new().increment("currentStock", 1));

        let err = store.commit(batch).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));

        assert!(store.get_raw("transactions", "t-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_version_precondition_conflict() {
        let store = store().await;

        let mut batch = WriteBatch::new();
        batch.set("products", "p-1", json!({ "n": 1 }));
        store.commit(batch).await.unwrap();

        let mut batch = WriteBatch::new();
        batch.set("products", "p-1", json!({ "n": 2 }));
        store.commit(batch).await.unwrap(); // now v2

        let mut batch = WriteBatch::new();
        batch.update("products", "p-1", Patch::new().increment("n", 10));
        batch.require_version("products", "p-1", 1);

        let err = store.commit(batch).await.unwrap_err();
        assert!(err.is_conflict());

        let raw = store.get_raw("products", "p-1").await.unwrap().unwrap();
        assert_eq!(raw.body["n"], 2);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = store().await;

        let mut batch = WriteBatch::new();
        batch.set("products", "p-1", json!({ "id": "p-1" }));
        store.commit(batch).await.unwrap();

        let mut batch = WriteBatch::new();
        batch.delete("products", "p-1");
        batch.delete("products", "never-existed");
        store.commit(batch).await.unwrap();

        assert!(store.get_raw("products", "p-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_query_with_json_filters() {
        let store = store().await;

        let mut batch = WriteBatch::new();
        batch.set("items", "i-2", json!({ "transactionId": "t-1", "quantity": 2 }));
        batch.set("items", "i-1", json!({ "transactionId": "t-1", "quantity": 1 }));
        batch.set("items", "i-3", json!({ "transactionId": "t-9", "quantity": 3 }));
        store.commit(batch).await.unwrap();

        let found = store
            .query_raw("items", &[Filter::eq("transactionId", "t-1")])
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, "i-1");
        assert_eq!(found[1].id, "i-2");

        // Integer-valued filters compare as integers.
        let found = store
            .query_raw(
                "items",
                &[
                    Filter::eq("transactionId", "t-1"),
                    Filter::eq("quantity", 2),
                ],
            )
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "i-2");
    }

    #[tokio::test]
    async fn test_query_rejects_bad_field_names() {
        let store = store().await;

        let err = store
            .query_raw("items", &[Filter::eq("x') OR 1=1 --", "boom")])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::QueryFailed(_)));
    }
}
