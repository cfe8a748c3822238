//! Record Storage using SQLite

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    store::{
        sort_records, IndexHint, MutationBatch, MutationKind, MutationListener, MutationNotice,
        Record, RecordKey, StoreAdapter, StoredRecord, WriteOp,
    },
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    Row,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, error};

const CREATE_RECORDS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS records (
        tbl TEXT NOT NULL,
        key TEXT NOT NULL,
        body TEXT NOT NULL,
        updated_at INTEGER NOT NULL,
        PRIMARY KEY (tbl, key)
    )
"#;

/// SQLite-backed record store implementation
///
/// Every logical table lives in one `records` table keyed by `(tbl, key)`,
/// where `key` is the JSON-encoded [`RecordKey`] and `body` the JSON record.
/// Commits run in a single SQLite transaction.
pub struct SqliteRecordStore {
    pool: SqlitePool,
    sequence: AtomicU64,
    write_lock: Mutex<()>,
    notify_lock: Mutex<()>,
    listeners: RwLock<Vec<Arc<dyn MutationListener>>>,
}

impl SqliteRecordStore {
    /// Open (or create) a store at the given database path
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(BridgeError::Io)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| BridgeError::StoreError(format!("Failed to connect to DB: {}", e)))?;

        let store = Self::with_pool(pool).await?;
        debug!(path = ?db_path, "Initialized record store");
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    ///
    /// The pool is pinned to one long-lived connection, since every SQLite
    /// in-memory connection is a separate database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| BridgeError::StoreError(format!("Failed to connect to DB: {}", e)))?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(CREATE_RECORDS_TABLE)
            .execute(&pool)
            .await
            .map_err(|e| BridgeError::StoreError(format!("Failed to create table: {}", e)))?;

        Ok(Self {
            pool,
            sequence: AtomicU64::new(0),
            write_lock: Mutex::new(()),
            notify_lock: Mutex::new(()),
            listeners: RwLock::new(Vec::new()),
        })
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn decode_body(table: &str, body: &str) -> Result<Record> {
        serde_json::from_str(body).map_err(|e| {
            error!(table = table, error = %e, "Corrupt record body");
            BridgeError::StoreError(format!("Corrupt record in {}: {}", table, e))
        })
    }

    fn listeners_snapshot(&self) -> Vec<Arc<dyn MutationListener>> {
        match self.listeners.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    async fn apply(&self, ops: Vec<WriteOp>) -> Result<Vec<MutationNotice>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| BridgeError::StoreError(format!("Failed to begin transaction: {}", e)))?;

        let mut changes = Vec::with_capacity(ops.len());
        let updated_at = Self::now();

        for op in ops {
            match op {
                WriteOp::Put { table, key, record } => {
                    let encoded = key.encode();
                    let exists = sqlx::query("SELECT 1 FROM records WHERE tbl = ? AND key = ?")
                        .bind(&table)
                        .bind(&encoded)
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(|e| BridgeError::StoreError(format!("Failed to read: {}", e)))?
                        .is_some();

                    let body = serde_json::to_string(&record).map_err(|e| {
                        BridgeError::StoreError(format!("Failed to encode record: {}", e))
                    })?;

                    sqlx::query(
                        r#"
                        INSERT INTO records (tbl, key, body, updated_at)
                        VALUES (?, ?, ?, ?)
                        ON CONFLICT(tbl, key) DO UPDATE SET
                            body = excluded.body,
                            updated_at = excluded.updated_at
                        "#,
                    )
                    .bind(&table)
                    .bind(&encoded)
                    .bind(body)
                    .bind(updated_at)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| BridgeError::StoreError(format!("Failed to write: {}", e)))?;

                    let kind = if exists {
                        MutationKind::Update
                    } else {
                        MutationKind::Insert
                    };
                    changes.push(MutationNotice { table, key, kind });
                }
                WriteOp::Delete { table, key } => {
                    let result = sqlx::query("DELETE FROM records WHERE tbl = ? AND key = ?")
                        .bind(&table)
                        .bind(key.encode())
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| BridgeError::StoreError(format!("Failed to delete: {}", e)))?;

                    if result.rows_affected() > 0 {
                        changes.push(MutationNotice {
                            table,
                            key,
                            kind: MutationKind::Delete,
                        });
                    }
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| BridgeError::StoreError(format!("Failed to commit: {}", e)))?;

        Ok(changes)
    }
}

#[async_trait]
impl StoreAdapter for SqliteRecordStore {
    async fn get(&self, table: &str, key: &RecordKey) -> Result<Option<Record>> {
        let row = sqlx::query("SELECT body FROM records WHERE tbl = ? AND key = ?")
            .bind(table)
            .bind(key.encode())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::StoreError(format!("Failed to read: {}", e)))?;

        match row {
            Some(row) => {
                let body: String = row
                    .try_get("body")
                    .map_err(|e| BridgeError::StoreError(e.to_string()))?;
                Ok(Some(Self::decode_body(table, &body)?))
            }
            None => Ok(None),
        }
    }

    async fn scan(&self, table: &str, index: IndexHint) -> Result<Vec<StoredRecord>> {
        let rows = sqlx::query("SELECT key, body FROM records WHERE tbl = ?")
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BridgeError::StoreError(format!("Failed to scan {}: {}", table, e)))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let key: String = row
                .try_get("key")
                .map_err(|e| BridgeError::StoreError(e.to_string()))?;
            let body: String = row
                .try_get("body")
                .map_err(|e| BridgeError::StoreError(e.to_string()))?;
            records.push(StoredRecord::new(
                RecordKey::decode(&key)?,
                Self::decode_body(table, &body)?,
            ));
        }

        sort_records(&mut records, &index);
        Ok(records)
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> Result<MutationBatch> {
        let write_guard = self.write_lock.lock().await;

        let changes = self.apply(ops).await?;
        let batch = MutationBatch {
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst) + 1,
            changes,
        };

        debug!(
            sequence = batch.sequence,
            changes = batch.len(),
            tables = ?batch.tables(),
            "Committed record batch"
        );

        // Hand over to the notify lock before releasing writers so listener
        // runs stay in commit order while reads proceed.
        let notify_guard = self.notify_lock.lock().await;
        drop(write_guard);

        if !batch.is_empty() {
            for listener in self.listeners_snapshot() {
                listener.on_mutation(&batch).await;
            }
        }
        drop(notify_guard);

        Ok(batch)
    }

    fn on_mutation(&self, listener: Arc<dyn MutationListener>) {
        match self.listeners.write() {
            Ok(mut guard) => guard.push(listener),
            Err(poisoned) => poisoned.into_inner().push(listener),
        }
    }
}
