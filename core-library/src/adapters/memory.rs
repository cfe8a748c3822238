//! In-Memory Store Adapter
//!
//! Volatile `StoreAdapter` backed by ordered maps. Used when no database path
//! is configured and throughout the test suites.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::store::{
    sort_records, IndexHint, MutationBatch, MutationKind, MutationListener, MutationNotice,
    Record, RecordKey, StoreAdapter, StoredRecord, WriteOp,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock as StdRwLock};
use tokio::sync::{Mutex, RwLock};
use tracing::trace;

type Table = BTreeMap<RecordKey, Record>;

/// Map-backed record store
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
    sequence: AtomicU64,
    write_lock: Mutex<()>,
    notify_lock: Mutex<()>,
    listeners: StdRwLock<Vec<Arc<dyn MutationListener>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored in `table`.
    pub async fn len(&self, table: &str) -> usize {
        self.tables.read().await.get(table).map_or(0, BTreeMap::len)
    }

    pub async fn is_empty(&self, table: &str) -> bool {
        self.len(table).await == 0
    }

    fn listeners_snapshot(&self) -> Vec<Arc<dyn MutationListener>> {
        match self.listeners.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl StoreAdapter for MemoryStore {
    async fn get(&self, table: &str, key: &RecordKey) -> Result<Option<Record>> {
        let tables = self.tables.read().await;
        Ok(tables.get(table).and_then(|rows| rows.get(key)).cloned())
    }

    async fn scan(&self, table: &str, index: IndexHint) -> Result<Vec<StoredRecord>> {
        let mut records: Vec<StoredRecord> = {
            let tables = self.tables.read().await;
            tables
                .get(table)
                .map(|rows| {
                    rows.iter()
                        .map(|(key, record)| StoredRecord::new(key.clone(), record.clone()))
                        .collect()
                })
                .unwrap_or_default()
        };

        sort_records(&mut records, &index);
        Ok(records)
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> Result<MutationBatch> {
        let write_guard = self.write_lock.lock().await;
        let mut tables = self.tables.write().await;

        let mut changes = Vec::with_capacity(ops.len());
        for op in ops {
            match op {
                WriteOp::Put { table, key, record } => {
                    let rows = tables.entry(table.clone()).or_default();
                    let kind = match rows.insert(key.clone(), record) {
                        Some(_) => MutationKind::Update,
                        None => MutationKind::Insert,
                    };
                    changes.push(MutationNotice { table, key, kind });
                }
                WriteOp::Delete { table, key } => {
                    let removed = tables
                        .get_mut(&table)
                        .and_then(|rows| rows.remove(&key))
                        .is_some();
                    if removed {
                        changes.push(MutationNotice {
                            table,
                            key,
                            kind: MutationKind::Delete,
                        });
                    }
                }
            }
        }

        drop(tables);

        let batch = MutationBatch {
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst) + 1,
            changes,
        };
        trace!(sequence = batch.sequence, changes = batch.len(), "Applied batch");

        // Take the notify lock before releasing writers so listener cycles
        // run in commit order.
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct Recorder {
        kinds: StdMutex<Vec<(String, MutationKind)>>,
    }

    #[async_trait]
    impl MutationListener for Recorder {
        async fn on_mutation(&self, batch: &MutationBatch) {
            let mut kinds = self.kinds.lock().unwrap();
            for change in &batch.changes {
                kinds.push((change.table.clone(), change.kind));
            }
        }
    }

    #[tokio::test]
    async fn reports_insert_update_delete() {
        let store = MemoryStore::new();
        let recorder = Arc::new(Recorder::default());
        store.on_mutation(recorder.clone());

        let key = RecordKey::single("1");
        store.put("songs", key.clone(), json!({ "title": "A" })).await.unwrap();
        store.put("songs", key.clone(), json!({ "title": "B" })).await.unwrap();
        assert!(store.delete("songs", &key).await.unwrap());
        assert!(!store.delete("songs", &key).await.unwrap());

        let kinds = recorder.kinds.lock().unwrap().clone();
        assert_eq!(
            kinds,
            vec![
                ("songs".to_string(), MutationKind::Insert),
                ("songs".to_string(), MutationKind::Update),
                ("songs".to_string(), MutationKind::Delete),
            ]
        );
    }

    #[tokio::test]
    async fn listener_can_read_during_notification() {
        struct Reader {
            store: std::sync::Weak<MemoryStore>,
            seen: StdMutex<Vec<usize>>,
        }

        #[async_trait]
        impl MutationListener for Reader {
            async fn on_mutation(&self, _batch: &MutationBatch) {
                if let Some(store) = self.store.upgrade() {
                    let rows = store.scan("songs", IndexHint::PrimaryKey).await.unwrap();
                    self.seen.lock().unwrap().push(rows.len());
                }
            }
        }

        let store = Arc::new(MemoryStore::new());
        let reader = Arc::new(Reader {
            store: Arc::downgrade(&store),
            seen: StdMutex::new(Vec::new()),
        });
        store.on_mutation(reader.clone());

        store
            .commit(vec![
                WriteOp::put("songs", RecordKey::single("1"), json!({})),
                WriteOp::put("songs", RecordKey::single("2"), json!({})),
            ])
            .await
            .unwrap();

        assert_eq!(*reader.seen.lock().unwrap(), vec![2]);
        assert_eq!(store.len("songs").await, 2);
    }

    #[tokio::test]
    async fn sequence_increases_per_commit() {
        let store = MemoryStore::new();
        let first = store.commit(vec![]).await.unwrap();
        let second = store
            .commit(vec![WriteOp::put("t", RecordKey::single("k"), json!(1))])
            .await
            .unwrap();
        assert!(second.sequence > first.sequence);
        assert!(first.is_empty());
    }
}
