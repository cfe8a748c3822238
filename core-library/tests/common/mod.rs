#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::store::{
    IndexHint, MutationBatch, MutationListener, Record, RecordKey, StoreAdapter, StoredRecord,
    WriteOp,
};
use bridge_traits::time::FixedClock;
use core_library::{CatalogService, LibraryQueryService, LiveQueryRegistry, MemoryStore, Song};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Store wrapper whose reads can be switched to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
}

impl FlakyStore {
    pub fn set_failing(&self, failing: bool) {
        self.fail_reads.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> BridgeResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            Err(BridgeError::StoreError("database is locked".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StoreAdapter for FlakyStore {
    async fn get(&self, table: &str, key: &RecordKey) -> BridgeResult<Option<Record>> {
        self.check()?;
        self.inner.get(table, key).await
    }

    async fn scan(&self, table: &str, index: IndexHint) -> BridgeResult<Vec<StoredRecord>> {
        self.check()?;
        self.inner.scan(table, index).await
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> BridgeResult<MutationBatch> {
        self.inner.commit(ops).await
    }

    fn on_mutation(&self, listener: Arc<dyn MutationListener>) {
        self.inner.on_mutation(listener)
    }
}

/// Records every batch a store reports.
#[derive(Default)]
pub struct BatchRecorder {
    pub batches: Mutex<Vec<MutationBatch>>,
}

#[async_trait]
impl MutationListener for BatchRecorder {
    async fn on_mutation(&self, batch: &MutationBatch) {
        self.batches.lock().unwrap().push(batch.clone());
    }
}

pub struct Library {
    pub store: Arc<dyn StoreAdapter>,
    pub queries: LibraryQueryService,
    pub catalog: CatalogService,
    pub registry: Arc<LiveQueryRegistry>,
}

impl Library {
    pub fn over(store: Arc<dyn StoreAdapter>) -> Self {
        Self {
            queries: LibraryQueryService::new(store.clone()),
            catalog: CatalogService::new(
                store.clone(),
                Arc::new(FixedClock::from_millis(1_700_000_000_000)),
            ),
            registry: LiveQueryRegistry::new(store.clone()),
            store,
        }
    }

    pub fn in_memory() -> Self {
        Self::over(Arc::new(MemoryStore::new()))
    }
}

/// Songs `{1: A}`, `{2: B}`, `{3: C}`.
pub fn abc_songs() -> Vec<Song> {
    vec![
        Song::new("1").with_title("A"),
        Song::new("2").with_title("B"),
        Song::new("3").with_title("C"),
    ]
}

pub fn ids(songs: &[Song]) -> Vec<String> {
    songs.iter().map(|song| song.id.to_string()).collect()
}
