//! # Live Query Registry
//!
//! Keeps subscriber result sets in step with the store.
//!
//! Each subscription pairs a [`LiveQuery`] with a delivery callback. The
//! registry indexes subscriptions by the tables their query depends on and
//! registers itself as a store [`MutationListener`]; every committed batch
//! re-evaluates exactly the subscriptions whose tables it touched.
//!
//! ## Ordering
//!
//! - One notification cycle runs to completion before the next starts.
//! - Within a cycle, affected subscriptions re-evaluate concurrently.
//! - A subscription's own deliveries never overlap and never reorder: the
//!   initial delivery and every refresh take the subscription's delivery lock.
//! - Because the store awaits listeners before `commit` returns, a caller that
//!   awaited a catalog mutation knows every dependent subscriber was refreshed.
//!
//! ## Failures
//!
//! A failed re-evaluation is delivered to the same callback as `Err(..)`. The
//! subscription stays registered and retries on the next relevant mutation.

use async_trait::async_trait;
use bridge_traits::store::{IndexHint, MutationBatch, MutationListener, StoreAdapter, StoredRecord};
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, Weak};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::error::{LibraryError, Result};
use crate::models::Song;
use crate::query::{LibraryQueryService, SongQuery};

/// What a subscription watches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveQuery {
    /// A song page query
    Songs(SongQuery),
    /// Every row of one table, in primary-key order
    Table(String),
}

impl LiveQuery {
    pub fn dependencies(&self) -> Vec<String> {
        match self {
            Self::Songs(query) => query
                .dependencies()
                .into_iter()
                .map(str::to_string)
                .collect(),
            Self::Table(table) => vec![table.clone()],
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Songs(query) => query.validate(),
            Self::Table(table) if table.trim().is_empty() => Err(LibraryError::invalid_query(
                "table",
                "Table watch requires a table name",
            )),
            Self::Table(_) => Ok(()),
        }
    }
}

/// One delivered evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveResult {
    Songs(Vec<Song>),
    Rows(Vec<StoredRecord>),
}

impl LiveResult {
    pub fn into_songs(self) -> Vec<Song> {
        match self {
            Self::Songs(songs) => songs,
            Self::Rows(_) => Vec::new(),
        }
    }

    pub fn into_rows(self) -> Vec<StoredRecord> {
        match self {
            Self::Rows(rows) => rows,
            Self::Songs(_) => Vec::new(),
        }
    }
}

pub type LiveCallback = Box<dyn Fn(Result<LiveResult>) + Send + Sync>;

/// Identifies a registered subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

struct Subscription {
    id: u64,
    query: LiveQuery,
    tables: Vec<String>,
    callback: LiveCallback,
    active: AtomicBool,
    delivery: Mutex<()>,
}

#[derive(Default)]
struct RegistryIndex {
    subscriptions: HashMap<u64, Arc<Subscription>>,
    by_table: HashMap<String, HashSet<u64>>,
}

impl RegistryIndex {
    fn insert(&mut self, subscription: Arc<Subscription>) {
        for table in &subscription.tables {
            self.by_table
                .entry(table.clone())
                .or_default()
                .insert(subscription.id);
        }
        self.subscriptions.insert(subscription.id, subscription);
    }

    fn remove(&mut self, id: u64) -> Option<Arc<Subscription>> {
        let subscription = self.subscriptions.remove(&id)?;
        for table in &subscription.tables {
            if let Some(ids) = self.by_table.get_mut(table) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.by_table.remove(table);
                }
            }
        }
        Some(subscription)
    }

    fn affected(&self, batch: &MutationBatch) -> Vec<Arc<Subscription>> {
        let ids: HashSet<u64> = batch
            .tables()
            .into_iter()
            .filter_map(|table| self.by_table.get(table))
            .flatten()
            .copied()
            .collect();
        ids.into_iter()
            .filter_map(|id| self.subscriptions.get(&id).cloned())
            .collect()
    }
}

/// Registry of live queries over one store.
pub struct LiveQueryRegistry {
    store: Arc<dyn StoreAdapter>,
    queries: LibraryQueryService,
    next_id: AtomicU64,
    index: StdMutex<RegistryIndex>,
    cycle: Mutex<()>,
}

impl LiveQueryRegistry {
    /// Create a registry and hook it into `store`'s mutation notifications.
    pub fn new(store: Arc<dyn StoreAdapter>) -> Arc<Self> {
        let registry = Arc::new(Self {
            queries: LibraryQueryService::new(store.clone()),
            store: store.clone(),
            next_id: AtomicU64::new(1),
            index: StdMutex::new(RegistryIndex::default()),
            cycle: Mutex::new(()),
        });

        store.on_mutation(Arc::new(RegistryListener {
            registry: Arc::downgrade(&registry),
        }));

        registry
    }

    /// Register `query` and deliver its first result before returning.
    pub async fn subscribe(
        &self,
        query: LiveQuery,
        callback: impl Fn(Result<LiveResult>) + Send + Sync + 'static,
    ) -> Result<SubscriptionHandle> {
        query.validate()?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let subscription = Arc::new(Subscription {
            id,
            tables: query.dependencies(),
            query,
            callback: Box::new(callback),
            active: AtomicBool::new(true),
            delivery: Mutex::new(()),
        });

        // Hold the delivery lock across registration so a concurrent refresh
        // queues behind the initial delivery.
        let delivery = subscription.delivery.lock().await;
        self.with_index(|index| index.insert(subscription.clone()));
        debug!(
            subscription = id,
            tables = ?subscription.tables,
            "Registered live query"
        );

        let result = self.evaluate(&subscription.query).await;
        (subscription.callback)(result);
        drop(delivery);

        Ok(SubscriptionHandle(id))
    }

    pub async fn subscribe_songs(
        &self,
        query: SongQuery,
        callback: impl Fn(Result<Vec<Song>>) + Send + Sync + 'static,
    ) -> Result<SubscriptionHandle> {
        self.subscribe(LiveQuery::Songs(query), move |result| {
            callback(result.map(LiveResult::into_songs))
        })
        .await
    }

    pub async fn subscribe_table(
        &self,
        table: impl Into<String>,
        callback: impl Fn(Result<Vec<StoredRecord>>) + Send + Sync + 'static,
    ) -> Result<SubscriptionHandle> {
        self.subscribe(LiveQuery::Table(table.into()), move |result| {
            callback(result.map(LiveResult::into_rows))
        })
        .await
    }

    /// Subscribe with deliveries pushed into an unbounded channel.
    ///
    /// The initial result is already queued when this returns. Dropping the
    /// receiver does not unsubscribe.
    pub async fn subscribe_channel(
        &self,
        query: LiveQuery,
    ) -> Result<(SubscriptionHandle, mpsc::UnboundedReceiver<Result<LiveResult>>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = self
            .subscribe(query, move |result| {
                let _ = tx.send(result);
            })
            .await?;
        Ok((handle, rx))
    }

    /// Stop future deliveries. Returns `false` for unknown handles.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        match self.with_index(|index| index.remove(handle.0)) {
            Some(subscription) => {
                subscription.active.store(false, Ordering::SeqCst);
                debug!(subscription = handle.0, "Removed live query");
                true
            }
            None => false,
        }
    }

    pub fn active_subscriptions(&self) -> usize {
        self.with_index(|index| index.subscriptions.len())
    }

    /// Re-evaluate every subscription affected by `batch`.
    pub async fn dispatch(&self, batch: &MutationBatch) {
        let _cycle = self.cycle.lock().await;

        let affected = self.with_index(|index| index.affected(batch));
        if affected.is_empty() {
            return;
        }

        debug!(
            sequence = batch.sequence,
            subscriptions = affected.len(),
            "Refreshing live queries"
        );

        join_all(affected.iter().map(|subscription| self.refresh(subscription))).await;
    }

    async fn refresh(&self, subscription: &Subscription) {
        let _delivery = subscription.delivery.lock().await;
        if !subscription.active.load(Ordering::SeqCst) {
            return;
        }

        let result = self.evaluate(&subscription.query).await;
        if let Err(err) = &result {
            warn!(
                subscription = subscription.id,
                error = %err,
                retryable = err.is_retryable(),
                "Live query re-evaluation failed"
            );
        }
        (subscription.callback)(result);
    }

    async fn evaluate(&self, query: &LiveQuery) -> Result<LiveResult> {
        match query {
            LiveQuery::Songs(query) => Ok(LiveResult::Songs(self.queries.query_page(query).await?)),
            LiveQuery::Table(table) => Ok(LiveResult::Rows(
                self.store.scan(table, IndexHint::PrimaryKey).await?,
            )),
        }
    }

    fn with_index<T>(&self, f: impl FnOnce(&mut RegistryIndex) -> T) -> T {
        match self.index.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

struct RegistryListener {
    registry: Weak<LiveQueryRegistry>,
}

#[async_trait]
impl MutationListener for RegistryListener {
    async fn on_mutation(&self, batch: &MutationBatch) {
        if let Some(registry) = self.registry.upgrade() {
            registry.dispatch(batch).await;
        }
    }
}
