//! Record Store Abstraction
//!
//! Contract for the embedded persistent store the core reads and writes.
//! The store is table-oriented: every table maps a [`RecordKey`] to a JSON
//! [`Record`]. Implementations provide point lookups, ordered scans, atomic
//! multi-record commits and a change-notification hook.
//!
//! ## Notification Semantics
//!
//! Every successful [`StoreAdapter::commit`] produces one [`MutationBatch`].
//! Registered [`MutationListener`]s are invoked after the batch is durable and
//! *before* the commit call returns, in commit order. A caller that awaited a
//! write therefore knows that every listener has already observed it.
//!
//! Deleting a key that does not exist produces no notice, and a batch without
//! notices is not delivered to listeners at all.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_traits::store::{IndexHint, RecordKey, StoreAdapter, WriteOp};
//!
//! async fn rename(store: &dyn StoreAdapter) -> bridge_traits::error::Result<()> {
//!     let key = RecordKey::single("42");
//!     store.put("songs", key, serde_json::json!({ "id": "42", "title": "Intro" })).await?;
//!     let by_title = store.scan("songs", IndexHint::field("title")).await?;
//!     assert_eq!(by_title.len(), 1);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{BridgeError, Result};

/// A stored row. Entities are serialized to JSON objects.
pub type Record = Value;

// =============================================================================
// Keys and Index Hints
// =============================================================================

/// Primary key of a record: one part for simple ids, several for composite keys.
///
/// Keys order lexicographically by part, which is the order
/// [`IndexHint::PrimaryKey`] scans return.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(Vec<String>);

impl RecordKey {
    /// Key made of a single part.
    pub fn single(part: impl Into<String>) -> Self {
        Self(vec![part.into()])
    }

    /// Composite key, e.g. `(playlist id, song id)`.
    pub fn composite<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    /// Borrow the key parts.
    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// First key part, if any.
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Stable textual encoding used by persistent backends.
    pub fn encode(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_default()
    }

    /// Inverse of [`RecordKey::encode`].
    pub fn decode(encoded: &str) -> Result<Self> {
        serde_json::from_str::<Vec<String>>(encoded)
            .map(Self)
            .map_err(|e| BridgeError::StoreError(format!("Invalid record key {}: {}", encoded, e)))
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("+"))
    }
}

/// Ordering requested from [`StoreAdapter::scan`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum IndexHint {
    /// Ascending primary key.
    #[default]
    PrimaryKey,
    /// Ascending by a top-level record field, ties broken by primary key.
    Field(String),
}

impl IndexHint {
    /// Shorthand for [`IndexHint::Field`].
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }
}

/// Record returned from a scan, together with its key.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub key: RecordKey,
    pub record: Record,
}

impl StoredRecord {
    pub fn new(key: RecordKey, record: Record) -> Self {
        Self { key, record }
    }
}

// =============================================================================
// Mutations
// =============================================================================

/// Kind of change applied to a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Insert,
    Update,
    Delete,
}

/// One record-level change inside a [`MutationBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationNotice {
    pub table: String,
    pub key: RecordKey,
    pub kind: MutationKind,
}

/// All changes applied by one commit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MutationBatch {
    /// Monotonic per-store commit counter.
    pub sequence: u64,
    pub changes: Vec<MutationNotice>,
}

impl MutationBatch {
    /// Distinct tables touched by this batch.
    pub fn tables(&self) -> BTreeSet<&str> {
        self.changes.iter().map(|c| c.table.as_str()).collect()
    }

    /// Whether the batch changed at least one record of `table`.
    pub fn touches(&self, table: &str) -> bool {
        self.changes.iter().any(|c| c.table == table)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }
}

/// A single write inside a [`StoreAdapter::commit`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Upsert by primary key.
    Put {
        table: String,
        key: RecordKey,
        record: Record,
    },
    /// Remove by primary key. A no-op when the key is absent.
    Delete { table: String, key: RecordKey },
}

impl WriteOp {
    pub fn put(table: impl Into<String>, key: RecordKey, record: Record) -> Self {
        Self::Put {
            table: table.into(),
            key,
            record,
        }
    }

    pub fn delete(table: impl Into<String>, key: RecordKey) -> Self {
        Self::Delete {
            table: table.into(),
            key,
        }
    }

    /// Table this operation targets.
    pub fn table(&self) -> &str {
        match self {
            WriteOp::Put { table, .. } | WriteOp::Delete { table, .. } => table,
        }
    }
}

/// Observer invoked once per committed, non-empty [`MutationBatch`].
#[async_trait]
pub trait MutationListener: Send + Sync {
    async fn on_mutation(&self, batch: &MutationBatch);
}

// =============================================================================
// Store Adapter Trait
// =============================================================================

/// Table/key/record store consumed by the core library.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync`; the core shares one adapter through
/// an `Arc` between the query engine, the live-query registry and the catalog.
///
/// ## Write Ordering
///
/// Commits are serialized by the adapter. Listeners for commit N finish before
/// the listeners for commit N+1 start.
#[async_trait]
pub trait StoreAdapter: Send + Sync {
    /// Point lookup by primary key.
    async fn get(&self, table: &str, key: &RecordKey) -> Result<Option<Record>>;

    /// Ordered scan over a whole table.
    async fn scan(&self, table: &str, index: IndexHint) -> Result<Vec<StoredRecord>>;

    /// Apply every operation atomically, notify listeners, and return the batch.
    ///
    /// If any operation fails nothing is applied and no listener is invoked.
    async fn commit(&self, ops: Vec<WriteOp>) -> Result<MutationBatch>;

    /// Register a change listener for the lifetime of the adapter.
    fn on_mutation(&self, listener: Arc<dyn MutationListener>);

    /// Upsert a single record.
    async fn put(&self, table: &str, key: RecordKey, record: Record) -> Result<MutationKind> {
        let batch = self.commit(vec![WriteOp::put(table, key, record)]).await?;
        Ok(batch
            .changes
            .first()
            .map(|change| change.kind)
            .unwrap_or(MutationKind::Update))
    }

    /// Delete a single record. Returns `false` when the key was absent.
    async fn delete(&self, table: &str, key: &RecordKey) -> Result<bool> {
        let batch = self
            .commit(vec![WriteOp::delete(table, key.clone())])
            .await?;
        Ok(!batch.is_empty())
    }
}

// =============================================================================
// Ordering Helpers
// =============================================================================

/// Total order over JSON values used for index scans.
///
/// Values of different types order as null < bool < number < string < array < object.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y.iter())
            .map(|(l, r)| compare_values(l, r))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Sort scan results according to an index hint (ties by primary key).
pub fn sort_records(records: &mut [StoredRecord], index: &IndexHint) {
    match index {
        IndexHint::PrimaryKey => records.sort_by(|a, b| a.key.cmp(&b.key)),
        IndexHint::Field(field) => records.sort_by(|a, b| {
            let left = a.record.get(field).unwrap_or(&Value::Null);
            let right = b.record.get(field).unwrap_or(&Value::Null);
            compare_values(left, right).then_with(|| a.key.cmp(&b.key))
        }),
    }
}
