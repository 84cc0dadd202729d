//! # In-Process Record Store
//!
//! [`MemoryStore`] implements [`RecordStore`] in memory. It backs the test
//! suites and the preview binary; it is not a durability layer.
//!
//! ## Behaviour
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  write / create / update / delete / bulk                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  collections[path][id] = fields (+ server timestamps)                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  for each live query on `path` ──► push full filtered window           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - Limited queries return the first `limit` matches in id order, which is
//!   *not* recency order. Callers must sort, as they would with the remote.
//! - A subscription receives its initial result set immediately.
//!
//! ## Fault Injection
//! - [`MemoryStore::deny_reads`]: queries and point reads fail with
//!   `PermissionDenied`
//! - [`MemoryStore::fail_writes`]: every write fails with `Unavailable`
//! - [`MemoryStore::break_subscriptions`]: every live query receives an
//!   `Unavailable` error and is closed

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::document::{Document, DocumentWrite};
use crate::error::{StoreError, StoreResult};
use crate::query::{CollectionPath, Query, QuerySnapshot};
use crate::record_store::{RecordStore, SnapshotStream};

/// Per-commit document limit, matching common hosted document stores.
pub const DEFAULT_MAX_BATCH: usize = 500;

type Fields = Map<String, Value>;

struct Watcher {
    query: Query,
    tx: mpsc::UnboundedSender<StoreResult<QuerySnapshot>>,
}

#[derive(Default)]
struct State {
    collections: HashMap<CollectionPath, BTreeMap<String, Fields>>,
    watchers: Vec<Watcher>,
    deny_reads: bool,
    fail_writes: bool,
    committed_writes: usize,
}

impl State {
    fn run_query(&self, query: &Query) -> QuerySnapshot {
        let Some(documents) = self.collections.get(&query.collection) else {
            return QuerySnapshot::default();
        };

        let matching = documents
            .iter()
            .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
            .filter(|doc| query.matches(doc));

        let documents = match query.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        };

        QuerySnapshot { documents }
    }

    /// Pushes fresh result sets to every live query on `path`.
    fn notify(&mut self, path: &CollectionPath) {
        let snapshots: Vec<Option<QuerySnapshot>> = self
            .watchers
            .iter()
            .map(|w| (w.query.collection == *path).then(|| self.run_query(&w.query)))
            .collect();

        let mut idx = 0;
        self.watchers.retain(|watcher| {
            let snapshot = snapshots[idx].clone();
            idx += 1;
            match snapshot {
                Some(snapshot) => watcher.tx.send(Ok(snapshot)).is_ok(),
                None => !watcher.tx.is_closed(),
            }
        });
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes {
            return Err(StoreError::Unavailable("writes are failing".to_string()));
        }
        Ok(())
    }

    fn check_readable(&self, path: &CollectionPath) -> StoreResult<()> {
        if self.deny_reads {
            return Err(StoreError::PermissionDenied(format!("read access to {path}")));
        }
        Ok(())
    }

    fn collection_mut(&mut self, path: &CollectionPath) -> &mut BTreeMap<String, Fields> {
        self.collections.entry(path.clone()).or_default()
    }
}

/// Stamps server-time fields into the payload.
fn materialize(write: DocumentWrite) -> Fields {
    let mut fields = write.fields;
    let now = Value::String(Utc::now().to_rfc3339());
    for field in write.server_timestamps {
        fields.insert(field, now.clone());
    }
    fields
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-process [`RecordStore`].
///
/// Cloning shares the same underlying data.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    max_batch: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store with the default batch limit.
    pub fn new() -> Self {
        Self::with_max_batch(DEFAULT_MAX_BATCH)
    }

    /// Creates an empty store with a custom batch limit.
    pub fn with_max_batch(max_batch: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            max_batch,
        }
    }

    /// Makes every read fail (or succeed again) with `PermissionDenied`.
    pub async fn deny_reads(&self, deny: bool) {
        self.state.lock().await.deny_reads = deny;
    }

    /// Makes every write fail (or succeed again) with `Unavailable`.
    pub async fn fail_writes(&self, fail: bool) {
        self.state.lock().await.fail_writes = fail;
    }

    /// Ends every live query with an `Unavailable` error.
    pub async fn break_subscriptions(&self) {
        let mut state = self.state.lock().await;
        let count = state.watchers.len();
        for watcher in state.watchers.drain(..) {
            let _ = watcher
                .tx
                .send(Err(StoreError::Unavailable("live query reset".to_string())));
        }
        warn!(count, "Broke all live queries");
    }

    /// Ends every live query without an error, as a store shutting down would.
    pub async fn close_subscriptions(&self) {
        let mut state = self.state.lock().await;
        let count = state.watchers.len();
        state.watchers.clear();
        warn!(count, "Closed all live queries");
    }

    /// Number of live queries whose consumer is still listening.
    pub async fn live_queries(&self) -> usize {
        let mut state = self.state.lock().await;
        state.watchers.retain(|w| !w.tx.is_closed());
        state.watchers.len()
    }

    /// Number of documents in a collection.
    pub async fn document_count(&self, path: &CollectionPath) -> usize {
        let state = self.state.lock().await;
        state.collections.get(path).map_or(0, BTreeMap::len)
    }

    /// Total documents written by successful commits since creation.
    pub async fn committed_writes(&self) -> usize {
        self.state.lock().await.committed_writes
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn subscribe_query(&self, query: Query) -> StoreResult<SnapshotStream> {
        let mut state = self.state.lock().await;
        state.check_readable(&query.collection)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let initial = state.run_query(&query);
        debug!(
            collection = %query.collection,
            documents = initial.len(),
            "Live query opened"
        );
        // Receiver is alive: it is returned below.
        let _ = tx.send(Ok(initial));
        state.watchers.push(Watcher { query, tx });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    async fn get(&self, collection: &CollectionPath, id: &str) -> StoreResult<Option<Document>> {
        let state = self.state.lock().await;
        state.check_readable(collection)?;

        Ok(state
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document::new(id, fields.clone())))
    }

    async fn create(&self, collection: &CollectionPath, write: DocumentWrite) -> StoreResult<String> {
        let mut state = self.state.lock().await;
        state.check_writable()?;

        let id = Uuid::new_v4().simple().to_string();
        state
            .collection_mut(collection)
            .insert(id.clone(), materialize(write));
        state.committed_writes += 1;
        state.notify(collection);

        Ok(id)
    }

    async fn write_one(
        &self,
        collection: &CollectionPath,
        id: &str,
        write: DocumentWrite,
    ) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.check_writable()?;

        state
            .collection_mut(collection)
            .insert(id.to_string(), materialize(write));
        state.committed_writes += 1;
        state.notify(collection);

        Ok(())
    }

    async fn update_one(
        &self,
        collection: &CollectionPath,
        id: &str,
        write: DocumentWrite,
    ) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.check_writable()?;

        let existing = state
            .collection_mut(collection)
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(collection.path(), id))?;
        existing.extend(materialize(write));

        state.committed_writes += 1;
        state.notify(collection);

        Ok(())
    }

    async fn delete_one(&self, collection: &CollectionPath, id: &str) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.check_writable()?;

        if state.collection_mut(collection).remove(id).is_some() {
            state.committed_writes += 1;
            state.notify(collection);
        }

        Ok(())
    }

    async fn atomic_bulk_write(
        &self,
        collection: &CollectionPath,
        writes: Vec<(String, DocumentWrite)>,
    ) -> StoreResult<()> {
        if writes.len() > self.max_batch {
            return Err(StoreError::BatchTooLarge {
                size: writes.len(),
                max: self.max_batch,
            });
        }

        let mut state = self.state.lock().await;
        state.check_writable()?;

        let count = writes.len();
        let documents = state.collection_mut(collection);
        for (id, write) in writes {
            documents.insert(id, materialize(write));
        }
        state.committed_writes += count;
        state.notify(collection);

        debug!(collection = %collection, count, "Batch committed");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Collection;
    use serde_json::json;
    use tokio_stream::StreamExt;

    fn tokens() -> CollectionPath {
        CollectionPath::new("test-app", Collection::Tokens)
    }

    fn token_write(sold: bool) -> DocumentWrite {
        DocumentWrite::new()
            .set("isSold", sold)
            .with_server_timestamp("importedAt")
    }

    #[tokio::test]
    async fn test_subscription_receives_initial_and_updates() {
        let store = MemoryStore::new();
        let query = Query::new(tokens()).where_eq("isSold", false);
        let mut stream = store.subscribe_query(query).await.unwrap();

        let initial = stream.next().await.unwrap().unwrap();
        assert!(initial.is_empty());

        store.write_one(&tokens(), "A", token_write(false)).await.unwrap();
        let update = stream.next().await.unwrap().unwrap();
        assert_eq!(update.len(), 1);
        assert!(update.documents[0].get("importedAt").is_some());

        // Sold token falls out of the filtered window.
        store.write_one(&tokens(), "B", token_write(true)).await.unwrap();
        let update = stream.next().await.unwrap().unwrap();
        assert_eq!(update.len(), 1);
    }

    #[tokio::test]
    async fn test_limit_window() {
        let store = MemoryStore::new();
        let writes = (0..5)
            .map(|i| (format!("T{i}"), token_write(false)))
            .collect();
        store.atomic_bulk_write(&tokens(), writes).await.unwrap();

        let mut stream = store
            .subscribe_query(Query::new(tokens()).limit(3))
            .await
            .unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_one(&tokens(), "missing", DocumentWrite::new().set("paperLevel", 100))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = MemoryStore::new();
        store
            .write_one(&tokens(), "A", DocumentWrite::new().set("plan", "Basic").set("price", 1))
            .await
            .unwrap();
        store
            .update_one(&tokens(), "A", DocumentWrite::new().set("price", 2))
            .await
            .unwrap();

        let doc = store.get(&tokens(), "A").await.unwrap().unwrap();
        assert_eq!(doc.get("plan"), Some(&json!("Basic")));
        assert_eq!(doc.get("price"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_batch_limit_and_failures_write_nothing() {
        let store = MemoryStore::with_max_batch(2);
        let writes: Vec<_> = (0..3)
            .map(|i| (format!("T{i}"), token_write(false)))
            .collect();
        let err = store.atomic_bulk_write(&tokens(), writes).await.unwrap_err();
        assert!(matches!(err, StoreError::BatchTooLarge { size: 3, max: 2 }));

        store.fail_writes(true).await;
        let err = store
            .atomic_bulk_write(&tokens(), vec![("A".into(), token_write(false))])
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        assert_eq!(store.document_count(&tokens()).await, 0);
        assert_eq!(store.committed_writes().await, 0);
    }

    #[tokio::test]
    async fn test_fault_injection_on_reads_and_streams() {
        let store = MemoryStore::new();
        let mut stream = store.subscribe_query(Query::new(tokens())).await.unwrap();
        stream.next().await.unwrap().unwrap();

        store.break_subscriptions().await;
        assert!(matches!(
            stream.next().await,
            Some(Err(StoreError::Unavailable(_)))
        ));
        assert!(stream.next().await.is_none());

        store.deny_reads(true).await;
        assert!(matches!(
            store.subscribe_query(Query::new(tokens())).await,
            Err(StoreError::PermissionDenied(_))
        ));
        assert!(store.get(&tokens(), "A").await.is_err());
    }

    #[tokio::test]
    async fn test_dropped_stream_is_pruned() {
        let store = MemoryStore::new();
        let stream = store.subscribe_query(Query::new(tokens())).await.unwrap();
        assert_eq!(store.live_queries().await, 1);
        drop(stream);
        assert_eq!(store.live_queries().await, 0);
    }
}
