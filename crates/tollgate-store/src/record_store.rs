//! # RecordStore Capability
//!
//! The only way Tollgate reaches the remote document store.
//!
//! ## Operations
//! ```text
//! ┌──────────────────────┬──────────────────────────────────────────────────┐
//! │ subscribe_query      │ live query; pushes full result sets until the    │
//! │                      │ stream is dropped or errors                      │
//! │ get                  │ point read                                       │
//! │ create               │ insert with a store-assigned id                  │
//! │ write_one            │ set / replace at a known id                      │
//! │ update_one           │ merge into an existing document                  │
//! │ delete_one           │ remove (absent is fine)                          │
//! │ atomic_bulk_write    │ many set-writes, all or nothing                  │
//! └──────────────────────┴──────────────────────────────────────────────────┘
//! ```
//!
//! Consistency is per document only. Writes made through this trait come
//! back through any live query that matches them.

use std::pin::Pin;

use async_trait::async_trait;
use tokio_stream::Stream;

use crate::document::{Document, DocumentWrite};
use crate::error::StoreResult;
use crate::query::{CollectionPath, Query, QuerySnapshot};

/// Push stream of a live query.
///
/// An `Err` item ends the subscription; the store sends nothing after it.
pub type SnapshotStream = Pin<Box<dyn Stream<Item = StoreResult<QuerySnapshot>> + Send>>;

/// Remote document store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Opens a live query.
    ///
    /// Fails if the store refuses to establish the query at all (for
    /// example on a permission error).
    async fn subscribe_query(&self, query: Query) -> StoreResult<SnapshotStream>;

    /// Reads one document, `None` if it does not exist.
    async fn get(&self, collection: &CollectionPath, id: &str) -> StoreResult<Option<Document>>;

    /// Inserts a document and returns the id the store assigned.
    async fn create(&self, collection: &CollectionPath, write: DocumentWrite) -> StoreResult<String>;

    /// Creates or fully replaces the document at `id`.
    async fn write_one(
        &self,
        collection: &CollectionPath,
        id: &str,
        write: DocumentWrite,
    ) -> StoreResult<()>;

    /// Merges fields into an existing document.
    ///
    /// Returns `NotFound` when the document does not exist.
    async fn update_one(
        &self,
        collection: &CollectionPath,
        id: &str,
        write: DocumentWrite,
    ) -> StoreResult<()>;

    /// Removes a document. Deleting a missing document is not an error.
    async fn delete_one(&self, collection: &CollectionPath, id: &str) -> StoreResult<()>;

    /// Applies every `(id, write)` as a set-write in one commit.
    ///
    /// Either all writes become visible or none do.
    async fn atomic_bulk_write(
        &self,
        collection: &CollectionPath,
        writes: Vec<(String, DocumentWrite)>,
    ) -> StoreResult<()>;
}
