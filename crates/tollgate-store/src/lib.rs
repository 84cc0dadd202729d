//! # tollgate-store: Record Store Seam for Tollgate
//!
//! This crate defines the capability Tollgate needs from the remote,
//! multi-writer document store, plus an in-process backend for tests.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tollgate Data Flow                               │
//! │                                                                         │
//! │  SyncStore / ImportPipeline / TerminalLifecycle (tollgate-sync)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  tollgate-store (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │  RecordStore  │    │   Document    │    │    Query     │  │   │
//! │  │   │   (trait)     │    │ DocumentWrite │    │ Collection   │  │   │
//! │  │   │               │    │               │    │ Path         │  │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           │ implemented by                                      │   │
//! │  │   ┌───────▼───────┐                                            │   │
//! │  │   │  MemoryStore  │  in-process, fault injection               │   │
//! │  │   └───────────────┘                                            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Remote document store (external collaborator)          │   │
//! │  │   artifacts/{namespace}/public/data/{machines,tokens,sales}     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`record_store`] - The `RecordStore` trait and `SnapshotStream`
//! - [`document`] - Stored documents and write payloads
//! - [`query`] - Collection paths, filters, live query snapshots
//! - [`memory`] - `MemoryStore` reference backend
//! - [`error`] - Store error types
//!
//! ## Usage
//!
//! ```rust
//! use tollgate_store::{Collection, CollectionPath, DocumentWrite, MemoryStore, RecordStore};
//!
//! # tokio_test_block_on(async {
//! let store = MemoryStore::new();
//! let machines = CollectionPath::new("default-app-id", Collection::Machines);
//!
//! let id = store
//!     .create(&machines, DocumentWrite::new().set("name", "Kios 1"))
//!     .await
//!     .unwrap();
//! assert!(store.get(&machines, &id).await.unwrap().is_some());
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod document;
pub mod error;
pub mod memory;
pub mod query;
pub mod record_store;

// =============================================================================
// Re-exports
// =============================================================================

pub use document::{Document, DocumentWrite};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use query::{Collection, CollectionPath, Filter, Query, QuerySnapshot};
pub use record_store::{RecordStore, SnapshotStream};
