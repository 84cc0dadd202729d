//! # tollgate-sync: Synchronization Engine for Tollgate
//!
//! Keeps the operator console's live view of the fleet and owns every write
//! path into the record store.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Tollgate Sync Architecture                         │
//! │                                                                         │
//! │  Session (actor id) ──watch──► SyncStore::run_session                  │
//! │                                     │                                   │
//! │                                     ▼                                   │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                           SyncStore                              │  │
//! │  │                                                                  │  │
//! │  │   terminals          unsold tokens          sales               │  │
//! │  │   (all machines)     (isSold == false,      (window, newest     │  │
//! │  │                       window, newest first)  first)             │  │
//! │  └───────────────┬──────────────────────────────────┬───────────────┘  │
//! │                  │ broadcast<SyncEvent>             │ watch<Snapshot>   │
//! │                  ▼                                  ▼                   │
//! │         ┌────────────────┐                   UI widgets                │
//! │         │ DashboardFeed  │──► watch<DashboardState>                    │
//! │         └────────────────┘                                             │
//! │                                                                         │
//! │  WRITE PATHS (straight to the RecordStore; results come back through   │
//! │  the live queries):                                                    │
//! │  ┌────────────────────────┐   ┌──────────────────────────────────────┐ │
//! │  │ ImportPipeline         │   │ TerminalLifecycle                    │ │
//! │  │ batch file → one       │   │ register / refill / set paper level  │ │
//! │  │ atomic bulk write      │   │ delete token                         │ │
//! │  └────────────────────────┘   └──────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - Engine configuration (namespace, windows, retry, import policy)
//! - [`error`] - Sync error types
//! - [`session`] - Actor identity seam
//! - [`snapshot`] - Snapshots, events and topic status
//! - [`sync_store`] - Live collections and subscription lifecycle
//! - [`import`] - Batch file import
//! - [`lifecycle`] - Terminal and token commands
//! - [`dashboard`] - Background dashboard recompute
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tollgate_sync::{ActorId, DashboardFeed, ImportPipeline, SyncConfig, SyncStore};
//!
//! let config = Arc::new(SyncConfig::load_or_default(None));
//! let sync = Arc::new(SyncStore::new(store.clone(), config.clone()));
//! sync.attach(ActorId::anonymous()).await?;
//!
//! let dashboard = DashboardFeed::spawn(sync.clone(), config.dashboard.clone());
//! ImportPipeline::new(store, config).import_file("batch.csv", PriceTier::Rp10000).await?;
//!
//! println!("{} tokens in stock", dashboard.state().aggregates.summary.available_tokens);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod session;
pub mod snapshot;
pub mod sync_store;

pub mod dashboard;
pub mod import;
pub mod lifecycle;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{
    DashboardSettings, ImportSettings, RetrySettings, SoldReimport, StoreSettings, SyncConfig,
    SyncSettings,
};
pub use dashboard::{DashboardFeed, DashboardHandle, DashboardState};
pub use error::{SyncError, SyncResult};
pub use import::{ImportPipeline, ImportReport};
pub use lifecycle::TerminalLifecycle;
pub use session::{ActorId, Session, SessionWatch};
pub use snapshot::{InventorySnapshot, Snapshot, SyncEvent, SyncHealth, Topic, TopicStatus};
pub use sync_store::{Subscription, SyncStore};
