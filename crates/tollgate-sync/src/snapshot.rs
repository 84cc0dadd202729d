//! # Snapshots and Events
//!
//! What the SyncStore publishes.
//!
//! ## Snapshot Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  store push #1  [A, B, C]   ──► Snapshot { items: [C, B, A], v: 1 }     │
//! │  store push #2  [A, B, C, D]──► Snapshot { items: [D, C, B, A], v: 2 }  │
//! │                                                                         │
//! │  Every push replaces the whole collection. There are no diffs; a      │
//! │  consumer that misses version 2 loses nothing by reading version 3.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ordering
//! Unsold tokens and sales are sorted newest first after every push.
//! A missing timestamp (a server write still pending) sorts last, and ties
//! break by id ascending so two pushes of the same data render identically.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use tollgate_core::{InventoryView, Sale, Terminal, Token};
use tollgate_store::{Collection, Document, StoreResult};

// =============================================================================
// Topic
// =============================================================================

/// One of the three live collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum Topic {
    Terminals,
    UnsoldTokens,
    Sales,
}

impl Topic {
    pub const ALL: [Topic; 3] = [Topic::Terminals, Topic::UnsoldTokens, Topic::Sales];

    /// Store collection backing this topic.
    pub const fn collection(&self) -> Collection {
        match self {
            Topic::Terminals => Collection::Machines,
            Topic::UnsoldTokens => Collection::Tokens,
            Topic::Sales => Collection::Sales,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Terminals => write!(f, "terminals"),
            Topic::UnsoldTokens => write!(f, "unsoldTokens"),
            Topic::Sales => write!(f, "sales"),
        }
    }
}

/// Connection state of one topic.
///
/// Lets the UI tell "no data yet" and "failed" apart from "zero records".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TopicStatus {
    /// Never subscribed, or disposed.
    #[default]
    Idle,
    /// Query requested, first snapshot not yet received.
    Connecting,
    Live,
    /// The live query ended with an error; data is stale.
    Failed { message: String },
}

impl TopicStatus {
    pub fn is_live(&self) -> bool {
        matches!(self, TopicStatus::Live)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TopicStatus::Failed { .. })
    }
}

/// Status of all three topics.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SyncHealth {
    pub terminals: TopicStatus,
    pub unsold_tokens: TopicStatus,
    pub sales: TopicStatus,
}

impl SyncHealth {
    /// True when every topic is live.
    pub fn all_live(&self) -> bool {
        self.terminals.is_live() && self.unsold_tokens.is_live() && self.sales.is_live()
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Immutable point-in-time copy of one collection.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    pub items: Arc<[T]>,
    /// Per-topic counter, starts at 1 with the first push.
    pub version: u64,
    /// Documents in the push that could not be decoded.
    pub rejected: usize,
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Snapshot {
            items: Arc::from(Vec::new()),
            version: 0,
            rejected: 0,
        }
    }
}

impl<T> Snapshot<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Event published on every change.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    Terminals(Snapshot<Terminal>),
    UnsoldTokens(Snapshot<Token>),
    Sales(Snapshot<Sale>),
    /// A topic's status changed without a new snapshot (connecting,
    /// disposed, refused, failed).
    Status { topic: Topic, status: TopicStatus },
    Failed { topic: Topic, message: String },
}

impl SyncEvent {
    pub fn topic(&self) -> Topic {
        match self {
            SyncEvent::Terminals(_) => Topic::Terminals,
            SyncEvent::UnsoldTokens(_) => Topic::UnsoldTokens,
            SyncEvent::Sales(_) => Topic::Sales,
            SyncEvent::Status { topic, .. } | SyncEvent::Failed { topic, .. } => *topic,
        }
    }
}

/// The three current snapshots, read together.
#[derive(Debug, Clone, Default)]
pub struct InventorySnapshot {
    pub terminals: Snapshot<Terminal>,
    pub unsold_tokens: Snapshot<Token>,
    pub sales: Snapshot<Sale>,
}

impl InventorySnapshot {
    /// Borrows the snapshots as an aggregation input.
    pub fn as_view(&self) -> InventoryView<'_> {
        InventoryView {
            terminals: &self.terminals.items,
            unsold_tokens: &self.unsold_tokens.items,
            sales: &self.sales.items,
        }
    }
}

// =============================================================================
// Record
// =============================================================================

/// A record type carried by one topic.
pub trait Record: Clone + Send + Sync + 'static {
    const TOPIC: Topic;

    /// Decodes one store document.
    fn from_document(document: &Document) -> StoreResult<Self>;

    /// Identifier used to break ordering ties.
    fn record_id(&self) -> &str;

    /// Timestamp that orders the topic, if it is ordered.
    fn recency(&self) -> Option<DateTime<Utc>>;

    /// Whether snapshots of this topic are sorted newest first.
    fn ordered() -> bool {
        true
    }

    fn into_event(snapshot: Snapshot<Self>) -> SyncEvent;
}

impl Record for Terminal {
    const TOPIC: Topic = Topic::Terminals;

    fn from_document(document: &Document) -> StoreResult<Self> {
        document.decode()
    }

    fn record_id(&self) -> &str {
        &self.id
    }

    fn recency(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Terminals keep the order the store delivers them in.
    fn ordered() -> bool {
        false
    }

    fn into_event(snapshot: Snapshot<Self>) -> SyncEvent {
        SyncEvent::Terminals(snapshot)
    }
}

impl Record for Token {
    const TOPIC: Topic = Topic::UnsoldTokens;

    fn from_document(document: &Document) -> StoreResult<Self> {
        let mut token: Token = document.decode()?;
        if token.code.is_empty() {
            token.code = document.id.clone();
        }
        Ok(token)
    }

    fn record_id(&self) -> &str {
        &self.code
    }

    fn recency(&self) -> Option<DateTime<Utc>> {
        self.imported_at
    }

    fn into_event(snapshot: Snapshot<Self>) -> SyncEvent {
        SyncEvent::UnsoldTokens(snapshot)
    }
}

impl Record for Sale {
    const TOPIC: Topic = Topic::Sales;

    fn from_document(document: &Document) -> StoreResult<Self> {
        document.decode()
    }

    fn record_id(&self) -> &str {
        &self.id
    }

    fn recency(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    fn into_event(snapshot: Snapshot<Self>) -> SyncEvent {
        SyncEvent::Sales(snapshot)
    }
}

/// Sorts newest first; missing timestamps last; ties by id ascending.
pub fn sort_newest_first<T: Record>(items: &mut [T]) {
    items.sort_by(|a, b| {
        let by_time = match (a.recency(), b.recency()) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_time.then_with(|| a.record_id().cmp(b.record_id()))
    });
}
