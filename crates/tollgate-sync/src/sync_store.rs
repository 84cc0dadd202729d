//! # SyncStore
//!
//! Keeps three live, ordered, local collections fed by the record store.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           SyncStore                                     │
//! │                                                                         │
//! │   RecordStore::subscribe_query ──► SnapshotStream                       │
//! │                                        │                                │
//! │                                        ▼                                │
//! │                          ┌──────────────────────────┐                  │
//! │                          │ pump task (one per topic)│                  │
//! │                          │ decode → sort → publish  │                  │
//! │                          └────────────┬─────────────┘                  │
//! │                                       │  under the topic gate:         │
//! │                                       │  generation still active?      │
//! │                                       ▼                                │
//! │        watch<Snapshot<T>> ◄───── yes ─┴─► broadcast<SyncEvent>         │
//! │             │                                   │                      │
//! │             ▼                                   ▼                      │
//! │       terminals() / sales()            DashboardFeed, UI               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Disposal
//! Each subscription gets a generation number. Publishing and disposing
//! both take the topic's gate lock, and a publish only goes through while its
//! generation is the active one. Once [`Subscription::dispose`] returns, no
//! snapshot from that query, however late, can reach the collection.
//!
//! ## Session
//! Subscriptions need an attached actor. Attaching a different actor tears
//! down every subscription and opens fresh ones; detaching tears them down
//! and keeps the last snapshots for display.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, watch, Mutex};
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use tollgate_core::{Sale, Terminal, Token};
use tollgate_store::{Query, QuerySnapshot, RecordStore, SnapshotStream, StoreError};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::session::{ActorId, SessionWatch};
use crate::snapshot::{
    sort_newest_first, InventorySnapshot, Record, Snapshot, SyncEvent, SyncHealth, Topic,
    TopicStatus,
};

// =============================================================================
// Topic Control
// =============================================================================

#[derive(Debug, Default)]
struct Gate {
    active: Option<u64>,
    next_generation: u64,
}

/// Per-topic state shared by the store, its pump and its subscriptions.
#[derive(Debug)]
struct TopicControl {
    topic: Topic,
    gate: Mutex<Gate>,
    status: watch::Sender<TopicStatus>,
    events: broadcast::Sender<SyncEvent>,
}

impl TopicControl {
    fn new(topic: Topic, events: broadcast::Sender<SyncEvent>) -> Self {
        let (status, _) = watch::channel(TopicStatus::Idle);
        TopicControl {
            topic,
            gate: Mutex::new(Gate::default()),
            status,
            events,
        }
    }

    /// Records a status change and announces it. Repeating the current
    /// status is silent.
    fn set_status(&self, status: TopicStatus) {
        let changed = self.status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status.clone();
            true
        });

        if changed {
            let _ = self.events.send(SyncEvent::Status {
                topic: self.topic,
                status,
            });
        }
    }
}

struct TopicState<T> {
    control: Arc<TopicControl>,
    snapshot: watch::Sender<Snapshot<T>>,
}

impl<T: Record> TopicState<T> {
    fn new(events: &broadcast::Sender<SyncEvent>) -> Arc<Self> {
        let (snapshot, _) = watch::channel(Snapshot::default());
        Arc::new(TopicState {
            control: Arc::new(TopicControl::new(T::TOPIC, events.clone())),
            snapshot,
        })
    }

    /// Decodes, orders and publishes one push. Returns false once the
    /// generation is no longer active.
    async fn publish(
        &self,
        generation: u64,
        pushed: QuerySnapshot,
        events: &broadcast::Sender<SyncEvent>,
    ) -> bool {
        let topic = T::TOPIC;
        let mut rejected = 0;
        let mut items: Vec<T> = Vec::with_capacity(pushed.len());

        for document in &pushed.documents {
            match T::from_document(document) {
                Ok(record) => items.push(record),
                Err(e) => {
                    rejected += 1;
                    warn!(topic = %topic, id = %document.id, error = %e, "Skipping undecodable document");
                }
            }
        }

        if T::ordered() {
            sort_newest_first(&mut items);
        }

        let gate = self.control.gate.lock().await;
        if gate.active != Some(generation) {
            debug!(topic = %topic, generation, "Dropping snapshot from disposed query");
            return false;
        }

        let snapshot = Snapshot {
            items: Arc::from(items),
            version: self.snapshot.borrow().version + 1,
            rejected,
        };
        debug!(
            topic = %topic,
            version = snapshot.version,
            count = snapshot.len(),
            rejected,
            "Snapshot published"
        );

        self.snapshot.send_replace(snapshot.clone());
        let was_live = self.control.status.borrow().is_live();
        if !was_live {
            info!(topic = %topic, "Topic live");
            self.control.set_status(TopicStatus::Live);
        }
        // No receivers is fine.
        let _ = events.send(T::into_event(snapshot));

        drop(gate);
        true
    }

    /// Marks the topic failed if `generation` is still active.
    async fn fail(&self, generation: u64, message: String, events: &broadcast::Sender<SyncEvent>) {
        let topic = T::TOPIC;
        let mut gate = self.control.gate.lock().await;
        if gate.active != Some(generation) {
            return;
        }
        gate.active = None;

        error!(topic = %topic, error = %message, "Live query failed; keeping last snapshot");
        self.control.set_status(TopicStatus::Failed {
            message: message.clone(),
        });
        let _ = events.send(SyncEvent::Failed { topic, message });
    }
}

async fn pump<T: Record>(
    state: Arc<TopicState<T>>,
    mut stream: SnapshotStream,
    generation: u64,
    cancel: CancellationToken,
    events: broadcast::Sender<SyncEvent>,
) {
    loop {
        let item = tokio::select! {
            _ = cancel.cancelled() => break,
            item = stream.next() => item,
        };

        match item {
            Some(Ok(pushed)) => {
                if !state.publish(generation, pushed, &events).await {
                    break;
                }
            }
            Some(Err(e)) => {
                state.fail(generation, e.to_string(), &events).await;
                break;
            }
            None => {
                state
                    .fail(generation, StoreError::Closed.to_string(), &events)
                    .await;
                break;
            }
        }
    }

    debug!(topic = %T::TOPIC, generation, "Pump stopped");
}

// =============================================================================
// Subscription
// =============================================================================

/// Disposer for one live query.
///
/// Clones share the same query. Dropping a handle does not end the query;
/// call [`Subscription::dispose`].
#[derive(Debug, Clone)]
pub struct Subscription {
    control: Arc<TopicControl>,
    generation: u64,
    cancel: CancellationToken,
}

impl Subscription {
    pub fn topic(&self) -> Topic {
        self.control.topic
    }

    /// Ends the query. Safe to call any number of times.
    ///
    /// After this returns, no snapshot from this query changes the
    /// collection.
    pub async fn dispose(&self) {
        let mut gate = self.control.gate.lock().await;
        if gate.active == Some(self.generation) {
            gate.active = None;
            self.control.set_status(TopicStatus::Idle);
            info!(topic = %self.control.topic, generation = self.generation, "Subscription disposed");
        }
        drop(gate);
        self.cancel.cancel();
    }

    /// Returns true while this query is the topic's active one.
    pub async fn is_active(&self) -> bool {
        !self.cancel.is_cancelled() && self.control.gate.lock().await.active == Some(self.generation)
    }
}

// =============================================================================
// Sync Store
// =============================================================================

#[derive(Default)]
struct SessionState {
    actor: Option<ActorId>,
    live: HashMap<Topic, Subscription>,
}

/// Live local view of terminals, unsold tokens and sales.
///
/// ## Usage
/// ```rust,ignore
/// let sync = Arc::new(SyncStore::new(store, config));
/// sync.attach(ActorId::anonymous()).await?;
///
/// let mut tokens = sync.watch_unsold_tokens();
/// tokens.changed().await?;
/// println!("{} tokens in stock", tokens.borrow().len());
/// ```
pub struct SyncStore {
    store: Arc<dyn RecordStore>,
    config: Arc<SyncConfig>,
    terminals: Arc<TopicState<Terminal>>,
    unsold_tokens: Arc<TopicState<Token>>,
    sales: Arc<TopicState<Sale>>,
    events: broadcast::Sender<SyncEvent>,
    session: Mutex<SessionState>,
}

impl SyncStore {
    /// Creates a store with no actor attached and every topic idle.
    pub fn new(store: Arc<dyn RecordStore>, config: Arc<SyncConfig>) -> Self {
        let (events, _) = broadcast::channel(config.sync.event_capacity.max(1));

        SyncStore {
            store,
            config,
            terminals: TopicState::new(&events),
            unsold_tokens: TopicState::new(&events),
            sales: TopicState::new(&events),
            events,
            session: Mutex::new(SessionState::default()),
        }
    }

    /// Returns the record store handle (shared with the write paths).
    pub fn record_store(&self) -> Arc<dyn RecordStore> {
        Arc::clone(&self.store)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Arc<SyncConfig> {
        &self.config
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Attaches an actor and subscribes every topic.
    ///
    /// A different actor than the current one disposes all subscriptions
    /// first. Re-attaching the same actor does nothing.
    ///
    /// ## Errors
    /// Every topic is attempted; the first subscription failure is returned.
    pub async fn attach(&self, actor: ActorId) -> SyncResult<()> {
        let mut session = self.session.lock().await;

        if session.actor.as_ref() == Some(&actor) {
            debug!(actor = %actor, "Actor already attached");
            return Ok(());
        }

        if let Some(previous) = session.actor.take() {
            info!(previous = %previous, actor = %actor, "Session changed; resubscribing");
            Self::dispose_all(&mut session).await;
        } else {
            info!(actor = %actor, "Session attached");
        }
        session.actor = Some(actor);

        let mut first_error = None;
        for topic in Topic::ALL {
            if let Err(e) = self.subscribe_locked(&mut session, topic).await {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Disposes every subscription and clears the actor.
    ///
    /// Every topic returns to `Idle`, including failed ones. Snapshots keep
    /// their last value.
    pub async fn detach(&self) {
        let mut session = self.session.lock().await;
        Self::dispose_all(&mut session).await;
        for control in self.controls() {
            control.set_status(TopicStatus::Idle);
        }
        if let Some(actor) = session.actor.take() {
            info!(actor = %actor, "Session detached");
        }
    }

    /// Follows the identity collaborator until its watch closes.
    pub async fn run_session(&self, mut session: SessionWatch) {
        loop {
            let actor = session.borrow_and_update().clone();
            match actor {
                Some(actor) => {
                    if let Err(e) = self.attach(actor).await {
                        warn!(error = %e, "Attach completed with errors");
                    }
                }
                None => self.detach().await,
            }

            if session.changed().await.is_err() {
                break;
            }
        }

        info!("Session watch closed");
        self.detach().await;
    }

    /// Returns the attached actor.
    pub async fn actor(&self) -> Option<ActorId> {
        self.session.lock().await.actor.clone()
    }

    fn controls(&self) -> [&TopicControl; 3] {
        [
            self.terminals.control.as_ref(),
            self.unsold_tokens.control.as_ref(),
            self.sales.control.as_ref(),
        ]
    }

        async fn dispose_all(session: &mut SessionState) {
        for (_, subscription) in session.live.drain() {
            subscription.dispose().await;
        }
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Opens the live query for `topic`.
    ///
    /// Returns the existing handle if the topic is already live.
    ///
    /// ## Errors
    /// - `SessionNotReady` before an actor is attached
    /// - `Subscription` if the store refuses the query
    pub async fn subscribe(&self, topic: Topic) -> SyncResult<Subscription> {
        let mut session = self.session.lock().await;
        self.subscribe_locked(&mut session, topic).await
    }

    /// Disposes `topic` and subscribes again, backing off on transient
    /// store failures.
    pub async fn retry(&self, topic: Topic) -> SyncResult<Subscription> {
        {
            let mut session = self.session.lock().await;
            if session.actor.is_none() {
                return Err(SyncError::SessionNotReady);
            }
            if let Some(existing) = session.live.remove(&topic) {
                existing.dispose().await;
            }
        }

        info!(topic = %topic, "Retrying subscription");
        let this = self;
        backoff::future::retry(self.config.retry.create_backoff(), move || async move {
            this.subscribe(topic).await.map_err(|e| {
                if e.is_retryable() {
                    debug!(topic = %topic, error = %e, "Subscription attempt failed; backing off");
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        })
        .await
    }

    async fn subscribe_locked(
        &self,
        session: &mut SessionState,
        topic: Topic,
    ) -> SyncResult<Subscription> {
        if session.actor.is_none() {
            return Err(SyncError::SessionNotReady);
        }

        if let Some(existing) = session.live.get(&topic) {
            if existing.is_active().await {
                return Ok(existing.clone());
            }
        }

        let query = self.query_for(topic);
        let subscription = match topic {
            Topic::Terminals => self.open(&self.terminals, query).await?,
            Topic::UnsoldTokens => self.open(&self.unsold_tokens, query).await?,
            Topic::Sales => self.open(&self.sales, query).await?,
        };

        session.live.insert(topic, subscription.clone());
        Ok(subscription)
    }

    async fn open<T: Record>(
        &self,
        state: &Arc<TopicState<T>>,
        query: Query,
    ) -> SyncResult<Subscription> {
        let topic = T::TOPIC;
        let control = &state.control;
        control.set_status(TopicStatus::Connecting);

        let stream = match self.store.subscribe_query(query).await {
            Ok(stream) => stream,
            Err(source) => {
                error!(topic = %topic, error = %source, "Store refused live query");
                control.set_status(TopicStatus::Failed {
                    message: source.to_string(),
                });
                return Err(SyncError::Subscription { topic, source });
            }
        };

        let generation = {
            let mut gate = control.gate.lock().await;
            gate.next_generation += 1;
            gate.active = Some(gate.next_generation);
            gate.next_generation
        };

        let cancel = CancellationToken::new();
        tokio::spawn(pump(
            Arc::clone(state),
            stream,
            generation,
            cancel.clone(),
            self.events.clone(),
        ));

        info!(topic = %topic, generation, "Subscribed");
        Ok(Subscription {
            control: Arc::clone(control),
            generation,
            cancel,
        })
    }

    fn query_for(&self, topic: Topic) -> Query {
        let query = Query::new(self.config.collection(topic.collection()));
        let window = self.config.sync.window_limit;

        match topic {
            Topic::Terminals => query,
            Topic::UnsoldTokens => query.where_eq("isSold", false).limit(window),
            Topic::Sales => query.limit(window),
        }
    }

    // =========================================================================
    // Readers
    // =========================================================================

    pub fn terminals(&self) -> Snapshot<Terminal> {
        self.terminals.snapshot.borrow().clone()
    }

    pub fn unsold_tokens(&self) -> Snapshot<Token> {
        self.unsold_tokens.snapshot.borrow().clone()
    }

    pub fn sales(&self) -> Snapshot<Sale> {
        self.sales.snapshot.borrow().clone()
    }

    pub fn watch_terminals(&self) -> watch::Receiver<Snapshot<Terminal>> {
        self.terminals.snapshot.subscribe()
    }

    pub fn watch_unsold_tokens(&self) -> watch::Receiver<Snapshot<Token>> {
        self.unsold_tokens.snapshot.subscribe()
    }

    pub fn watch_sales(&self) -> watch::Receiver<Snapshot<Sale>> {
        self.sales.snapshot.subscribe()
    }

    /// Subscribes to change and failure events.
    pub fn events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub fn status(&self, topic: Topic) -> TopicStatus {
        let status = match topic {
            Topic::Terminals => &self.terminals.control.status,
            Topic::UnsoldTokens => &self.unsold_tokens.control.status,
            Topic::Sales => &self.sales.control.status,
        };
        status.borrow().clone()
    }

    pub fn health(&self) -> SyncHealth {
        SyncHealth {
            terminals: self.status(Topic::Terminals),
            unsold_tokens: self.status(Topic::UnsoldTokens),
            sales: self.status(Topic::Sales),
        }
    }

    /// Reads all three snapshots.
    pub fn view(&self) -> InventorySnapshot {
        InventorySnapshot {
            terminals: self.terminals(),
            unsold_tokens: self.unsold_tokens(),
            sales: self.sales(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
