//! # Session
//!
//! The identity collaborator's seam. Signing in happens elsewhere; all the
//! engine needs is an opaque actor id, and to know when it changes.
//!
//! ```text
//!   identity provider ──► Session::sign_in(actor) ──► watch<Option<ActorId>>
//!                                                          │
//!                                   SyncStore::run_session ◄┘
//!                                   Some(a) → attach(a)
//!                                   None    → detach()
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;

/// Opaque identifier of the signed-in actor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        ActorId(id.into())
    }

    /// A fresh id for an anonymous sign-in.
    pub fn anonymous() -> Self {
        ActorId(format!("anon-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Receiving side handed to the engine.
pub type SessionWatch = watch::Receiver<Option<ActorId>>;

/// Sending side owned by the identity collaborator.
#[derive(Debug)]
pub struct Session {
    tx: watch::Sender<Option<ActorId>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Starts signed out.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Session { tx }
    }

    /// Returns a receiver for the engine.
    pub fn watch(&self) -> SessionWatch {
        self.tx.subscribe()
    }

    /// Publishes a signed-in actor.
    pub fn sign_in(&self, actor: ActorId) {
        info!(actor = %actor, "Session signed in");
        self.tx.send_replace(Some(actor));
    }

    /// Publishes sign-out.
    pub fn sign_out(&self) {
        info!("Session signed out");
        self.tx.send_replace(None);
    }

    /// Returns the current actor, if any.
    pub fn current(&self) -> Option<ActorId> {
        self.tx.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_in_is_observed() {
        let session = Session::new();
        let mut watch = session.watch();
        assert!(watch.borrow().is_none());

        session.sign_in(ActorId::new("operator-1"));
        watch.changed().await.unwrap();
        assert_eq!(watch.borrow().as_ref().map(ActorId::as_str), Some("operator-1"));

        session.sign_out();
        watch.changed().await.unwrap();
        assert!(session.current().is_none());
    }

    #[test]
    fn test_anonymous_ids_are_distinct() {
        assert_ne!(ActorId::anonymous(), ActorId::anonymous());
    }
}
