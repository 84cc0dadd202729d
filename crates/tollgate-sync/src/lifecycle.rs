//! # Terminal Lifecycle
//!
//! Operator commands that change a single document: registering a terminal,
//! refilling or setting its paper level, and deleting a token.
//!
//! Each command validates its input first and writes one document. A store
//! failure is logged and returned as [`SyncError::Write`] naming the
//! command; nothing is retried here. The change reaches the dashboard
//! through the live queries, not through the return value.

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info};

use tollgate_core::validation::{validate_location, validate_paper_level, validate_terminal_name};
use tollgate_core::{TerminalStatus, FULL_PAPER_LEVEL};
use tollgate_store::{Collection, CollectionPath, DocumentWrite, RecordStore, StoreError};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};

/// Single-document commands against terminals and tokens.
pub struct TerminalLifecycle {
    store: Arc<dyn RecordStore>,
    config: Arc<SyncConfig>,
}

impl TerminalLifecycle {
    pub fn new(store: Arc<dyn RecordStore>, config: Arc<SyncConfig>) -> Self {
        TerminalLifecycle { store, config }
    }

    fn path(&self, collection: Collection) -> CollectionPath {
        self.config.collection(collection)
    }

    /// Registers a new terminal and returns its id.
    ///
    /// The terminal starts offline with a full roll; `createdAt` is filled
    /// in by the store.
    pub async fn register(&self, name: &str, location: &str) -> SyncResult<String> {
        let name = validate_terminal_name(name)?;
        let location = validate_location(location)?;

        let write = DocumentWrite::new()
            .set("name", name.as_str())
            .set("location", location.as_str())
            .set("paperLevel", FULL_PAPER_LEVEL)
            .set("status", TerminalStatus::Offline.to_string())
            .with_server_timestamp("createdAt");

        let id = self
            .store
            .create(&self.path(Collection::Machines), write)
            .await
            .map_err(|source| write_failed("register terminal", source))?;

        info!(id = %id, name = %name, location = %location, "Terminal registered");
        Ok(id)
    }

    /// Sets the terminal's paper level back to full.
    pub async fn refill_paper(&self, terminal_id: &str) -> SyncResult<()> {
        self.write_paper_level("refill paper", terminal_id, FULL_PAPER_LEVEL)
            .await
    }

    /// Sets the terminal's paper level to `level` (0..=100).
    pub async fn set_paper_level(&self, terminal_id: &str, level: i64) -> SyncResult<()> {
        let level = validate_paper_level(level)?;
        self.write_paper_level("set paper level", terminal_id, level)
            .await
    }

    async fn write_paper_level(
        &self,
        operation: &'static str,
        terminal_id: &str,
        level: u8,
    ) -> SyncResult<()> {
        let write = DocumentWrite::new().set("paperLevel", Value::from(level));

        self.store
            .update_one(&self.path(Collection::Machines), terminal_id, write)
            .await
            .map_err(|source| write_failed(operation, source))?;

        info!(terminal = %terminal_id, level, "Paper level updated");
        Ok(())
    }

    /// Deletes a token document. Deleting a missing token succeeds.
    pub async fn delete_token(&self, code: &str) -> SyncResult<()> {
        self.store
            .delete_one(&self.path(Collection::Tokens), code)
            .await
            .map_err(|source| write_failed("delete token", source))?;

        info!(code = %code, "Token deleted");
        Ok(())
    }
}

fn write_failed(operation: &'static str, source: StoreError) -> SyncError {
    error!(operation, error = %source, "Store write failed");
    SyncError::Write { operation, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_core::{Terminal, ValidationError};
    use tollgate_store::MemoryStore;

    fn setup() -> (MemoryStore, TerminalLifecycle) {
        let memory = MemoryStore::new();
        let lifecycle = TerminalLifecycle::new(Arc::new(memory.clone()), Arc::new(SyncConfig::default()));
        (memory, lifecycle)
    }

    async fn load(memory: &MemoryStore, id: &str) -> Terminal {
        let path = SyncConfig::default().collection(Collection::Machines);
        memory.get(&path, id).await.unwrap().unwrap().decode().unwrap()
    }

    #[tokio::test]
    async fn test_register_writes_defaults() {
        let (memory, lifecycle) = setup();
        let id = lifecycle.register("  Kiosk A ", "Lobby").await.unwrap();

        let terminal = load(&memory, &id).await;
        assert_eq!(terminal.name, "Kiosk A");
        assert_eq!(terminal.location, "Lobby");
        assert_eq!(terminal.paper_level, 100);
        assert_eq!(terminal.status, TerminalStatus::Offline);
        assert!(terminal.created_at.is_some());
    }

    #[tokio::test]
    async fn test_register_rejects_blank_name() {
        let (memory, lifecycle) = setup();
        let err = lifecycle.register("   ", "Lobby").await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Validation(ValidationError::Required { .. })
        ));
        assert_eq!(memory.committed_writes().await, 0);
    }

    #[tokio::test]
    async fn test_refill_and_set_paper_level() {
        let (memory, lifecycle) = setup();
        let id = lifecycle.register("Kiosk A", "Lobby").await.unwrap();

        lifecycle.set_paper_level(&id, 15).await.unwrap();
        assert_eq!(load(&memory, &id).await.paper_level, 15);

        lifecycle.refill_paper(&id).await.unwrap();
        lifecycle.refill_paper(&id).await.unwrap();
        let terminal = load(&memory, &id).await;
        assert_eq!(terminal.paper_level, 100);
        assert_eq!(terminal.name, "Kiosk A");
    }

    #[tokio::test]
    async fn test_paper_level_out_of_range() {
        let (_, lifecycle) = setup();
        let err = lifecycle.set_paper_level("any", 101).await.unwrap_err();
        assert!(err.is_user_correctable());
    }

    #[tokio::test]
    async fn test_refill_missing_terminal_is_write_error() {
        let (_, lifecycle) = setup();
        let err = lifecycle.refill_paper("ghost").await.unwrap_err();
        match err {
            SyncError::Write { operation, source } => {
                assert_eq!(operation, "refill paper");
                assert!(matches!(source, StoreError::NotFound { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_delete_token_is_idempotent() {
        let (memory, lifecycle) = setup();
        let path = SyncConfig::default().collection(Collection::Tokens);
        memory
            .write_one(&path, "ABC123", DocumentWrite::new().set("code", "ABC123"))
            .await
            .unwrap();

        lifecycle.delete_token("ABC123").await.unwrap();
        lifecycle.delete_token("ABC123").await.unwrap();
        assert_eq!(memory.document_count(&path).await, 0);
    }

    #[tokio::test]
    async fn test_unavailable_store_is_retryable() {
        let (memory, lifecycle) = setup();
        memory.fail_writes(true).await;
        let err = lifecycle.register("Kiosk A", "Lobby").await.unwrap_err();
        assert!(err.is_retryable());
    }
}
