//! # Import Pipeline
//!
//! Stages a supplier batch file as unsold tokens in one atomic write.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  batch text ──► parse_batch ──► tier check ──► sold check ──► bulk     │
//! │                (tollgate-core)  (config)      (point reads)   write    │
//! │                     │               │              │            │       │
//! │                     ▼               ▼              ▼            ▼       │
//! │               ValidationError  NotAllowed    AlreadySold   Import error │
//! │                                                                         │
//! │  Nothing is written unless every step before the bulk write passes.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Idempotency
//! The token code is the document id, so importing the same file twice
//! leaves one document per code. Under the default `reject` policy a code
//! that has already been sold is never reset to unsold.
//!
//! The sold check and the write are two separate store calls. A token sold
//! between them is still overwritten; the store offers no conditional batch.

use std::path::Path;
use std::sync::Arc;

use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};
use ts_rs::TS;

use tollgate_core::batch::parse_batch;
use tollgate_core::validation::validate_price_tier;
use tollgate_core::{Money, PriceTier, Token, ValidationError};
use tollgate_store::{Collection, CollectionPath, DocumentWrite, RecordStore, StoreError};

use crate::config::{SoldReimport, SyncConfig};
use crate::error::{SyncError, SyncResult};

/// Outcome of a committed import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ImportReport {
    /// Distinct tokens written.
    pub staged: usize,
    /// Data rows without a code.
    pub skipped_rows: usize,
    /// Rows folded into a later row with the same code.
    pub duplicate_rows: usize,
    /// Sale price applied to every token.
    pub price: Money,
}

/// Writes batch files into the tokens collection.
pub struct ImportPipeline {
    store: Arc<dyn RecordStore>,
    config: Arc<SyncConfig>,
}

impl ImportPipeline {
    pub fn new(store: Arc<dyn RecordStore>, config: Arc<SyncConfig>) -> Self {
        ImportPipeline { store, config }
    }

    fn tokens_path(&self) -> CollectionPath {
        self.config.collection(Collection::Tokens)
    }

    /// Reads a batch file from disk and imports it.
    pub async fn import_file(&self, path: impl AsRef<Path>, tier: PriceTier) -> SyncResult<ImportReport> {
        let path = path.as_ref();
        debug!(?path, "Reading batch file");
        let text = tokio::fs::read_to_string(path).await?;
        self.import_text(&text, tier).await
    }

    /// Imports batch file contents priced at `tier`.
    ///
    /// ## Errors
    /// - `Validation` for a bad file, a disabled tier or (under `reject`)
    ///   already-sold codes; the store is not written
    /// - `Import` if a store read or the batch write fails; nothing is written
    pub async fn import_text(&self, text: &str, tier: PriceTier) -> SyncResult<ImportReport> {
        validate_price_tier(tier, &self.config.import.enabled_tiers())?;

        let batch = parse_batch(text)?;
        let skipped_rows = batch.skipped_rows;
        let duplicate_rows = batch.duplicate_rows;
        let tokens = batch.into_tokens(tier, &self.config.import.default_plan);
        let staged = tokens.len();

        debug!(staged, skipped_rows, duplicate_rows, price = %tier, "Batch parsed");

        let sold = self
            .sold_codes(&tokens)
            .await
            .map_err(|source| SyncError::Import { staged, source })?;

        if !sold.is_empty() {
            match self.config.import.sold_reimport {
                SoldReimport::Reject => {
                    warn!(count = sold.len(), "Import rejected: batch contains sold tokens");
                    return Err(ValidationError::AlreadySold { codes: sold }.into());
                }
                SoldReimport::Overwrite => {
                    for code in &sold {
                        warn!(code = %code, "Resetting sold token to unsold");
                    }
                }
            }
        }

        let writes = tokens
            .iter()
            .map(|token| {
                DocumentWrite::from_record(token)
                    .map(|write| (token.code.clone(), write.with_server_timestamp("importedAt")))
            })
            .collect::<Result<Vec<_>, StoreError>>()
            .map_err(|source| SyncError::Import { staged, source })?;

        if let Err(source) = self.store.atomic_bulk_write(&self.tokens_path(), writes).await {
            error!(staged, error = %source, "Batch write failed");
            return Err(SyncError::Import { staged, source });
        }

        info!(staged, skipped_rows, duplicate_rows, price = %tier, "Batch imported");

        Ok(ImportReport {
            staged,
            skipped_rows,
            duplicate_rows,
            price: tier.money(),
        })
    }

    /// Returns the codes among `tokens` whose stored document is sold.
    async fn sold_codes(&self, tokens: &[Token]) -> Result<Vec<String>, StoreError> {
        let path = self.tokens_path();
        let reads = tokens.iter().map(|token| {
            let path = &path;
            async move {
                let document = self.store.get(path, &token.code).await?;
                let sold = document
                    .and_then(|doc| doc.get("isSold").cloned())
                    .is_some_and(|value| value == Value::Bool(true));
                Ok::<_, StoreError>(sold.then(|| token.code.clone()))
            }
        });

        Ok(try_join_all(reads).await?.into_iter().flatten().collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_store::MemoryStore;

    const SCENARIO: &str = "Login,Plan,Price,SellerFee\n\
                            ABC123,Basic,8000,1000\n\
                            ,Basic,8000,1000\n\
                            XYZ789,Pro,9000,1500";

    fn setup(config: SyncConfig) -> (MemoryStore, ImportPipeline) {
        let memory = MemoryStore::new();
        let pipeline = ImportPipeline::new(Arc::new(memory.clone()), Arc::new(config));
        (memory, pipeline)
    }

    fn tokens_path() -> CollectionPath {
        SyncConfig::default().collection(Collection::Tokens)
    }

    #[tokio::test]
    async fn test_scenario_import() {
        let (memory, pipeline) = setup(SyncConfig::default());

        let report = pipeline.import_text(SCENARIO, PriceTier::Rp10000).await.unwrap();
        assert_eq!(report.staged, 2);
        assert_eq!(report.skipped_rows, 1);
        assert_eq!(report.price, Money::from_rupiah(10_000));

        let doc = memory.get(&tokens_path(), "XYZ789").await.unwrap().unwrap();
        assert_eq!(doc.get("price"), Some(&serde_json::json!(10_000)));
        assert_eq!(doc.get("costPrice"), Some(&serde_json::json!(9_000)));
        assert_eq!(doc.get("isSold"), Some(&Value::Bool(false)));
        assert!(doc.get("importedAt").is_some_and(Value::is_string));
    }

    #[tokio::test]
    async fn test_reimport_is_idempotent() {
        let (memory, pipeline) = setup(SyncConfig::default());
        pipeline.import_text(SCENARIO, PriceTier::Rp10000).await.unwrap();
        pipeline.import_text(SCENARIO, PriceTier::Rp10000).await.unwrap();
        assert_eq!(memory.document_count(&tokens_path()).await, 2);
    }

    #[tokio::test]
    async fn test_header_only_writes_nothing() {
        let (memory, pipeline) = setup(SyncConfig::default());
        let err = pipeline
            .import_text("Login,Price,SellerFee\n", PriceTier::Rp10000)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Validation(ValidationError::NoDataRows)));
        assert_eq!(memory.committed_writes().await, 0);
    }

    #[tokio::test]
    async fn test_disabled_tier_is_rejected() {
        let mut config = SyncConfig::default();
        config.import.price_tiers = vec![5_000];
        let (memory, pipeline) = setup(config);

        let err = pipeline.import_text(SCENARIO, PriceTier::Rp10000).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Validation(ValidationError::NotAllowed { .. })
        ));
        assert_eq!(memory.committed_writes().await, 0);
    }

    #[tokio::test]
    async fn test_sold_reimport_rejected_by_default() {
        let (memory, pipeline) = setup(SyncConfig::default());
        memory
            .write_one(
                &tokens_path(),
                "ABC123",
                DocumentWrite::new().set("code", "ABC123").set("isSold", true),
            )
            .await
            .unwrap();

        let err = pipeline.import_text(SCENARIO, PriceTier::Rp10000).await.unwrap_err();
        match err {
            SyncError::Validation(ValidationError::AlreadySold { codes }) => {
                assert_eq!(codes, vec!["ABC123".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(memory.document_count(&tokens_path()).await, 1);
    }

    #[tokio::test]
    async fn test_sold_reimport_overwrite_policy() {
        let mut config = SyncConfig::default();
        config.import.sold_reimport = SoldReimport::Overwrite;
        let (memory, pipeline) = setup(config);
        memory
            .write_one(
                &tokens_path(),
                "ABC123",
                DocumentWrite::new().set("code", "ABC123").set("isSold", true),
            )
            .await
            .unwrap();

        pipeline.import_text(SCENARIO, PriceTier::Rp10000).await.unwrap();
        let doc = memory.get(&tokens_path(), "ABC123").await.unwrap().unwrap();
        assert_eq!(doc.get("isSold"), Some(&Value::Bool(false)));
    }

    #[tokio::test]
    async fn test_store_failure_is_import_error() {
        let (memory, pipeline) = setup(SyncConfig::default());
        memory.fail_writes(true).await;

        let err = pipeline.import_text(SCENARIO, PriceTier::Rp10000).await.unwrap_err();
        assert!(matches!(err, SyncError::Import { staged: 2, .. }));
        assert!(err.is_retryable());
        assert_eq!(memory.document_count(&tokens_path()).await, 0);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let (_, pipeline) = setup(SyncConfig::default());
        let err = pipeline
            .import_file("/nonexistent/batch.csv", PriceTier::Rp10000)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Io(_)));
    }
}
