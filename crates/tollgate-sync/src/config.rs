//! # Sync Configuration
//!
//! Configuration management for the sync engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TOLLGATE_NAMESPACE=my-app                                          │
//! │     TOLLGATE_WINDOW_LIMIT=500                                          │
//! │     TOLLGATE_SOLD_REIMPORT=overwrite                                   │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/console/tollgate.toml (Linux)                            │
//! │     ~/Library/Application Support/id.tollgate.console/tollgate.toml    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     namespace "default-app-id", window 200, reject sold re-import      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [store]
//! namespace = "default-app-id"
//!
//! [sync]
//! window_limit = 200
//! event_capacity = 64
//!
//! [retry]
//! initial_backoff_ms = 250
//! max_backoff_secs = 10
//! max_elapsed_secs = 60
//!
//! [import]
//! price_tiers = [2000, 5000, 10000, 20000, 50000, 100000]
//! sold_reimport = "reject"   # reject | overwrite
//! default_plan = "Default Plan"
//!
//! [dashboard]
//! recent_sales = 10
//! ```

use std::path::PathBuf;
use std::time::Duration;

use backoff::ExponentialBackoff;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use tollgate_core::{PriceTier, DEFAULT_PLAN_LABEL, DEFAULT_WINDOW_LIMIT};
use tollgate_store::{Collection, CollectionPath};

use crate::error::{SyncError, SyncResult};

/// Largest accepted `window_limit`.
pub const MAX_WINDOW_LIMIT: usize = 1000;

// =============================================================================
// Sold Re-import Policy
// =============================================================================

/// What an import does when a staged code is already sold in the store.
///
/// ## Policy Comparison
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  REJECT (Default)                   │  OVERWRITE                        │
/// │  ────────────────                   │  ─────────                        │
/// │  • Point-read every staged code     │  • Point-read every staged code   │
/// │  • Any sold → AlreadySold, no write │  • Sold codes logged, then reset  │
/// │  • Sales history stays consistent   │    to unsold by the batch write   │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoldReimport {
    #[default]
    Reject,
    Overwrite,
}

impl std::fmt::Display for SoldReimport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SoldReimport::Reject => write!(f, "reject"),
            SoldReimport::Overwrite => write!(f, "overwrite"),
        }
    }
}

impl std::str::FromStr for SoldReimport {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(SoldReimport::Reject),
            "overwrite" | "clobber" => Ok(SoldReimport::Overwrite),
            other => Err(SyncError::InvalidConfig(format!(
                "Unknown sold re-import policy: '{}'. Valid options: reject, overwrite",
                other
            ))),
        }
    }
}

// =============================================================================
// Store Settings
// =============================================================================

/// Where the collections live in the remote store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Application id segment of every collection path.
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_namespace() -> String {
    "default-app-id".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            namespace: default_namespace(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Live query behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Maximum documents fetched for unsold tokens and for sales.
    #[serde(default = "default_window_limit")]
    pub window_limit: usize,

    /// Capacity of the `SyncEvent` broadcast channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_window_limit() -> usize {
    DEFAULT_WINDOW_LIMIT
}

fn default_event_capacity() -> usize {
    64
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            window_limit: default_window_limit(),
            event_capacity: default_event_capacity(),
        }
    }
}

// =============================================================================
// Retry Settings
// =============================================================================

/// Backoff bounds for re-establishing a failed live query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,

    /// Give up after this long. 0 retries forever.
    #[serde(default = "default_max_elapsed")]
    pub max_elapsed_secs: u64,
}

fn default_initial_backoff() -> u64 {
    250
}
fn default_max_backoff() -> u64 {
    10
}
fn default_max_elapsed() -> u64 {
    60
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
            max_elapsed_secs: default_max_elapsed(),
        }
    }
}

impl RetrySettings {
    /// Creates the exponential backoff configuration.
    pub fn create_backoff(&self) -> ExponentialBackoff {
        let max_elapsed_time = match self.max_elapsed_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        ExponentialBackoff {
            initial_interval: Duration::from_millis(self.initial_backoff_ms),
            max_interval: Duration::from_secs(self.max_backoff_secs),
            multiplier: 2.0,
            max_elapsed_time,
            ..Default::default()
        }
    }
}

// =============================================================================
// Import Settings
// =============================================================================

/// Batch import behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSettings {
    /// Sale prices the operator may pick, in whole Rupiah.
    #[serde(default = "default_price_tiers")]
    pub price_tiers: Vec<i64>,

    #[serde(default)]
    pub sold_reimport: SoldReimport,

    /// Plan label for rows without one.
    #[serde(default = "default_plan")]
    pub default_plan: String,
}

fn default_price_tiers() -> Vec<i64> {
    PriceTier::ALL.iter().map(PriceTier::rupiah).collect()
}

fn default_plan() -> String {
    DEFAULT_PLAN_LABEL.to_string()
}

impl Default for ImportSettings {
    fn default() -> Self {
        ImportSettings {
            price_tiers: default_price_tiers(),
            sold_reimport: SoldReimport::default(),
            default_plan: default_plan(),
        }
    }
}

impl ImportSettings {
    /// Returns the configured tiers that are known price tiers.
    ///
    /// `validate()` guarantees every configured value is known.
    pub fn enabled_tiers(&self) -> Vec<PriceTier> {
        self.price_tiers
            .iter()
            .filter_map(|&rupiah| PriceTier::try_from(rupiah).ok())
            .collect()
    }
}

// =============================================================================
// Dashboard Settings
// =============================================================================

/// Dashboard feed behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSettings {
    /// Number of sales shown in the recent sales list.
    #[serde(default = "default_recent_sales")]
    pub recent_sales: usize,
}

fn default_recent_sales() -> usize {
    10
}

impl Default for DashboardSettings {
    fn default() -> Self {
        DashboardSettings {
            recent_sales: default_recent_sales(),
        }
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub import: ImportSettings,

    #[serde(default)]
    pub dashboard: DashboardSettings,
}

impl SyncConfig {
    /// Creates a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (tollgate.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading tollgate config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| SyncError::ConfigLoadFailed(e.to_string()))?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load tollgate config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Tollgate config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.store.namespace.trim().is_empty() {
            return Err(SyncError::InvalidConfig(
                "store.namespace must not be empty".into(),
            ));
        }

        if !(1..=MAX_WINDOW_LIMIT).contains(&self.sync.window_limit) {
            return Err(SyncError::InvalidConfig(format!(
                "sync.window_limit must be between 1 and {}, got {}",
                MAX_WINDOW_LIMIT, self.sync.window_limit
            )));
        }

        if self.sync.event_capacity == 0 {
            return Err(SyncError::InvalidConfig(
                "sync.event_capacity must be greater than 0".into(),
            ));
        }

        if self.import.price_tiers.is_empty() {
            return Err(SyncError::InvalidConfig(
                "import.price_tiers must list at least one tier".into(),
            ));
        }

        if let Some(unknown) = self
            .import
            .price_tiers
            .iter()
            .find(|&&rupiah| PriceTier::try_from(rupiah).is_err())
        {
            return Err(SyncError::InvalidConfig(format!(
                "import.price_tiers contains unknown tier {}",
                unknown
            )));
        }

        if self.dashboard.recent_sales == 0 {
            return Err(SyncError::InvalidConfig(
                "dashboard.recent_sales must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(namespace) = std::env::var("TOLLGATE_NAMESPACE") {
            debug!(namespace = %namespace, "Overriding namespace from environment");
            self.store.namespace = namespace;
        }

        if let Ok(limit) = std::env::var("TOLLGATE_WINDOW_LIMIT") {
            match limit.parse::<usize>() {
                Ok(limit) => self.sync.window_limit = limit,
                Err(_) => warn!(value = %limit, "Ignoring non-numeric TOLLGATE_WINDOW_LIMIT"),
            }
        }

        if let Ok(policy) = std::env::var("TOLLGATE_SOLD_REIMPORT") {
            match policy.parse() {
                Ok(parsed) => {
                    debug!(policy = %policy, "Overriding sold re-import policy from environment");
                    self.import.sold_reimport = parsed;
                }
                Err(e) => warn!(error = %e, "Ignoring TOLLGATE_SOLD_REIMPORT"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("id", "tollgate", "console")
            .map(|dirs| dirs.config_dir().join("tollgate.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Returns the namespace.
    pub fn namespace(&self) -> &str {
        &self.store.namespace
    }

    /// Returns the path of a collection in the configured namespace.
    pub fn collection(&self, collection: Collection) -> CollectionPath {
        CollectionPath::new(self.store.namespace.clone(), collection)
    }
}
