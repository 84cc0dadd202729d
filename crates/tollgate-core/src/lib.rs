//! # tollgate-core: Pure Domain Logic for Tollgate
//!
//! This crate holds the parts of the operator console that can be expressed
//! as pure functions: the record types, money, batch file parsing, and the
//! dashboard aggregates. Nothing in here touches the document store.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tollgate Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Operator UI (external collaborator)             │   │
//! │  │    Dashboard ──► Terminals ──► Tokens ──► Import                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 tollgate-sync (SyncStore, pipelines)            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tollgate-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   batch   │  │ aggregate │  │   money   │  │   │
//! │  │   │ Terminal  │  │ CSV rows  │  │ Dashboard │  │  Rupiah   │  │   │
//! │  │   │ Token     │  │ columns   │  │ per-term. │  │  format   │  │   │
//! │  │   │ Sale      │  │           │  │ tallies   │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO STORE • NO NETWORK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Terminal, Token, Sale and their enums
//! - [`money`] - Whole-Rupiah amounts with Indonesian formatting
//! - [`batch`] - Batch file parsing into token rows
//! - [`aggregate`] - Dashboard and per-terminal summaries
//! - [`validation`] - Input validation for operator-entered values
//! - [`error`] - Validation error types
//!
//! ## Example Usage
//!
//! ```rust
//! use tollgate_core::batch::parse_batch;
//! use tollgate_core::PriceTier;
//!
//! let batch = parse_batch("Login,Price,SellerFee\nABC123,8000,1000").unwrap();
//! let tokens = batch.into_tokens(PriceTier::Rp10000, "Default Plan");
//!
//! assert_eq!(tokens.len(), 1);
//! assert_eq!(tokens[0].price, 10_000);
//! assert!(!tokens[0].is_sold);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregate;
pub mod batch;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use aggregate::{
    Aggregates, Aggregator, DashboardSummary, FullRecompute, InventoryView, RecentSale,
    TerminalSales,
};
pub use error::{ValidationError, ValidationResult};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Paper level of a freshly registered or refilled terminal.
pub const FULL_PAPER_LEVEL: u8 = 100;

/// Terminals strictly below this paper level count as low stock.
///
/// The dashboard counter and the `Critical` paper band share this threshold.
pub const LOW_PAPER_THRESHOLD: u8 = 20;

/// Terminals strictly below this level (and at or above
/// [`LOW_PAPER_THRESHOLD`]) are shown as `Low`.
pub const WARN_PAPER_THRESHOLD: u8 = 50;

/// Number of most recent documents fetched for tokens and sales.
pub const DEFAULT_WINDOW_LIMIT: usize = 200;

/// Plan label used when a batch file has no `Plan` column.
pub const DEFAULT_PLAN_LABEL: &str = "Default Plan";

/// Bucket name for sales whose terminal is no longer known.
pub const UNKNOWN_TERMINAL_LABEL: &str = "Unknown Terminal";
