//! # Domain Types
//!
//! Record types shared by every Tollgate crate.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Terminal     │   │      Token      │   │      Sale       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (store)     │   │  code (= id)    │   │  id (store)     │       │
//! │  │  name/location  │   │  plan           │   │  machine_id ────┼──┐    │
//! │  │  paper_level    │   │  price          │   │  token_code     │  │    │
//! │  │  status         │   │  cost_price     │   │  price          │  │    │
//! │  │  created_at     │   │  franchisee_fee │   │  franchisee_fee │  │    │
//! │  └────────▲────────┘   │  is_sold        │   │  timestamp      │  │    │
//! │           │            │  machine_id     │   └─────────────────┘  │    │
//! │           │            │  imported_at    │                        │    │
//! │           │            └─────────────────┘                        │    │
//! │           └──────────── soft reference, no integrity check ───────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Document Field Names
//! Records are stored as JSON documents with camelCase keys (`paperLevel`,
//! `isSold`, `importedAt`). Every type here uses
//! `#[serde(rename_all = "camelCase")]` so the Rust side stays snake_case.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::{LOW_PAPER_THRESHOLD, WARN_PAPER_THRESHOLD};

// =============================================================================
// Terminal
// =============================================================================

/// Heartbeat status reported by the terminal itself.
///
/// This engine only reads it; the terminal's own heartbeat writes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum TerminalStatus {
    Online,
    #[default]
    Offline,
    /// Anything the heartbeat wrote that we do not recognise.
    #[serde(other)]
    Unknown,
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalStatus::Online => write!(f, "online"),
            TerminalStatus::Offline => write!(f, "offline"),
            TerminalStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Paper band shown next to each terminal.
///
/// ```text
///   0 ────────── 20 ────────── 50 ──────────────── 100
///   │  Critical   │     Low     │        Ok         │
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaperStatus {
    Critical,
    Low,
    Ok,
}

impl PaperStatus {
    /// Classifies a paper level.
    pub fn from_level(level: u8) -> Self {
        if level < LOW_PAPER_THRESHOLD {
            PaperStatus::Critical
        } else if level < WARN_PAPER_THRESHOLD {
            PaperStatus::Low
        } else {
            PaperStatus::Ok
        }
    }
}

/// A vending unit in the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Terminal {
    /// Store-assigned document id.
    #[serde(default)]
    pub id: String,

    /// Display name, e.g. "Warung Pak Budi".
    pub name: String,

    #[serde(default)]
    pub location: String,

    /// Percentage of paper left, 0..=100.
    #[serde(default)]
    pub paper_level: u8,

    #[serde(default)]
    pub status: TerminalStatus,

    /// Server timestamp; absent while the write is still pending.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Terminal {
    /// Returns the paper band for this terminal.
    #[inline]
    pub fn paper_status(&self) -> PaperStatus {
        PaperStatus::from_level(self.paper_level)
    }

    /// True when the terminal counts toward the low-stock dashboard counter.
    #[inline]
    pub fn is_low_on_paper(&self) -> bool {
        self.paper_level < LOW_PAPER_THRESHOLD
    }

    /// True when a refill would change nothing.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.paper_level >= crate::FULL_PAPER_LEVEL
    }
}

// =============================================================================
// Token
// =============================================================================

/// A prepaid access code waiting to be dispensed.
///
/// ## Identity
/// `code` is both the business key and the document id, so importing the
/// same code twice overwrites one document instead of creating two.
///
/// ## Sold flag
/// `is_sold` only ever goes `false → true`, and only outside this engine
/// (the terminal reports the redemption). Nothing here sets it to `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    #[serde(default)]
    pub code: String,

    #[serde(default)]
    pub plan: String,

    /// Sale price charged to the customer (from the batch's price tier).
    #[serde(default)]
    pub price: i64,

    /// Wholesale cost basis (batch `Price` column).
    #[serde(default)]
    pub cost_price: i64,

    /// Portion of `price` kept by the local operator (batch `SellerFee`).
    #[serde(default)]
    pub franchisee_fee: i64,

    #[serde(default)]
    pub is_sold: bool,

    /// Terminal that sold the token; `None` while unsold.
    #[serde(default)]
    pub machine_id: Option<String>,

    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub imported_at: Option<DateTime<Utc>>,
}

impl Token {
    /// Returns the sale price as Money.
    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_rupiah(self.price)
    }

    /// Returns the franchisee fee as Money.
    #[inline]
    pub fn fee(&self) -> Money {
        Money::from_rupiah(self.franchisee_fee)
    }
}

// =============================================================================
// Sale
// =============================================================================

/// An immutable record of one redemption.
///
/// `price` and `franchisee_fee` are copied at sale time; the Sale, not the
/// Token, is the source of truth for what was charged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    #[serde(default)]
    pub id: String,

    /// Terminal where the redemption happened. May not resolve.
    #[serde(default)]
    pub machine_id: Option<String>,

    #[serde(default)]
    pub token_code: String,

    #[serde(default)]
    pub price: i64,

    /// Older sales were written without a fee; treat missing as zero.
    #[serde(default)]
    pub franchisee_fee: Option<i64>,

    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Sale {
    /// Returns the charged price as Money.
    #[inline]
    pub fn revenue(&self) -> Money {
        Money::from_rupiah(self.price)
    }

    /// Returns the franchisee fee as Money (zero when missing).
    #[inline]
    pub fn fee(&self) -> Money {
        Money::from_rupiah(self.franchisee_fee.unwrap_or(0))
    }
}

// =============================================================================
// Price Tier
// =============================================================================

/// Sale prices an operator can assign to a whole batch.
///
/// The batch file only carries cost and fee; the sale price is picked by the
/// operator at import time from this fixed list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum PriceTier {
    Rp2000,
    Rp5000,
    Rp10000,
    Rp20000,
    Rp50000,
    Rp100000,
}

impl PriceTier {
    /// Every tier, cheapest first.
    pub const ALL: [PriceTier; 6] = [
        PriceTier::Rp2000,
        PriceTier::Rp5000,
        PriceTier::Rp10000,
        PriceTier::Rp20000,
        PriceTier::Rp50000,
        PriceTier::Rp100000,
    ];

    /// Returns the tier's price in whole Rupiah.
    pub const fn rupiah(&self) -> i64 {
        match self {
            PriceTier::Rp2000 => 2_000,
            PriceTier::Rp5000 => 5_000,
            PriceTier::Rp10000 => 10_000,
            PriceTier::Rp20000 => 20_000,
            PriceTier::Rp50000 => 50_000,
            PriceTier::Rp100000 => 100_000,
        }
    }

    /// Returns the tier's price as Money.
    pub const fn money(&self) -> Money {
        Money::from_rupiah(self.rupiah())
    }

    fn allowed_values() -> Vec<String> {
        PriceTier::ALL.iter().map(|t| t.rupiah().to_string()).collect()
    }
}

impl From<PriceTier> for i64 {
    fn from(tier: PriceTier) -> Self {
        tier.rupiah()
    }
}

impl TryFrom<i64> for PriceTier {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        PriceTier::ALL
            .into_iter()
            .find(|tier| tier.rupiah() == value)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "price".to_string(),
                allowed: PriceTier::allowed_values(),
            })
    }
}

impl std::str::FromStr for PriceTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.trim().chars().filter(|c| *c != '.' && *c != '_').collect();
        let value = digits.parse::<i64>().map_err(|_| ValidationError::NotAllowed {
            field: "price".to_string(),
            allowed: PriceTier::allowed_values(),
        })?;
        PriceTier::try_from(value)
    }
}

impl fmt::Display for PriceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.money())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_paper_status_bands() {
        assert_eq!(PaperStatus::from_level(0), PaperStatus::Critical);
        assert_eq!(PaperStatus::from_level(19), PaperStatus::Critical);
        assert_eq!(PaperStatus::from_level(20), PaperStatus::Low);
        assert_eq!(PaperStatus::from_level(49), PaperStatus::Low);
        assert_eq!(PaperStatus::from_level(50), PaperStatus::Ok);
        assert_eq!(PaperStatus::from_level(100), PaperStatus::Ok);
    }

    #[test]
    fn test_terminal_reads_camel_case_document() {
        let terminal: Terminal = serde_json::from_value(json!({
            "id": "t-1",
            "name": "Warung Pak Budi",
            "location": "Jl. Merdeka 10",
            "paperLevel": 15,
            "status": "online",
        }))
        .unwrap();

        assert_eq!(terminal.paper_level, 15);
        assert_eq!(terminal.status, TerminalStatus::Online);
        assert!(terminal.is_low_on_paper());
        assert!(terminal.created_at.is_none());
    }

    #[test]
    fn test_unrecognised_status_degrades() {
        let terminal: Terminal = serde_json::from_value(json!({
            "name": "Kios 3",
            "status": "maintenance",
        }))
        .unwrap();
        assert_eq!(terminal.status, TerminalStatus::Unknown);
    }

    #[test]
    fn test_sale_missing_fee_is_zero() {
        let sale: Sale = serde_json::from_value(json!({
            "machineId": "t-1",
            "tokenCode": "ABC123",
            "price": 10000,
        }))
        .unwrap();
        assert_eq!(sale.fee(), Money::zero());
        assert_eq!(sale.revenue().rupiah(), 10_000);
    }

    #[test]
    fn test_price_tier_conversions() {
        assert_eq!(PriceTier::try_from(10_000).unwrap(), PriceTier::Rp10000);
        assert_eq!("50000".parse::<PriceTier>().unwrap(), PriceTier::Rp50000);
        assert_eq!("100.000".parse::<PriceTier>().unwrap(), PriceTier::Rp100000);
        assert!(PriceTier::try_from(7_500).is_err());
        assert!("abc".parse::<PriceTier>().is_err());
        assert_eq!(PriceTier::Rp20000.to_string(), "Rp 20.000");
    }

    #[test]
    fn test_token_serializes_document_fields() {
        let token = Token {
            code: "ABC123".to_string(),
            plan: "Basic".to_string(),
            price: 10_000,
            cost_price: 8_000,
            franchisee_fee: 1_000,
            is_sold: false,
            machine_id: None,
            imported_at: None,
        };
        let value = serde_json::to_value(&token).unwrap();
        assert_eq!(value["costPrice"], 8_000);
        assert_eq!(value["franchiseeFee"], 1_000);
        assert_eq!(value["isSold"], false);
        assert!(value["machineId"].is_null());
    }
}
