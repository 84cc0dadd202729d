//! # Validation Module
//!
//! Checks operator-entered values before anything reaches the record store.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Operator UI                                                  │
//! │  └── Required markers, price picker                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: tollgate-sync operations                                     │
//! │  └── THIS MODULE: name/location/paper level/price tier                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Record store                                                 │
//! │  └── Permission rules only; no schema                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The store enforces no schema, so this layer is the last one that can
//! reject a malformed terminal.
//!
//! ## Usage
//! ```rust
//! use tollgate_core::validation::{validate_terminal_name, validate_paper_level};
//!
//! assert_eq!(validate_terminal_name("  Kios 7 ").unwrap(), "Kios 7");
//! assert!(validate_paper_level(150).is_err());
//! ```

use crate::error::{ValidationError, ValidationResult};
use crate::types::PriceTier;
use crate::FULL_PAPER_LEVEL;

/// Longest accepted terminal name or location.
pub const MAX_LABEL_LENGTH: usize = 100;

// =============================================================================
// String Validators
// =============================================================================

fn validate_label(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > MAX_LABEL_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_LABEL_LENGTH,
        });
    }

    Ok(value.to_string())
}

/// Validates a terminal display name.
///
/// ## Rules
/// - Must not be blank after trimming
/// - At most 100 characters
///
/// ## Returns
/// The trimmed name, which is what gets stored.
pub fn validate_terminal_name(name: &str) -> ValidationResult<String> {
    validate_label("name", name)
}

/// Validates a terminal location. Same rules as the name.
pub fn validate_location(location: &str) -> ValidationResult<String> {
    validate_label("location", location)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a paper level supplied by the operator.
///
/// ## Rules
/// - Must be between 0 and 100 (inclusive)
///
/// ## Example
/// ```rust
/// use tollgate_core::validation::validate_paper_level;
///
/// assert_eq!(validate_paper_level(35).unwrap(), 35);
/// assert!(validate_paper_level(-1).is_err());
/// assert!(validate_paper_level(101).is_err());
/// ```
pub fn validate_paper_level(level: i64) -> ValidationResult<u8> {
    if !(0..=FULL_PAPER_LEVEL as i64).contains(&level) {
        return Err(ValidationError::OutOfRange {
            field: "paper level".to_string(),
            min: 0,
            max: FULL_PAPER_LEVEL as i64,
        });
    }

    Ok(level as u8)
}

/// Validates that a tier is one of the tiers enabled for import.
///
/// `enabled` comes from configuration and may be a subset of
/// [`PriceTier::ALL`].
pub fn validate_price_tier(tier: PriceTier, enabled: &[PriceTier]) -> ValidationResult<()> {
    if enabled.contains(&tier) {
        return Ok(());
    }

    Err(ValidationError::NotAllowed {
        field: "price".to_string(),
        allowed: enabled.iter().map(|t| t.rupiah().to_string()).collect(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_terminal_name() {
        assert_eq!(validate_terminal_name("Kios A").unwrap(), "Kios A");
        assert_eq!(
            validate_terminal_name("   "),
            Err(ValidationError::required("name"))
        );
        assert!(matches!(
            validate_terminal_name(&"A".repeat(101)),
            Err(ValidationError::TooLong { max: 100, .. })
        ));
        assert!(validate_terminal_name(&"A".repeat(100)).is_ok());
    }

    #[test]
    fn test_validate_location_names_field() {
        let err = validate_location("").unwrap_err();
        assert_eq!(err.to_string(), "location is required");
    }

    #[test]
    fn test_validate_paper_level() {
        assert_eq!(validate_paper_level(0).unwrap(), 0);
        assert_eq!(validate_paper_level(100).unwrap(), 100);
        assert!(validate_paper_level(101).is_err());
        assert!(validate_paper_level(-5).is_err());
    }

    #[test]
    fn test_validate_price_tier() {
        let enabled = [PriceTier::Rp5000, PriceTier::Rp10000];
        assert!(validate_price_tier(PriceTier::Rp10000, &enabled).is_ok());

        let err = validate_price_tier(PriceTier::Rp50000, &enabled).unwrap_err();
        assert_eq!(
            err,
            ValidationError::NotAllowed {
                field: "price".to_string(),
                allowed: vec!["5000".to_string(), "10000".to_string()],
            }
        );
    }
}
