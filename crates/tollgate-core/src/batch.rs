//! # Batch File Parsing
//!
//! Turns a supplier's token batch file into rows ready to be staged.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Login,Plan,Price,SellerFee          ◄── header (mandatory)             │
//! │  ABC123,Basic,8000,1000              ◄── one token per line             │
//! │  ,Basic,8000,1000                    ◄── no code: skipped, counted      │
//! │  XYZ789,Pro,9000,1500                                                   │
//! │                                                                         │
//! │  Login     → Token.code        (required)                               │
//! │  Price     → Token.cost_price  (required, supplier cost, NOT sale price)│
//! │  SellerFee → Token.franchisee_fee (required)                            │
//! │  Plan      → Token.plan        (optional)                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The sale price is not in the file. The operator picks a [`PriceTier`] for
//! the whole batch and [`ParsedBatch::into_tokens`] stamps it on every row.
//!
//! ## Limitations
//! Fields are split on every comma. A quoted field containing a comma is not
//! supported and will shift the columns of that row.

use std::collections::HashMap;

use crate::error::{ValidationError, ValidationResult};
use crate::types::{PriceTier, Token};

/// Header name of the token code column.
pub const LOGIN_COLUMN: &str = "Login";
/// Header name of the cost column.
pub const PRICE_COLUMN: &str = "Price";
/// Header name of the franchisee fee column.
pub const SELLER_FEE_COLUMN: &str = "SellerFee";
/// Header name of the optional plan column.
pub const PLAN_COLUMN: &str = "Plan";

// =============================================================================
// Parsed Rows
// =============================================================================

/// One accepted data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRow {
    pub code: String,
    /// `None` when the file has no Plan column or the cell is blank.
    pub plan: Option<String>,
    pub cost_price: i64,
    pub franchisee_fee: i64,
}

/// Result of parsing a batch file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBatch {
    /// Accepted rows, unique by code, in first-seen order.
    pub rows: Vec<TokenRow>,
    /// Non-blank data lines dropped because they had no code.
    pub skipped_rows: usize,
    /// Rows folded into an earlier row with the same code.
    pub duplicate_rows: usize,
}

impl ParsedBatch {
    /// Number of distinct tokens the batch will stage.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Builds unsold tokens priced at `tier`.
    ///
    /// `imported_at` is left empty; the store stamps it on write.
    pub fn into_tokens(self, tier: PriceTier, default_plan: &str) -> Vec<Token> {
        self.rows
            .into_iter()
            .map(|row| Token {
                code: row.code,
                plan: row.plan.unwrap_or_else(|| default_plan.to_string()),
                price: tier.rupiah(),
                cost_price: row.cost_price,
                franchisee_fee: row.franchisee_fee,
                is_sold: false,
                machine_id: None,
                imported_at: None,
            })
            .collect()
    }
}

// =============================================================================
// Parser
// =============================================================================

struct Columns {
    login: usize,
    price: usize,
    seller_fee: usize,
    plan: Option<usize>,
}

impl Columns {
    fn resolve(header: &str) -> ValidationResult<Self> {
        let names: Vec<String> = split_fields(header);
        let find = |column: &str| names.iter().position(|name| name == column);
        let require = |column: &str| {
            find(column).ok_or_else(|| ValidationError::MissingColumn {
                column: column.to_string(),
            })
        };

        // Reported in this order when several are missing.
        let login = require(LOGIN_COLUMN)?;
        let seller_fee = require(SELLER_FEE_COLUMN)?;
        let price = require(PRICE_COLUMN)?;

        Ok(Columns {
            login,
            price,
            seller_fee,
            plan: find(PLAN_COLUMN),
        })
    }
}

fn split_fields(line: &str) -> Vec<String> {
    line.split(',')
        .map(|field| field.trim().replace('"', ""))
        .collect()
}

/// Reads a leading integer the way the supplier tools write them.
///
/// `"8000"` and `"8000.50"` both give 8000. Blank, non-numeric and
/// negative values give 0.
fn parse_amount(field: Option<&String>) -> i64 {
    let Some(field) = field else { return 0 };
    let digits: String = field.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<i64>().unwrap_or(0)
}

/// Parses a batch file.
///
/// ## Errors
/// - [`ValidationError::NoDataRows`] if the header is missing or every line
///   after it is blank; a blank-only body counts as no data rows, not as
///   rows without a code
/// - [`ValidationError::MissingColumn`] for `Login`, then `SellerFee`, then `Price`
/// - [`ValidationError::NoValidTokens`] if every data row was skipped
///
/// ## Example
/// ```rust
/// use tollgate_core::batch::parse_batch;
///
/// let batch = parse_batch("Login,Price,SellerFee\nA1,8000,1000\nA1,9000,1200").unwrap();
/// assert_eq!(batch.len(), 1);
/// assert_eq!(batch.rows[0].cost_price, 9000);
/// assert_eq!(batch.duplicate_rows, 1);
/// ```
pub fn parse_batch(text: &str) -> ValidationResult<ParsedBatch> {
    let mut lines = text.split('\n').map(str::trim);

    let header = lines.next().unwrap_or_default();
    let data: Vec<&str> = lines.filter(|line| !line.is_empty()).collect();

    if header.is_empty() || data.is_empty() {
        return Err(ValidationError::NoDataRows);
    }

    let columns = Columns::resolve(header)?;

    let mut rows: Vec<TokenRow> = Vec::with_capacity(data.len());
    let mut seen: HashMap<String, usize> = HashMap::with_capacity(data.len());
    let mut skipped_rows = 0;
    let mut duplicate_rows = 0;

    for line in data {
        let fields = split_fields(line);

        let code = match fields.get(columns.login) {
            Some(code) if !code.is_empty() => code.clone(),
            _ => {
                skipped_rows += 1;
                continue;
            }
        };

        let row = TokenRow {
            plan: columns
                .plan
                .and_then(|idx| fields.get(idx))
                .filter(|plan| !plan.is_empty())
                .cloned(),
            cost_price: parse_amount(fields.get(columns.price)),
            franchisee_fee: parse_amount(fields.get(columns.seller_fee)),
            code,
        };

        match seen.get(&row.code) {
            Some(&idx) => {
                rows[idx] = row;
                duplicate_rows += 1;
            }
            None => {
                seen.insert(row.code.clone(), rows.len());
                rows.push(row);
            }
        }
    }

    if rows.is_empty() {
        return Err(ValidationError::NoValidTokens);
    }

    Ok(ParsedBatch {
        rows,
        skipped_rows,
        duplicate_rows,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_PLAN_LABEL;

    const SCENARIO: &str = "Login,Plan,Price,SellerFee\n\
                            ABC123,Basic,8000,1000\n\
                            ,Basic,8000,1000\n\
                            XYZ789,Pro,9000,1500";

    #[test]
    fn test_scenario_batch_at_ten_thousand() {
        let batch = parse_batch(SCENARIO).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.skipped_rows, 1);
        assert_eq!(batch.duplicate_rows, 0);

        let tokens = batch.into_tokens(PriceTier::Rp10000, DEFAULT_PLAN_LABEL);
        assert_eq!(tokens[0].code, "ABC123");
        assert_eq!(tokens[0].plan, "Basic");
        assert_eq!(tokens[0].cost_price, 8000);
        assert_eq!(tokens[0].franchisee_fee, 1000);
        assert_eq!(tokens[1].code, "XYZ789");
        assert_eq!(tokens[1].franchisee_fee, 1500);
        assert!(tokens.iter().all(|t| t.price == 10_000 && !t.is_sold));
        assert!(tokens.iter().all(|t| t.machine_id.is_none()));
    }

    #[test]
    fn test_header_only_is_rejected() {
        assert_eq!(
            parse_batch("Login,Price,SellerFee"),
            Err(ValidationError::NoDataRows)
        );
        assert_eq!(
            parse_batch("Login,Price,SellerFee\n\n"),
            Err(ValidationError::NoDataRows)
        );
        assert_eq!(
            parse_batch("Login,Price,SellerFee\r\n  \r\n\t\n"),
            Err(ValidationError::NoDataRows)
        );
        assert_eq!(parse_batch(""), Err(ValidationError::NoDataRows));
    }

    #[test]
    fn test_missing_columns_reported_in_order() {
        let err = parse_batch("Code,Price\nA,1").unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingColumn {
                column: "Login".to_string()
            }
        );

        let err = parse_batch("Login\nA").unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingColumn {
                column: "SellerFee".to_string()
            }
        );

        let err = parse_batch("Login,SellerFee\nA,1").unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingColumn {
                column: "Price".to_string()
            }
        );
    }

    #[test]
    fn test_all_rows_without_code() {
        let err = parse_batch("Login,Price,SellerFee\n,1,2\n ,3,4").unwrap_err();
        assert_eq!(err, ValidationError::NoValidTokens);
        assert!(err.is_empty_batch());
    }

    #[test]
    fn test_crlf_and_quoted_header() {
        let text = "\"Login\",\"Price\",\"SellerFee\"\r\n\"Q1\",\"7000\",\"500\"\r\n";
        let batch = parse_batch(text).unwrap();
        assert_eq!(batch.rows[0].code, "Q1");
        assert_eq!(batch.rows[0].cost_price, 7000);
        assert_eq!(batch.rows[0].franchisee_fee, 500);
    }

    #[test]
    fn test_bad_numbers_become_zero() {
        let batch = parse_batch("Login,Price,SellerFee\nA,abc,-5\nB,8000.50,\nC").unwrap();
        assert_eq!(batch.rows[0].cost_price, 0);
        assert_eq!(batch.rows[0].franchisee_fee, 0);
        assert_eq!(batch.rows[1].cost_price, 8000);
        assert_eq!(batch.rows[1].franchisee_fee, 0);
        assert_eq!(batch.rows[2].cost_price, 0);
    }

    #[test]
    fn test_missing_plan_uses_default() {
        let batch = parse_batch("Login,Plan,Price,SellerFee\nA,,1,1").unwrap();
        let tokens = batch.into_tokens(PriceTier::Rp2000, "Paket Harian");
        assert_eq!(tokens[0].plan, "Paket Harian");
    }

    #[test]
    fn test_duplicates_keep_last_values_first_position() {
        let batch =
            parse_batch("Login,Price,SellerFee\nA,1,1\nB,2,2\nA,3,3").unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.duplicate_rows, 1);
        assert_eq!(batch.rows[0].code, "A");
        assert_eq!(batch.rows[0].cost_price, 3);
        assert_eq!(batch.rows[1].code, "B");
    }
}
