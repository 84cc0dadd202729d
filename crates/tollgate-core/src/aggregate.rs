//! # Aggregation Engine
//!
//! Pure summaries over one consistent view of the three collections.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   terminals ─────┐                                                      │
//! │   unsold tokens ─┼──► InventoryView ──► Aggregator::aggregate ──►       │
//! │   sales ─────────┘         (borrowed)          │                        │
//! │                                                ▼                        │
//! │                                  Aggregates                             │
//! │                                  ├── summary (revenue, counts)          │
//! │                                  ├── tokens_by_price                    │
//! │                                  └── sales_by_terminal                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every function is synchronous and allocation-light; the dashboard calls
//! them again on every snapshot change rather than patching old results.
//!
//! ## Grouping by Name
//! `sales_by_terminal` groups by the terminal's display name, so two
//! terminals registered with the same name share one bucket.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Sale, Terminal, Token};
use crate::UNKNOWN_TERMINAL_LABEL;

// =============================================================================
// Output Types
// =============================================================================

/// Headline numbers for the dashboard cards.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DashboardSummary {
    pub total_revenue: Money,
    pub total_franchisee_revenue: Money,
    pub total_sales: usize,
    pub total_terminals: usize,
    pub available_tokens: usize,
    pub low_stock_terminals: usize,
}

/// Per-terminal sales tally.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TerminalSales {
    pub count: usize,
    pub total_revenue: Money,
    pub total_franchisee_fee: Money,
}

/// A sale with its terminal name already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RecentSale {
    pub id: String,
    pub terminal_name: String,
    pub token_code: String,
    pub price: Money,
    pub franchisee_fee: Money,
    #[ts(as = "Option<String>")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Everything the dashboard derives from one view.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Aggregates {
    pub summary: DashboardSummary,
    /// Unsold token count keyed by sale price.
    pub tokens_by_price: BTreeMap<i64, usize>,
    /// Sales keyed by terminal display name.
    pub sales_by_terminal: BTreeMap<String, TerminalSales>,
}

/// Borrowed view over the three collections at one point in time.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryView<'a> {
    pub terminals: &'a [Terminal],
    pub unsold_tokens: &'a [Token],
    pub sales: &'a [Sale],
}

// =============================================================================
// Aggregator Trait
// =============================================================================

/// Computes [`Aggregates`] from a view.
///
/// Takes `&mut self` so an implementation may carry state between calls.
pub trait Aggregator {
    fn aggregate(&mut self, view: InventoryView<'_>) -> Aggregates;
}

/// Recomputes everything from scratch on each call.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullRecompute;

impl Aggregator for FullRecompute {
    fn aggregate(&mut self, view: InventoryView<'_>) -> Aggregates {
        Aggregates {
            summary: DashboardSummary {
                total_revenue: total_revenue(view.sales),
                total_franchisee_revenue: total_franchisee_revenue(view.sales),
                total_sales: view.sales.len(),
                total_terminals: view.terminals.len(),
                available_tokens: view.unsold_tokens.len(),
                low_stock_terminals: low_stock_terminal_count(view.terminals),
            },
            tokens_by_price: tokens_by_price(view.unsold_tokens),
            sales_by_terminal: sales_by_terminal(view.terminals, view.sales),
        }
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Sum of all sale prices. Zero for no sales.
pub fn total_revenue(sales: &[Sale]) -> Money {
    sales.iter().map(Sale::revenue).sum()
}

/// Sum of all franchisee fees, counting a missing fee as zero.
pub fn total_franchisee_revenue(sales: &[Sale]) -> Money {
    sales.iter().map(Sale::fee).sum()
}

/// Number of terminals below the low-paper threshold.
pub fn low_stock_terminal_count(terminals: &[Terminal]) -> usize {
    terminals.iter().filter(|t| t.is_low_on_paper()).count()
}

/// Counts tokens per sale price.
///
/// ```rust
/// use tollgate_core::aggregate::tokens_by_price;
/// use tollgate_core::Token;
///
/// let token = |price| Token {
///     code: format!("T{price}"),
///     plan: String::new(),
///     price,
///     cost_price: 0,
///     franchisee_fee: 0,
///     is_sold: false,
///     machine_id: None,
///     imported_at: None,
/// };
///
/// let counts = tokens_by_price(&[token(10_000), token(10_000), token(20_000)]);
/// assert_eq!(counts.get(&10_000), Some(&2));
/// assert_eq!(counts.get(&20_000), Some(&1));
/// ```
pub fn tokens_by_price(tokens: &[Token]) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for token in tokens {
        *counts.entry(token.price).or_insert(0) += 1;
    }
    counts
}

fn terminal_names(terminals: &[Terminal]) -> HashMap<&str, &str> {
    terminals
        .iter()
        .map(|t| (t.id.as_str(), t.name.as_str()))
        .collect()
}

fn resolve_name<'a>(names: &HashMap<&str, &'a str>, sale: &Sale) -> &'a str {
    sale.machine_id
        .as_deref()
        .and_then(|id| names.get(id).copied())
        .unwrap_or(UNKNOWN_TERMINAL_LABEL)
}

/// Groups sales by terminal name in a single pass.
///
/// Sales whose terminal id does not resolve land in `"Unknown Terminal"`.
pub fn sales_by_terminal(terminals: &[Terminal], sales: &[Sale]) -> BTreeMap<String, TerminalSales> {
    let names = terminal_names(terminals);

    sales.iter().fold(BTreeMap::new(), |mut acc, sale| {
        let entry: &mut TerminalSales = acc
            .entry(resolve_name(&names, sale).to_string())
            .or_default();
        entry.count += 1;
        entry.total_revenue += sale.revenue();
        entry.total_franchisee_fee += sale.fee();
        acc
    })
}

/// First `n` sales with resolved terminal names.
///
/// `sales` is expected newest first, as the sync layer delivers it.
pub fn recent_sales(terminals: &[Terminal], sales: &[Sale], n: usize) -> Vec<RecentSale> {
    let names = terminal_names(terminals);

    sales
        .iter()
        .take(n)
        .map(|sale| RecentSale {
            id: sale.id.clone(),
            terminal_name: resolve_name(&names, sale).to_string(),
            token_code: sale.token_code.clone(),
            price: sale.revenue(),
            franchisee_fee: sale.fee(),
            timestamp: sale.timestamp,
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TerminalStatus;

    fn terminal(id: &str, name: &str, paper_level: u8) -> Terminal {
        Terminal {
            id: id.to_string(),
            name: name.to_string(),
            location: "Jl. Sudirman".to_string(),
            paper_level,
            status: TerminalStatus::Online,
            created_at: None,
        }
    }

    fn sale(id: &str, machine: Option<&str>, price: i64, fee: Option<i64>) -> Sale {
        Sale {
            id: id.to_string(),
            machine_id: machine.map(str::to_string),
            token_code: format!("code-{id}"),
            price,
            franchisee_fee: fee,
            timestamp: None,
        }
    }

    fn token(code: &str, price: i64) -> Token {
        Token {
            code: code.to_string(),
            plan: "Basic".to_string(),
            price,
            cost_price: 0,
            franchisee_fee: 0,
            is_sold: false,
            machine_id: None,
            imported_at: None,
        }
    }

    #[test]
    fn test_revenue_totals() {
        let sales = vec![
            sale("s1", Some("t1"), 10_000, Some(1_000)),
            sale("s2", Some("t1"), 20_000, None),
            sale("s3", None, 5_000, Some(500)),
        ];
        assert_eq!(total_revenue(&sales).rupiah(), 35_000);
        assert_eq!(total_franchisee_revenue(&sales).rupiah(), 1_500);
    }

    #[test]
    fn test_empty_inputs_are_zero() {
        assert!(total_revenue(&[]).is_zero());
        assert!(total_franchisee_revenue(&[]).is_zero());
        assert!(tokens_by_price(&[]).is_empty());
        assert!(sales_by_terminal(&[], &[]).is_empty());
        assert_eq!(FullRecompute.aggregate(InventoryView::default()), Aggregates::default());
    }

    #[test]
    fn test_low_stock_threshold_is_strict() {
        let terminals = vec![
            terminal("a", "A", 19),
            terminal("b", "B", 20),
            terminal("c", "C", 0),
        ];
        assert_eq!(low_stock_terminal_count(&terminals), 2);
    }

    #[test]
    fn test_tokens_by_price_counts_sum_to_total() {
        let tokens = vec![token("a", 10_000), token("b", 10_000), token("c", 20_000)];
        let counts = tokens_by_price(&tokens);
        assert_eq!(counts, BTreeMap::from([(10_000, 2), (20_000, 1)]));
        assert_eq!(counts.values().sum::<usize>(), tokens.len());
    }

    #[test]
    fn test_sales_by_terminal_with_unknown_bucket() {
        let terminals = vec![terminal("t1", "Kios Pasar", 80)];
        let sales = vec![
            sale("s1", Some("t1"), 10_000, Some(1_000)),
            sale("s2", Some("t-gone"), 5_000, None),
            sale("s3", Some("t1"), 10_000, Some(1_000)),
            sale("s4", None, 2_000, None),
        ];

        let grouped = sales_by_terminal(&terminals, &sales);
        let kios = &grouped["Kios Pasar"];
        assert_eq!(kios.count, 2);
        assert_eq!(kios.total_revenue.rupiah(), 20_000);
        assert_eq!(kios.total_franchisee_fee.rupiah(), 2_000);

        let unknown = &grouped[UNKNOWN_TERMINAL_LABEL];
        assert_eq!(unknown.count, 2);
        assert_eq!(unknown.total_revenue.rupiah(), 7_000);

        let counted: usize = grouped.values().map(|g| g.count).sum();
        assert_eq!(counted, sales.len());
    }

    #[test]
    fn test_recent_sales_takes_prefix() {
        let terminals = vec![terminal("t1", "Kios Pasar", 80)];
        let sales: Vec<Sale> = (0..15)
            .map(|i| sale(&format!("s{i}"), Some("t1"), 2_000, None))
            .collect();

        let recent = recent_sales(&terminals, &sales, 10);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].id, "s0");
        assert_eq!(recent[0].terminal_name, "Kios Pasar");
        assert_eq!(recent_sales(&terminals, &sales[..3], 10).len(), 3);
    }

    #[test]
    fn test_full_recompute_summary() {
        let terminals = vec![terminal("t1", "A", 10), terminal("t2", "B", 90)];
        let tokens = vec![token("x", 5_000)];
        let sales = vec![sale("s1", Some("t2"), 10_000, Some(1_000))];

        let aggregates = FullRecompute.aggregate(InventoryView {
            terminals: &terminals,
            unsold_tokens: &tokens,
            sales: &sales,
        });

        let summary = aggregates.summary;
        assert_eq!(summary.total_revenue.rupiah(), 10_000);
        assert_eq!(summary.total_franchisee_revenue.rupiah(), 1_000);
        assert_eq!(summary.total_sales, 1);
        assert_eq!(summary.total_terminals, 2);
        assert_eq!(summary.available_tokens, 1);
        assert_eq!(summary.low_stock_terminals, 1);
        assert_eq!(aggregates.sales_by_terminal["B"].count, 1);
    }
}
