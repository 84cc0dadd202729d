//! # Batch Preview
//!
//! Imports a batch file into an in-memory store and prints the dashboard it
//! would produce. Useful for checking a supplier file before importing it
//! for real.
//!
//! ## Usage
//! ```bash
//! cargo run -p tollgate-sync --bin tollgate-preview -- batch.csv 10000
//!
//! # Use a specific config file (price tiers, sold re-import policy)
//! cargo run -p tollgate-sync --bin tollgate-preview -- batch.csv 10.000 --config ./tollgate.toml
//! ```

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use tollgate_core::{Money, PriceTier};
use tollgate_store::MemoryStore;
use tollgate_sync::{ActorId, DashboardFeed, ImportPipeline, SyncConfig, SyncStore};

const USAGE: &str = "Usage: tollgate-preview <BATCH_FILE> <PRICE> [--config <PATH>]";

struct Args {
    batch: PathBuf,
    price: PriceTier,
    config: Option<PathBuf>,
}

fn parse_args() -> Result<Option<Args>, String> {
    let mut positional = Vec::new();
    let mut config = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().ok_or("--config needs a path")?;
                config = Some(PathBuf::from(path));
            }
            "--help" | "-h" => return Ok(None),
            _ => positional.push(arg),
        }
    }

    let [batch, price] = <[String; 2]>::try_from(positional).map_err(|_| USAGE.to_string())?;
    let price = price.parse::<PriceTier>().map_err(|e| e.to_string())?;

    Ok(Some(Args {
        batch: PathBuf::from(batch),
        price,
        config,
    }))
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tollgate=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => {
            println!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("✗ {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(SyncConfig::load(args.config)?);
    let memory = Arc::new(MemoryStore::new());

    let sync = Arc::new(SyncStore::new(memory.clone(), config.clone()));
    sync.attach(ActorId::anonymous()).await?;
    let dashboard = DashboardFeed::spawn(sync.clone(), config.dashboard.clone());

    let mut tokens = sync.watch_unsold_tokens();
    let before = tokens.borrow_and_update().version;

    let window = config.sync.window_limit;
    let report = ImportPipeline::new(memory, config)
        .import_file(&args.batch, args.price)
        .await?;
    let expected = visible_tokens(report.staged, window);

    tokio::time::timeout(Duration::from_secs(5), tokens.wait_for(|s| s.version > before))
        .await
        .map_err(|_| "timed out waiting for the imported tokens")??;

    let mut state = dashboard.subscribe();
    tokio::time::timeout(
        Duration::from_secs(5),
        state.wait_for(|s| s.aggregates.summary.available_tokens >= expected),
    )
    .await
    .map_err(|_| "timed out waiting for the dashboard")??;

    let state = dashboard.state();
    dashboard.shutdown().await;

    println!("Batch: {}", args.batch.display());
    println!("Price: {}", report.price);
    println!();
    println!("✓ Staged {} tokens", report.staged);
    if report.skipped_rows > 0 {
        println!("⚠ Skipped {} rows without a code", report.skipped_rows);
    }
    if report.duplicate_rows > 0 {
        println!("⚠ Merged {} duplicate rows", report.duplicate_rows);
    }
    if report.staged > window {
        println!("⚠ Only {window} tokens fit the live window");
    }
    println!();
    println!("Available tokens: {}", state.aggregates.summary.available_tokens);
    for (price, count) in &state.aggregates.tokens_by_price {
        let label = Money::from_rupiah(*price).to_string();
        println!("  {label:>14}  {count}");
    }

    Ok(())
}

/// Tokens the live view can show after staging `staged` into an empty store.
fn visible_tokens(staged: usize, window: usize) -> usize {
    staged.min(window)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_tokens_capped_by_window() {
        assert_eq!(visible_tokens(2, 200), 2);
        assert_eq!(visible_tokens(200, 200), 200);
        assert_eq!(visible_tokens(250, 200), 200);
    }
}
