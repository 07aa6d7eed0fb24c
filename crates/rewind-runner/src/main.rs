//! Snapshot runner entry point.
//!
//! Reconstructs a collection's ownership as of a past target time and
//! prints the resulting snapshot as JSON on stdout. The ledger service
//! is rate-limited, so a full run over a large collection deliberately
//! takes a while; progress is visible through the structured logs.
//!
//! # Architecture
//!
//! ```text
//! env config --> HTTP ledger (rate-limited) --> snapshot engine --> JSON
//! ```
//!
//! The run either completes with a snapshot (possibly carrying
//! degradation warnings) or fails fast on a collection-wide fetch.

mod config;
mod error;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rewind_engine::take_snapshot;
use rewind_ledger::{HttpLedger, HttpTransport, RateLimitedSource, TokioSleep};
use rewind_types::Completeness;

use crate::config::RunnerConfig;

/// Application entry point.
///
/// Initializes logging, loads configuration from environment variables,
/// builds the rate-limited ledger client, runs one snapshot, and prints
/// it.
///
/// # Errors
///
/// Returns an error if configuration is invalid or a collection-wide
/// ledger fetch fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("rewind-runner starting");

    let config = RunnerConfig::from_env()?;
    info!(
        ledger_url = config.ledger_url,
        collection = %config.collection,
        target_time = %config.target_time,
        min_delay_ms = config.min_delay.as_millis(),
        cooldown_ms = config.cooldown.as_millis(),
        "configuration loaded"
    );

    let transport = HttpTransport::new(&config.ledger_url, config.api_key.clone());
    let source = RateLimitedSource::new(transport, TokioSleep, config.min_delay, config.cooldown);
    let ledger = HttpLedger::new(source);

    let snapshot = take_snapshot(&ledger, &config.collection, config.target_time).await?;

    info!(
        items = snapshot.item_count,
        owners = snapshot.owner_count,
        completeness = ?snapshot.completeness,
        "snapshot complete"
    );
    for ranked in snapshot.ranking.iter().take(10) {
        info!(owner = %ranked.address, count = ranked.count, "top owner");
    }
    if snapshot.completeness == Completeness::Degraded {
        warn!(
            warnings = snapshot.warnings.len(),
            "snapshot produced with degraded completeness"
        );
    }
    for warning in &snapshot.warnings {
        warn!(warning = %warning, "degradation");
    }

    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    Ok(())
}
