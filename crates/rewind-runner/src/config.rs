//! Configuration types for the snapshot runner.
//!
//! All configuration is loaded from environment variables. The runner
//! needs to know how to reach the ledger API, which collection to
//! reconstruct, and the target instant.

use std::time::Duration;

use chrono::{DateTime, Utc};

use rewind_types::Address;

use crate::error::RunnerError;

/// Complete runner configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Ledger API base URL (e.g. `https://ledger.example.com`).
    pub ledger_url: String,
    /// Optional bearer token for the ledger API.
    pub api_key: Option<String>,
    /// The collection whose ownership is reconstructed.
    pub collection: Address,
    /// The past instant to reconstruct ownership for.
    pub target_time: DateTime<Utc>,
    /// Pacing delay inserted after every successful ledger call.
    pub min_delay: Duration,
    /// Backoff applied when the ledger signals rate limiting.
    pub cooldown: Duration,
}

impl RunnerConfig {
    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `LEDGER_URL` -- ledger API base URL
    /// - `COLLECTION` -- collection address to reconstruct
    /// - `TARGET_TIME` -- target instant, RFC 3339 (e.g. `2024-06-01T00:00:00Z`)
    ///
    /// Optional variables:
    /// - `LEDGER_API_KEY` -- bearer token for the ledger API
    /// - `MIN_DELAY_MS` -- pacing delay between calls in milliseconds (default 500)
    /// - `COOLDOWN_MS` -- rate-limit backoff in milliseconds (default 5000)
    pub fn from_env() -> Result<Self, RunnerError> {
        let ledger_url = env_var("LEDGER_URL")?;
        let api_key = std::env::var("LEDGER_API_KEY").ok();
        let collection = Address::new(env_var("COLLECTION")?);

        let target_raw = env_var("TARGET_TIME")?;
        let target_time = DateTime::parse_from_rfc3339(&target_raw)
            .map_err(|e| RunnerError::Config(format!("invalid TARGET_TIME: {e}")))?
            .with_timezone(&Utc);

        let min_delay = parse_duration_ms(
            "MIN_DELAY_MS",
            std::env::var("MIN_DELAY_MS").ok().as_deref(),
            500,
        )?;
        let cooldown = parse_duration_ms(
            "COOLDOWN_MS",
            std::env::var("COOLDOWN_MS").ok().as_deref(),
            5000,
        )?;

        Ok(Self {
            ledger_url,
            api_key,
            collection,
            target_time,
            min_delay,
            cooldown,
        })
    }
}

/// Read a required environment variable.
fn env_var(name: &str) -> Result<String, RunnerError> {
    std::env::var(name)
        .map_err(|e| RunnerError::Config(format!("missing required env var {name}: {e}")))
}

/// Parse an optional millisecond setting, falling back to a default
/// when the variable is unset.
fn parse_duration_ms(
    name: &str,
    raw: Option<&str>,
    default_ms: u64,
) -> Result<Duration, RunnerError> {
    let ms: u64 = match raw {
        Some(raw) => raw
            .parse()
            .map_err(|e| RunnerError::Config(format!("invalid {name}: {e}")))?,
        None => default_ms,
    };
    Ok(Duration::from_millis(ms))
}
