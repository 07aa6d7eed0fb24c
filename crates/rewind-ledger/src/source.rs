//! The rate-limited request executor.
//!
//! Every query against the ledger goes through [`RateLimitedSource`],
//! which enforces two rules uniformly, regardless of request type:
//!
//! 1. A rate-limit response (HTTP 429) suspends the entire calling
//!    sequence for a fixed cool-down, then retries the same request.
//!    There is no retry cap on this condition -- the ledger's limit is
//!    always temporary, so giving up would trade a delay for a failure.
//! 2. Every successful call is followed by a fixed minimum delay before
//!    the caller may issue the next one. This is a token-free
//!    fixed-interval throttle, not a token bucket; the snapshot
//!    pipeline is strictly sequential by design, so pacing each call is
//!    enough to respect the limit.
//!
//! Both the HTTP transport and the sleep are injected seams
//! ([`Transport`], [`Sleep`]) so tests can script rate-limit responses
//! and observe the delays without real wall-clock waits.

use std::time::Duration;

use tracing::{debug, warn};

use crate::LedgerError;

/// HTTP status signaling the ledger's rate limit.
const HTTP_TOO_MANY_REQUESTS: u16 = 429;

/// Default minimum spacing between consecutive ledger calls.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(500);

/// Default full-stop cool-down after a rate-limit response.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Request and response shapes
// ---------------------------------------------------------------------------

/// A GET request against the ledger service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    path: String,
    query: Vec<(String, String)>,
}

impl ApiRequest {
    /// Create a request for the given path (no query parameters yet).
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    /// Append a query parameter.
    pub fn with(mut self, key: &str, value: impl core::fmt::Display) -> Self {
        self.query.push((key.to_owned(), value.to_string()));
        self
    }

    /// The request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The query parameters, in append order.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }
}

/// The raw outcome of one transport round-trip.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// The HTTP status code.
    pub status: u16,
    /// The response body text.
    pub body: String,
}

// ---------------------------------------------------------------------------
// Injected seams
// ---------------------------------------------------------------------------

/// One HTTP round-trip against the ledger.
///
/// The production implementation is [`HttpTransport`]; tests script
/// responses instead.
pub trait Transport {
    /// Send the request and return the raw status and body.
    fn send(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<RawResponse, LedgerError>>;
}

/// A suspendable delay.
///
/// Production code sleeps on the tokio timer via [`TokioSleep`]; tests
/// record the requested durations and return immediately.
pub trait Sleep {
    /// Suspend for the given duration.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

/// [`Sleep`] on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleep;

impl Sleep for TokioSleep {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// [`Transport`] over a [`reqwest::Client`] with a fixed base URL and
/// optional bearer key.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpTransport {
    /// Create a transport for the given ledger base URL.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, LedgerError> {
        let url = format!("{}{}", self.base_url, request.path());
        let mut builder = self.client.get(&url).query(request.query());
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| LedgerError::Transport {
            path: request.path().to_owned(),
            reason: e.to_string(),
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| LedgerError::Transport {
            path: request.path().to_owned(),
            reason: format!("failed to read body: {e}"),
        })?;

        Ok(RawResponse { status, body })
    }
}

// ---------------------------------------------------------------------------
// Rate-limited source
// ---------------------------------------------------------------------------

/// Request executor enforcing the ledger's rate limit.
///
/// See the module docs for the two rules it applies. All ledger calls
/// in one run share a single source, so the pacing is global across
/// the whole pipeline.
#[derive(Debug)]
pub struct RateLimitedSource<T, S> {
    transport: T,
    sleeper: S,
    min_delay: Duration,
    cooldown: Duration,
}

impl<T: Transport, S: Sleep> RateLimitedSource<T, S> {
    /// Create a source over the given transport and sleeper.
    pub const fn new(transport: T, sleeper: S, min_delay: Duration, cooldown: Duration) -> Self {
        Self {
            transport,
            sleeper,
            min_delay,
            cooldown,
        }
    }

    /// Execute a request, absorbing rate-limit responses.
    ///
    /// Retries indefinitely on HTTP 429 after the cool-down. On success,
    /// decodes the body as JSON, surfaces an `error` payload as
    /// [`LedgerError::Api`], and sleeps the minimum inter-call delay
    /// before returning so the next call is paced automatically.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Transport`], [`LedgerError::Status`],
    /// [`LedgerError::Api`], or [`LedgerError::Decode`] -- never a
    /// rate-limit condition.
    pub async fn execute(&self, request: &ApiRequest) -> Result<serde_json::Value, LedgerError> {
        loop {
            let response = self.transport.send(request).await?;

            if response.status == HTTP_TOO_MANY_REQUESTS {
                warn!(
                    path = request.path(),
                    cooldown_ms = self.cooldown.as_millis(),
                    "ledger rate limit hit, cooling down before retry"
                );
                self.sleeper.sleep(self.cooldown).await;
                continue;
            }

            if !(200..300).contains(&response.status) {
                return Err(LedgerError::Status {
                    status: response.status,
                    path: request.path().to_owned(),
                });
            }

            let value: serde_json::Value = serde_json::from_str(&response.body)?;
            if let Some(message) = error_payload(&value) {
                return Err(LedgerError::Api {
                    path: request.path().to_owned(),
                    message,
                });
            }

            debug!(
                path = request.path(),
                pacing_ms = self.min_delay.as_millis(),
                "ledger call succeeded, pacing before next call"
            );
            self.sleeper.sleep(self.min_delay).await;
            return Ok(value);
        }
    }
}

/// Extract an application-level error message from a 2xx body, if any.
fn error_payload(value: &serde_json::Value) -> Option<String> {
    let error = value.get("error")?;
    match error.as_str() {
        Some(text) => Some(text.to_owned()),
        None => Some(error.to_string()),
    }
}
