//! Ledger-service access for the Rewind snapshot engine.
//!
//! The external ledger is authoritative for *current* state only, is
//! rate-limited, and is eventually consistent across its own pagination
//! cursors. This crate contains everything needed to obtain a complete
//! and correct picture from it anyway:
//!
//! - [`source`] -- The [`RateLimitedSource`]: a request executor that
//!   enforces a fixed inter-call spacing and retries rate-limit
//!   responses after a full-stop cool-down. Transport and sleeping are
//!   injected seams so tests never touch the network or the wall clock.
//! - [`api`] -- The [`LedgerQuery`] capability trait (the logical API
//!   the engine consumes) and [`HttpLedger`], its production
//!   implementation over the rate-limited source.
//! - [`paginator`] -- The two pagination strategies: the
//!   collection-wide cursor walk and the per-item windowed fallback,
//!   each with its own termination policy and safety ceiling.
//!
//! Rate limiting never surfaces as an error; everything else fails
//! loudly through [`LedgerError`] and is the caller's decision.
//!
//! [`RateLimitedSource`]: source::RateLimitedSource
//! [`LedgerQuery`]: api::LedgerQuery
//! [`HttpLedger`]: api::HttpLedger

pub mod api;
pub mod paginator;
pub mod source;

pub use api::{AddressProfile, HttpLedger, LedgerQuery};
pub use paginator::{CollectedLog, ItemProbe};
pub use source::{HttpTransport, RateLimitedSource, Sleep, TokioSleep, Transport};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors surfaced by ledger queries.
///
/// Rate-limit responses (HTTP 429) are absent on purpose: the source
/// absorbs them with a cool-down retry and they are never a failure.
/// Callers branch on the variant, not on message text.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The request never produced a usable HTTP response.
    #[error("transport failure for {path}: {reason}")]
    Transport {
        /// The request path that failed.
        path: String,
        /// The underlying transport error, rendered.
        reason: String,
    },

    /// The ledger answered with a non-success, non-rate-limit status.
    #[error("ledger returned HTTP {status} for {path}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The request path that failed.
        path: String,
    },

    /// The ledger answered 2xx but the body carries an application
    /// error payload.
    #[error("ledger error for {path}: {message}")]
    Api {
        /// The request path that failed.
        path: String,
        /// The error message from the payload.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("response decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}
