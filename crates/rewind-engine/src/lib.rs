//! The ownership reconstruction engine.
//!
//! Given the collection's *current* ownership and an append-only
//! transfer log queried from the ledger, this crate derives ownership
//! as of an arbitrary past target time and aggregates it into a ranked
//! distribution over real owners.
//!
//! # Architecture
//!
//! ```text
//! current items --> OwnershipMap --+
//!                                  +--> rewind (reverse replay)
//! collection transfer log ---------+         |
//!                                            v
//!                        per-item verification probes
//!                                            |
//!                                            v
//!                  owner resolution (custodial unwinding, memoized)
//!                                            |
//!                                            v
//!                        balance aggregation --> Snapshot
//! ```
//!
//! - [`reconstruct`] -- The reverse replay over post-target events and
//!   the per-item verification pass for items with no detected events.
//! - [`resolver`] -- Unwinds custodial holding contracts to the
//!   underlying real owner, with memoization, a cycle guard, and a
//!   depth bound. Total: it never fails outward.
//! - [`aggregate`] -- Folds the final ownership map into a
//!   [`BalanceTable`](rewind_types::BalanceTable) over resolved owners.
//! - [`orchestrator`] -- Sequences the whole pipeline and assembles the
//!   immutable [`Snapshot`](rewind_types::Snapshot).
//!
//! Only failures of the top-level collection-wide queries are fatal;
//! every per-item and per-owner degradation is isolated, accumulated as
//! a warning, and the run always produces a best-effort snapshot whose
//! balance counts sum to the item count.

pub mod aggregate;
pub mod orchestrator;
pub mod reconstruct;
pub mod resolver;

#[cfg(test)]
pub(crate) mod mock;

pub use aggregate::aggregate_balances;
pub use orchestrator::take_snapshot;
pub use reconstruct::{rewind_ownership, verify_quiet_items, RewoundOwnership};
pub use resolver::{OwnerResolver, MAX_RESOLUTION_HOPS};

use rewind_ledger::LedgerError;

/// Errors that abort a whole snapshot run.
///
/// Per the propagation policy, only the top-level collection-wide
/// fetches can fail fatally; everything else degrades to warnings.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A collection-wide ledger query failed.
    #[error("ledger query failed: {0}")]
    Ledger(#[from] LedgerError),
}
