//! Transfer events: one observed change of holder for one item.
//!
//! Events come from two places -- the collection-wide transfer log and
//! the per-item fallback probe -- and the [`EventSource`] tag records
//! which. The reconstruction algorithm only ever sorts events by
//! timestamp (stable, so log order breaks ties) and reads the `from`
//! side; everything else is context for diagnostics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Which pagination strategy observed a transfer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSource {
    /// The collection-wide cursor-paginated transfer log.
    CollectionLog,
    /// The per-item verification probe (primary or windowed fallback).
    ItemProbe,
}

/// One observed ownership transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    /// The item whose holder changed.
    pub item: Address,
    /// The holder before the transfer. Absent for mints and first
    /// assignments, where there is nothing to revert to.
    pub from: Option<Address>,
    /// The holder after the transfer. Absent transfers are no-ops for
    /// reconstruction purposes.
    pub to: Option<Address>,
    /// When the transfer was recorded by the ledger.
    pub timestamp: DateTime<Utc>,
    /// Which strategy observed the event.
    pub source: EventSource,
}

impl TransferEvent {
    /// Whether the event happened strictly after the given instant.
    ///
    /// Only these events need to be undone when rewinding to `target`.
    pub fn is_after(&self, target: DateTime<Utc>) -> bool {
        self.timestamp > target
    }
}
