//! The final snapshot record and its degradation reporting.
//!
//! A run must always complete and produce a best-effort [`Snapshot`],
//! even when some items or owners could not be fully verified or
//! resolved. Degradations are never swallowed: each one accumulates as
//! a [`SnapshotWarning`], and the truncation kinds downgrade the
//! snapshot's [`Completeness`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::ownership::{BalanceTable, RankedOwner};

/// Whether the snapshot's data collection ran to natural completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Completeness {
    /// Every pagination pass terminated naturally.
    Full,
    /// A pagination safety ceiling was hit; the snapshot was produced
    /// from whatever was collected and may miss transfers.
    Degraded,
}

/// A non-fatal degradation recorded while producing a snapshot.
///
/// Per-item and per-owner failures are isolated by design: they warn,
/// they never abort the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotWarning {
    /// The collection-wide transfer log hit its page ceiling; the log
    /// fed to the reconstruction may be incomplete.
    CollectionLogTruncated {
        /// Number of pages fetched before stopping.
        pages: u32,
    },
    /// A per-item fallback probe hit its page ceiling.
    ItemProbeTruncated {
        /// The item whose probe was cut short.
        item: Address,
        /// Number of pages fetched before stopping.
        pages: u32,
    },
    /// A per-item fallback probe failed outright; the item keeps its
    /// pre-verification best estimate.
    ItemVerificationFailed {
        /// The item whose probe failed.
        item: Address,
        /// What went wrong, for the operator.
        reason: String,
    },
    /// The resolver could not classify or fully unwind an address; the
    /// address was treated as its own final owner.
    OwnerUnresolved {
        /// The address left unresolved.
        address: Address,
        /// Why resolution stopped (classification failure, unknown
        /// pattern, empty lookup, cycle, depth overrun).
        reason: String,
    },
}

impl SnapshotWarning {
    /// Whether this warning downgrades the snapshot's completeness.
    ///
    /// Only truncated pagination can mean missing transfers; unresolved
    /// owners and failed probes degrade accuracy for one address or
    /// item, not the completeness of the collected log.
    pub const fn is_truncation(&self) -> bool {
        matches!(
            self,
            Self::CollectionLogTruncated { .. } | Self::ItemProbeTruncated { .. }
        )
    }
}

impl core::fmt::Display for SnapshotWarning {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::CollectionLogTruncated { pages } => {
                write!(f, "collection transfer log truncated after {pages} pages")
            }
            Self::ItemProbeTruncated { item, pages } => {
                write!(f, "history probe for item {item} truncated after {pages} pages")
            }
            Self::ItemVerificationFailed { item, reason } => {
                write!(f, "verification of item {item} failed: {reason}")
            }
            Self::OwnerUnresolved { address, reason } => {
                write!(f, "owner of {address} left unresolved: {reason}")
            }
        }
    }
}

/// Derive the completeness flag from a run's accumulated warnings.
pub fn completeness_of(warnings: &[SnapshotWarning]) -> Completeness {
    if warnings.iter().any(SnapshotWarning::is_truncation) {
        Completeness::Degraded
    } else {
        Completeness::Full
    }
}

/// The final, immutable result of one reconstruction run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// The collection the snapshot covers.
    pub collection: Address,
    /// The point in time ownership was reconstructed for.
    pub target_time: DateTime<Utc>,
    /// Number of distinct items in the collection's current set.
    pub item_count: usize,
    /// Number of distinct resolved owners at the target time.
    pub owner_count: usize,
    /// Items per resolved owner. Counts always sum to `item_count`.
    pub balances: BalanceTable,
    /// The distribution ranked by count (display ordering).
    pub ranking: Vec<RankedOwner>,
    /// Whether data collection completed without hitting a ceiling.
    pub completeness: Completeness,
    /// Every non-fatal degradation encountered during the run.
    pub warnings: Vec<SnapshotWarning>,
    /// When the snapshot was produced.
    pub generated_at: DateTime<Utc>,
}
