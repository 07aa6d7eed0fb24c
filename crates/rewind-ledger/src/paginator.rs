//! Pagination strategies for pulling a complete transfer log.
//!
//! Two strategies with different termination policies:
//!
//! - [`collect_collection_log`] walks the collection-wide log with the
//!   ledger's opaque cursor, seeded by a start-time lower bound. It
//!   stops on an empty/zero cursor or an empty page; a hard 100-page
//!   ceiling guards against a looping or inconsistent cursor and is
//!   surfaced as degraded completeness, never ignored.
//! - [`probe_item_history`] verifies a single item believed to have no
//!   collection-level events. The primary call reads the item's own
//!   recent history; if that fails, a windowed walk moves backward from
//!   now using an upper time bound, stopping once a page crosses the
//!   target boundary. A 10-page ceiling marks the probe degraded for
//!   that one item.
//!
//! Within one invocation neither strategy re-queries a range it has
//! already fully paged, so the output sequence is deduplicated by
//! construction.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use rewind_types::{Address, EventSource, TransferEvent};

use crate::api::LedgerQuery;
use crate::LedgerError;

/// Hard page ceiling for the collection-wide cursor walk.
pub const COLLECTION_PAGE_CEILING: u32 = 100;

/// Hard page ceiling for one item's windowed fallback walk.
pub const ITEM_PAGE_CEILING: u32 = 10;

/// Page size for per-item history calls.
pub const ITEM_PROBE_PAGE_SIZE: u32 = 25;

/// The collection-wide transfer log collected by the cursor walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedLog {
    /// Events in ledger response order across pages.
    pub events: Vec<TransferEvent>,
    /// False when the page ceiling cut the walk short.
    pub complete: bool,
}

/// The post-target events found by one item's verification probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemProbe {
    /// Events with `timestamp > target`, in response order.
    pub events: Vec<TransferEvent>,
    /// False when the windowed walk hit its page ceiling.
    pub complete: bool,
}

/// Pull the collection-wide transfer log since a lower time bound.
///
/// The first page is seeded with `since`; each subsequent page passes
/// the previous page's "continue before" cursor. See the module docs
/// for the termination policy.
///
/// # Errors
///
/// Propagates any [`LedgerError`]; a failure here aborts the whole
/// pagination pass (the collection-wide log is a fatal dependency of
/// the reconstruction).
pub async fn collect_collection_log<L: LedgerQuery>(
    ledger: &L,
    collection: &Address,
    since: DateTime<Utc>,
) -> Result<CollectedLog, LedgerError> {
    let mut events: Vec<TransferEvent> = Vec::new();
    let mut cursor: Option<u64> = None;
    let mut pages: u32 = 0;

    loop {
        if pages >= COLLECTION_PAGE_CEILING {
            warn!(
                collection = %collection,
                pages = pages,
                events = events.len(),
                "collection transfer log hit page ceiling, continuing degraded"
            );
            return Ok(CollectedLog {
                events,
                complete: false,
            });
        }

        let page = if pages == 0 {
            ledger
                .collection_transfers(collection, Some(since), None)
                .await?
        } else {
            ledger.collection_transfers(collection, None, cursor).await?
        };
        pages = pages.saturating_add(1);

        let next_cursor = page.next_cursor;
        let page_events = page.into_events(EventSource::CollectionLog);

        debug!(
            collection = %collection,
            page = pages,
            page_events = page_events.len(),
            next_cursor = ?next_cursor,
            "collection transfer page fetched"
        );

        if page_events.is_empty() {
            return Ok(CollectedLog {
                events,
                complete: true,
            });
        }
        events.extend(page_events);

        match next_cursor {
            None | Some(0) => {
                return Ok(CollectedLog {
                    events,
                    complete: true,
                });
            }
            Some(next) => cursor = Some(next),
        }
    }
}

/// Re-check a single item's history for transfers after `target`.
///
/// Primary path: one call for the item's recent history, filtered to
/// post-target events. Fallback path (only when the primary call
/// fails): windowed walk backward from `now`, described in the module
/// docs.
///
/// # Errors
///
/// Returns a [`LedgerError`] only when both the primary call and the
/// windowed fallback fail; the caller treats that as a non-fatal,
/// per-item degradation.
pub async fn probe_item_history<L: LedgerQuery>(
    ledger: &L,
    item: &Address,
    target: DateTime<Utc>,
) -> Result<ItemProbe, LedgerError> {
    match ledger.item_transfers(item, ITEM_PROBE_PAGE_SIZE).await {
        Ok(page) => {
            let events = page
                .into_events(EventSource::ItemProbe)
                .into_iter()
                .filter(|e| e.is_after(target))
                .collect();
            Ok(ItemProbe {
                events,
                complete: true,
            })
        }
        Err(primary_err) => {
            warn!(
                item = %item,
                error = %primary_err,
                "primary item history call failed, falling back to windowed walk"
            );
            windowed_probe(ledger, item, target).await
        }
    }
}

/// Windowed fallback: walk the item's history backward from now.
///
/// Each page is bounded above by the oldest timestamp seen so far.
/// Events after the target are collected; a page containing any event
/// at or before the target has crossed the boundary and ends the range
/// (this leans on the ledger returning windows in descending or
/// boundary order -- if that assumption breaks, the walk can end
/// early). A window that fails to advance also terminates, since
/// re-querying the same range would loop forever.
async fn windowed_probe<L: LedgerQuery>(
    ledger: &L,
    item: &Address,
    target: DateTime<Utc>,
) -> Result<ItemProbe, LedgerError> {
    let mut events: Vec<TransferEvent> = Vec::new();
    let mut upper = Utc::now();
    let mut pages: u32 = 0;

    loop {
        if pages >= ITEM_PAGE_CEILING {
            warn!(
                item = %item,
                pages = pages,
                "item history walk hit page ceiling, probe degraded"
            );
            return Ok(ItemProbe {
                events,
                complete: false,
            });
        }

        let page = ledger
            .item_transfers_before(item, upper, ITEM_PROBE_PAGE_SIZE)
            .await?;
        pages = pages.saturating_add(1);

        let page_events = page.into_events(EventSource::ItemProbe);
        if page_events.is_empty() {
            // History exhausted before reaching the target boundary.
            return Ok(ItemProbe {
                events,
                complete: true,
            });
        }

        let crossed_boundary = page_events.iter().any(|e| !e.is_after(target));
        let oldest = page_events.iter().map(|e| e.timestamp).min();

        if crossed_boundary {
            events.extend(page_events.into_iter().filter(|e| e.is_after(target)));
            return Ok(ItemProbe {
                events,
                complete: true,
            });
        }

        match oldest {
            Some(oldest) if oldest < upper => {
                events.extend(page_events.into_iter().filter(|e| e.is_after(target)));
                upper = oldest;
            }
            _ => {
                // The window re-served an already-collected range;
                // stop rather than loop, and do not collect it twice.
                warn!(
                    item = %item,
                    upper = %upper,
                    "item history window failed to advance, probe degraded"
                );
                return Ok(ItemProbe {
                    events,
                    complete: false,
                });
            }
        }
    }
}
