//! The snapshot run: fetch, rewind, verify, resolve, aggregate.
//!
//! `take_snapshot` is the crate's entry point. It owns the propagation
//! policy end to end: the two collection-wide fetches (the item listing
//! and the transfer log) are fatal on failure, everything downstream
//! degrades into [`SnapshotWarning`]s and the run still produces a
//! snapshot.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use rewind_ledger::paginator::{collect_collection_log, COLLECTION_PAGE_CEILING};
use rewind_ledger::LedgerQuery;
use rewind_types::{
    completeness_of, Address, Item, OwnershipMap, Snapshot, SnapshotWarning,
};

use crate::aggregate::aggregate_balances;
use crate::reconstruct::{rewind_ownership, verify_quiet_items};
use crate::resolver::OwnerResolver;
use crate::EngineError;

/// Page size for listing the collection's current items.
pub const ITEM_LIST_PAGE_SIZE: u32 = 100;

/// Fetch the collection's complete current item set.
///
/// Plain offset pagination; a page shorter than the requested size is
/// the last one, so the walk needs no ceiling.
async fn fetch_all_items<L: LedgerQuery>(
    ledger: &L,
    collection: &Address,
) -> Result<Vec<Item>, EngineError> {
    let mut items: Vec<Item> = Vec::new();
    let mut offset: u64 = 0;

    loop {
        let page = ledger
            .collection_items(collection, ITEM_LIST_PAGE_SIZE, offset)
            .await?;
        let page_len = page.items.len();
        items.extend(page.items.into_iter().map(|r| r.into_item()));

        if page_len < usize::try_from(ITEM_LIST_PAGE_SIZE).unwrap_or(usize::MAX) {
            return Ok(items);
        }
        offset = offset.saturating_add(u64::from(ITEM_LIST_PAGE_SIZE));
    }
}

/// Reconstruct ownership of `collection` as of `target` and aggregate
/// it into a ranked per-owner snapshot.
///
/// # Errors
///
/// Returns [`EngineError`] only when a collection-wide fetch fails (the
/// item listing or the transfer log). All per-item and per-owner
/// failures degrade to warnings on the returned snapshot.
pub async fn take_snapshot<L: LedgerQuery>(
    ledger: &L,
    collection: &Address,
    target: DateTime<Utc>,
) -> Result<Snapshot, EngineError> {
    info!(collection = %collection, target = %target, "snapshot run starting");
    let mut warnings: Vec<SnapshotWarning> = Vec::new();

    let items = fetch_all_items(ledger, collection).await?;
    // The map is keyed by item address, so rows the listing repeated
    // across offset pages collapse here. The item count is the map's
    // size, never the raw row count, which keeps the balance totals
    // honest when the listing shifted under the pagination.
    let initial = OwnershipMap::from_items(&items);
    let item_count = initial.len();
    if item_count < items.len() {
        warn!(
            rows = items.len(),
            items = item_count,
            "listing repeated item rows across pages, collapsed by address"
        );
    }
    info!(items = item_count, "current item set fetched");

    let log = collect_collection_log(ledger, collection, target).await?;
    if !log.complete {
        warnings.push(SnapshotWarning::CollectionLogTruncated {
            pages: COLLECTION_PAGE_CEILING,
        });
    }

    let rewound = rewind_ownership(initial, &log.events, target);
    let mut ownership = rewound.ownership;
    verify_quiet_items(ledger, &mut ownership, target, &rewound.detected, &mut warnings).await;

    let mut resolver = OwnerResolver::new(ledger);
    let balances = aggregate_balances(&ownership, &mut resolver).await;
    warnings.extend(resolver.take_warnings());

    let ranking = balances.ranked();
    let completeness = completeness_of(&warnings);
    info!(
        items = item_count,
        owners = balances.owner_count(),
        warnings = warnings.len(),
        completeness = ?completeness,
        "snapshot run finished"
    );

    Ok(Snapshot {
        collection: collection.clone(),
        target_time: target,
        item_count,
        owner_count: balances.owner_count(),
        balances,
        ranking,
        completeness,
        warnings,
        generated_at: Utc::now(),
    })
}
