//! Balance aggregation over resolved owners.

use tracing::info;

use rewind_ledger::LedgerQuery;
use rewind_types::{BalanceTable, OwnershipMap};

use crate::resolver::OwnerResolver;

/// Fold a reconstructed ownership map into per-owner balances.
///
/// Each item credits exactly one owner, the resolved one, so the
/// table's total always equals the map's item count regardless of how
/// many resolutions degraded. Distinct holders that unwind to the same
/// real owner collapse into a single row.
pub async fn aggregate_balances<L: LedgerQuery>(
    ownership: &OwnershipMap,
    resolver: &mut OwnerResolver<'_, L>,
) -> BalanceTable {
    let mut balances = BalanceTable::default();
    for (_, holder) in ownership.iter() {
        let owner = resolver.resolve(holder).await;
        balances.credit(owner);
    }

    info!(
        items = ownership.len(),
        owners = balances.owner_count(),
        resolved = resolver.cache_len(),
        "balances aggregated"
    );
    balances
}
