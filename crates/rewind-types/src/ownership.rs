//! The current item set, the ownership map, and the balance table.
//!
//! # Invariants
//!
//! - An [`OwnershipMap`]'s domain is fixed at construction: exactly the
//!   current item set, one entry per item, never partial. Reassignment
//!   only ever overwrites existing entries.
//! - A [`BalanceTable`]'s counts always sum to the number of items that
//!   were credited into it: every item contributes exactly one count to
//!   exactly one owner.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// One item of the collection together with its present-day holder.
///
/// Created by the present-ownership query; never mutated afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// The item's own address (its identity within the collection).
    pub address: Address,
    /// The address currently recorded as holding the item.
    pub current_holder: Address,
}

// ---------------------------------------------------------------------------
// Ownership map
// ---------------------------------------------------------------------------

/// A total mapping from item address to holder address.
///
/// The domain is exactly the item set passed to [`OwnershipMap::from_items`].
/// [`assign`](OwnershipMap::assign) overwrites entries for known items and
/// ignores unknown ones, so the map can never grow, shrink, or go partial
/// while the reconstruction replays events over it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipMap {
    entries: BTreeMap<Address, Address>,
}

impl OwnershipMap {
    /// Build the map from the current item set, one entry per item.
    pub fn from_items(items: &[Item]) -> Self {
        let entries = items
            .iter()
            .map(|item| (item.address.clone(), item.current_holder.clone()))
            .collect();
        Self { entries }
    }

    /// Number of items in the map.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map holds no items.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the recorded holder of an item, if the item is known.
    pub fn holder_of(&self, item: &Address) -> Option<&Address> {
        self.entries.get(item)
    }

    /// Overwrite the holder of a known item.
    ///
    /// Returns `false` (and changes nothing) when the item is not part
    /// of the map's fixed domain, which keeps stray events for foreign
    /// items from widening the item set.
    pub fn assign(&mut self, item: &Address, holder: Address) -> bool {
        match self.entries.get_mut(item) {
            Some(entry) => {
                *entry = holder;
                true
            }
            None => false,
        }
    }

    /// Iterate over `(item, holder)` pairs in address order.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &Address)> {
        self.entries.iter()
    }

    /// Iterate over the item addresses in address order.
    pub fn items(&self) -> impl Iterator<Item = &Address> {
        self.entries.keys()
    }
}

// ---------------------------------------------------------------------------
// Balance table
// ---------------------------------------------------------------------------

/// One row of the ranked ownership distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedOwner {
    /// The resolved owner address.
    pub address: Address,
    /// How many items the owner held at the target time.
    pub count: u64,
}

/// Items-per-owner tally over resolved owner addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceTable {
    counts: BTreeMap<Address, u64>,
}

impl BalanceTable {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self {
            counts: BTreeMap::new(),
        }
    }

    /// Credit one item to an owner.
    pub fn credit(&mut self, owner: Address) {
        let count = self.counts.entry(owner).or_insert(0);
        *count = count.saturating_add(1);
    }

    /// Number of distinct owners in the table.
    pub fn owner_count(&self) -> usize {
        self.counts.len()
    }

    /// Sum of all counts. Equals the number of items credited.
    pub fn total(&self) -> u64 {
        self.counts.values().fold(0_u64, |acc, c| acc.saturating_add(*c))
    }

    /// Return the count for one owner, zero if absent.
    pub fn count_for(&self, owner: &Address) -> u64 {
        self.counts.get(owner).copied().unwrap_or(0)
    }

    /// Iterate over `(owner, count)` pairs in address order.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, u64)> {
        self.counts.iter().map(|(owner, count)| (owner, *count))
    }

    /// Produce the ranked distribution: count descending, address
    /// ascending on equal counts.
    ///
    /// The tie-break is for display stability only; it carries no
    /// correctness weight.
    pub fn ranked(&self) -> Vec<RankedOwner> {
        let mut rows: Vec<RankedOwner> = self
            .counts
            .iter()
            .map(|(address, count)| RankedOwner {
                address: address.clone(),
                count: *count,
            })
            .collect();
        // Stable sort over the address-ordered rows keeps ties ascending.
        rows.sort_by(|a, b| b.count.cmp(&a.count));
        rows
    }
}
