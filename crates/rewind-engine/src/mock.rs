//! Scripted in-memory ledger for engine tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use rewind_ledger::api::{AddressProfile, EventRecord, EventsPage, ItemRecord, ItemsPage};
use rewind_ledger::{LedgerError, LedgerQuery};
use rewind_types::{Address, CustodialPattern};

/// A ledger backed by plain maps, with call counting for the
/// memoization tests.
#[derive(Default)]
pub(crate) struct MockLedger {
    /// The collection's current items, in listing order.
    pub items: Vec<ItemRecord>,
    /// The collection-wide transfer log (served as a single page).
    pub collection_events: Vec<EventRecord>,
    /// When true, the collection log always returns the same page with
    /// a live cursor, simulating pagination that never terminates.
    pub endless_collection_cursor: bool,
    /// Per-item histories for the verification probes.
    pub item_histories: BTreeMap<Address, Vec<EventRecord>>,
    /// Items whose probes fail on every path.
    pub failing_probes: BTreeSet<Address>,
    /// Address classifications. Unlisted addresses classify as direct
    /// holders with no interfaces.
    pub profiles: BTreeMap<Address, AddressProfile>,
    /// Addresses whose classification query fails.
    pub failing_classifications: BTreeSet<Address>,
    /// Custodian -> underlying owner for the owner-lookup capability.
    pub owners: BTreeMap<Address, Address>,
    /// How many times each address has been classified.
    pub classify_calls: RefCell<BTreeMap<Address, usize>>,
}

impl MockLedger {
    /// Script an address as a marketplace escrow.
    pub fn add_escrow(&mut self, custodian: &Address, owner: Option<Address>) {
        self.profiles.insert(
            custodian.clone(),
            AddressProfile {
                is_direct_holder: false,
                interfaces: vec!["marketplace_escrow".to_owned()],
            },
        );
        if let Some(owner) = owner {
            self.owners.insert(custodian.clone(), owner);
        }
    }

    /// How many classification queries an address has received.
    pub fn classify_count(&self, address: &Address) -> usize {
        self.classify_calls
            .borrow()
            .get(address)
            .copied()
            .unwrap_or(0)
    }

    fn transport_failure(path: String) -> LedgerError {
        LedgerError::Transport {
            path,
            reason: "scripted failure".to_owned(),
        }
    }
}

impl LedgerQuery for MockLedger {
    async fn collection_items(
        &self,
        _collection: &Address,
        limit: u32,
        offset: u64,
    ) -> Result<ItemsPage, LedgerError> {
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let items = self
            .items
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok(ItemsPage { items })
    }

    async fn collection_transfers(
        &self,
        _collection: &Address,
        since: Option<DateTime<Utc>>,
        _cursor: Option<u64>,
    ) -> Result<EventsPage, LedgerError> {
        if self.endless_collection_cursor {
            return Ok(EventsPage {
                events: self.collection_events.clone(),
                next_cursor: Some(1),
            });
        }
        // Single-page log: the seeded first call gets everything, the
        // paginator stops on the missing cursor.
        let events = if since.is_some() {
            self.collection_events.clone()
        } else {
            Vec::new()
        };
        Ok(EventsPage {
            events,
            next_cursor: None,
        })
    }

    async fn item_transfers(&self, item: &Address, _limit: u32) -> Result<EventsPage, LedgerError> {
        if self.failing_probes.contains(item) {
            return Err(Self::transport_failure(format!(
                "/v1/items/{item}/transfers"
            )));
        }
        Ok(EventsPage {
            events: self.item_histories.get(item).cloned().unwrap_or_default(),
            next_cursor: None,
        })
    }

    async fn item_transfers_before(
        &self,
        item: &Address,
        before: DateTime<Utc>,
        _limit: u32,
    ) -> Result<EventsPage, LedgerError> {
        if self.failing_probes.contains(item) {
            return Err(Self::transport_failure(format!(
                "/v1/items/{item}/transfers"
            )));
        }
        let events = self
            .item_histories
            .get(item)
            .map(|history| {
                history
                    .iter()
                    .filter(|e| e.timestamp < before.timestamp())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(EventsPage {
            events,
            next_cursor: None,
        })
    }

    async fn classify_address(&self, address: &Address) -> Result<AddressProfile, LedgerError> {
        {
            let mut calls = self.classify_calls.borrow_mut();
            let count = calls.entry(address.clone()).or_insert(0);
            *count = count.saturating_add(1);
        }
        if self.failing_classifications.contains(address) {
            return Err(Self::transport_failure(format!("/v1/accounts/{address}")));
        }
        Ok(self
            .profiles
            .get(address)
            .cloned()
            .unwrap_or(AddressProfile {
                is_direct_holder: true,
                interfaces: Vec::new(),
            }))
    }

    async fn owner_lookup(
        &self,
        custodian: &Address,
        _pattern: CustodialPattern,
    ) -> Result<Option<Address>, LedgerError> {
        Ok(self.owners.get(custodian).cloned())
    }
}

/// Build an event record for tests.
pub(crate) fn event_record(item: &str, from: Option<&str>, to: &str, secs: i64) -> EventRecord {
    EventRecord {
        item: item.to_owned(),
        from: from.map(ToOwned::to_owned),
        to: Some(to.to_owned()),
        timestamp: secs,
    }
}

/// Build an item record for tests.
pub(crate) fn item_record(address: &str, holder: &str) -> ItemRecord {
    ItemRecord {
        address: address.to_owned(),
        holder: holder.to_owned(),
    }
}
