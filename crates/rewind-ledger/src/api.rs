//! The logical ledger API and its HTTP implementation.
//!
//! [`LedgerQuery`] is the capability set the snapshot engine consumes:
//! list current items, list transfer events, classify an address,
//! invoke a custodial owner lookup. The engine is generic
//! over it, so tests script a ledger in memory while production uses
//! [`HttpLedger`] over the rate-limited source.
//!
//! Wire records are this crate's own REST shape; only the logical
//! capabilities matter to the engine. Timestamps travel as unix
//! seconds, cursors as opaque unsigned integers where `0` (or absence)
//! means end of log.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use rewind_types::{Address, CustodialPattern, EventSource, Item, TransferEvent};

use crate::source::{ApiRequest, RateLimitedSource, Sleep, Transport};
use crate::LedgerError;

// ---------------------------------------------------------------------------
// Wire records
// ---------------------------------------------------------------------------

/// One item row from the present-ownership listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemRecord {
    /// The item's address.
    pub address: String,
    /// The address currently recorded as holding the item.
    pub holder: String,
}

impl ItemRecord {
    /// Convert into the domain [`Item`].
    pub fn into_item(self) -> Item {
        Item {
            address: Address::new(self.address),
            current_holder: Address::new(self.holder),
        }
    }
}

/// One page of the present-ownership listing (offset pagination).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemsPage {
    /// The items on this page.
    #[serde(default)]
    pub items: Vec<ItemRecord>,
}

/// One transfer-event row.
#[derive(Debug, Clone, Deserialize)]
pub struct EventRecord {
    /// The item whose holder changed.
    pub item: String,
    /// The holder before the transfer, absent for mints.
    #[serde(default)]
    pub from: Option<String>,
    /// The holder after the transfer, absent for burns.
    #[serde(default)]
    pub to: Option<String>,
    /// Unix seconds when the ledger recorded the transfer.
    pub timestamp: i64,
}

impl EventRecord {
    /// Convert into the domain [`TransferEvent`].
    ///
    /// Returns `None` when the unix timestamp is outside the
    /// representable range; such rows are dropped rather than aborting
    /// a whole page.
    pub fn to_event(&self, source: EventSource) -> Option<TransferEvent> {
        let timestamp = DateTime::from_timestamp(self.timestamp, 0)?;
        Some(TransferEvent {
            item: Address::new(self.item.clone()),
            from: self.from.clone().map(Address::new),
            to: self.to.clone().map(Address::new),
            timestamp,
            source,
        })
    }
}

/// One page of a transfer log (cursor pagination).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventsPage {
    /// The events on this page, in the ledger's response order.
    #[serde(default)]
    pub events: Vec<EventRecord>,
    /// Opaque "continue before" cursor for the next page. Absent or
    /// zero means the log is exhausted.
    #[serde(default)]
    pub next_cursor: Option<u64>,
}

impl EventsPage {
    /// Convert every decodable row, preserving response order.
    ///
    /// Rows with unrepresentable timestamps are dropped with a warning.
    pub fn into_events(self, source: EventSource) -> Vec<TransferEvent> {
        self.events
            .iter()
            .filter_map(|record| {
                let event = record.to_event(source);
                if event.is_none() {
                    warn!(
                        item = record.item,
                        timestamp = record.timestamp,
                        "dropping transfer event with unrepresentable timestamp"
                    );
                }
                event
            })
            .collect()
    }
}

/// The classification of an address.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressProfile {
    /// Whether the address is a direct holder (a real end owner, not
    /// an intermediary contract).
    pub is_direct_holder: bool,
    /// The address's declared capability interfaces.
    #[serde(default)]
    pub interfaces: Vec<String>,
}

/// The result of a custodial owner lookup.
#[derive(Debug, Clone, Default, Deserialize)]
struct OwnerRecord {
    /// The underlying owner, when the contract exposes one.
    #[serde(default)]
    owner: Option<String>,
}

// ---------------------------------------------------------------------------
// Capability trait
// ---------------------------------------------------------------------------

/// The logical capabilities the snapshot engine consumes from the
/// ledger service.
///
/// Every method is fallible and possibly incomplete: the service is
/// rate-limited and eventually consistent across its own cursors. The
/// pagination strategies and the reconstruction engine are written to
/// tolerate that.
pub trait LedgerQuery {
    /// List one page of the collection's current items and holders.
    fn collection_items(
        &self,
        collection: &Address,
        limit: u32,
        offset: u64,
    ) -> impl Future<Output = Result<ItemsPage, LedgerError>>;

    /// List one page of the collection-wide transfer log.
    ///
    /// The first page is seeded with `since` (a lower time bound);
    /// subsequent pages pass the previous page's cursor instead.
    fn collection_transfers(
        &self,
        collection: &Address,
        since: Option<DateTime<Utc>>,
        cursor: Option<u64>,
    ) -> impl Future<Output = Result<EventsPage, LedgerError>>;

    /// List the most recent transfer events of a single item.
    fn item_transfers(
        &self,
        item: &Address,
        limit: u32,
    ) -> impl Future<Output = Result<EventsPage, LedgerError>>;

    /// List a single item's transfer events strictly before an upper
    /// time bound, newest first.
    fn item_transfers_before(
        &self,
        item: &Address,
        before: DateTime<Utc>,
        limit: u32,
    ) -> impl Future<Output = Result<EventsPage, LedgerError>>;

    /// Classify an address: direct holder or intermediary, plus its
    /// declared interfaces.
    fn classify_address(
        &self,
        address: &Address,
    ) -> impl Future<Output = Result<AddressProfile, LedgerError>>;

    /// Invoke the owner-lookup method of a known custodial pattern.
    fn owner_lookup(
        &self,
        custodian: &Address,
        pattern: CustodialPattern,
    ) -> impl Future<Output = Result<Option<Address>, LedgerError>>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// [`LedgerQuery`] over HTTP, paced by a [`RateLimitedSource`].
#[derive(Debug)]
pub struct HttpLedger<T, S> {
    source: RateLimitedSource<T, S>,
}

impl<T: Transport, S: Sleep> HttpLedger<T, S> {
    /// Wrap a rate-limited source.
    pub const fn new(source: RateLimitedSource<T, S>) -> Self {
        Self { source }
    }

    async fn fetch<R: serde::de::DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> Result<R, LedgerError> {
        let value = self.source.execute(request).await?;
        Ok(serde_json::from_value(value)?)
    }
}

impl<T: Transport, S: Sleep> LedgerQuery for HttpLedger<T, S> {
    async fn collection_items(
        &self,
        collection: &Address,
        limit: u32,
        offset: u64,
    ) -> Result<ItemsPage, LedgerError> {
        let request = ApiRequest::new(format!("/v1/collections/{collection}/items"))
            .with("limit", limit)
            .with("offset", offset);
        self.fetch(&request).await
    }

    async fn collection_transfers(
        &self,
        collection: &Address,
        since: Option<DateTime<Utc>>,
        cursor: Option<u64>,
    ) -> Result<EventsPage, LedgerError> {
        let mut request = ApiRequest::new(format!("/v1/collections/{collection}/transfers"));
        if let Some(since) = since {
            request = request.with("since", since.timestamp());
        }
        if let Some(cursor) = cursor {
            request = request.with("before_cursor", cursor);
        }
        self.fetch(&request).await
    }

    async fn item_transfers(&self, item: &Address, limit: u32) -> Result<EventsPage, LedgerError> {
        let request =
            ApiRequest::new(format!("/v1/items/{item}/transfers")).with("limit", limit);
        self.fetch(&request).await
    }

    async fn item_transfers_before(
        &self,
        item: &Address,
        before: DateTime<Utc>,
        limit: u32,
    ) -> Result<EventsPage, LedgerError> {
        let request = ApiRequest::new(format!("/v1/items/{item}/transfers"))
            .with("before", before.timestamp())
            .with("limit", limit);
        self.fetch(&request).await
    }

    async fn classify_address(&self, address: &Address) -> Result<AddressProfile, LedgerError> {
        let request = ApiRequest::new(format!("/v1/accounts/{address}"));
        self.fetch(&request).await
    }

    async fn owner_lookup(
        &self,
        custodian: &Address,
        pattern: CustodialPattern,
    ) -> Result<Option<Address>, LedgerError> {
        let request = ApiRequest::new(format!(
            "/v1/accounts/{custodian}/methods/{}",
            pattern.lookup_method()
        ));
        let record: OwnerRecord = self.fetch(&request).await?;
        Ok(record.owner.map(Address::new))
    }
}
