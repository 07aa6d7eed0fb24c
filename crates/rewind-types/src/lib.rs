//! Shared domain types for the Rewind ownership snapshot engine.
//!
//! Rewind reconstructs the historical ownership distribution of a fixed
//! collection of uniquely identified items as of an arbitrary past point
//! in time, by replaying a transfer-event log backward from the present.
//! This crate holds the vocabulary every other crate speaks:
//!
//! - [`address`] -- The [`Address`] newtype identifying items, holders,
//!   and custodial contracts.
//! - [`event`] -- The [`TransferEvent`] record and its provenance tag.
//! - [`ownership`] -- The current item set, the total [`OwnershipMap`],
//!   and the [`BalanceTable`] it aggregates into.
//! - [`custodial`] -- The closed set of known custodial contract
//!   patterns the owner resolver can unwind.
//! - [`snapshot`] -- The final immutable [`Snapshot`] record, its
//!   completeness flag, and the non-fatal warnings accumulated along
//!   the way.
//!
//! All types are plain data: no I/O, no clocks, no network. The engine
//! and ledger crates own the behavior.

pub mod address;
pub mod custodial;
pub mod event;
pub mod ownership;
pub mod snapshot;

pub use address::Address;
pub use custodial::CustodialPattern;
pub use event::{EventSource, TransferEvent};
pub use ownership::{BalanceTable, Item, OwnershipMap, RankedOwner};
pub use snapshot::{completeness_of, Completeness, Snapshot, SnapshotWarning};
