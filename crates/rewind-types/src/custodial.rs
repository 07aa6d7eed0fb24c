//! Known custodial contract patterns.
//!
//! Some addresses recorded as holders are not real owners: they hold an
//! item on someone's behalf (a marketplace escrow while the item is
//! listed for sale, for example). The owner resolver unwinds these to
//! the underlying owner, but only for patterns it positively recognizes
//! from the address's declared interface set. Everything else is
//! treated as a real owner -- best effort, by design.
//!
//! The set is deliberately closed and small; adding a pattern means
//! adding a variant, its interface markers, and its lookup method here.

use serde::{Deserialize, Serialize};

/// Interface markers that identify a marketplace escrow contract.
const MARKETPLACE_ESCROW_INTERFACES: [&str; 3] =
    ["marketplace_escrow", "item_sale", "item_sale_v2"];

/// A custodial contract pattern the resolver knows how to unwind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustodialPattern {
    /// A marketplace escrow holding an item while it is listed for
    /// sale. Its owner-lookup method returns the seller.
    MarketplaceEscrow,
}

impl CustodialPattern {
    /// Match a declared interface set against the known patterns.
    ///
    /// Returns `None` when no pattern matches, in which case the
    /// address is treated as its own final owner.
    pub fn detect(interfaces: &[String]) -> Option<Self> {
        let escrow = interfaces
            .iter()
            .any(|i| MARKETPLACE_ESCROW_INTERFACES.contains(&i.as_str()));
        escrow.then_some(Self::MarketplaceEscrow)
    }

    /// The ledger-side owner-lookup method for this pattern.
    pub const fn lookup_method(self) -> &'static str {
        match self {
            Self::MarketplaceEscrow => "sale_owner",
        }
    }

    /// Stable name for logging and query parameters.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MarketplaceEscrow => "marketplace_escrow",
        }
    }
}

impl core::fmt::Display for CustodialPattern {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
