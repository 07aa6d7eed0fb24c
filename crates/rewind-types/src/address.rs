//! The [`Address`] newtype.
//!
//! Items, wallets, collections, and custodial contracts are all
//! identified by ledger addresses. The engine never interprets the
//! text; normalization is the caller's concern. Addresses are ordered
//! so they can key [`BTreeMap`]s deterministically.
//!
//! [`BTreeMap`]: std::collections::BTreeMap

use serde::{Deserialize, Serialize};

/// An opaque ledger address.
///
/// Comparison is plain byte order on the underlying string, which gives
/// every map and ranking in the pipeline a stable iteration order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Wrap a raw address string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Return the address text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the owned string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for Address {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Address {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for Address {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}
