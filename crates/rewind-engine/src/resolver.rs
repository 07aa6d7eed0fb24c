//! Owner resolution: unwinding custodial contracts to real owners.
//!
//! A holder recorded by the ledger may be a custodial contract (a
//! marketplace escrow, say) rather than a person's wallet. The resolver
//! classifies each address and, for positively recognized custodial
//! patterns, follows the contract's owner-lookup to the underlying
//! owner -- repeatedly, since an owner can itself be custodial.
//!
//! Resolution is **total**: every internal failure degrades to "the
//! address is its own owner" with a warning, never an error. The walk
//! is an explicit bounded loop with a visited chain, so a cyclical or
//! pathological custodial chain terminates instead of recursing
//! unboundedly. Results are memoized for the lifetime of one run: once
//! an address resolves, it never resolves differently, and a cache hit
//! issues no classification query at all.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use rewind_ledger::LedgerQuery;
use rewind_types::{Address, CustodialPattern, SnapshotWarning};

/// Maximum custodial hops followed before giving up on a chain.
///
/// Real custodial chains are one or two hops deep; the bound exists so
/// a pathological ledger answer cannot walk forever.
pub const MAX_RESOLUTION_HOPS: usize = 8;

/// What one classification step decided.
enum Step {
    /// The walk ends here; the address is the final owner.
    Terminal,
    /// The address is custodial; continue at its underlying owner.
    Next(Address),
}

/// Memoizing resolver from holder addresses to real owners.
///
/// Owned by a single reconstruction run; the cache is monotonic and
/// never shared across runs.
pub struct OwnerResolver<'a, L> {
    ledger: &'a L,
    cache: BTreeMap<Address, Address>,
    warnings: Vec<SnapshotWarning>,
}

impl<'a, L: LedgerQuery> OwnerResolver<'a, L> {
    /// Create a resolver with an empty cache.
    pub const fn new(ledger: &'a L) -> Self {
        Self {
            ledger,
            cache: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Resolve an address to its real owner. Total; never fails.
    ///
    /// Cache hits return immediately. Otherwise the custodial chain is
    /// walked hop by hop; whatever terminates the walk (a direct
    /// holder, an unrecognized address, a failure, a cycle, or the hop
    /// bound) becomes the owner for *every* address visited on the way,
    /// so owner-of-owner chains are cached end to end.
    pub async fn resolve(&mut self, address: &Address) -> Address {
        if let Some(hit) = self.cache.get(address) {
            return hit.clone();
        }

        let mut chain: Vec<Address> = vec![address.clone()];
        let mut current = address.clone();

        let terminal = loop {
            if chain.len() > MAX_RESOLUTION_HOPS {
                warn!(
                    address = %address,
                    hops = chain.len(),
                    "custodial chain exceeded hop bound, stopping"
                );
                self.warnings.push(SnapshotWarning::OwnerUnresolved {
                    address: current.clone(),
                    reason: format!("custodial chain exceeded {MAX_RESOLUTION_HOPS} hops"),
                });
                break current;
            }

            if let Some(hit) = self.cache.get(&current) {
                break hit.clone();
            }

            match self.classify_step(&current).await {
                Step::Terminal => break current,
                Step::Next(owner) => {
                    if chain.contains(&owner) {
                        warn!(
                            address = %current,
                            owner = %owner,
                            "custodial chain cycles, stopping"
                        );
                        self.warnings.push(SnapshotWarning::OwnerUnresolved {
                            address: current.clone(),
                            reason: format!("custodial cycle through {owner}"),
                        });
                        break current;
                    }
                    debug!(custodian = %current, owner = %owner, "following custodial hop");
                    chain.push(owner.clone());
                    current = owner;
                }
            }
        };

        for visited in chain {
            self.cache.insert(visited, terminal.clone());
        }
        terminal
    }

    /// Classify one address and decide how the walk proceeds.
    ///
    /// Every failure path is terminal by the best-effort policy: the
    /// address stands as its own owner and the reason is recorded.
    async fn classify_step(&mut self, current: &Address) -> Step {
        let profile = match self.ledger.classify_address(current).await {
            Ok(profile) => profile,
            Err(err) => {
                warn!(address = %current, error = %err, "address classification failed");
                self.warnings.push(SnapshotWarning::OwnerUnresolved {
                    address: current.clone(),
                    reason: format!("classification failed: {err}"),
                });
                return Step::Terminal;
            }
        };

        if profile.is_direct_holder {
            return Step::Terminal;
        }

        let Some(pattern) = CustodialPattern::detect(&profile.interfaces) else {
            self.warnings.push(SnapshotWarning::OwnerUnresolved {
                address: current.clone(),
                reason: "no known custodial pattern".to_owned(),
            });
            return Step::Terminal;
        };

        match self.ledger.owner_lookup(current, pattern).await {
            Ok(Some(owner)) => Step::Next(owner),
            Ok(None) => {
                self.warnings.push(SnapshotWarning::OwnerUnresolved {
                    address: current.clone(),
                    reason: format!("{pattern} owner lookup returned no owner"),
                });
                Step::Terminal
            }
            Err(err) => {
                warn!(address = %current, error = %err, "owner lookup failed");
                self.warnings.push(SnapshotWarning::OwnerUnresolved {
                    address: current.clone(),
                    reason: format!("{pattern} owner lookup failed: {err}"),
                });
                Step::Terminal
            }
        }
    }

    /// Number of addresses resolved so far.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Drain the warnings accumulated by resolution.
    pub fn take_warnings(&mut self) -> Vec<SnapshotWarning> {
        core::mem::take(&mut self.warnings)
    }
}
