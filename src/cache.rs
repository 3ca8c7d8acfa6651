//! The selector cache: a dependency-keyed tree of memoized results.
//!
//! ## Architecture
//!
//! One tier per dependency-chain link, then a final strong results tier
//! keyed by the call's cache key:
//!
//! ```text
//!   root (flavor of dep[0])
//!     └── dep[0] ──► tier (flavor of dep[1])
//!                      └── dep[1] ──► results: FxHashMap<CacheKey, Arc<R>>
//!                                       ├── "10"  ──► Arc<R>
//!                                       └── "11"  ──► Arc<R>
//! ```
//!
//! ## Core Operations
//! - `select_with`: the memoized read; walks the chain, creating empty
//!   tiers at the point of divergence, and computes only on a miss.
//! - `lookup` / `insert`: the split halves of `select_with`, for callers
//!   that manage computation themselves.
//! - `clear`: back to the empty state; the next call re-decides the root
//!   tier's flavor from its first dependency.
//! - `prune_stale`: sweeps weak slots whose key objects have been freed.
//!
//! ## Invariants
//! - The root is created lazily; its flavor is fixed until the cache
//!   empties.
//! - Every path through a populated tree has the same depth, equal to the
//!   dependency-chain length that built it. A call with a different chain
//!   length resets the tree and rebuilds from scratch.
//! - The results tier is always strong; cache keys are primitive by
//!   construction.
//! - A cached result stays valid until its chain diverges by identity or
//!   the cache is cleared; nothing here compares values deeply.
//!
//! ## Failure Semantics
//! Never fails. A panicking compute propagates; tiers created during the
//! walk remain, but no result entry is written.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::dependency::Dependency;
use crate::ds::{TierMap, TierNode};
#[cfg(any(test, debug_assertions))]
use crate::error::InvariantError;
use crate::key::CacheKey;

/// How a memoized read was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Result found under the current chain and key.
    Hit,
    /// Computed and stored.
    Stored,
    /// Computed and stored after the chain length changed and the tree was
    /// rebuilt.
    StoredAfterReset,
    /// Computed without caching: the chain was empty, or a dependency's
    /// flavor did not fit an existing tier.
    Bypassed,
}

enum Walk<'a, R> {
    Results {
        results: &'a mut FxHashMap<CacheKey, Arc<R>>,
        reset: bool,
    },
    Bypassed,
}

/// Dependency-keyed result cache for one memoized selector.
#[derive(Debug)]
pub struct SelectorCache<R> {
    root: Option<TierMap<R>>,
    chain_len: usize,
    prune_watermark: usize,
}

impl<R> SelectorCache<R> {
    /// Creates an empty cache. Weak tiers sweep dead slots once they grow
    /// past `prune_watermark` entries.
    pub fn new(prune_watermark: usize) -> Self {
        Self {
            root: None,
            chain_len: 0,
            prune_watermark,
        }
    }

    /// The memoized read. Walks `deps`, returning the entry under `key` if
    /// present, otherwise running `compute` and storing its result.
    ///
    /// An empty chain cannot key a tier, so it computes without caching.
    pub fn select_with<F>(
        &mut self,
        deps: &[Dependency],
        key: &CacheKey,
        compute: F,
    ) -> (Arc<R>, CacheOutcome)
    where
        F: FnOnce() -> R,
    {
        if deps.is_empty() {
            return (Arc::new(compute()), CacheOutcome::Bypassed);
        }
        match self.walk_mut(deps) {
            Walk::Bypassed => (Arc::new(compute()), CacheOutcome::Bypassed),
            Walk::Results { results, reset } => {
                if let Some(found) = results.get(key) {
                    return (Arc::clone(found), CacheOutcome::Hit);
                }
                let computed = Arc::new(compute());
                results.insert(key.clone(), Arc::clone(&computed));
                let outcome = if reset {
                    CacheOutcome::StoredAfterReset
                } else {
                    CacheOutcome::Stored
                };
                (computed, outcome)
            },
        }
    }

    /// Looks up the entry under `deps` + `key` without modifying the tree.
    pub fn lookup(&self, deps: &[Dependency], key: &CacheKey) -> Option<Arc<R>> {
        if deps.len() != self.chain_len {
            return None;
        }
        let mut tier = self.root.as_ref()?;
        for dep in deps {
            match tier.node(dep)? {
                TierNode::Branch(next) => tier = next,
                TierNode::Results(results) => return results.get(key).cloned(),
            }
        }
        None
    }

    /// Stores `value` under `deps` + `key`, creating tiers as needed.
    /// Returns `false` when the chain cannot key the tree (empty chain or
    /// flavor mismatch), in which case nothing is stored.
    pub fn insert(&mut self, deps: &[Dependency], key: CacheKey, value: Arc<R>) -> bool {
        if deps.is_empty() {
            return false;
        }
        match self.walk_mut(deps) {
            Walk::Bypassed => false,
            Walk::Results { results, .. } => {
                results.insert(key, value);
                true
            },
        }
    }

    /// Discards every memoized result. The next call rebuilds the tree and
    /// re-decides the root flavor.
    pub fn clear(&mut self) {
        self.root = None;
        self.chain_len = 0;
    }

    /// Total number of cached results, including results reachable only
    /// through weak slots pending reclamation.
    pub fn len(&self) -> usize {
        self.root.as_ref().map_or(0, TierMap::result_count)
    }

    /// Returns `true` if no results are cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length of the dependency chain the current tree was built for, or
    /// zero while empty.
    pub fn depth(&self) -> usize {
        if self.root.is_some() {
            self.chain_len
        } else {
            0
        }
    }

    /// Sweeps weak slots whose key objects have been freed, dropping their
    /// subtrees. Returns the number of slots removed.
    pub fn prune_stale(&mut self) -> usize {
        self.root.as_mut().map_or(0, TierMap::prune_stale)
    }

    fn walk_mut(&mut self, deps: &[Dependency]) -> Walk<'_, R> {
        let mut reset = false;
        if self.root.is_some() && self.chain_len != deps.len() {
            log::debug!(
                "dependency chain length changed from {} to {}; cache reset",
                self.chain_len,
                deps.len()
            );
            self.root = None;
            reset = true;
        }
        if self.root.is_none() {
            self.chain_len = deps.len();
        }

        let watermark = self.prune_watermark;
        let first = &deps[0];
        let root = self
            .root
            .get_or_insert_with(|| TierMap::for_dependency(first, watermark));

        let last = deps.len() - 1;
        let mut tier = root;
        for (i, dep) in deps.iter().enumerate() {
            let node = tier.node_or_insert_with(dep, || {
                if i == last {
                    TierNode::Results(FxHashMap::default())
                } else {
                    TierNode::Branch(TierMap::for_dependency(&deps[i + 1], watermark))
                }
            });
            match node {
                None => {
                    log::debug!("dependency flavor mismatch at tier {}; memoization bypassed", i);
                    return Walk::Bypassed;
                },
                Some(TierNode::Branch(next)) => tier = next,
                Some(TierNode::Results(results)) => return Walk::Results { results, reset },
            }
        }
        Walk::Bypassed
    }

    /// Verifies the tier tree's structural invariants: uniform depth equal
    /// to the recorded chain length, results tiers only at the leaves.
    #[cfg(any(test, debug_assertions))]
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let root = match &self.root {
            Some(root) => root,
            None => return Ok(()),
        };
        if self.chain_len == 0 {
            return Err(InvariantError::new(
                "populated cache with zero-length dependency chain",
            ));
        }
        Self::check_tier(root, self.chain_len)
    }

    #[cfg(any(test, debug_assertions))]
    fn check_tier(tier: &TierMap<R>, remaining: usize) -> Result<(), InvariantError> {
        for node in tier.nodes() {
            match node {
                TierNode::Branch(next) => {
                    if remaining <= 1 {
                        return Err(InvariantError::new(
                            "branch tier found where results tier expected",
                        ));
                    }
                    Self::check_tier(next, remaining - 1)?;
                },
                TierNode::Results(_) => {
                    if remaining != 1 {
                        return Err(InvariantError::new(format!(
                            "results tier found {} levels early",
                            remaining - 1
                        )));
                    }
                },
            }
        }
        Ok(())
    }
}
