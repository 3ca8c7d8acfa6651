//! Cache tier tree.
//!
//! One [`TierMap`] per dependency-chain position, each keyed either by
//! primitive value (strong flavor) or by shared-object identity (weak
//! flavor, see [`WeakDepMap`]). The flavor of a tier is fixed by the first
//! key inserted into it; a key of the other flavor does not fit and the
//! caller falls back to an unmemoized call. Every chain terminates in a
//! results tier, which is always a strong map from cache key to result.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::dependency::Dependency;
use crate::ds::weak_map::WeakDepMap;
use crate::key::CacheKey;

/// One level of the tier tree.
#[derive(Debug)]
pub enum TierMap<R> {
    /// Primitive-keyed tier; entries live until cleared.
    Strong(FxHashMap<CacheKey, TierNode<R>>),
    /// Identity-keyed tier; entries die with their key object.
    Weak(WeakDepMap<TierNode<R>>),
}

/// What hangs under a tier key: another tier, or the results map.
#[derive(Debug)]
pub enum TierNode<R> {
    Branch(TierMap<R>),
    Results(FxHashMap<CacheKey, Arc<R>>),
}

impl<R> TierMap<R> {
    /// Creates an empty tier whose flavor fits `dep`.
    pub fn for_dependency(dep: &Dependency, watermark: usize) -> Self {
        match dep {
            Dependency::Value(_) => TierMap::Strong(FxHashMap::default()),
            Dependency::Shared(_) => TierMap::Weak(WeakDepMap::new(watermark)),
        }
    }

    /// Returns the node stored under `dep`, or `None` when the key is
    /// absent or its flavor does not match this tier.
    pub fn node(&self, dep: &Dependency) -> Option<&TierNode<R>> {
        match (self, dep) {
            (TierMap::Strong(map), Dependency::Value(key)) => map.get(key),
            (TierMap::Weak(map), Dependency::Shared(arc)) => map.get(arc),
            _ => None,
        }
    }

    /// Returns the node under `dep`, inserting an empty one built by
    /// `make` if absent. `None` means the key's flavor does not match this
    /// tier, which the caller treats as a memoization bypass.
    pub fn node_or_insert_with(
        &mut self,
        dep: &Dependency,
        make: impl FnOnce() -> TierNode<R>,
    ) -> Option<&mut TierNode<R>> {
        match (self, dep) {
            (TierMap::Strong(map), Dependency::Value(key)) => {
                Some(map.entry(key.clone()).or_insert_with(make))
            },
            (TierMap::Weak(map), Dependency::Shared(arc)) => {
                Some(map.slot_or_insert_with(arc, make))
            },
            _ => None,
        }
    }

    /// Whether this tier holds entries weakly.
    pub fn is_weak(&self) -> bool {
        matches!(self, TierMap::Weak(_))
    }

    /// Number of keys at this level, including weak slots pending a sweep.
    pub fn len(&self) -> usize {
        match self {
            TierMap::Strong(map) => map.len(),
            TierMap::Weak(map) => map.len(),
        }
    }

    /// Returns `true` if this level holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates the nodes at this level.
    pub fn nodes(&self) -> Box<dyn Iterator<Item = &TierNode<R>> + '_> {
        match self {
            TierMap::Strong(map) => Box::new(map.values()),
            TierMap::Weak(map) => Box::new(map.values()),
        }
    }

    /// Total number of cached results in this subtree.
    pub fn result_count(&self) -> usize {
        self.nodes().map(TierNode::result_count).sum()
    }

    /// Sweeps dead weak slots in this subtree, dropping their subtrees.
    /// Returns the number of slots removed.
    pub fn prune_stale(&mut self) -> usize {
        let mut removed = 0;
        match self {
            TierMap::Strong(map) => {
                for node in map.values_mut() {
                    removed += node.prune_stale();
                }
            },
            TierMap::Weak(map) => {
                removed += map.prune();
                for node in map.values_mut() {
                    removed += node.prune_stale();
                }
            },
        }
        removed
    }
}

impl<R> TierNode<R> {
    /// Total number of cached results under this node.
    pub fn result_count(&self) -> usize {
        match self {
            TierNode::Branch(tier) => tier.result_count(),
            TierNode::Results(map) => map.len(),
        }
    }

    fn prune_stale(&mut self) -> usize {
        match self {
            TierNode::Branch(tier) => tier.prune_stale(),
            TierNode::Results(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::CacheKey;

    fn results_node<R>() -> TierNode<R> {
        TierNode::Results(FxHashMap::default())
    }

    #[test]
    fn flavor_follows_first_dependency() {
        let value_dep = Dependency::value(1i64);
        let shared_dep = Dependency::shared(&Arc::new(vec![1u64]));

        assert!(!TierMap::<u32>::for_dependency(&value_dep, 8).is_weak());
        assert!(TierMap::<u32>::for_dependency(&shared_dep, 8).is_weak());
    }

    #[test]
    fn mismatched_flavor_is_rejected() {
        let value_dep = Dependency::value(1i64);
        let arc = Arc::new(vec![1u64]);
        let shared_dep = Dependency::shared(&arc);

        let mut strong = TierMap::<u32>::for_dependency(&value_dep, 8);
        assert!(strong.node_or_insert_with(&shared_dep, results_node).is_none());
        assert!(strong.node(&shared_dep).is_none());

        let mut weak = TierMap::<u32>::for_dependency(&shared_dep, 8);
        assert!(weak.node_or_insert_with(&value_dep, results_node).is_none());
        assert!(weak.node(&value_dep).is_none());
    }

    #[test]
    fn strong_tier_round_trip() {
        let dep = Dependency::value("posts");
        let mut tier = TierMap::<u32>::for_dependency(&dep, 8);

        let node = tier.node_or_insert_with(&dep, results_node).unwrap();
        if let TierNode::Results(map) = node {
            map.insert(CacheKey::Int(1), Arc::new(10));
        }

        assert_eq!(tier.len(), 1);
        assert_eq!(tier.result_count(), 1);
        assert!(tier.node(&dep).is_some());
    }

    #[test]
    fn weak_tier_prunes_through_branches() {
        let outer = Arc::new(1u64);
        let inner = Arc::new(2u64);
        let outer_dep = Dependency::shared(&outer);
        let inner_dep = Dependency::shared(&inner);

        let mut tier = TierMap::<u32>::for_dependency(&outer_dep, 8);
        let node = tier
            .node_or_insert_with(&outer_dep, || {
                TierNode::Branch(TierMap::for_dependency(&inner_dep, 8))
            })
            .unwrap();
        if let TierNode::Branch(next) = node {
            let leaf = next.node_or_insert_with(&inner_dep, results_node).unwrap();
            if let TierNode::Results(map) = leaf {
                map.insert(CacheKey::Str("k".into()), Arc::new(10));
            }
        }
        assert_eq!(tier.result_count(), 1);

        // the dependency values hold Arc clones; both must go for the
        // object to die
        drop(inner_dep);
        drop(inner);
        assert_eq!(tier.prune_stale(), 1);
        assert_eq!(tier.result_count(), 0);

        drop(outer_dep);
        drop(outer);
        assert_eq!(tier.prune_stale(), 1);
        assert!(tier.is_empty());
    }
}
