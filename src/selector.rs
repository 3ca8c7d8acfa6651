//! Memoized selector wrappers.
//!
//! A [`MemoizedSelector`] wraps a pure selector function so that repeated
//! calls with unchanged dependencies return the cached result instead of
//! recomputing. It is a drop-in replacement for calling the selector
//! directly, plus cache control (`clear_cache`, `prune_stale`) and
//! introspection (`cache`, `len`).
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use selectorkit::builder::SelectorBuilder;
//! use selectorkit::dependency::Dependency;
//!
//! struct AppState {
//!     posts: Arc<Vec<(u64, u64)>>, // (post id, site id)
//! }
//!
//! let mut posts_for_site = SelectorBuilder::new(|state: &Arc<AppState>, args: &(u64,)| {
//!     state
//!         .posts
//!         .iter()
//!         .filter(|p| p.1 == args.0)
//!         .map(|p| p.0)
//!         .collect::<Vec<_>>()
//! })
//! .dependant(|state: &Arc<AppState>, _: &(u64,)| Dependency::shared(&state.posts))
//! .build();
//!
//! let state = Arc::new(AppState {
//!     posts: Arc::new(vec![(1, 10), (2, 11)]),
//! });
//! assert_eq!(*posts_for_site.select(&state, (10,)), vec![1]);
//! assert_eq!(*posts_for_site.select(&state, (11,)), vec![2]);
//! assert_eq!(posts_for_site.len(), 2);
//! ```
//!
//! ## Thread Safety
//!
//! `MemoizedSelector` is single-threaded (`select` takes `&mut self`).
//! With the `concurrency` feature, [`ConcurrentSelector`] wraps it behind
//! a `parking_lot::RwLock` for shared use; the select path takes the write
//! lock because even a hit may rebuild tiers or sweep weak slots.

use std::sync::Arc;

use crate::cache::SelectorCache;
use crate::dependency::{Dependants, Dependency};
#[cfg(any(test, debug_assertions))]
use crate::error::InvariantError;
use crate::key::{CacheKey, SelectorArgs};
#[cfg(feature = "metrics")]
use crate::metrics::{SelectorMetrics, SelectorMetricsSnapshot};

/// Boxed selector function. Receives the already-extracted dependency
/// chain as its third argument; selectors built without the chain form
/// simply ignore it.
pub type SelectorFn<S, A, R> = Box<dyn Fn(&Arc<S>, &A, &[Dependency]) -> R + Send + Sync>;

/// Boxed cache-key function.
pub type CacheKeyFn<S, A> = Box<dyn Fn(&Arc<S>, &A) -> CacheKey + Send + Sync>;

/// A selector with a dependency-tracked result cache.
///
/// Built by [`SelectorBuilder`](crate::builder::SelectorBuilder) or the
/// [`create_selector`](crate::builder::create_selector) shorthands.
pub struct MemoizedSelector<S, A, R> {
    select_fn: SelectorFn<S, A, R>,
    dependants: Dependants<S, A>,
    key_fn: CacheKeyFn<S, A>,
    cache: SelectorCache<R>,
    #[cfg(feature = "metrics")]
    metrics: SelectorMetrics,
}

impl<S, A, R> std::fmt::Debug for MemoizedSelector<S, A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoizedSelector")
            .field("len", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl<S, A, R> MemoizedSelector<S, A, R> {
    pub(crate) fn from_parts(
        select_fn: SelectorFn<S, A, R>,
        dependants: Dependants<S, A>,
        key_fn: CacheKeyFn<S, A>,
        cache: SelectorCache<R>,
    ) -> Self {
        Self {
            select_fn,
            dependants,
            key_fn,
            cache,
            #[cfg(feature = "metrics")]
            metrics: SelectorMetrics::new(),
        }
    }

    /// Discards every memoized result.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
        #[cfg(feature = "metrics")]
        self.metrics.record_clear();
    }

    /// Read-only view of the cache, for introspection and tests.
    pub fn cache(&self) -> &SelectorCache<R> {
        &self.cache
    }

    /// Sweeps cache entries whose dependency objects have been freed.
    /// Returns the number of weak slots removed.
    pub fn prune_stale(&mut self) -> usize {
        let removed = self.cache.prune_stale();
        #[cfg(feature = "metrics")]
        self.metrics.record_stale_evictions(removed as u64);
        removed
    }

    /// Number of cached results.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Verifies the cache tree's structural invariants.
    #[cfg(any(test, debug_assertions))]
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.cache.check_invariants()
    }

    /// Snapshot of the selector's counters and cache gauges.
    #[cfg(feature = "metrics")]
    pub fn metrics_snapshot(&self) -> SelectorMetricsSnapshot {
        self.metrics.snapshot(self.cache.len(), self.cache.depth())
    }

    /// Moves this selector behind a lock for shared use.
    #[cfg(feature = "concurrency")]
    pub fn into_concurrent(self) -> ConcurrentSelector<S, A, R> {
        ConcurrentSelector::new(self)
    }
}

impl<S, A, R> MemoizedSelector<S, A, R>
where
    A: SelectorArgs,
{
    /// The memoized read. Same observable result as calling the selector
    /// directly; recomputes only when the dependency chain or cache key
    /// has not been seen.
    pub fn select(&mut self, state: &Arc<S>, args: A) -> Arc<R> {
        #[cfg(debug_assertions)]
        if args.has_complex() {
            log::warn!(
                "memoized selector called with complex (non-primitive) arguments; \
                 the default cache key cannot tell such values apart"
            );
        }

        let key = (self.key_fn)(state, &args);
        let deps = self.dependants.extract(state, &args);
        let select_fn = &self.select_fn;
        let (result, outcome) = self
            .cache
            .select_with(&deps, &key, || select_fn(state, &args, &deps));

        #[cfg(feature = "metrics")]
        self.metrics.record_select(outcome);
        #[cfg(not(feature = "metrics"))]
        let _ = outcome;

        result
    }
}

// ---------------------------------------------------------------------------
// ConcurrentSelector
// ---------------------------------------------------------------------------

/// Thread-safe wrapper around [`MemoizedSelector`].
///
/// | Method        | Lock Type | Notes                                 |
/// |---------------|-----------|---------------------------------------|
/// | `select`      | Write     | Even a hit may rebuild or sweep tiers |
/// | `clear_cache` | Write     |                                       |
/// | `prune_stale` | Write     |                                       |
/// | `len`         | Read      |                                       |
#[cfg(feature = "concurrency")]
pub struct ConcurrentSelector<S, A, R> {
    inner: parking_lot::RwLock<MemoizedSelector<S, A, R>>,
}

#[cfg(feature = "concurrency")]
impl<S, A, R> ConcurrentSelector<S, A, R> {
    pub fn new(inner: MemoizedSelector<S, A, R>) -> Self {
        Self {
            inner: parking_lot::RwLock::new(inner),
        }
    }

    /// The memoized read; serialized behind the write lock.
    pub fn select(&self, state: &Arc<S>, args: A) -> Arc<R>
    where
        A: SelectorArgs,
    {
        self.inner.write().select(state, args)
    }

    /// Discards every memoized result.
    pub fn clear_cache(&self) {
        self.inner.write().clear_cache();
    }

    /// Sweeps cache entries whose dependency objects have been freed.
    pub fn prune_stale(&self) -> usize {
        self.inner.write().prune_stale()
    }

    /// Number of cached results.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Snapshot of the selector's counters and cache gauges.
    #[cfg(feature = "metrics")]
    pub fn metrics_snapshot(&self) -> SelectorMetricsSnapshot {
        self.inner.read().metrics_snapshot()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::builder::SelectorBuilder;

    struct AppState {
        posts: Arc<Vec<u64>>,
    }

    fn counting_selector(
        calls: Arc<AtomicU32>,
    ) -> impl Fn(&Arc<AppState>, &(u64,)) -> usize + Send + Sync + 'static {
        move |state, args| {
            calls.fetch_add(1, Ordering::SeqCst);
            state.posts.iter().filter(|&&p| p == args.0).count()
        }
    }

    #[test]
    fn repeat_select_hits_cache() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut selector = SelectorBuilder::new(counting_selector(Arc::clone(&calls)))
            .dependant(|state: &Arc<AppState>, _: &(u64,)| Dependency::shared(&state.posts))
            .build();

        let state = Arc::new(AppState {
            posts: Arc::new(vec![1, 1, 2]),
        });

        assert_eq!(*selector.select(&state, (1,)), 2);
        assert_eq!(*selector.select(&state, (1,)), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        selector.check_invariants().unwrap();
    }

    #[test]
    fn clear_cache_recomputes() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut selector = SelectorBuilder::new(counting_selector(Arc::clone(&calls)))
            .dependant(|state: &Arc<AppState>, _: &(u64,)| Dependency::shared(&state.posts))
            .build();

        let state = Arc::new(AppState {
            posts: Arc::new(vec![1]),
        });

        selector.select(&state, (1,));
        selector.clear_cache();
        assert!(selector.is_empty());
        assert_eq!(*selector.select(&state, (1,)), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn prune_stale_reports_dead_slots() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut selector = SelectorBuilder::new(counting_selector(Arc::clone(&calls)))
            .dependant(|state: &Arc<AppState>, _: &(u64,)| Dependency::shared(&state.posts))
            .build();

        let state = Arc::new(AppState {
            posts: Arc::new(vec![1]),
        });
        selector.select(&state, (1,));
        assert_eq!(selector.prune_stale(), 0);

        drop(state);
        assert_eq!(selector.prune_stale(), 1);
        assert!(selector.is_empty());
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn metrics_track_hits_and_misses() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut selector = SelectorBuilder::new(counting_selector(Arc::clone(&calls)))
            .dependant(|state: &Arc<AppState>, _: &(u64,)| Dependency::shared(&state.posts))
            .build();

        let state = Arc::new(AppState {
            posts: Arc::new(vec![1]),
        });
        selector.select(&state, (1,));
        selector.select(&state, (1,));
        selector.select(&state, (2,));

        let snap = selector.metrics_snapshot();
        assert_eq!(snap.select_calls, 3);
        assert_eq!(snap.select_hits, 1);
        assert_eq!(snap.select_misses, 2);
        assert_eq!(snap.cached_results, 2);
        assert_eq!(snap.chain_depth, 1);
    }

    #[cfg(feature = "concurrency")]
    #[test]
    fn concurrent_selector_is_shareable() {
        let calls = Arc::new(AtomicU32::new(0));
        let selector = SelectorBuilder::new(counting_selector(Arc::clone(&calls)))
            .dependant(|state: &Arc<AppState>, _: &(u64,)| Dependency::shared(&state.posts))
            .build()
            .into_concurrent();
        let selector = Arc::new(selector);

        let state = Arc::new(AppState {
            posts: Arc::new(vec![1, 1]),
        });

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let selector = Arc::clone(&selector);
                let state = Arc::clone(&state);
                std::thread::spawn(move || *selector.select(&state, (1,)))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 2);
        }

        // the first thread in computes; everyone else hits
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(selector.len(), 1);
    }
}
