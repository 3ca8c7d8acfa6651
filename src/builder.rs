//! Builder and shorthands for memoized selectors.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use selectorkit::builder::create_selector;
//! use selectorkit::dependency::Dependency;
//!
//! struct AppState {
//!     sites: Arc<Vec<u64>>,
//! }
//!
//! let mut site_count = create_selector(
//!     |state: &Arc<AppState>, _args: &()| state.sites.len(),
//!     |state: &Arc<AppState>, _args: &()| Dependency::shared(&state.sites),
//! );
//! let state = Arc::new(AppState { sites: Arc::new(vec![10, 11]) });
//! assert_eq!(*site_count.select(&state, ()), 2);
//! ```

use std::any::Any;
use std::sync::Arc;

use crate::cache::SelectorCache;
use crate::dependency::{Dependant, Dependants, Dependency};
use crate::ds::DEFAULT_PRUNE_WATERMARK;
use crate::error::ConfigError;
use crate::key::{CacheKey, SelectorArgs};
use crate::selector::{CacheKeyFn, MemoizedSelector, SelectorFn};

/// Tunable parameters of a memoized selector.
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Weak tiers sweep dead entries once they grow past this many slots.
    /// Must be non-zero.
    pub prune_watermark: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            prune_watermark: DEFAULT_PRUNE_WATERMARK,
        }
    }
}

/// Builder for [`MemoizedSelector`] instances.
///
/// Defaults: the whole state handle is the single dependency, and the
/// cache key joins the call's positional arguments.
pub struct SelectorBuilder<S, A, R> {
    select_fn: SelectorFn<S, A, R>,
    dependants: Option<Dependants<S, A>>,
    key_fn: Option<CacheKeyFn<S, A>>,
    config: SelectorConfig,
}

impl<S, A, R> SelectorBuilder<S, A, R> {
    /// Starts a builder from a plain selector function.
    pub fn new<F>(selector: F) -> Self
    where
        F: Fn(&Arc<S>, &A) -> R + Send + Sync + 'static,
    {
        Self {
            select_fn: Box::new(move |state, args, _deps| selector(state, args)),
            dependants: None,
            key_fn: None,
            config: SelectorConfig::default(),
        }
    }

    /// Starts a builder from a selector that also receives the extracted
    /// dependency chain, so it can reuse those values instead of re-reading
    /// the state (see [`Dependency::downcast_shared`]).
    pub fn new_with_deps<F>(selector: F) -> Self
    where
        F: Fn(&Arc<S>, &A, &[Dependency]) -> R + Send + Sync + 'static,
    {
        Self {
            select_fn: Box::new(selector),
            dependants: None,
            key_fn: None,
            config: SelectorConfig::default(),
        }
    }

    /// Appends one dependency extractor. Calling this repeatedly builds up
    /// the chain in order; it replaces a previously set chain function.
    pub fn dependant<D>(mut self, dependant: D) -> Self
    where
        D: Dependant<S, A> + Send + Sync + 'static,
    {
        match &mut self.dependants {
            Some(Dependants::List(list)) => list.push(Box::new(dependant)),
            _ => self.dependants = Some(Dependants::single(dependant)),
        }
        self
    }

    /// Sets the full extractor list at once (see [`crate::dependency::dep`]).
    pub fn dependants(mut self, list: Vec<Box<dyn Dependant<S, A> + Send + Sync>>) -> Self {
        self.dependants = Some(Dependants::list(list));
        self
    }

    /// Sets a single function producing the whole dependency chain. Keys
    /// the cache exactly like the equivalent extractor list.
    pub fn dependant_chain<F>(mut self, f: F) -> Self
    where
        F: Fn(&Arc<S>, &A) -> Vec<Dependency> + Send + Sync + 'static,
    {
        self.dependants = Some(Dependants::chain(f));
        self
    }

    /// Replaces the default argument-joining cache-key function.
    pub fn cache_key<F>(mut self, f: F) -> Self
    where
        F: Fn(&Arc<S>, &A) -> CacheKey + Send + Sync + 'static,
    {
        self.key_fn = Some(Box::new(f));
        self
    }

    /// Overrides the default configuration.
    pub fn config(mut self, config: SelectorConfig) -> Self {
        self.config = config;
        self
    }
}

impl<S, A, R> SelectorBuilder<S, A, R>
where
    S: Any + Send + Sync,
    A: SelectorArgs + 'static,
    R: 'static,
{
    /// Builds the selector, validating the configuration.
    pub fn try_build(self) -> Result<MemoizedSelector<S, A, R>, ConfigError> {
        if self.config.prune_watermark == 0 {
            return Err(ConfigError::new("prune watermark must be greater than zero"));
        }
        if let Some(dependants) = &self.dependants {
            if dependants.is_empty() {
                return Err(ConfigError::new(
                    "dependant list must name at least one extractor",
                ));
            }
        }

        let dependants = self.dependants.unwrap_or_else(Dependants::whole_state);
        let key_fn = self
            .key_fn
            .unwrap_or_else(|| Box::new(|_state: &Arc<S>, args: &A| args.default_cache_key()));

        Ok(MemoizedSelector::from_parts(
            self.select_fn,
            dependants,
            key_fn,
            SelectorCache::new(self.config.prune_watermark),
        ))
    }

    /// Builds the selector.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid. See [`try_build`](Self::try_build).
    pub fn build(self) -> MemoizedSelector<S, A, R> {
        match self.try_build() {
            Ok(selector) => selector,
            Err(err) => panic!("invalid selector configuration: {}", err),
        }
    }
}

/// Wraps `selector` with a cache keyed by one dependency extractor and the
/// default argument-joining cache key.
pub fn create_selector<S, A, R, F, D>(selector: F, dependant: D) -> MemoizedSelector<S, A, R>
where
    S: Any + Send + Sync,
    A: SelectorArgs + 'static,
    R: 'static,
    F: Fn(&Arc<S>, &A) -> R + Send + Sync + 'static,
    D: Dependant<S, A> + Send + Sync + 'static,
{
    SelectorBuilder::new(selector).dependant(dependant).build()
}

/// Like [`create_selector`], but the selector also receives the extracted
/// dependency chain as a trailing argument.
pub fn create_selector_with_deps<S, A, R, F, D>(
    selector: F,
    dependant: D,
) -> MemoizedSelector<S, A, R>
where
    S: Any + Send + Sync,
    A: SelectorArgs + 'static,
    R: 'static,
    F: Fn(&Arc<S>, &A, &[Dependency]) -> R + Send + Sync + 'static,
    D: Dependant<S, A> + Send + Sync + 'static,
{
    SelectorBuilder::new_with_deps(selector)
        .dependant(dependant)
        .build()
}
