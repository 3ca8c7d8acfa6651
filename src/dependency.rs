//! Dependencies and dependency extraction.
//!
//! A selector's cached result stays valid only while the values it was
//! derived from are unchanged. Those values form the dependency chain: each
//! call evaluates the selector's dependants against `(state, args)` and the
//! resulting [`Dependency`] values key the cache tiers, compared by
//! identity (for shared objects) or by primitive equality (for values) —
//! never by deep equality.
//!
//! ## Key Components
//!
//! - [`Dependency`]: one link of the chain; a primitive value or a shared
//!   object tracked by `Arc` pointer identity.
//! - [`Dependant`]: one extractor, `(state, args) -> Dependency`.
//!   Implemented for any matching closure.
//! - [`Dependants`]: the extractor set of a selector; a list of dependants
//!   or a single chain function producing the whole chain at once. A lone
//!   extractor is normalized to a one-element list.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::key::CacheKey;

// ---------------------------------------------------------------------------
// Dependency
// ---------------------------------------------------------------------------

/// One entry of a selector's dependency chain.
pub enum Dependency {
    /// A primitive dependency value, keyed in a strong tier.
    Value(CacheKey),
    /// A shared object, keyed by `Arc` pointer identity in a weak tier.
    /// The cache never keeps the object alive.
    Shared(Arc<dyn Any + Send + Sync>),
}

impl Dependency {
    /// Builds a primitive dependency.
    pub fn value(key: impl Into<CacheKey>) -> Self {
        Dependency::Value(key.into())
    }

    /// Builds a shared-object dependency from an `Arc` handle.
    ///
    /// The handle is cloned; identity follows the `Arc`'s data pointer, so
    /// replacing the `Arc` in the state (even with an equal value)
    /// invalidates entries keyed by it.
    ///
    /// Identity of zero-sized values is not meaningful; do not use them as
    /// dependencies.
    pub fn shared<T: Any + Send + Sync>(value: &Arc<T>) -> Self {
        Dependency::Shared(Arc::clone(value) as Arc<dyn Any + Send + Sync>)
    }

    /// Returns the identity address for a shared dependency.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Dependency::Value(_) => None,
            Dependency::Shared(arc) => Some(Arc::as_ptr(arc) as *const () as usize),
        }
    }

    /// Returns the primitive key for a value dependency.
    pub fn as_value(&self) -> Option<&CacheKey> {
        match self {
            Dependency::Value(key) => Some(key),
            Dependency::Shared(_) => None,
        }
    }

    /// Downcasts a shared dependency back to its concrete type.
    ///
    /// Useful in selectors built with
    /// [`create_selector_with_deps`](crate::builder::create_selector_with_deps),
    /// which receive the already-extracted chain and can reuse it instead
    /// of re-reading the state.
    pub fn downcast_shared<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            Dependency::Value(_) => None,
            Dependency::Shared(arc) => Arc::clone(arc).downcast::<T>().ok(),
        }
    }
}

impl Clone for Dependency {
    fn clone(&self) -> Self {
        match self {
            Dependency::Value(key) => Dependency::Value(key.clone()),
            Dependency::Shared(arc) => Dependency::Shared(Arc::clone(arc)),
        }
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::Value(key) => f.debug_tuple("Value").field(key).finish(),
            Dependency::Shared(arc) => write!(f, "Shared({:p})", Arc::as_ptr(arc)),
        }
    }
}

impl From<CacheKey> for Dependency {
    fn from(key: CacheKey) -> Self {
        Dependency::Value(key)
    }
}

// ---------------------------------------------------------------------------
// Dependant
// ---------------------------------------------------------------------------

/// One dependency extractor.
///
/// Implemented for any `Fn(&Arc<S>, &A) -> Dependency` closure, which is
/// the form selectors normally use:
///
/// ```
/// use std::sync::Arc;
///
/// use selectorkit::dependency::{Dependant, Dependency};
///
/// struct AppState {
///     posts: Arc<Vec<String>>,
/// }
///
/// let watch_posts = |state: &Arc<AppState>, _args: &()| Dependency::shared(&state.posts);
/// let state = Arc::new(AppState { posts: Arc::new(vec![]) });
/// let dep = watch_posts.extract(&state, &());
/// assert!(dep.identity().is_some());
/// ```
pub trait Dependant<S, A> {
    /// Extracts one dependency value from the current call.
    fn extract(&self, state: &Arc<S>, args: &A) -> Dependency;
}

impl<S, A, F> Dependant<S, A> for F
where
    F: Fn(&Arc<S>, &A) -> Dependency,
{
    fn extract(&self, state: &Arc<S>, args: &A) -> Dependency {
        self(state, args)
    }
}

/// Boxes a dependant for use in a [`Dependants::list`].
pub fn dep<S, A, D>(dependant: D) -> Box<dyn Dependant<S, A> + Send + Sync>
where
    D: Dependant<S, A> + Send + Sync + 'static,
{
    Box::new(dependant)
}

// ---------------------------------------------------------------------------
// Dependants
// ---------------------------------------------------------------------------

/// The dependency extractor set of a memoized selector.
///
/// Either a list of per-link extractors or a single chain function that
/// produces the entire chain in one call. The two forms key the cache
/// identically; a list is just the pre-split spelling of the chain.
pub enum Dependants<S, A> {
    /// One extractor per chain link, evaluated in order.
    List(Vec<Box<dyn Dependant<S, A> + Send + Sync>>),
    /// A single function returning the whole chain.
    Chain(Box<dyn Fn(&Arc<S>, &A) -> Vec<Dependency> + Send + Sync>),
}

impl<S, A> Dependants<S, A> {
    /// Normalizes a lone extractor into a one-element list.
    pub fn single<D>(dependant: D) -> Self
    where
        D: Dependant<S, A> + Send + Sync + 'static,
    {
        Dependants::List(vec![Box::new(dependant)])
    }

    /// Builds from a list of boxed extractors (see [`dep`]).
    pub fn list(list: Vec<Box<dyn Dependant<S, A> + Send + Sync>>) -> Self {
        Dependants::List(list)
    }

    /// Builds from a chain function returning all dependencies at once.
    pub fn chain<F>(f: F) -> Self
    where
        F: Fn(&Arc<S>, &A) -> Vec<Dependency> + Send + Sync + 'static,
    {
        Dependants::Chain(Box::new(f))
    }

    /// The default extractor set: the entire state handle is the single
    /// dependency, so any replacement of the state `Arc` invalidates every
    /// cached result.
    pub fn whole_state() -> Self
    where
        S: Any + Send + Sync,
    {
        Dependants::single(|state: &Arc<S>, _args: &A| Dependency::shared(state))
    }

    /// Evaluates the extractor set into the call's dependency chain.
    pub fn extract(&self, state: &Arc<S>, args: &A) -> Vec<Dependency> {
        match self {
            Dependants::List(list) => list.iter().map(|d| d.extract(state, args)).collect(),
            Dependants::Chain(f) => f(state, args),
        }
    }

    /// Whether the list form is statically known to produce no chain.
    pub fn is_empty(&self) -> bool {
        matches!(self, Dependants::List(list) if list.is_empty())
    }
}

impl<S, A> fmt::Debug for Dependants<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependants::List(list) => f.debug_struct("List").field("len", &list.len()).finish(),
            Dependants::Chain(_) => f.debug_struct("Chain").finish(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
