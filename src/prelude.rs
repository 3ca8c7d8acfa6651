pub use crate::builder::{
    create_selector, create_selector_with_deps, SelectorBuilder, SelectorConfig,
};
pub use crate::cache::{CacheOutcome, SelectorCache};
pub use crate::dependency::{dep, Dependant, Dependants, Dependency};
pub use crate::error::{ConfigError, InvariantError};
pub use crate::key::{ArgKey, CacheKey, Opaque, SelectorArgs, KEY_SEPARATOR};
#[cfg(feature = "concurrency")]
pub use crate::selector::ConcurrentSelector;
pub use crate::selector::MemoizedSelector;

#[cfg(feature = "metrics")]
pub use crate::metrics::SelectorMetricsSnapshot;
