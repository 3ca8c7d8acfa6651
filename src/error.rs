//! Error types for the selectorkit library.
//!
//! ## Key Components
//!
//! - [`InvariantError`]: Returned when internal cache-tree invariants are
//!   violated (debug-only `check_invariants` methods).
//! - [`ConfigError`]: Returned when selector configuration parameters are
//!   invalid (e.g. zero prune watermark, empty dependant list).
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use selectorkit::builder::{SelectorBuilder, SelectorConfig};
//!
//! // Fallible build for user-configurable parameters
//! let selector = SelectorBuilder::new(|state: &Arc<i64>, _args: &()| **state * 2)
//!     .try_build();
//! assert!(selector.is_ok());
//!
//! // Invalid configuration is caught without panicking
//! let bad = SelectorBuilder::new(|state: &Arc<i64>, _args: &()| **state * 2)
//!     .config(SelectorConfig { prune_watermark: 0 })
//!     .try_build();
//! assert!(bad.is_err());
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal cache-tree invariants are violated.
///
/// Produced by the debug-only
/// [`SelectorCache::check_invariants`](crate::cache::SelectorCache::check_invariants)
/// method. Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when selector configuration parameters are invalid.
///
/// Produced by [`SelectorBuilder::try_build`](crate::builder::SelectorBuilder::try_build).
/// Carries a human-readable description of which parameter failed validation.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use selectorkit::builder::{SelectorBuilder, SelectorConfig};
///
/// let err = SelectorBuilder::new(|state: &Arc<i64>, _args: &()| **state)
///     .config(SelectorConfig { prune_watermark: 0 })
///     .try_build()
///     .unwrap_err();
/// assert!(err.to_string().contains("watermark"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
