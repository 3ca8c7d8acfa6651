//! Cache keys and cache-key derivation.
//!
//! A cache key is the final lookup key inside a selector's tier tree. Keys
//! are primitive by construction: [`CacheKey`] only admits values that hash
//! and compare cheaply, which is what makes the results tier a plain map.
//!
//! ## Key Components
//!
//! - [`CacheKey`]: primitive key value (`None`, `Bool`, `Int`, `Str`).
//! - [`ArgKey`]: per-argument key rendering, implemented for the primitive
//!   types callers normally pass to selectors.
//! - [`SelectorArgs`]: tuple-level key derivation; joins all positional
//!   arguments with [`KEY_SEPARATOR`], which is the default cache-key
//!   function of a memoized selector.
//! - [`Opaque`]: escape hatch for non-primitive arguments. Renders a fixed
//!   placeholder, so distinct opaque values collide under the default key
//!   function and are flagged by the debug-build diagnostics.
//!
//! ## Example Usage
//!
//! ```
//! use selectorkit::key::{CacheKey, SelectorArgs};
//!
//! assert_eq!((42u64, "draft").default_cache_key(), CacheKey::Str("42,draft".into()));
//! assert_eq!(().default_cache_key(), CacheKey::Str(String::new()));
//! ```

use std::fmt;

/// Separator between joined argument renderings in a default cache key.
pub const KEY_SEPARATOR: char = ',';

// ---------------------------------------------------------------------------
// CacheKey
// ---------------------------------------------------------------------------

/// A primitive cache key.
///
/// The results tier of a selector cache is keyed by `CacheKey`, and a
/// dependency extractor may also return one (see
/// [`Dependency::Value`](crate::dependency::Dependency::Value)) to key a
/// tier by a primitive instead of an object identity.
///
/// Floating-point values are intentionally absent; they do not implement
/// `Eq`/`Hash`. Render them through [`CacheKey::Str`] if they must key a
/// cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Absent/neutral key.
    None,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::None => Ok(()),
            CacheKey::Bool(v) => write!(f, "{}", v),
            CacheKey::Int(v) => write!(f, "{}", v),
            CacheKey::Str(v) => f.write_str(v),
        }
    }
}

impl From<bool> for CacheKey {
    fn from(v: bool) -> Self {
        CacheKey::Bool(v)
    }
}

impl From<i64> for CacheKey {
    fn from(v: i64) -> Self {
        CacheKey::Int(v)
    }
}

impl From<i32> for CacheKey {
    fn from(v: i32) -> Self {
        CacheKey::Int(v as i64)
    }
}

impl From<u32> for CacheKey {
    fn from(v: u32) -> Self {
        CacheKey::Int(v as i64)
    }
}

impl From<&str> for CacheKey {
    fn from(v: &str) -> Self {
        CacheKey::Str(v.to_string())
    }
}

impl From<String> for CacheKey {
    fn from(v: String) -> Self {
        CacheKey::Str(v)
    }
}

// ---------------------------------------------------------------------------
// ArgKey
// ---------------------------------------------------------------------------

/// Per-argument cache-key rendering.
///
/// Implemented for the primitive types that make reliable cache keys. A
/// type that is not meaningfully primitive should be passed through
/// [`Opaque`], which renders a shared placeholder and marks the argument
/// complex for the debug-build diagnostics.
pub trait ArgKey {
    /// Appends this argument's key rendering to `out`.
    fn write_key(&self, out: &mut String);

    /// Whether this argument differentiates cache keys reliably.
    fn is_primitive(&self) -> bool {
        true
    }
}

macro_rules! impl_arg_key_display {
    ($($ty:ty),+ $(,)?) => {$(
        impl ArgKey for $ty {
            fn write_key(&self, out: &mut String) {
                use std::fmt::Write;
                let _ = write!(out, "{}", self);
            }
        }
    )+};
}

impl_arg_key_display!(bool, char, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl ArgKey for str {
    fn write_key(&self, out: &mut String) {
        out.push_str(self);
    }
}

impl ArgKey for String {
    fn write_key(&self, out: &mut String) {
        out.push_str(self);
    }
}

impl<T: ArgKey + ?Sized> ArgKey for &T {
    fn write_key(&self, out: &mut String) {
        (**self).write_key(out);
    }

    fn is_primitive(&self) -> bool {
        (**self).is_primitive()
    }
}

/// A missing argument renders as nothing and never counts as complex.
impl<T: ArgKey> ArgKey for Option<T> {
    fn write_key(&self, out: &mut String) {
        if let Some(v) = self {
            v.write_key(out);
        }
    }

    fn is_primitive(&self) -> bool {
        self.as_ref().map_or(true, ArgKey::is_primitive)
    }
}

// ---------------------------------------------------------------------------
// Opaque
// ---------------------------------------------------------------------------

/// Wrapper admitting a non-primitive value as a selector argument.
///
/// All opaque values render the same `[opaque]` placeholder, so under the
/// default cache-key function they collide rather than differentiate. That
/// is safe (the dependency chain still invalidates correctly) but wasteful,
/// which is why debug builds log a warning when one is seen. Callers who
/// need complex arguments to participate in the key should install a custom
/// cache-key function instead.
///
/// # Example
///
/// ```
/// use selectorkit::key::{ArgKey, Opaque};
///
/// let arg = Opaque(vec![1, 2, 3]);
/// assert!(!arg.is_primitive());
///
/// let mut out = String::new();
/// arg.write_key(&mut out);
/// assert_eq!(out, "[opaque]");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opaque<T>(pub T);

impl<T> ArgKey for Opaque<T> {
    fn write_key(&self, out: &mut String) {
        out.push_str("[opaque]");
    }

    fn is_primitive(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// SelectorArgs
// ---------------------------------------------------------------------------

/// Tuple-level cache-key derivation over a selector's positional arguments.
///
/// Implemented for `()` and tuples of up to four [`ArgKey`] arguments. The
/// default rendering joins every argument with [`KEY_SEPARATOR`], so
/// `(42, "draft")` keys as `"42,draft"` and `()` keys as the empty string.
pub trait SelectorArgs {
    /// Derives the default cache key for this argument tuple.
    fn default_cache_key(&self) -> CacheKey;

    /// Whether any positional argument is complex (non-primitive).
    fn has_complex(&self) -> bool;
}

impl SelectorArgs for () {
    fn default_cache_key(&self) -> CacheKey {
        CacheKey::Str(String::new())
    }

    fn has_complex(&self) -> bool {
        false
    }
}

macro_rules! impl_selector_args {
    ($(($($name:ident : $idx:tt),+)),+ $(,)?) => {$(
        impl<$($name: ArgKey),+> SelectorArgs for ($($name,)+) {
            fn default_cache_key(&self) -> CacheKey {
                let mut out = String::new();
                let mut first = true;
                $(
                    if first {
                        first = false;
                    } else {
                        out.push(KEY_SEPARATOR);
                    }
                    self.$idx.write_key(&mut out);
                )+
                let _ = first;
                CacheKey::Str(out)
            }

            fn has_complex(&self) -> bool {
                false $(|| !self.$idx.is_primitive())+
            }
        }
    )+};
}

impl_selector_args! {
    (A0: 0),
    (A0: 0, A1: 1),
    (A0: 0, A1: 1, A2: 2),
    (A0: 0, A1: 1, A2: 2, A3: 3),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_args_key_is_empty_string() {
        assert_eq!(().default_cache_key(), CacheKey::Str(String::new()));
    }

    #[test]
    fn single_arg_key_has_no_separator() {
        assert_eq!((42u64,).default_cache_key(), CacheKey::Str("42".into()));
    }

    #[test]
    fn args_join_with_separator() {
        let key = (10u64, "draft", true).default_cache_key();
        assert_eq!(key, CacheKey::Str("10,draft,true".into()));
    }

    #[test]
    fn missing_optional_arg_still_separates() {
        let key = (None::<u64>, 7u64).default_cache_key();
        assert_eq!(key, CacheKey::Str(",7".into()));
    }

    #[test]
    fn opaque_args_collide_under_default_key() {
        let a = (Opaque(vec![1]), 5u64).default_cache_key();
        let b = (Opaque(vec![2]), 5u64).default_cache_key();
        assert_eq!(a, b);
    }

    #[test]
    fn opaque_arg_is_complex() {
        assert!((Opaque("payload"),).has_complex());
        assert!(!(7u64, "x").has_complex());
    }

    #[test]
    fn absent_opaque_is_not_complex() {
        assert!(!(None::<Opaque<Vec<u8>>>,).has_complex());
        assert!((Some(Opaque(1u8)),).has_complex());
    }

    #[test]
    fn cache_key_display_round_trip() {
        assert_eq!(CacheKey::from(12i64).to_string(), "12");
        assert_eq!(CacheKey::from("abc").to_string(), "abc");
        assert_eq!(CacheKey::from(true).to_string(), "true");
        assert_eq!(CacheKey::None.to_string(), "");
    }

    #[test]
    fn borrowed_args_render_like_owned() {
        let owned = ("a".to_string(), 1u32).default_cache_key();
        let borrowed = ("a", 1u32).default_cache_key();
        assert_eq!(owned, borrowed);
    }
}
