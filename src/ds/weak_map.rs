//! Identity-keyed map with weak-reference slots.
//!
//! Backing store for weak cache tiers. Keys are shared objects tracked by
//! `Arc` data-pointer address; the map holds only `Weak` handles, so it
//! never keeps a key object alive.
//!
//! ## Architecture
//!
//! ```text
//!   slots: FxHashMap<usize, WeakSlot<T>>
//!   ┌───────────┬──────────────────────────────┐
//!   │  address  │  (Weak<dyn Any>, T)          │
//!   │  0x55a1…  │  alive  ──► subtree          │
//!   │  0x55b3…  │  dead   ──► pending sweep    │
//!   └───────────┴──────────────────────────────┘
//! ```
//!
//! ## Behavior
//! - `slot_or_insert_with(k)`: get-or-create by identity; a dead slot at a
//!   reused address is replaced, never resurrected
//! - `prune()`: drops every slot whose key object has been freed
//! - inserts sweep opportunistically once `len()` crosses the watermark;
//!   if the map is still over the watermark after a sweep, the watermark
//!   doubles so the sweep cost stays amortized
//!
//! ## Performance
//! - `get` / `slot_or_insert_with`: O(1) average, plus an amortized sweep
//! - `prune`: O(n)

use std::any::Any;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Weak};

use rustc_hash::FxHashMap;

/// Default slot count past which inserts start sweeping dead slots.
pub const DEFAULT_PRUNE_WATERMARK: usize = 64;

#[derive(Debug)]
struct WeakSlot<T> {
    key: Weak<dyn Any + Send + Sync>,
    value: T,
}

/// Map from shared-object identity to `T`, holding keys weakly.
#[derive(Debug)]
pub struct WeakDepMap<T> {
    slots: FxHashMap<usize, WeakSlot<T>>,
    watermark: usize,
    base_watermark: usize,
}

impl<T> WeakDepMap<T> {
    /// Creates an empty map with the given prune watermark.
    pub fn new(watermark: usize) -> Self {
        Self {
            slots: FxHashMap::default(),
            watermark,
            base_watermark: watermark,
        }
    }

    fn address(key: &Arc<dyn Any + Send + Sync>) -> usize {
        Arc::as_ptr(key) as *const () as usize
    }

    /// Returns the value stored for `key`, if its slot is still alive.
    ///
    /// A slot whose weak handle is dead is never returned: the address may
    /// since have been reused by an unrelated allocation.
    pub fn get(&self, key: &Arc<dyn Any + Send + Sync>) -> Option<&T> {
        let slot = self.slots.get(&Self::address(key))?;
        if slot.key.strong_count() == 0 {
            return None;
        }
        Some(&slot.value)
    }

    /// Returns the value stored for `key`, creating it with `make` if the
    /// slot is missing or stale.
    pub fn slot_or_insert_with(
        &mut self,
        key: &Arc<dyn Any + Send + Sync>,
        make: impl FnOnce() -> T,
    ) -> &mut T {
        self.maybe_prune();
        let addr = Self::address(key);
        match self.slots.entry(addr) {
            Entry::Occupied(mut entry) => {
                // a dead weak at this address means the slot belonged to a
                // previous object whose allocation was reused
                if entry.get().key.strong_count() == 0 {
                    entry.insert(WeakSlot {
                        key: Arc::downgrade(key),
                        value: make(),
                    });
                }
                &mut entry.into_mut().value
            },
            Entry::Vacant(entry) => {
                &mut entry
                    .insert(WeakSlot {
                        key: Arc::downgrade(key),
                        value: make(),
                    })
                    .value
            },
        }
    }

    /// Removes every slot whose key object has been freed. Returns the
    /// number of slots removed.
    pub fn prune(&mut self) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, slot| slot.key.strong_count() > 0);
        before - self.slots.len()
    }

    fn maybe_prune(&mut self) {
        if self.slots.len() < self.watermark {
            return;
        }
        self.prune();
        if self.slots.len() >= self.watermark {
            self.watermark = self.watermark.saturating_mul(2);
        }
    }

    /// Returns the number of slots, including slots pending a sweep.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the map holds no slots at all.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the current prune watermark.
    pub fn watermark(&self) -> usize {
        self.watermark
    }

    /// Drops all slots and resets the watermark.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.watermark = self.base_watermark;
    }

    /// Iterates stored values, including values in stale slots.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.slots.values().map(|slot| &slot.value)
    }

    /// Mutably iterates stored values, including values in stale slots.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.values_mut().map(|slot| &mut slot.value)
    }
}
