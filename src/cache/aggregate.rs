//! Keyed memoization for composite read views.

use std::sync::Arc;

use dashmap::DashMap;
use metrics::counter;
use tracing::debug;

use super::{METRIC_CACHE_HIT, METRIC_CACHE_INVALIDATE, METRIC_CACHE_MISS};

/// Monotonic per-key counter bumped by every invalidation.
pub type Generation = u64;

#[derive(Debug)]
struct Slot<T> {
    generation: Generation,
    value: Option<Arc<T>>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            generation: 0,
            value: None,
        }
    }
}

/// Read-through cache for one aggregate view type.
///
/// Entries never expire on their own: every write path that touches the
/// underlying collection has to call [`AggregateCache::invalidate`]. All
/// operations are safe to call concurrently without external locking.
#[derive(Debug)]
pub struct AggregateCache<T> {
    namespace: &'static str,
    slots: DashMap<String, Slot<T>>,
}

impl<T> AggregateCache<T> {
    pub fn new(namespace: &'static str) -> Self {
        Self {
            namespace,
            slots: DashMap::new(),
        }
    }

    /// Return the cached snapshot for `key`, if any.
    pub fn load(&self, key: &str) -> Option<Arc<T>> {
        let hit = self
            .slots
            .get(key)
            .and_then(|slot| slot.value.as_ref().map(Arc::clone));

        if hit.is_some() {
            counter!(METRIC_CACHE_HIT, "cache" => self.namespace).increment(1);
        } else {
            counter!(METRIC_CACHE_MISS, "cache" => self.namespace).increment(1);
        }
        hit
    }

    /// Unconditionally overwrite the snapshot for `key`.
    pub fn store(&self, key: &str, value: Arc<T>) {
        self.slots.entry(key.to_string()).or_default().value = Some(value);
    }

    /// Drop the snapshot for `key`. Absent keys are fine.
    pub fn invalidate(&self, key: &str) {
        let mut slot = self.slots.entry(key.to_string()).or_default();
        slot.generation = slot.generation.wrapping_add(1);
        slot.value = None;
        drop(slot);

        counter!(METRIC_CACHE_INVALIDATE, "cache" => self.namespace).increment(1);
        debug!(
            target = "recipebox::cache",
            cache = self.namespace,
            key,
            "aggregate cache entry invalidated"
        );
    }

    /// Current generation of `key`; capture before computing a value for it.
    pub fn generation(&self, key: &str) -> Generation {
        self.slots.get(key).map(|slot| slot.generation).unwrap_or(0)
    }

    /// Store `value` only if `key` was not invalidated since `generation` was read.
    ///
    /// Returns whether the value was stored.
    pub fn store_if_current(&self, key: &str, generation: Generation, value: Arc<T>) -> bool {
        let mut slot = self.slots.entry(key.to_string()).or_default();
        if slot.generation != generation {
            debug!(
                target = "recipebox::cache",
                cache = self.namespace,
                key,
                expected = generation,
                actual = slot.generation,
                "discarding aggregate computed before an invalidation"
            );
            return false;
        }
        slot.value = Some(value);
        true
    }
}
