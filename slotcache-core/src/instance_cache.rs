use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::{Slot, SlotId};

/// Per-object storage for cached members.
///
/// An object that wants cached properties or methods embeds one
/// `InstanceCache` field and exposes it through [`InstanceStorage`]. Each
/// cached member owns one entry, keyed by its [`SlotId`] and by the type of
/// the stored value, created on first read and dropped with the object.
///
/// # Thread Safety
///
/// Storage lives in a `RefCell`: objects embedding an `InstanceCache` are
/// `!Sync`, and no borrow is held while a computation runs, so a
/// computation may read other cached members of the same object.
///
/// # Cloning
///
/// Cloning yields an empty cache. A cloned object recomputes its members
/// instead of sharing the original's entries.
///
/// # Examples
///
/// ```
/// use slotcache_core::{InstanceCache, Slot};
///
/// static TOTAL: Slot = Slot::new("Invoice::total");
///
/// let cache = InstanceCache::new();
/// assert_eq!(cache.resolve(&TOTAL, || 120u32), 120);
/// assert_eq!(cache.resolve(&TOTAL, || 0u32), 120);
///
/// assert!(cache.remove(TOTAL.id()));
/// assert_eq!(cache.resolve(&TOTAL, || 7u32), 7);
/// ```
#[derive(Default)]
pub struct InstanceCache {
    slots: RefCell<HashMap<(SlotId, TypeId), Box<dyn Any>>>,
}

/// Objects that carry an [`InstanceCache`].
///
/// ```
/// use slotcache_core::{InstanceCache, InstanceStorage};
///
/// struct Circle {
///     radius: f64,
///     cache: InstanceCache,
/// }
///
/// impl InstanceStorage for Circle {
///     fn instance_cache(&self) -> &InstanceCache {
///         &self.cache
///     }
/// }
/// ```
pub trait InstanceStorage {
    fn instance_cache(&self) -> &InstanceCache;
}

impl InstanceStorage for InstanceCache {
    fn instance_cache(&self) -> &InstanceCache {
        self
    }
}

impl InstanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a clone of the value stored for `slot`, if any.
    pub fn get<S: Clone + 'static>(&self, slot: SlotId) -> Option<S> {
        self.slots
            .borrow()
            .get(&(slot, TypeId::of::<S>()))
            .and_then(|entry| entry.downcast_ref::<S>())
            .cloned()
    }

    /// Stores `value` for `slot`, replacing any previous value of that type.
    pub fn insert<S: 'static>(&self, slot: SlotId, value: S) {
        self.slots
            .borrow_mut()
            .insert((slot, TypeId::of::<S>()), Box::new(value));
    }

    /// Returns `true` when `slot` holds a value of any type.
    pub fn contains(&self, slot: SlotId) -> bool {
        self.slots.borrow().keys().any(|(id, _)| *id == slot)
    }

    /// Deletes every value stored for `slot`.
    ///
    /// Returns `true` when something was removed. The next read of the
    /// member recomputes it.
    pub fn remove(&self, slot: SlotId) -> bool {
        let mut slots = self.slots.borrow_mut();
        let before = slots.len();
        slots.retain(|(id, _), _| *id != slot);
        before != slots.len()
    }

    /// Number of occupied entries.
    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }

    /// Drops every cached value of this object.
    pub fn clear(&self) {
        self.slots.borrow_mut().clear();
    }

    /// Returns the stored value for `slot`, computing and storing it first
    /// when absent.
    ///
    /// The computation runs without any borrow of the cache held. If it
    /// panics nothing is stored.
    pub fn resolve<S, F>(&self, slot: &Slot, compute: F) -> S
    where
        S: Clone + 'static,
        F: FnOnce() -> S,
    {
        let id = slot.id();
        if let Some(value) = self.get::<S>(id) {
            slot.record_hit();
            return value;
        }

        slot.record_miss();
        let value = compute();
        self.insert(id, value.clone());
        value
    }

    /// Like [`resolve`](Self::resolve) for fallible computations: only `Ok`
    /// values are stored, an `Err` is returned as-is and the next read
    /// retries.
    pub fn try_resolve<S, E, F>(&self, slot: &Slot, compute: F) -> Result<S, E>
    where
        S: Clone + 'static,
        F: FnOnce() -> Result<S, E>,
    {
        let id = slot.id();
        if let Some(value) = self.get::<S>(id) {
            slot.record_hit();
            return Ok(value);
        }

        slot.record_miss();
        let value = compute()?;
        self.insert(id, value.clone());
        Ok(value)
    }

    /// Argument-keyed variant of [`resolve`](Self::resolve).
    ///
    /// The slot holds a map from `key` to value; each distinct key is
    /// computed once and kept for the object's lifetime.
    pub fn resolve_keyed<K, S, F>(&self, slot: &Slot, key: K, compute: F) -> S
    where
        K: Hash + Eq + 'static,
        S: Clone + 'static,
        F: FnOnce(&K) -> S,
    {
        let id = slot.id();
        if let Some(value) = self.keyed_get::<K, S>(id, &key) {
            slot.record_hit();
            return value;
        }

        slot.record_miss();
        let value = compute(&key);
        self.keyed_insert(id, key, value.clone());
        value
    }

    /// Argument-keyed variant of [`try_resolve`](Self::try_resolve).
    pub fn try_resolve_keyed<K, S, E, F>(&self, slot: &Slot, key: K, compute: F) -> Result<S, E>
    where
        K: Hash + Eq + 'static,
        S: Clone + 'static,
        F: FnOnce(&K) -> Result<S, E>,
    {
        let id = slot.id();
        if let Some(value) = self.keyed_get::<K, S>(id, &key) {
            slot.record_hit();
            return Ok(value);
        }

        slot.record_miss();
        let value = compute(&key)?;
        self.keyed_insert(id, key, value.clone());
        Ok(value)
    }

    /// Number of keys cached for an argument-keyed `slot`.
    pub fn keyed_len<K, S>(&self, slot: SlotId) -> usize
    where
        K: Hash + Eq + 'static,
        S: 'static,
    {
        self.slots
            .borrow()
            .get(&(slot, TypeId::of::<HashMap<K, S>>()))
            .and_then(|entry| entry.downcast_ref::<HashMap<K, S>>())
            .map_or(0, HashMap::len)
    }

    /// Returns `true` when `key` is cached for an argument-keyed `slot`.
    pub fn keyed_contains<K, S>(&self, slot: SlotId, key: &K) -> bool
    where
        K: Hash + Eq + 'static,
        S: 'static,
    {
        self.slots
            .borrow()
            .get(&(slot, TypeId::of::<HashMap<K, S>>()))
            .and_then(|entry| entry.downcast_ref::<HashMap<K, S>>())
            .map_or(false, |map| map.contains_key(key))
    }

    fn keyed_get<K, S>(&self, slot: SlotId, key: &K) -> Option<S>
    where
        K: Hash + Eq + 'static,
        S: Clone + 'static,
    {
        self.slots
            .borrow()
            .get(&(slot, TypeId::of::<HashMap<K, S>>()))
            .and_then(|entry| entry.downcast_ref::<HashMap<K, S>>())
            .and_then(|map| map.get(key))
            .cloned()
    }

    fn keyed_insert<K, S>(&self, slot: SlotId, key: K, value: S)
    where
        K: Hash + Eq + 'static,
        S: 'static,
    {
        let mut slots = self.slots.borrow_mut();
        let entry = slots
            .entry((slot, TypeId::of::<HashMap<K, S>>()))
            .or_insert_with(|| Box::new(HashMap::<K, S>::new()));
        if let Some(map) = entry.downcast_mut::<HashMap<K, S>>() {
            map.insert(key, value);
        }
    }
}

impl Clone for InstanceCache {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl fmt::Debug for InstanceCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceCache")
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_resolve_computes_once() {
        let slot = Slot::new("once");
        let cache = InstanceCache::new();
        let calls = Cell::new(0);

        let compute = || {
            calls.set(calls.get() + 1);
            42
        };
        assert_eq!(cache.resolve(&slot, compute), 42);
        assert_eq!(cache.resolve(&slot, compute), 42);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_distinct_slots_do_not_collide() {
        let width = Slot::new("width");
        let height = Slot::new("height");
        let cache = InstanceCache::new();

        assert_eq!(cache.resolve(&width, || 3), 3);
        assert_eq!(cache.resolve(&height, || 4), 4);
        assert_eq!(cache.resolve(&width, || 0), 3);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_remove_forces_recompute() {
        let slot = Slot::new("removable");
        let cache = InstanceCache::new();

        cache.resolve(&slot, || 1);
        assert!(cache.contains(slot.id()));
        assert!(cache.remove(slot.id()));
        assert!(!cache.contains(slot.id()));
        assert!(!cache.remove(slot.id()));
        assert_eq!(cache.resolve(&slot, || 2), 2);
    }

    #[test]
    fn test_try_resolve_does_not_store_errors() {
        let slot = Slot::new("fallible");
        let cache = InstanceCache::new();
        let calls = Cell::new(0);

        let failing = || -> Result<u32, String> {
            calls.set(calls.get() + 1);
            Err("boom".to_string())
        };
        assert!(cache.try_resolve(&slot, failing).is_err());
        assert!(cache.try_resolve(&slot, failing).is_err());
        assert_eq!(calls.get(), 2);
        assert!(cache.is_empty());

        assert_eq!(cache.try_resolve::<u32, String, _>(&slot, || Ok(5)), Ok(5));
        assert_eq!(cache.try_resolve::<u32, String, _>(&slot, || Ok(6)), Ok(5));
    }

    #[test]
    fn test_panicking_compute_leaves_slot_empty() {
        let slot = Slot::new("panics");
        let cache = InstanceCache::new();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            cache.resolve::<u32, _>(&slot, || panic!("compute failed"))
        }));
        assert!(result.is_err());
        assert!(!cache.contains(slot.id()));
        assert_eq!(cache.resolve(&slot, || 9u32), 9);
    }

    #[test]
    fn test_reentrant_compute() {
        let inner = Slot::new("inner");
        let outer = Slot::new("outer");
        let cache = InstanceCache::new();

        let value = cache.resolve(&outer, || cache.resolve(&inner, || 10) * 2);
        assert_eq!(value, 20);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_keyed_entries_are_independent() {
        let slot = Slot::new("keyed");
        let cache = InstanceCache::new();
        let calls = Cell::new(0);

        let square = |x: &u32| {
            calls.set(calls.get() + 1);
            x * x
        };
        assert_eq!(cache.resolve_keyed(&slot, 2u32, square), 4);
        assert_eq!(cache.resolve_keyed(&slot, 3u32, square), 9);
        assert_eq!(cache.resolve_keyed(&slot, 2u32, square), 4);
        assert_eq!(calls.get(), 2);
        assert_eq!(cache.keyed_len::<u32, u32>(slot.id()), 2);
        assert!(cache.keyed_contains::<u32, u32>(slot.id(), &3));
        assert!(!cache.keyed_contains::<u32, u32>(slot.id(), &4));
    }

    #[test]
    fn test_try_resolve_keyed_retries_errors() {
        let slot = Slot::new("keyed_fallible");
        let cache = InstanceCache::new();

        let parse = |s: &String| s.parse::<i32>().map_err(|e| e.to_string());
        assert!(cache
            .try_resolve_keyed(&slot, "x".to_string(), parse)
            .is_err());
        assert_eq!(cache.keyed_len::<String, i32>(slot.id()), 0);
        assert_eq!(cache.try_resolve_keyed(&slot, "12".to_string(), parse), Ok(12));
        assert_eq!(cache.keyed_len::<String, i32>(slot.id()), 1);
    }

    #[test]
    fn test_clone_is_empty() {
        let slot = Slot::new("cloned");
        let cache = InstanceCache::new();
        cache.resolve(&slot, || 1);

        let copy = cache.clone();
        assert!(copy.is_empty());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear() {
        let slot = Slot::new("cleared");
        let cache = InstanceCache::new();
        cache.resolve(&slot, || 'x');
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(format!("{:?}", cache), "InstanceCache { entries: 0 }");
    }
}
