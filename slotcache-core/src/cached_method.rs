use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use crate::{InstanceStorage, Raw, Slot, StoragePolicy};

#[cfg(feature = "stats")]
use crate::CacheStats;

/// A memoized method without arguments.
///
/// [`call`](Self::call) runs the method once per object and returns the
/// stored result on every later call, regardless of changes to the object.
/// There is no per-method reset: the entry lives as long as the object's
/// [`InstanceCache`](crate::InstanceCache) (or until that cache is cleared).
///
/// ```
/// use slotcache_core::{CachedMethod, InstanceCache, InstanceStorage};
///
/// struct Document {
///     text: String,
///     cache: InstanceCache,
/// }
///
/// impl InstanceStorage for Document {
///     fn instance_cache(&self) -> &InstanceCache {
///         &self.cache
///     }
/// }
///
/// static WORD_COUNT: CachedMethod<Document, usize> =
///     CachedMethod::new("Document::word_count", |doc| doc.text.split_whitespace().count());
///
/// let doc = Document { text: "to be or not".into(), cache: InstanceCache::new() };
/// assert_eq!(WORD_COUNT.call(&doc), 4);
/// assert!(WORD_COUNT.is_cached(&doc));
/// ```
pub struct CachedMethod<T: ?Sized, V, P = Raw> {
    slot: Slot,
    compute: fn(&T) -> V,
    _policy: PhantomData<fn() -> P>,
}

impl<T: ?Sized, V, P> CachedMethod<T, V, P> {
    pub const fn new(name: &'static str, compute: fn(&T) -> V) -> Self {
        Self {
            slot: Slot::new(name),
            compute,
            _policy: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.slot.name()
    }

    pub fn slot(&self) -> &Slot {
        &self.slot
    }

    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        self.slot.stats()
    }

    pub fn register_stats(&'static self) {
        self.slot.register_stats();
    }
}

impl<T, V, P> CachedMethod<T, V, P>
where
    T: InstanceStorage + ?Sized,
    P: StoragePolicy<V>,
{
    pub fn call(&self, obj: &T) -> P::Stored {
        obj.instance_cache()
            .resolve(&self.slot, || P::prepare((self.compute)(obj)))
    }
}

impl<T: InstanceStorage + ?Sized, V, P> CachedMethod<T, V, P> {
    pub fn is_cached(&self, obj: &T) -> bool {
        obj.instance_cache().contains(self.slot.id())
    }
}

impl<T, U, E, P> CachedMethod<T, Result<U, E>, P>
where
    T: InstanceStorage + ?Sized,
    P: StoragePolicy<U>,
{
    /// Calls a fallible method, caching only `Ok` results.
    pub fn try_call(&self, obj: &T) -> Result<P::Stored, E> {
        obj.instance_cache()
            .try_resolve(&self.slot, || (self.compute)(obj).map(P::prepare))
    }
}

impl<T: ?Sized, V, P> fmt::Debug for CachedMethod<T, V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedMethod")
            .field("name", &self.slot.name())
            .finish()
    }
}

/// A memoized method keyed by its argument tuple.
///
/// Each object keeps one map per method from argument tuple `A` to result.
/// A tuple seen for the first time is computed and stored; a known tuple
/// returns the stored result. The map grows for the object's whole
/// lifetime and is never evicted.
///
/// Arguments must be `Hash + Eq`, which the compiler checks at the call
/// site. Pass a 1-tuple `(x,)` or `()` for single or no arguments.
///
/// ```
/// use slotcache_core::{CachedArgsMethod, InstanceCache, InstanceStorage};
///
/// struct Grid {
///     width: u32,
///     cache: InstanceCache,
/// }
///
/// impl InstanceStorage for Grid {
///     fn instance_cache(&self) -> &InstanceCache {
///         &self.cache
///     }
/// }
///
/// static INDEX: CachedArgsMethod<Grid, (u32, u32), u32> =
///     CachedArgsMethod::new("Grid::index", |grid, &(x, y)| y * grid.width + x);
///
/// let grid = Grid { width: 10, cache: InstanceCache::new() };
/// assert_eq!(INDEX.call(&grid, (3, 2)), 23);
/// assert_eq!(INDEX.call(&grid, (0, 1)), 10);
/// assert_eq!(INDEX.cached_len(&grid), 2);
/// ```
pub struct CachedArgsMethod<T: ?Sized, A, V, P = Raw> {
    slot: Slot,
    compute: fn(&T, &A) -> V,
    _policy: PhantomData<fn() -> P>,
}

impl<T: ?Sized, A, V, P> CachedArgsMethod<T, A, V, P> {
    pub const fn new(name: &'static str, compute: fn(&T, &A) -> V) -> Self {
        Self {
            slot: Slot::new(name),
            compute,
            _policy: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.slot.name()
    }

    pub fn slot(&self) -> &Slot {
        &self.slot
    }

    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        self.slot.stats()
    }

    pub fn register_stats(&'static self) {
        self.slot.register_stats();
    }
}

impl<T, A, V, P> CachedArgsMethod<T, A, V, P>
where
    T: InstanceStorage + ?Sized,
    A: Hash + Eq + 'static,
    P: StoragePolicy<V>,
{
    pub fn call(&self, obj: &T, args: A) -> P::Stored {
        obj.instance_cache()
            .resolve_keyed(&self.slot, args, |args| P::prepare((self.compute)(obj, args)))
    }

    /// Number of argument tuples cached for `obj`.
    pub fn cached_len(&self, obj: &T) -> usize {
        obj.instance_cache()
            .keyed_len::<A, P::Stored>(self.slot.id())
    }

    /// Returns `true` when the result for `args` is cached for `obj`.
    pub fn is_cached(&self, obj: &T, args: &A) -> bool {
        obj.instance_cache()
            .keyed_contains::<A, P::Stored>(self.slot.id(), args)
    }
}

impl<T, A, U, E, P> CachedArgsMethod<T, A, Result<U, E>, P>
where
    T: InstanceStorage + ?Sized,
    A: Hash + Eq + 'static,
    P: StoragePolicy<U>,
{
    /// Calls a fallible method, caching only `Ok` results per tuple.
    ///
    /// Entries written by `try_call` are not counted by
    /// [`cached_len`](Self::cached_len), which tracks `call`.
    pub fn try_call(&self, obj: &T, args: A) -> Result<P::Stored, E> {
        obj.instance_cache()
            .try_resolve_keyed(&self.slot, args, |args| {
                (self.compute)(obj, args).map(P::prepare)
            })
    }

    /// Number of argument tuples cached for `obj` through `try_call`.
    pub fn try_cached_len(&self, obj: &T) -> usize {
        obj.instance_cache()
            .keyed_len::<A, P::Stored>(self.slot.id())
    }
}

impl<T: ?Sized, A, V, P> fmt::Debug for CachedArgsMethod<T, A, V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedArgsMethod")
            .field("name", &self.slot.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Frozen, InstanceCache};
    use std::cell::Cell;
    use std::collections::HashSet;
    use std::sync::Arc;

    struct Inventory {
        items: Vec<&'static str>,
        calls: Cell<u32>,
        cache: InstanceCache,
    }

    impl Inventory {
        fn new(items: &[&'static str]) -> Self {
            Self {
                items: items.to_vec(),
                calls: Cell::new(0),
                cache: InstanceCache::new(),
            }
        }

        fn bump(&self) {
            self.calls.set(self.calls.get() + 1);
        }

        fn count(&self) -> usize {
            self.bump();
            self.items.len()
        }

        fn distinct(&self) -> HashSet<&'static str> {
            self.bump();
            self.items.iter().copied().collect()
        }

        fn starting_with(&self, (prefix,): &(char,)) -> Vec<&'static str> {
            self.bump();
            self.items
                .iter()
                .copied()
                .filter(|item| item.starts_with(*prefix))
                .collect()
        }

        fn nth(&self, (index,): &(usize,)) -> Result<&'static str, String> {
            self.bump();
            self.items
                .get(*index)
                .copied()
                .ok_or_else(|| format!("no item at {}", index))
        }
    }

    impl InstanceStorage for Inventory {
        fn instance_cache(&self) -> &InstanceCache {
            &self.cache
        }
    }

    static COUNT: CachedMethod<Inventory, usize> = CachedMethod::new("Inventory::count", Inventory::count);
    static ITEM_COUNT: CachedMethod<Inventory, usize> =
        CachedMethod::new("Inventory::item_count", |inv| inv.items.len() * 10);
    static DISTINCT: CachedMethod<Inventory, HashSet<&'static str>, Frozen> =
        CachedMethod::new("Inventory::distinct", Inventory::distinct);
    static STARTING_WITH: CachedArgsMethod<Inventory, (char,), Vec<&'static str>> =
        CachedArgsMethod::new("Inventory::starting_with", Inventory::starting_with);
    static STARTING_WITH_FROZEN: CachedArgsMethod<Inventory, (char,), Vec<&'static str>, Frozen> =
        CachedArgsMethod::new("Inventory::starting_with_frozen", Inventory::starting_with);
    static NTH: CachedArgsMethod<Inventory, (usize,), Result<&'static str, String>> =
        CachedArgsMethod::new("Inventory::nth", Inventory::nth);

    #[test]
    fn test_call_ignores_later_state() {
        let mut inventory = Inventory::new(&["apple", "pear"]);
        assert_eq!(COUNT.call(&inventory), 2);
        inventory.items.push("plum");
        assert_eq!(COUNT.call(&inventory), 2);
        assert_eq!(inventory.calls.get(), 1);
    }

    #[test]
    fn test_methods_do_not_collide() {
        let inventory = Inventory::new(&["apple"]);
        assert_eq!(COUNT.call(&inventory), 1);
        assert_eq!(ITEM_COUNT.call(&inventory), 10);
        assert_eq!(COUNT.call(&inventory), 1);
        assert_eq!(inventory.cache.len(), 2);
    }

    #[test]
    fn test_frozen_set_identity() {
        let inventory = Inventory::new(&["apple", "apple", "fig"]);
        let first = DISTINCT.call(&inventory);
        let second = DISTINCT.call(&inventory);
        assert_eq!(first.len(), 2);
        assert!(first.contains("fig"));
        assert!(first.ptr_eq(&second));
        assert_eq!(inventory.calls.get(), 1);
    }

    #[test]
    fn test_args_discriminate() {
        let inventory = Inventory::new(&["apple", "avocado", "banana"]);
        assert_eq!(STARTING_WITH.call(&inventory, ('a',)), vec!["apple", "avocado"]);
        assert_eq!(STARTING_WITH.call(&inventory, ('b',)), vec!["banana"]);
        assert_eq!(inventory.calls.get(), 2);

        assert_eq!(STARTING_WITH.call(&inventory, ('a',)), vec!["apple", "avocado"]);
        assert_eq!(inventory.calls.get(), 2);
        assert_eq!(STARTING_WITH.cached_len(&inventory), 2);
        assert!(STARTING_WITH.is_cached(&inventory, &('b',)));
        assert!(!STARTING_WITH.is_cached(&inventory, &('z',)));
    }

    #[test]
    fn test_args_per_instance() {
        let first = Inventory::new(&["apple"]);
        let second = Inventory::new(&["apricot"]);
        assert_eq!(STARTING_WITH.call(&first, ('a',)), vec!["apple"]);
        assert_eq!(STARTING_WITH.call(&second, ('a',)), vec!["apricot"]);
        assert_eq!(STARTING_WITH.cached_len(&second), 1);
    }

    #[test]
    fn test_args_frozen_values() {
        let inventory = Inventory::new(&["cherry", "cranberry"]);
        let first: Arc<[&'static str]> = STARTING_WITH_FROZEN.call(&inventory, ('c',));
        let second = STARTING_WITH_FROZEN.call(&inventory, ('c',));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(STARTING_WITH_FROZEN.cached_len(&inventory), 1);
    }

    #[test]
    fn test_try_call_caches_ok_only() {
        let inventory = Inventory::new(&["kiwi"]);
        assert_eq!(NTH.try_call(&inventory, (0,)), Ok("kiwi"));
        assert_eq!(NTH.try_call(&inventory, (0,)), Ok("kiwi"));
        assert_eq!(inventory.calls.get(), 1);

        assert!(NTH.try_call(&inventory, (5,)).is_err());
        assert!(NTH.try_call(&inventory, (5,)).is_err());
        assert_eq!(inventory.calls.get(), 3);
        assert_eq!(NTH.try_cached_len(&inventory), 1);
    }

    #[test]
    fn test_debug() {
        assert_eq!(format!("{:?}", COUNT), r#"CachedMethod { name: "Inventory::count" }"#);
        assert_eq!(
            format!("{:?}", NTH),
            r#"CachedArgsMethod { name: "Inventory::nth" }"#
        );
    }
}
