use std::fmt;
use std::marker::PhantomData;

use crate::{InstanceStorage, Raw, Slot, StoragePolicy};

#[cfg(feature = "stats")]
use crate::CacheStats;

/// A lazily computed, per-object property.
///
/// The first [`get`](Self::get) on an object runs the computation with the
/// object and stores the result in the object's
/// [`InstanceCache`](crate::InstanceCache). Later reads return the stored
/// value without running the computation, whatever happened to the object
/// in between. [`invalidate`](Self::invalidate) deletes the stored value so
/// the next read recomputes.
///
/// The descriptor itself is the "class-level" view of the property: it
/// exposes its [`name`](Self::name) and [`doc`](Self::doc) and never
/// computes anything on its own.
///
/// # Type Parameters
///
/// * `T` - the owning type (may be unsized, e.g. a trait object)
/// * `V` - the computation's return type
/// * `P` - the [`StoragePolicy`]: [`Raw`] (default) or
///   [`Frozen`](crate::Frozen)
///
/// Declare descriptors as `static` items; a `const` descriptor is copied at
/// each use and would never find its own entries.
///
/// # Examples
///
/// ```
/// use slotcache_core::{CachedProperty, InstanceCache, InstanceStorage};
///
/// struct Rect {
///     width: f64,
///     height: f64,
///     cache: InstanceCache,
/// }
///
/// impl InstanceStorage for Rect {
///     fn instance_cache(&self) -> &InstanceCache {
///         &self.cache
///     }
/// }
///
/// static AREA: CachedProperty<Rect, f64> =
///     CachedProperty::new("Rect::area", |rect| rect.width * rect.height);
///
/// let rect = Rect { width: 2.0, height: 3.0, cache: InstanceCache::new() };
/// assert_eq!(AREA.get(&rect), 6.0);
/// assert!(AREA.is_cached(&rect));
///
/// assert!(AREA.invalidate(&rect));
/// assert!(!AREA.is_cached(&rect));
/// ```
pub struct CachedProperty<T: ?Sized, V, P = Raw> {
    slot: Slot,
    compute: fn(&T) -> V,
    doc: Option<&'static str>,
    _policy: PhantomData<fn() -> P>,
}

impl<T: ?Sized, V, P> CachedProperty<T, V, P> {
    pub const fn new(name: &'static str, compute: fn(&T) -> V) -> Self {
        Self {
            slot: Slot::new(name),
            compute,
            doc: None,
            _policy: PhantomData,
        }
    }

    /// Creates a property carrying a documentation string.
    pub const fn documented(name: &'static str, doc: &'static str, compute: fn(&T) -> V) -> Self {
        Self {
            slot: Slot::new(name),
            compute,
            doc: Some(doc),
            _policy: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.slot.name()
    }

    pub fn doc(&self) -> Option<&'static str> {
        self.doc
    }

    pub fn slot(&self) -> &Slot {
        &self.slot
    }

    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        self.slot.stats()
    }

    /// See [`Slot::register_stats`].
    pub fn register_stats(&'static self) {
        self.slot.register_stats();
    }
}

impl<T, V, P> CachedProperty<T, V, P>
where
    T: InstanceStorage + ?Sized,
    P: StoragePolicy<V>,
{
    /// Returns the property value for `obj`, computing it on first read.
    pub fn get(&self, obj: &T) -> P::Stored {
        obj.instance_cache()
            .resolve(&self.slot, || P::prepare((self.compute)(obj)))
    }
}

impl<T: InstanceStorage + ?Sized, V, P> CachedProperty<T, V, P> {
    /// Returns `true` when `obj` holds a computed value.
    pub fn is_cached(&self, obj: &T) -> bool {
        obj.instance_cache().contains(self.slot.id())
    }

    /// Deletes the cached value of `obj`.
    ///
    /// Returns `true` when a value was removed.
    pub fn invalidate(&self, obj: &T) -> bool {
        let removed = obj.instance_cache().remove(self.slot.id());
        if removed {
            tracing::debug!(slot = self.slot.name(), "invalidated cached property");
        }
        removed
    }
}

impl<T, U, E, P> CachedProperty<T, Result<U, E>, P>
where
    T: InstanceStorage + ?Sized,
    P: StoragePolicy<U>,
{
    /// Reads a fallible property: `Ok` values are cached, an `Err` is
    /// returned without being stored and the next read retries.
    ///
    /// `get` and `try_get` keep separate entries; use one of them per
    /// property.
    pub fn try_get(&self, obj: &T) -> Result<P::Stored, E> {
        obj.instance_cache()
            .try_resolve(&self.slot, || (self.compute)(obj).map(P::prepare))
    }
}

impl<T: ?Sized, V, P> fmt::Debug for CachedProperty<T, V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedProperty")
            .field("name", &self.slot.name())
            .field("doc", &self.doc)
            .finish()
    }
}
