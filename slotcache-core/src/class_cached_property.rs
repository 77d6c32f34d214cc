use std::fmt;
use std::marker::PhantomData;

use crate::{resolve_shared, try_resolve_shared, CacheError, ClassScoped, Raw, Result, Slot, StoragePolicy};

#[cfg(feature = "stats")]
use crate::CacheStats;

/// A property computed once per exact type and shared by all its objects.
///
/// The first read through an object of type `C` computes the value with
/// that object and stores it in the hierarchy's
/// [`ClassCache`](crate::ClassCache) under `C`. Other objects of `C` reuse
/// it; objects of a different concrete type (a "subclass" sharing the same
/// trait and cache root) compute and store their own value.
///
/// When the object exposes
/// [`mirror_storage`](ClassScoped::mirror_storage) the value is also copied
/// into it, and later reads through that object return the mirrored copy.
///
/// # Errors
///
/// [`get`](Self::get) fails with [`CacheError::MissingClassCache`] when the
/// object's type provides no `ClassCache`.
///
/// # Examples
///
/// ```
/// use once_cell::sync::Lazy;
/// use slotcache_core::{ClassCache, ClassCachedProperty, ClassId, ClassScoped};
///
/// static SHAPES: Lazy<ClassCache> = Lazy::new(ClassCache::new);
///
/// trait Shape: ClassScoped {
///     fn corners(&self) -> u32;
/// }
///
/// struct Square;
/// struct Triangle;
///
/// impl ClassScoped for Square {
///     fn class_id(&self) -> ClassId { ClassId::of::<Self>() }
///     fn class_cache(&self) -> Option<&ClassCache> { Some(&*SHAPES) }
/// }
/// impl ClassScoped for Triangle {
///     fn class_id(&self) -> ClassId { ClassId::of::<Self>() }
///     fn class_cache(&self) -> Option<&ClassCache> { Some(&*SHAPES) }
/// }
/// impl Shape for Square { fn corners(&self) -> u32 { 4 } }
/// impl Shape for Triangle { fn corners(&self) -> u32 { 3 } }
///
/// static LABEL: ClassCachedProperty<dyn Shape, String> =
///     ClassCachedProperty::new("Shape::label", |shape| format!("{} corners", shape.corners()));
///
/// assert_eq!(LABEL.get(&Square).unwrap(), "4 corners");
/// assert_eq!(LABEL.get(&Triangle).unwrap(), "3 corners");
/// ```
pub struct ClassCachedProperty<T: ?Sized, V, P = Raw> {
    slot: Slot,
    compute: fn(&T) -> V,
    _policy: PhantomData<fn() -> P>,
}

impl<T: ?Sized, V, P> ClassCachedProperty<T, V, P> {
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

impl<T, V, P> ClassCachedProperty<T, V, P>
where
    T: ClassScoped + ?Sized,
    P: StoragePolicy<V>,
    P::Stored: Send + Sync,
{
    pub fn get(&self, obj: &T) -> Result<P::Stored> {
        resolve_shared(obj, &self.slot, || P::prepare((self.compute)(obj)))
    }
}

impl<T: ClassScoped + ?Sized, V, P> ClassCachedProperty<T, V, P> {
    /// Returns `true` when the exact type of `obj` holds a shared value.
    ///
    /// Always `false` when the type provides no class cache.
    pub fn is_cached(&self, obj: &T) -> bool {
        obj.class_cache()
            .map_or(false, |cache| cache.contains(obj.class_id(), self.slot.id()))
    }
}

impl<T, U, E, P> ClassCachedProperty<T, std::result::Result<U, E>, P>
where
    T: ClassScoped + ?Sized,
    E: From<CacheError>,
    P: StoragePolicy<U>,
    P::Stored: Send + Sync,
{
    /// Reads a fallible property: only `Ok` values are shared, an `Err`
    /// reaches the caller and the next read retries.
    pub fn try_get(&self, obj: &T) -> std::result::Result<P::Stored, E> {
        try_resolve_shared(obj, &self.slot, || (self.compute)(obj).map(P::prepare))
    }
}

impl<T: ?Sized, V, P> fmt::Debug for ClassCachedProperty<T, V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassCachedProperty")
            .field("name", &self.slot.name())
            .finish()
    }
}
