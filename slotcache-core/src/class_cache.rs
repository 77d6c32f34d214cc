use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::{CacheError, InstanceCache, Result, Slot, SlotId};

/// Identity of an exact concrete type.
///
/// Equality and hashing use the `TypeId` only; the name is kept for logs
/// and error messages.
#[derive(Clone, Copy)]
pub struct ClassId {
    type_id: TypeId,
    name: &'static str,
}

impl ClassId {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ClassId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ClassId {}

impl Hash for ClassId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClassId").field(&self.name).finish()
    }
}

type ClassEntries = HashMap<(SlotId, TypeId), Box<dyn Any + Send + Sync>>;

/// Shared storage for class-cached members, keyed by exact type.
///
/// A type hierarchy registers one `ClassCache` (typically a
/// `static Lazy<ClassCache>`) and every type in it reports that cache from
/// [`ClassScoped::class_cache`]. Entries are keyed by ([`ClassId`], member),
/// so types sharing the root never read each other's values.
///
/// # Thread Safety
///
/// Entries sit in a `DashMap` so the cache can live in a `static`. No shard
/// lock is held while a computation runs: concurrent first reads of the
/// same member may each compute, and the last write wins.
///
/// # Examples
///
/// ```
/// use slotcache_core::{ClassCache, ClassId, Slot};
///
/// struct Square;
/// struct Triangle;
///
/// static SIDES: Slot = Slot::new("Shape::sides");
///
/// let cache = ClassCache::new();
/// assert_eq!(cache.resolve(ClassId::of::<Square>(), &SIDES, || 4u32), 4);
/// assert_eq!(cache.resolve(ClassId::of::<Triangle>(), &SIDES, || 3u32), 3);
/// assert_eq!(cache.resolve(ClassId::of::<Square>(), &SIDES, || 0u32), 4);
/// assert_eq!(cache.class_count(), 2);
/// ```
#[derive(Default)]
pub struct ClassCache {
    classes: DashMap<ClassId, ClassEntries>,
}

/// Objects whose cached members are shared per exact type.
///
/// # Examples
///
/// ```
/// use once_cell::sync::Lazy;
/// use slotcache_core::{ClassCache, ClassId, ClassScoped, InstanceCache};
///
/// static WIDGETS: Lazy<ClassCache> = Lazy::new(ClassCache::new);
///
/// struct Button {
///     cache: InstanceCache,
/// }
///
/// impl ClassScoped for Button {
///     fn class_id(&self) -> ClassId {
///         ClassId::of::<Self>()
///     }
///
///     fn class_cache(&self) -> Option<&ClassCache> {
///         Some(&*WIDGETS)
///     }
///
///     fn mirror_storage(&self) -> Option<&InstanceCache> {
///         Some(&self.cache)
///     }
/// }
/// ```
pub trait ClassScoped {
    /// The exact type of this object.
    fn class_id(&self) -> ClassId;

    /// The shared cache root of this type's hierarchy, if it provides one.
    fn class_cache(&self) -> Option<&ClassCache>;

    /// Per-object storage that shared values are mirrored into.
    ///
    /// `None` (the default) means the object has no room for mirrored
    /// values; mirroring is then skipped.
    fn mirror_storage(&self) -> Option<&InstanceCache> {
        None
    }
}

impl ClassCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a clone of the value stored for (`class`, `slot`).
    pub fn get<S: Clone + 'static>(&self, class: ClassId, slot: SlotId) -> Option<S> {
        self.classes.get(&class).and_then(|entries| {
            entries
                .get(&(slot, TypeId::of::<S>()))
                .and_then(|entry| entry.downcast_ref::<S>())
                .cloned()
        })
    }

    /// Stores `value` for (`class`, `slot`), replacing any previous value.
    pub fn insert<S: Send + Sync + 'static>(&self, class: ClassId, slot: SlotId, value: S) {
        self.classes
            .entry(class)
            .or_default()
            .insert((slot, TypeId::of::<S>()), Box::new(value));
    }

    /// Returns `true` when `class` holds a value for `slot`.
    pub fn contains(&self, class: ClassId, slot: SlotId) -> bool {
        self.classes
            .get(&class)
            .map_or(false, |entries| entries.keys().any(|(id, _)| *id == slot))
    }

    /// Returns the value stored for (`class`, `slot`), computing and storing
    /// it first when absent.
    pub fn resolve<S, F>(&self, class: ClassId, slot: &Slot, compute: F) -> S
    where
        S: Clone + Send + Sync + 'static,
        F: FnOnce() -> S,
    {
        let id = slot.id();
        if let Some(value) = self.get::<S>(class, id) {
            slot.record_hit();
            return value;
        }

        slot.record_miss();
        let value = compute();
        tracing::debug!(class = class.name(), slot = slot.name(), "populated class cache");
        self.insert(class, id, value.clone());
        value
    }

    /// Like [`resolve`](Self::resolve) but only `Ok` values are stored.
    pub fn try_resolve<S, E, F>(&self, class: ClassId, slot: &Slot, compute: F) -> Result<S, E>
    where
        S: Clone + Send + Sync + 'static,
        F: FnOnce() -> Result<S, E>,
    {
        let id = slot.id();
        if let Some(value) = self.get::<S>(class, id) {
            slot.record_hit();
            return Ok(value);
        }

        slot.record_miss();
        let value = compute()?;
        tracing::debug!(class = class.name(), slot = slot.name(), "populated class cache");
        self.insert(class, id, value.clone());
        Ok(value)
    }

    /// Drops every value stored for `class`.
    ///
    /// Objects that already hold a mirrored copy keep it.
    pub fn clear_class(&self, class: ClassId) -> bool {
        let removed = self.classes.remove(&class).is_some();
        if removed {
            tracing::debug!(class = class.name(), "cleared class cache");
        }
        removed
    }

    /// Drops every value of every class.
    pub fn clear(&self) {
        self.classes.clear();
    }

    /// Number of classes holding at least one entry.
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Number of entries stored for `class`.
    pub fn len(&self, class: ClassId) -> usize {
        self.classes.get(&class).map_or(0, |entries| entries.len())
    }
}

impl fmt::Debug for ClassCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassCache")
            .field("classes", &self.class_count())
            .finish()
    }
}

/// Resolves a class-shared member for `owner`.
///
/// Lookup order: the owner's mirrored copy, then the shared entry of its
/// exact class, then the computation. A value found or computed through
/// the class cache is mirrored into the owner when it exposes
/// [`mirror_storage`](ClassScoped::mirror_storage).
///
/// # Errors
///
/// [`CacheError::MissingClassCache`] when there is no mirrored copy and the
/// owner's type provides no [`ClassCache`].
pub fn resolve_shared<O, S, F>(owner: &O, slot: &Slot, compute: F) -> Result<S>
where
    O: ClassScoped + ?Sized,
    S: Clone + Send + Sync + 'static,
    F: FnOnce() -> S,
{
    if let Some(value) = mirrored(owner, slot) {
        return Ok(value);
    }

    let class = owner.class_id();
    let cache = owner.class_cache().ok_or(CacheError::MissingClassCache {
        class: class.name(),
    })?;
    let value = cache.resolve(class, slot, compute);
    mirror(owner, slot, &value);
    Ok(value)
}

/// Fallible variant of [`resolve_shared`]: `Err` values are returned
/// uncached, and a missing class cache is converted into the caller's
/// error type.
pub fn try_resolve_shared<O, S, E, F>(owner: &O, slot: &Slot, compute: F) -> Result<S, E>
where
    O: ClassScoped + ?Sized,
    S: Clone + Send + Sync + 'static,
    E: From<CacheError>,
    F: FnOnce() -> Result<S, E>,
{
    if let Some(value) = mirrored(owner, slot) {
        return Ok(value);
    }

    let class = owner.class_id();
    let cache = owner.class_cache().ok_or(CacheError::MissingClassCache {
        class: class.name(),
    })?;
    let value = cache.try_resolve(class, slot, compute)?;
    mirror(owner, slot, &value);
    Ok(value)
}

fn mirrored<O, S>(owner: &O, slot: &Slot) -> Option<S>
where
    O: ClassScoped + ?Sized,
    S: Clone + 'static,
{
    let value = owner.mirror_storage()?.get::<S>(slot.id())?;
    slot.record_hit();
    Some(value)
}

fn mirror<O, S>(owner: &O, slot: &Slot, value: &S)
where
    O: ClassScoped + ?Sized,
    S: Clone + 'static,
{
    match owner.mirror_storage() {
        Some(storage) => storage.insert(slot.id(), value.clone()),
        None => tracing::trace!(slot = slot.name(), "object has no mirror storage, skipping"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Plain;
    struct Derived;

    struct Owner<'a> {
        class: ClassId,
        cache: Option<&'a ClassCache>,
        mirror: Option<InstanceCache>,
    }

    impl ClassScoped for Owner<'_> {
        fn class_id(&self) -> ClassId {
            self.class
        }

        fn class_cache(&self) -> Option<&ClassCache> {
            self.cache
        }

        fn mirror_storage(&self) -> Option<&InstanceCache> {
            self.mirror.as_ref()
        }
    }

    #[test]
    fn test_class_id_identity() {
        assert_eq!(ClassId::of::<Plain>(), ClassId::of::<Plain>());
        assert_ne!(ClassId::of::<Plain>(), ClassId::of::<Derived>());
        assert!(ClassId::of::<Plain>().name().ends_with("Plain"));
    }

    #[test]
    fn test_exact_class_isolation() {
        let slot = Slot::new("isolated");
        let cache = ClassCache::new();
        let calls = AtomicUsize::new(0);
        let compute = || calls.fetch_add(1, Ordering::SeqCst) + 100;

        let plain = cache.resolve(ClassId::of::<Plain>(), &slot, compute);
        let derived = cache.resolve(ClassId::of::<Derived>(), &slot, compute);
        assert_eq!(plain, 100);
        assert_eq!(derived, 101);
        assert_eq!(cache.resolve(ClassId::of::<Plain>(), &slot, compute), 100);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_clear_class() {
        let slot = Slot::new("clearable");
        let cache = ClassCache::new();
        let class = ClassId::of::<Plain>();

        cache.resolve(class, &slot, || 1u8);
        assert!(cache.contains(class, slot.id()));
        assert_eq!(cache.len(class), 1);
        assert!(cache.clear_class(class));
        assert!(!cache.clear_class(class));
        assert_eq!(cache.resolve(class, &slot, || 2u8), 2);

        cache.clear();
        assert_eq!(cache.class_count(), 0);
    }

    #[test]
    fn test_try_resolve_keeps_errors_out() {
        let slot = Slot::new("class_fallible");
        let cache = ClassCache::new();
        let class = ClassId::of::<Plain>();

        let failed: std::result::Result<u8, &str> = cache.try_resolve(class, &slot, || Err("no"));
        assert_eq!(failed, Err("no"));
        assert!(!cache.contains(class, slot.id()));
        assert_eq!(cache.try_resolve::<u8, &str, _>(class, &slot, || Ok(8)), Ok(8));
        assert_eq!(cache.try_resolve::<u8, &str, _>(class, &slot, || Ok(9)), Ok(8));
    }

    #[test]
    fn test_resolve_shared_mirrors_value() {
        let slot = Slot::new("mirrored");
        let cache = ClassCache::new();
        let owner = Owner {
            class: ClassId::of::<Plain>(),
            cache: Some(&cache),
            mirror: Some(InstanceCache::new()),
        };

        assert_eq!(resolve_shared(&owner, &slot, || 5u32), Ok(5));
        let mirror = owner.mirror.as_ref().unwrap();
        assert_eq!(mirror.get::<u32>(slot.id()), Some(5));

        // the mirrored copy wins even after the shared entry is dropped
        cache.clear();
        assert_eq!(resolve_shared(&owner, &slot, || 6u32), Ok(5));
    }

    #[test]
    fn test_resolve_shared_without_mirror_storage() {
        let slot = Slot::new("unmirrored");
        let cache = ClassCache::new();
        let owner = Owner {
            class: ClassId::of::<Plain>(),
            cache: Some(&cache),
            mirror: None,
        };

        assert_eq!(resolve_shared(&owner, &slot, || 'a'), Ok('a'));
        assert_eq!(resolve_shared(&owner, &slot, || 'b'), Ok('a'));
    }

    #[test]
    fn test_resolve_shared_missing_class_cache() {
        let slot = Slot::new("orphan");
        let owner = Owner {
            class: ClassId::of::<Derived>(),
            cache: None,
            mirror: Some(InstanceCache::new()),
        };

        let err = resolve_shared(&owner, &slot, || 1u8).unwrap_err();
        assert_eq!(
            err,
            CacheError::MissingClassCache {
                class: ClassId::of::<Derived>().name()
            }
        );
    }

    #[test]
    fn test_try_resolve_shared_converts_missing_cache() {
        #[derive(Debug, PartialEq)]
        enum AppError {
            Cache(CacheError),
        }

        impl From<CacheError> for AppError {
            fn from(err: CacheError) -> Self {
                AppError::Cache(err)
            }
        }

        let slot = Slot::new("orphan_fallible");
        let owner = Owner {
            class: ClassId::of::<Plain>(),
            cache: None,
            mirror: None,
        };

        let result: std::result::Result<u8, AppError> = try_resolve_shared(&owner, &slot, || Ok(1));
        assert!(matches!(
            result,
            Err(AppError::Cache(CacheError::MissingClassCache { .. }))
        ));
    }
}
