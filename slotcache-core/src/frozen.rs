//! Read-only collections used to freeze cached results.
//!
//! A cached value is shared by every later reader. When the computation
//! returns a mapping or a set, freezing it into [`FrozenMap`] or
//! [`FrozenSet`] removes every mutating operation from the surface, and the
//! `Arc`-backed storage makes each read a cheap clone of the same allocation.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;
use std::ops::Index;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::{CacheError, Result};

/// An immutable, insertion-ordered map.
///
/// Built once from key/value pairs; duplicate keys resolve last-write-wins
/// while the key keeps the position of its first occurrence. There is no
/// insert, update or remove operation.
///
/// # Examples
///
/// ```
/// use slotcache_core::FrozenMap;
///
/// let map: FrozenMap<&str, i32> = [("a", 1), ("b", 2), ("a", 3)].into_iter().collect();
///
/// assert_eq!(map.len(), 2);
/// assert_eq!(map["a"], 3);
/// assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec!["a", "b"]);
/// assert!(map.lookup("c").is_err());
/// assert_eq!(format!("{:?}", map), r#"{"a": 3, "b": 2}"#);
/// ```
pub struct FrozenMap<K, V> {
    inner: Arc<IndexMap<K, V>>,
}

impl<K: Hash + Eq, V> FrozenMap<K, V> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(IndexMap::new()),
        }
    }

    /// Returns the value stored under `key`, or `None`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.get(key)
    }

    /// Returns the value stored under `key`.
    ///
    /// # Errors
    ///
    /// [`CacheError::MissingKey`] when the key is absent. The error carries
    /// the `Debug` rendering of the key.
    pub fn lookup<Q>(&self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + fmt::Debug + ?Sized,
    {
        self.inner.get(key).ok_or_else(|| CacheError::MissingKey {
            key: format!("{:?}", key),
        })
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.contains_key(key)
    }
}

impl<K, V> FrozenMap<K, V> {
    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> indexmap::map::Keys<'_, K, V> {
        self.inner.keys()
    }

    /// Values in insertion order.
    pub fn values(&self) -> indexmap::map::Values<'_, K, V> {
        self.inner.values()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, K, V> {
        self.inner.iter()
    }

    /// Returns `true` when both maps share the same storage.
    ///
    /// Clones of a frozen map never copy their entries, so two reads of the
    /// same cached value are `ptr_eq`.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<K, V> Clone for FrozenMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: Hash + Eq, V> Default for FrozenMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq, V> FromIterator<(K, V)> for FrozenMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: Arc::new(iter.into_iter().collect()),
        }
    }
}

impl<K: Hash + Eq, V, const N: usize> From<[(K, V); N]> for FrozenMap<K, V> {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<K: Hash + Eq, V, S> From<HashMap<K, V, S>> for FrozenMap<K, V> {
    fn from(map: HashMap<K, V, S>) -> Self {
        map.into_iter().collect()
    }
}

impl<K: Hash + Eq, V> From<BTreeMap<K, V>> for FrozenMap<K, V> {
    fn from(map: BTreeMap<K, V>) -> Self {
        map.into_iter().collect()
    }
}

impl<K, Q, V> Index<&Q> for FrozenMap<K, V>
where
    K: Hash + Eq + Borrow<Q>,
    Q: Hash + Eq + ?Sized,
{
    type Output = V;

    /// # Panics
    ///
    /// Panics when the key is absent, like `HashMap`. Use
    /// [`FrozenMap::lookup`] for a fallible lookup.
    fn index(&self, key: &Q) -> &V {
        match self.inner.get(key) {
            Some(value) => value,
            None => panic!("FrozenMap: key not found"),
        }
    }
}

impl<'a, K, V> IntoIterator for &'a FrozenMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = indexmap::map::Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

impl<K: Hash + Eq, V: PartialEq> PartialEq for FrozenMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.inner == *other.inner
    }
}

impl<K: Hash + Eq, V: Eq> Eq for FrozenMap<K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for FrozenMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.inner.iter()).finish()
    }
}

/// An immutable, insertion-ordered set.
///
/// # Examples
///
/// ```
/// use slotcache_core::FrozenSet;
///
/// let set: FrozenSet<u32> = [3, 1, 3, 2].into_iter().collect();
/// assert_eq!(set.len(), 3);
/// assert!(set.contains(&1));
/// assert_eq!(format!("{:?}", set), "{3, 1, 2}");
/// ```
pub struct FrozenSet<T> {
    inner: Arc<IndexSet<T>>,
}

impl<T: Hash + Eq> FrozenSet<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(IndexSet::new()),
        }
    }

    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.contains(value)
    }
}

impl<T> FrozenSet<T> {
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Members in insertion order.
    pub fn iter(&self) -> indexmap::set::Iter<'_, T> {
        self.inner.iter()
    }

    /// Returns `true` when both sets share the same storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Clone for FrozenSet<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Hash + Eq> Default for FrozenSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Hash + Eq> FromIterator<T> for FrozenSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            inner: Arc::new(iter.into_iter().collect()),
        }
    }
}

impl<'a, T> IntoIterator for &'a FrozenSet<T> {
    type Item = &'a T;
    type IntoIter = indexmap::set::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

impl<T: Hash + Eq> PartialEq for FrozenSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.inner == *other.inner
    }
}

impl<T: Hash + Eq> Eq for FrozenSet<T> {}

impl<T: fmt::Debug> fmt::Debug for FrozenSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.inner.iter()).finish()
    }
}
