//! How a computed value is prepared before it is stored in a cache slot.
//!
//! Two policies exist and the choice is made per member, in the type:
//!
//! * [`Raw`] - store the value exactly as the computation returned it. Every
//!   read hands back a clone of it. This is the default.
//! * [`Frozen`] - pass the value through [`Freeze`] first. Sequences become
//!   `Arc<[T]>`, sets become [`FrozenSet`], maps become [`FrozenMap`] and
//!   strings become `Arc<str>`. Reads then clone an `Arc`, so every reader
//!   observes the same allocation and nobody can mutate the cached copy.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use slotcache_core::{Freeze, Frozen, Raw, StoragePolicy};
//!
//! let raw: Vec<u8> = <Raw as StoragePolicy<Vec<u8>>>::prepare(vec![1, 2]);
//! assert_eq!(raw, vec![1, 2]);
//!
//! let frozen: Arc<[u8]> = <Frozen as StoragePolicy<Vec<u8>>>::prepare(vec![1, 2]);
//! assert_eq!(&*frozen, &[1, 2]);
//!
//! assert_eq!(vec![1, 2].freeze(), frozen);
//! ```

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::Arc;

use crate::{FrozenMap, FrozenSet};

/// Conversion of a value into its immutable, cheaply clonable form.
pub trait Freeze {
    type Frozen: Clone + 'static;

    fn freeze(self) -> Self::Frozen;
}

/// Selects how computed values are stored.
///
/// `Stored` is what the cache keeps and what every read returns.
pub trait StoragePolicy<V>: 'static {
    type Stored: Clone + 'static;

    fn prepare(value: V) -> Self::Stored;
}

/// Store computed values unchanged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Raw;

/// Store computed values in their [`Freeze`]d form.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Frozen;

impl<V: Clone + 'static> StoragePolicy<V> for Raw {
    type Stored = V;

    #[inline]
    fn prepare(value: V) -> V {
        value
    }
}

impl<V: Freeze> StoragePolicy<V> for Frozen {
    type Stored = V::Frozen;

    #[inline]
    fn prepare(value: V) -> V::Frozen {
        value.freeze()
    }
}

impl<T: 'static> Freeze for Vec<T> {
    type Frozen = Arc<[T]>;

    fn freeze(self) -> Arc<[T]> {
        self.into()
    }
}

impl<T: 'static> Freeze for VecDeque<T> {
    type Frozen = Arc<[T]>;

    fn freeze(self) -> Arc<[T]> {
        Vec::from(self).into()
    }
}

impl<T: 'static> Freeze for Box<[T]> {
    type Frozen = Arc<[T]>;

    fn freeze(self) -> Arc<[T]> {
        self.into()
    }
}

impl<T: Hash + Eq + 'static, S> Freeze for HashSet<T, S> {
    type Frozen = FrozenSet<T>;

    fn freeze(self) -> FrozenSet<T> {
        self.into_iter().collect()
    }
}

impl<K: Hash + Eq + 'static, V: 'static, S> Freeze for HashMap<K, V, S> {
    type Frozen = FrozenMap<K, V>;

    fn freeze(self) -> FrozenMap<K, V> {
        self.into()
    }
}

impl<K: Hash + Eq + 'static, V: 'static> Freeze for BTreeMap<K, V> {
    type Frozen = FrozenMap<K, V>;

    fn freeze(self) -> FrozenMap<K, V> {
        self.into()
    }
}

impl Freeze for String {
    type Frozen = Arc<str>;

    fn freeze(self) -> Arc<str> {
        self.into()
    }
}

impl<T: Freeze> Freeze for Option<T> {
    type Frozen = Option<T::Frozen>;

    fn freeze(self) -> Self::Frozen {
        self.map(Freeze::freeze)
    }
}

impl<A: Freeze, B: Freeze> Freeze for (A, B) {
    type Frozen = (A::Frozen, B::Frozen);

    fn freeze(self) -> Self::Frozen {
        (self.0.freeze(), self.1.freeze())
    }
}

impl<A: Freeze, B: Freeze, C: Freeze> Freeze for (A, B, C) {
    type Frozen = (A::Frozen, B::Frozen, C::Frozen);

    fn freeze(self) -> Self::Frozen {
        (self.0.freeze(), self.1.freeze(), self.2.freeze())
    }
}

impl<T: ?Sized + 'static> Freeze for Arc<T> {
    type Frozen = Arc<T>;

    fn freeze(self) -> Arc<T> {
        self
    }
}

impl<K: 'static, V: 'static> Freeze for FrozenMap<K, V> {
    type Frozen = Self;

    fn freeze(self) -> Self {
        self
    }
}

impl<T: 'static> Freeze for FrozenSet<T> {
    type Frozen = Self;

    fn freeze(self) -> Self {
        self
    }
}

// Values without interior structure are already immutable.
macro_rules! freeze_as_is {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Freeze for $ty {
                type Frozen = $ty;

                #[inline]
                fn freeze(self) -> $ty {
                    self
                }
            }
        )*
    };
}

freeze_as_is!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    &'static str,
);
