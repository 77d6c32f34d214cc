/// Errors reported by slotcache lookups.
///
/// Failures of a cached computation are never represented here: panics and
/// `Err` values produced by the computation reach the caller unchanged and
/// nothing is stored.
///
/// # Examples
///
/// ```
/// use slotcache_core::{CacheError, FrozenMap};
///
/// let map: FrozenMap<&str, i32> = [("a", 1)].into();
/// let err = map.lookup("c").unwrap_err();
/// assert_eq!(err, CacheError::MissingKey { key: "\"c\"".to_string() });
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// A [`FrozenMap`](crate::FrozenMap) lookup named a key that is not present.
    #[error("key not found: {key}")]
    MissingKey { key: String },

    /// A class-cached member was read on a type that does not provide a
    /// [`ClassCache`](crate::ClassCache).
    #[error("type `{class}` does not provide a class cache")]
    MissingClassCache { class: &'static str },
}

/// Result alias used across slotcache.
pub type Result<T, E = CacheError> = std::result::Result<T, E>;
