use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "stats")]
use std::sync::Once;

#[cfg(feature = "stats")]
use crate::CacheStats;

static NEXT_SLOT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of one cached member.
///
/// Ids are handed out from a global counter the first time a [`Slot`] is
/// used, so two members never share storage even when their names match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u64);

impl SlotId {
    fn next() -> Self {
        SlotId(NEXT_SLOT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Registration record of a cached member.
///
/// A `Slot` names the member, lazily receives its [`SlotId`] and, with the
/// `stats` feature, counts hits and misses. It is meant to live in a
/// `static` so every object of the owning type resolves the same id:
///
/// ```
/// use slotcache_core::{InstanceCache, Slot};
///
/// static GREETING: Slot = Slot::new("Greeter::greeting");
///
/// let cache = InstanceCache::new();
/// let first = cache.resolve(&GREETING, || String::from("hello"));
/// let second: String = cache.resolve(&GREETING, || unreachable!());
/// assert_eq!(first, second);
/// assert_eq!(GREETING.id(), GREETING.id());
/// ```
///
/// A `Slot` created in a `const` is copied at every use and each copy gets
/// a fresh id; declare slots (and the descriptors that embed them) as
/// `static`.
pub struct Slot {
    name: &'static str,
    id: OnceCell<SlotId>,
    #[cfg(feature = "stats")]
    stats: CacheStats,
    #[cfg(feature = "stats")]
    registered: Once,
}

impl Slot {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            id: OnceCell::new(),
            #[cfg(feature = "stats")]
            stats: CacheStats::new(),
            #[cfg(feature = "stats")]
            registered: Once::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the slot's id, assigning one on first use.
    pub fn id(&self) -> SlotId {
        *self.id.get_or_init(|| {
            let id = SlotId::next();
            tracing::debug!(slot = self.name, id = id.get(), "registered cache slot");
            id
        })
    }

    /// Hit/miss counters of this member.
    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Publishes this slot's statistics in the
    /// [`stats_registry`](crate::stats_registry) under the slot name.
    ///
    /// Only the first call registers; later calls are a cheap check. Without
    /// the `stats` feature this does nothing.
    pub fn register_stats(&'static self) {
        #[cfg(feature = "stats")]
        self.registered
            .call_once(|| crate::stats_registry::register(self.name, &self.stats));
    }

    #[inline]
    pub(crate) fn record_hit(&self) {
        tracing::trace!(slot = self.name, "cache hit");
        #[cfg(feature = "stats")]
        self.stats.record_hit();
    }

    #[inline]
    pub(crate) fn record_miss(&self) {
        tracing::trace!(slot = self.name, "cache miss");
        #[cfg(feature = "stats")]
        self.stats.record_miss();
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("name", &self.name)
            .field("id", &self.id.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_is_stable() {
        let slot = Slot::new("stable");
        assert_eq!(slot.id(), slot.id());
    }

    #[test]
    fn test_same_name_distinct_ids() {
        let first = Slot::new("area");
        let second = Slot::new("area");
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn test_debug_shows_unassigned_id() {
        let slot = Slot::new("lazy");
        assert_eq!(format!("{:?}", slot), r#"Slot { name: "lazy", id: None }"#);
        let id = slot.id();
        assert!(format!("{:?}", slot).contains(&format!("{}", id.get())));
    }

    #[test]
    #[cfg(feature = "stats")]
    fn test_register_stats_once() {
        static SLOT: Slot = Slot::new("slot_test_register_stats");

        SLOT.register_stats();
        SLOT.register_stats();
        SLOT.record_miss();
        SLOT.record_hit();

        let snapshot = crate::stats_registry::get("slot_test_register_stats").unwrap();
        assert_eq!(snapshot.hits(), 1);
        assert_eq!(snapshot.misses(), 1);
    }
}
