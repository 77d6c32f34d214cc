//! Process-wide registry of cached members' statistics, indexed by name.
//!
//! Members generated by the slotcache attribute macros register themselves
//! on their first call. Hand-written descriptors declared as `static` items
//! can opt in with `register_stats()`.
//!
//! # Examples
//!
//! ```
//! use slotcache_core::{stats_registry, CacheStats};
//!
//! static STATS: CacheStats = CacheStats::new();
//! stats_registry::register("Report::summary", &STATS);
//!
//! STATS.record_miss();
//! let snapshot = stats_registry::get("Report::summary").unwrap();
//! assert_eq!(snapshot.misses(), 1);
//! ```

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::CacheStats;

static STATS_REGISTRY: Lazy<RwLock<HashMap<String, &'static CacheStats>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Registers `stats` under `name`, replacing any previous registration.
pub fn register(name: &str, stats: &'static CacheStats) {
    tracing::debug!(name, "registered cache statistics");
    STATS_REGISTRY.write().insert(name.to_string(), stats);
}

/// Returns a snapshot of the statistics registered under `name`.
pub fn get(name: &str) -> Option<CacheStats> {
    STATS_REGISTRY.read().get(name).map(|stats| (*stats).clone())
}

/// Returns the live statistics registered under `name`.
pub fn get_ref(name: &str) -> Option<&'static CacheStats> {
    STATS_REGISTRY.read().get(name).copied()
}

/// Names of all registered members.
pub fn list() -> Vec<String> {
    STATS_REGISTRY.read().keys().cloned().collect()
}

/// Removes every registration. The counters themselves are not reset.
pub fn clear() {
    STATS_REGISTRY.write().clear();
}

/// Resets the counters registered under `name`.
///
/// Returns `false` when nothing is registered under that name.
pub fn reset(name: &str) -> bool {
    match STATS_REGISTRY.read().get(name) {
        Some(stats) => {
            stats.reset();
            true
        }
        None => false,
    }
}
