//! # slotcache
//!
//! Memoization for methods and properties: a value is computed once per
//! object (or once per exact type) and reused on every later access.
//!
//! ## Features
//!
//! - **Cached properties**: `#[cached_property]` computes on first read and
//!   generates an `invalidate_<name>` companion
//! - **Cached methods**: `#[cached_method]` for `&self` methods,
//!   `#[cached_args_method]` for methods keyed by their argument tuple
//! - **Class-shared values**: `#[class_cached_property]` stores one value per
//!   exact type, so "subclasses" never read a parent's entry
//! - **Frozen values**: the `freeze` option stores sequences, sets, maps and
//!   strings in immutable `Arc`-backed forms so callers cannot mutate the
//!   cached copy
//! - **Result-aware**: only `Ok` values are cached, errors are retried
//! - **Statistics**: hit/miss counters per member with the `stats` feature
//!
//! ## Quick Start
//!
//! Embed an [`InstanceCache`] in the struct and expose it through
//! [`InstanceStorage`]:
//!
//! ```rust
//! use slotcache::{cached_args_method, cached_property, InstanceCache, InstanceStorage};
//!
//! struct Polygon {
//!     points: Vec<(f64, f64)>,
//!     cache: InstanceCache,
//! }
//!
//! impl InstanceStorage for Polygon {
//!     fn instance_cache(&self) -> &InstanceCache {
//!         &self.cache
//!     }
//! }
//!
//! impl Polygon {
//!     #[cached_property]
//!     fn perimeter(&self) -> f64 {
//!         let n = self.points.len();
//!         (0..n)
//!             .map(|i| {
//!                 let (x1, y1) = self.points[i];
//!                 let (x2, y2) = self.points[(i + 1) % n];
//!                 ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt()
//!             })
//!             .sum()
//!     }
//!
//!     #[cached_args_method]
//!     fn scaled_perimeter(&self, factor: u32) -> f64 {
//!         self.perimeter() * factor as f64
//!     }
//! }
//!
//! let square = Polygon {
//!     points: vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)],
//!     cache: InstanceCache::new(),
//! };
//! assert_eq!(square.perimeter(), 4.0);
//! assert_eq!(square.scaled_perimeter(3), 12.0);
//!
//! // Drop the cached perimeter; the next read recomputes it.
//! assert!(square.invalidate_perimeter());
//! ```
//!
//! ## Frozen Values
//!
//! ```rust
//! use std::collections::HashMap;
//! use slotcache::{cached_method, FrozenMap, InstanceCache, InstanceStorage};
//!
//! struct Catalog {
//!     cache: InstanceCache,
//! }
//!
//! impl InstanceStorage for Catalog {
//!     fn instance_cache(&self) -> &InstanceCache {
//!         &self.cache
//!     }
//! }
//!
//! impl Catalog {
//!     #[cached_method(freeze)]
//!     fn prices(&self) -> HashMap<&'static str, u32> {
//!         HashMap::from([("tea", 3), ("cake", 5)])
//!     }
//! }
//!
//! let catalog = Catalog { cache: InstanceCache::new() };
//! let prices: FrozenMap<&str, u32> = catalog.prices();
//! assert_eq!(prices[&"tea"], 3);
//! assert!(prices.ptr_eq(&catalog.prices()));
//! ```
//!
//! ## Class-Shared Values
//!
//! A type hierarchy registers one [`ClassCache`]; each concrete type reports
//! its own [`ClassId`]:
//!
//! ```rust
//! use once_cell::sync::Lazy;
//! use slotcache::{class_cached_property, ClassCache, ClassId, ClassScoped};
//!
//! static DRIVERS: Lazy<ClassCache> = Lazy::new(ClassCache::new);
//!
//! struct Postgres;
//!
//! impl ClassScoped for Postgres {
//!     fn class_id(&self) -> ClassId {
//!         ClassId::of::<Self>()
//!     }
//!
//!     fn class_cache(&self) -> Option<&ClassCache> {
//!         Some(&*DRIVERS)
//!     }
//! }
//!
//! impl Postgres {
//!     #[class_cached_property]
//!     fn dialect(&self) -> String {
//!         "postgresql".to_string()
//!     }
//! }
//!
//! assert_eq!(Postgres.dialect().unwrap(), "postgresql");
//! ```
//!
//! ## Explicit Descriptors
//!
//! The macros are thin wrappers; the same caches are available as `static`
//! descriptor values ([`CachedProperty`], [`CachedMethod`],
//! [`CachedArgsMethod`], [`ClassCachedProperty`]) for code that prefers
//! explicit getters or needs `is_cached`/`invalidate` on methods.
//!
//! ## Statistics
//!
//! With the default `stats` feature every macro-generated member registers
//! its counters in [`stats_registry`] under its name (or `name = "..."`):
//!
//! ```rust
//! # #[cfg(feature = "stats")]
//! # {
//! use slotcache::{cached_method, stats_registry, InstanceCache, InstanceStorage};
//!
//! struct Job {
//!     cache: InstanceCache,
//! }
//!
//! impl InstanceStorage for Job {
//!     fn instance_cache(&self) -> &InstanceCache {
//!         &self.cache
//!     }
//! }
//!
//! impl Job {
//!     #[cached_method(name = "Job::estimate")]
//!     fn estimate(&self) -> u64 {
//!         42
//!     }
//! }
//!
//! let job = Job { cache: InstanceCache::new() };
//! job.estimate();
//! job.estimate();
//!
//! let stats = stats_registry::get("Job::estimate").unwrap();
//! assert_eq!(stats.hits(), 1);
//! assert_eq!(stats.misses(), 1);
//! # }
//! ```
pub use slotcache_core::*;
pub use slotcache_macros::{cached_args_method, cached_method, cached_property, class_cached_property};
