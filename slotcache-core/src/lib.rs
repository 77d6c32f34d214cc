//! # slotcache Core
//!
//! Storage and descriptor types behind the slotcache memoization macros.
//!
//! A cached member is identified by a [`Slot`], a `static` registration
//! record that receives a process-unique [`SlotId`] on first use. Values are
//! kept in one of two places:
//!
//! - **Per object**: an [`InstanceCache`] embedded in the owning struct and
//!   exposed through [`InstanceStorage`]. Property, method and
//!   argument-keyed method caches live here.
//! - **Per exact type**: a [`ClassCache`] shared by a type hierarchy and
//!   exposed through [`ClassScoped`]. Each concrete type gets its own entry.
//!
//! ## Module Organization
//!
//! - [`cached_property`] / [`cached_method`] / [`class_cached_property`] -
//!   descriptor values with explicit `get`/`call` accessors
//! - [`storage_policy`] - `Raw` or `Frozen` storage of computed values
//! - [`frozen`] - the immutable [`FrozenMap`] and [`FrozenSet`]
//! - [`stats_registry`] - named hit/miss statistics (`stats` feature)
//!
//! Everything is in-memory and unbounded: entries are only dropped with
//! their owner or by explicit invalidation.
pub mod cached_method;
pub mod cached_property;
pub mod class_cached_property;
pub mod frozen;
pub mod storage_policy;

mod class_cache;
mod error;
mod instance_cache;
mod slot;

#[cfg(feature = "stats")]
mod stats;

#[cfg(feature = "stats")]
pub mod stats_registry;

pub use cached_method::{CachedArgsMethod, CachedMethod};
pub use cached_property::CachedProperty;
pub use class_cache::{resolve_shared, try_resolve_shared, ClassCache, ClassId, ClassScoped};
pub use class_cached_property::ClassCachedProperty;
pub use error::{CacheError, Result};
pub use frozen::{FrozenMap, FrozenSet};
pub use instance_cache::{InstanceCache, InstanceStorage};
pub use slot::{Slot, SlotId};
pub use storage_policy::{Freeze, Frozen, Raw, StoragePolicy};

#[cfg(feature = "stats")]
pub use stats::CacheStats;
