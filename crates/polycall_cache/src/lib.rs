//! In-memory caches of the call performance engine.
//!
//! Both caches are capacity-bounded, guarded by their own mutex and evict the
//! least accessed entry (oldest access on ties) when full.

pub mod call_cache;
pub mod eviction;
pub mod metadata;
pub mod type_cache;

pub use call_cache::{CacheEntry, CallCache};
pub use eviction::{EvictionPolicy, LeastAccessedPolicy};
pub use metadata::CacheMetadata;
pub use type_cache::{ConversionKey, ConversionPlan, TypeCache};

/// Point-in-time counters of a cache.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub usage_percent: f64,
    pub evictions: u64,
    pub expirations: u64,
}

impl CacheStats {
    pub(crate) fn new(entries: usize, capacity: usize, evictions: u64, expirations: u64) -> Self {
        let usage_percent = if capacity == 0 {
            0.0
        } else {
            (entries as f64 / capacity as f64) * 100.0
        };
        Self {
            entries,
            capacity,
            usage_percent,
            evictions,
            expirations,
        }
    }
}
