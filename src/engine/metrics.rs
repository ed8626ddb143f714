use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::CachePadded;
use serde::Serialize;

/// Aggregate counters, updated lock-free from every call site.
///
/// Each counter is exact on its own. A snapshot reads them one by one, so it
/// is not an atomic view across counters.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    total_calls: CachePadded<AtomicU64>,
    cache_hits: CachePadded<AtomicU64>,
    cache_misses: CachePadded<AtomicU64>,
    total_execution_ns: CachePadded<AtomicU64>,
    total_marshalling_ns: CachePadded<AtomicU64>,
    batched_calls: CachePadded<AtomicU64>,
    type_conversions: CachePadded<AtomicU64>,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_call(&self) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batched(&self) {
        self.batched_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_conversion(&self) {
        self.type_conversions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timing(&self, execution_ns: u64, marshalling_ns: u64) {
        self.total_execution_ns
            .fetch_add(execution_ns, Ordering::Relaxed);
        if marshalling_ns != 0 {
            self.total_marshalling_ns
                .fetch_add(marshalling_ns, Ordering::Relaxed);
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.total_calls,
            &self.cache_hits,
            &self.cache_misses,
            &self.total_execution_ns,
            &self.total_marshalling_ns,
            &self.batched_calls,
            &self.type_conversions,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// `memory_usage_bytes` is not tracked here; the manager measures it.
    pub fn snapshot(&self, memory_usage_bytes: u64) -> Metrics {
        Metrics {
            total_calls: self.total_calls.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            total_execution_time_ns: self.total_execution_ns.load(Ordering::Relaxed),
            total_marshalling_time_ns: self.total_marshalling_ns.load(Ordering::Relaxed),
            batched_calls: self.batched_calls.load(Ordering::Relaxed),
            type_conversions: self.type_conversions.load(Ordering::Relaxed),
            memory_usage_bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub total_calls: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub total_execution_time_ns: u64,
    pub total_marshalling_time_ns: u64,
    pub batched_calls: u64,
    pub type_conversions: u64,
    pub memory_usage_bytes: u64,
}

impl Metrics {
    /// Hits over hit+miss lookups, `0.0` before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.cache_hits + self.cache_misses;
        if lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 / lookups as f64
        }
    }

    /// `(name, value)` pairs in export order.
    pub fn fields(&self) -> [(&'static str, u64); 8] {
        [
            ("total_calls", self.total_calls),
            ("cache_hits", self.cache_hits),
            ("cache_misses", self.cache_misses),
            ("total_execution_time_ns", self.total_execution_time_ns),
            ("total_marshalling_time_ns", self.total_marshalling_time_ns),
            ("batched_calls", self.batched_calls),
            ("type_conversions", self.type_conversions),
            ("memory_usage_bytes", self.memory_usage_bytes),
        ]
    }
}
