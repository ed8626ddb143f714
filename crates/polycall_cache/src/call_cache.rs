use std::mem;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use polycall_value::{FfiValue, call_hash, hash_value};
use tracing::{debug, trace};

use crate::CacheStats;
use crate::eviction::{EvictionPolicy, LeastAccessedPolicy};
use crate::metadata::CacheMetadata;

/// Cached result of one call signature.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub function_name: String,
    pub arg_count: usize,
    pub call_hash: u64,
    pub result_hash: u64,
    pub args: Vec<FfiValue>,
    pub cached_result: FfiValue,
    pub metadata: CacheMetadata,
}

impl CacheEntry {
    fn new(
        function_name: &str,
        args: &[FfiValue],
        call_hash: u64,
        result: FfiValue,
        now: Instant,
    ) -> Self {
        Self {
            function_name: function_name.to_string(),
            arg_count: args.len(),
            call_hash,
            result_hash: hash_value(&result),
            args: args.to_vec(),
            cached_result: result,
            metadata: CacheMetadata::new(now),
        }
    }

    /// The hash narrows the search; name, arity and every argument must
    /// still be identical for a hit.
    fn matches(&self, call_hash: u64, function_name: &str, args: &[FfiValue]) -> bool {
        self.call_hash == call_hash
            && self.arg_count == args.len()
            && self.function_name == function_name
            && self
                .args
                .iter()
                .zip(args)
                .all(|(cached, arg)| cached.same_as(arg))
    }

    fn heap_size(&self) -> usize {
        self.function_name.capacity()
            + self.args.capacity() * mem::size_of::<FfiValue>()
            + self.args.iter().map(FfiValue::heap_size).sum::<usize>()
            + self.cached_result.heap_size()
    }
}

#[derive(Debug, Default)]
struct CallCacheState {
    entries: Vec<CacheEntry>,
    evictions: u64,
    expirations: u64,
}

/// Content-addressed store of call results with TTL and least-accessed
/// eviction.
pub struct CallCache<P: EvictionPolicy = LeastAccessedPolicy> {
    state: Mutex<CallCacheState>,
    policy: P,
    capacity: usize,
    ttl: Duration,
}

impl CallCache<LeastAccessedPolicy> {
    pub fn new(capacity: usize, ttl_ms: u64) -> Self {
        Self::with_policy(capacity, ttl_ms, LeastAccessedPolicy, true)
    }

    /// Same as [`CallCache::new`] but storage is only allocated on first insert.
    pub fn lazy(capacity: usize, ttl_ms: u64) -> Self {
        Self::with_policy(capacity, ttl_ms, LeastAccessedPolicy, false)
    }
}

impl<P: EvictionPolicy> CallCache<P> {
    pub fn with_policy(capacity: usize, ttl_ms: u64, policy: P, preallocate: bool) -> Self {
        let entries = if preallocate {
            Vec::with_capacity(capacity)
        } else {
            Vec::new()
        };
        Self {
            state: Mutex::new(CallCacheState {
                entries,
                ..CallCacheState::default()
            }),
            policy,
            capacity,
            ttl: Duration::from_millis(ttl_ms),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a cached result and return a clone of it.
    pub fn lookup(&self, function_name: &str, args: &[FfiValue]) -> Option<FfiValue> {
        self.lookup_at(function_name, args, Instant::now())
    }

    pub fn lookup_at(
        &self,
        function_name: &str,
        args: &[FfiValue],
        now: Instant,
    ) -> Option<FfiValue> {
        let hash = call_hash(function_name, args);
        let mut state = self.state.lock();
        self.sweep_locked(&mut state, now);

        let entry = state
            .entries
            .iter_mut()
            .find(|entry| entry.matches(hash, function_name, args))?;
        entry.metadata.record_access(now);
        trace!(
            function = function_name,
            access_count = entry.metadata.access_count,
            "call cache hit"
        );
        Some(entry.cached_result.clone())
    }

    /// Store `result` for the call, updating a matching entry in place or
    /// evicting one entry if the cache is full.
    pub fn insert(&self, function_name: &str, args: &[FfiValue], result: FfiValue) {
        self.insert_at(function_name, args, result, Instant::now());
    }

    pub fn insert_at(&self, function_name: &str, args: &[FfiValue], result: FfiValue, now: Instant) {
        if self.capacity == 0 {
            return;
        }

        let hash = call_hash(function_name, args);
        let mut state = self.state.lock();
        self.sweep_locked(&mut state, now);

        if let Some(entry) = state
            .entries
            .iter_mut()
            .find(|entry| entry.matches(hash, function_name, args))
        {
            let result_hash = hash_value(&result);
            if entry.result_hash != result_hash || !entry.cached_result.same_as(&result) {
                entry.result_hash = result_hash;
                entry.cached_result = result;
            }
            entry.metadata.record_write(now);
            return;
        }

        while state.entries.len() >= self.capacity {
            let victim = self
                .policy
                .select_victim(&mut state.entries.iter().map(|entry| &entry.metadata));
            let Some(index) = victim else { break };
            let evicted = state.entries.swap_remove(index);
            state.evictions += 1;
            debug!(
                function = %evicted.function_name,
                access_count = evicted.metadata.access_count,
                "evicted call cache entry"
            );
        }

        state
            .entries
            .push(CacheEntry::new(function_name, args, hash, result, now));
    }

    /// Drop every entry whose TTL elapsed. Returns how many were removed.
    pub fn sweep_expired(&self, now: Instant) -> usize {
        let mut state = self.state.lock();
        self.sweep_locked(&mut state, now)
    }

    fn sweep_locked(&self, state: &mut CallCacheState, now: Instant) -> usize {
        if self.ttl.is_zero() {
            return 0;
        }
        let before = state.entries.len();
        let ttl = self.ttl;
        state
            .entries
            .retain(|entry| !entry.metadata.is_expired(ttl, now));
        let removed = before - state.entries.len();
        if removed > 0 {
            state.expirations += removed as u64;
            trace!(removed, "expired call cache entries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    /// Cloned entries, for inspection.
    pub fn snapshot(&self) -> Vec<CacheEntry> {
        self.state.lock().entries.clone()
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats::new(
            state.entries.len(),
            self.capacity,
            state.evictions,
            state.expirations,
        )
    }

    /// Estimated bytes held by the cache storage and every owned payload.
    pub fn memory_usage(&self) -> usize {
        let state = self.state.lock();
        state.entries.capacity() * mem::size_of::<CacheEntry>()
            + state.entries.iter().map(CacheEntry::heap_size).sum::<usize>()
    }
}
