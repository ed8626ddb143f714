use std::mem;
use std::time::Instant;

use parking_lot::Mutex;
use polycall_value::ValueKind;
use tracing::debug;

use crate::CacheStats;
use crate::eviction::{EvictionPolicy, LeastAccessedPolicy};
use crate::metadata::CacheMetadata;

/// Identifies one conversion: a value kind travelling to a target language.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversionKey {
    pub kind: ValueKind,
    pub target_language: String,
}

impl ConversionKey {
    pub fn new(kind: ValueKind, target_language: impl Into<String>) -> Self {
        Self {
            kind,
            target_language: target_language.into(),
        }
    }
}

/// Prepared marshaling layout for a [`ConversionKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionPlan {
    pub kind: ValueKind,
    pub target_language: String,
    /// Bytes the value occupies on the wire.
    pub wire_size: usize,
    /// Strings and opaque handles cross the boundary as references.
    pub by_reference: bool,
}

impl ConversionPlan {
    pub fn for_target(key: &ConversionKey) -> Self {
        let (wire_size, by_reference) = match key.kind {
            ValueKind::Int => (mem::size_of::<i64>(), false),
            ValueKind::Float => (mem::size_of::<f32>(), false),
            ValueKind::Double => (mem::size_of::<f64>(), false),
            ValueKind::Bool => (mem::size_of::<bool>(), false),
            // pointer + length
            ValueKind::String => (2 * mem::size_of::<usize>(), true),
            ValueKind::Opaque => (mem::size_of::<usize>(), true),
        };
        Self {
            kind: key.kind,
            target_language: key.target_language.clone(),
            wire_size,
            by_reference,
        }
    }
}

#[derive(Debug, Clone)]
struct TypeCacheEntry {
    key: ConversionKey,
    plan: ConversionPlan,
    metadata: CacheMetadata,
}

#[derive(Debug, Default)]
struct TypeCacheState {
    entries: Vec<TypeCacheEntry>,
    evictions: u64,
}

/// Bounded memo of conversion plans. Entries never expire.
pub struct TypeCache<P: EvictionPolicy = LeastAccessedPolicy> {
    state: Mutex<TypeCacheState>,
    policy: P,
    capacity: usize,
}

impl TypeCache<LeastAccessedPolicy> {
    pub fn new(capacity: usize) -> Self {
        Self::with_policy(capacity, LeastAccessedPolicy, true)
    }

    pub fn lazy(capacity: usize) -> Self {
        Self::with_policy(capacity, LeastAccessedPolicy, false)
    }
}

impl<P: EvictionPolicy> TypeCache<P> {
    pub fn with_policy(capacity: usize, policy: P, preallocate: bool) -> Self {
        let entries = if preallocate {
            Vec::with_capacity(capacity)
        } else {
            Vec::new()
        };
        Self {
            state: Mutex::new(TypeCacheState {
                entries,
                evictions: 0,
            }),
            policy,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn lookup(&self, key: &ConversionKey) -> Option<ConversionPlan> {
        let mut state = self.state.lock();
        let entry = state.entries.iter_mut().find(|entry| &entry.key == key)?;
        entry.metadata.record_access(Instant::now());
        Some(entry.plan.clone())
    }

    pub fn insert(&self, key: ConversionKey, plan: ConversionPlan) {
        if self.capacity == 0 {
            return;
        }

        let now = Instant::now();
        let mut state = self.state.lock();
        if let Some(entry) = state.entries.iter_mut().find(|entry| entry.key == key) {
            entry.plan = plan;
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
                kind = %evicted.key.kind,
                target = %evicted.key.target_language,
                "evicted type cache entry"
            );
        }

        state.entries.push(TypeCacheEntry {
            key,
            plan,
            metadata: CacheMetadata::new(now),
        });
    }

    /// Returns the cached plan, or builds and caches it. The flag is `true`
    /// when the plan was built by this call.
    pub fn get_or_insert_with<F>(&self, key: &ConversionKey, build: F) -> (ConversionPlan, bool)
    where
        F: FnOnce(&ConversionKey) -> ConversionPlan,
    {
        if let Some(plan) = self.lookup(key) {
            return (plan, false);
        }
        let plan = build(key);
        self.insert(key.clone(), plan.clone());
        (plan, true)
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

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats::new(state.entries.len(), self.capacity, state.evictions, 0)
    }

    pub fn memory_usage(&self) -> usize {
        let state = self.state.lock();
        state.entries.capacity() * mem::size_of::<TypeCacheEntry>()
            + state
                .entries
                .iter()
                .map(|entry| {
                    entry.key.target_language.capacity() + entry.plan.target_language.capacity()
                })
                .sum::<usize>()
    }
}
