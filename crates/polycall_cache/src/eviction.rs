use crate::metadata::CacheMetadata;

/// Picks the entry to drop when a cache is full.
pub trait EvictionPolicy: Send + Sync {
    /// Returns the position of the victim among `candidates`, or `None` when
    /// there is nothing to evict.
    fn select_victim(&self, candidates: &mut dyn Iterator<Item = &CacheMetadata>)
    -> Option<usize>;
}

/// Lowest `access_count` loses; ties go to the entry accessed longest ago.
#[derive(Debug, Default, Clone, Copy)]
pub struct LeastAccessedPolicy;

impl LeastAccessedPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl EvictionPolicy for LeastAccessedPolicy {
    fn select_victim(
        &self,
        candidates: &mut dyn Iterator<Item = &CacheMetadata>,
    ) -> Option<usize> {
        candidates
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.access_count
                    .cmp(&b.access_count)
                    .then(a.last_accessed.cmp(&b.last_accessed))
            })
            .map(|(index, _)| index)
    }
}
