use std::time::{Duration, Instant};

/// Access bookkeeping shared by every cache entry.
#[derive(Debug, Clone)]
pub struct CacheMetadata {
    pub created_at: Instant,
    pub last_accessed: Instant,
    pub access_count: u64,
}

impl CacheMetadata {
    pub fn new(now: Instant) -> Self {
        Self {
            created_at: now,
            last_accessed: now,
            access_count: 1,
        }
    }

    pub fn record_access(&mut self, now: Instant) {
        self.last_accessed = now;
        self.access_count += 1;
    }

    /// Restart the TTL clock after the cached payload was rewritten.
    pub fn record_write(&mut self, now: Instant) {
        self.created_at = now;
        self.record_access(now);
    }

    /// A zero `ttl` never expires.
    pub fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        !ttl.is_zero() && now.saturating_duration_since(self.created_at) >= ttl
    }
}

impl Default for CacheMetadata {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}
