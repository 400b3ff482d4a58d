use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::entity::Entity;

/// One cache slot: the entity, when it was cached (monotonic clock, immune
/// to wall-clock drift), and its TTL. Expiration is evaluated lazily at
/// lookup time; there is no background sweeper.
#[derive(Clone)]
pub(crate) struct CacheEntry {
    pub entity: Entity,
    pub cached_at: Instant,
    pub ttl: Option<Duration>,
}

impl CacheEntry {
    pub fn new(entity: Entity, ttl: Option<Duration>) -> Self {
        Self {
            entity,
            cached_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        match self.ttl {
            Some(ttl) => self.cached_at.elapsed() > ttl,
            None => false,
        }
    }
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub by_type: BTreeMap<String, usize>,
    pub expired_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Maybe;
    use crate::schema::catalog::tag_schema;

    #[test]
    fn test_entry_without_ttl_never_expires() {
        let tag = Entity::new(tag_schema().unwrap(), vec![("name", Maybe::Value("a".into()))])
            .unwrap();
        let entry = CacheEntry::new(tag, None);
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_with_zero_ttl_expires() {
        let tag = Entity::new(tag_schema().unwrap(), vec![]).unwrap();
        let mut entry = CacheEntry::new(tag, Some(Duration::from_millis(5)));
        entry.cached_at = Instant::now() - Duration::from_millis(50);
        assert!(entry.is_expired());
    }
}
