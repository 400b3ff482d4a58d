use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::{json, Value as JsonValue};
use tracing::debug;

use crate::core::error::{Result, StoreError};
use crate::entity::{Entity, InputKind};
use crate::ops;
use crate::schema::registry::SchemaRegistry;
use crate::store::cache::{CacheEntry, CacheStats};
use crate::transport::Transport;

/// Identity-mapped entity store with read-through caching.
///
/// The store is the sole source of truth for which in-memory instance
/// corresponds to a `(type_name, id)` pair. Payload-driven construction is
/// intercepted so a payload naming an already-cached id merges into and
/// returns the cached instance, never a second copy.
///
/// A single lock protects the cache map. It is held only for synchronous
/// bookkeeping and never across an `.await`: operations that reach the
/// transport snapshot what they need, release, await, and re-lock to apply
/// results, so cancellation at any suspension point cannot corrupt the
/// cache.
pub struct EntityStore {
    transport: Arc<dyn Transport>,
    registry: SchemaRegistry,
    default_ttl: Option<Duration>,
    inner: Mutex<StoreInner>,
}

pub(crate) struct StoreInner {
    pub cache: HashMap<(String, String), CacheEntry>,
    pub type_ttls: HashMap<String, Option<Duration>>,
}

impl EntityStore {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);
    pub const DEFAULT_QUERY_BATCH: usize = 40;
    /// Maximum result size for `find` before `find_iter` is required.
    pub const FIND_LIMIT: usize = 1000;

    pub fn new(transport: Arc<dyn Transport>, registry: SchemaRegistry) -> Self {
        Self {
            transport,
            registry,
            default_ttl: Some(Self::DEFAULT_TTL),
            inner: Mutex::new(StoreInner {
                cache: HashMap::new(),
                type_ttls: HashMap::new(),
            }),
        }
    }

    /// Override the default TTL; `None` disables expiration.
    pub fn with_default_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Take the store lock. Not reentrant: while the returned guard (or
    /// any `&mut StoreInner` derived from it) is alive, nested helpers
    /// must receive the `&mut StoreInner` as a parameter — calling
    /// `lock()` again on the same thread deadlocks.
    pub(crate) fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn ttl_for(&self, inner: &StoreInner, type_name: &str) -> Option<Duration> {
        inner
            .type_ttls
            .get(type_name)
            .copied()
            .unwrap_or(self.default_ttl)
    }

    /// Cached instance for `(type_name, id)`, if present and not expired.
    /// Expired entries are evicted on the way.
    pub fn cached(&self, type_name: &str, id: &str) -> Option<Entity> {
        let mut inner = self.lock();
        let key = (type_name.to_string(), id.to_string());
        match inner.cache.get(&key) {
            Some(entry) if !entry.is_expired() => Some(entry.entity.clone()),
            Some(_) => {
                debug!(type_name, id, "cache entry expired");
                inner.cache.remove(&key);
                None
            }
            None => None,
        }
    }

    pub fn is_cached(&self, type_name: &str, id: &str) -> bool {
        self.cached(type_name, id).is_some()
    }

    /// Read-through fetch by id. Cache hit returns the cached instance;
    /// a miss queries the remote and caches the result. A remote miss is
    /// `Ok(None)`, not an error, and leaves the store unchanged.
    pub async fn get(&self, type_name: &str, id: &str) -> Result<Option<Entity>> {
        self.registry.get(type_name)?;
        require_numeric_id(id)?;

        if let Some(entity) = self.cached(type_name, id) {
            debug!(type_name, id, "cache hit");
            return Ok(Some(entity));
        }

        debug!(type_name, id, "cache miss");
        let operation = ops::find_operation(type_name);
        let result = self
            .transport
            .execute(&operation, json!({ "id": id }))
            .await?;

        match result.get(&operation) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(payload) => Ok(Some(self.ingest(type_name, payload.clone())?)),
        }
    }

    /// Batch read-through: cached entities are returned as-is, missing ids
    /// are fetched. Order is not guaranteed; remote misses are dropped.
    pub async fn get_many(&self, type_name: &str, ids: &[&str]) -> Result<Vec<Entity>> {
        let mut results = Vec::new();
        let mut missing: Vec<&str> = Vec::new();
        for &id in ids {
            match self.cached(type_name, id) {
                Some(entity) => results.push(entity),
                None => missing.push(id),
            }
        }
        if !missing.is_empty() {
            debug!(type_name, count = missing.len(), "fetching missing entities");
        }
        for id in missing {
            if let Some(entity) = self.get(type_name, id).await? {
                results.push(entity);
            }
        }
        Ok(results)
    }

    /// Persist an entity: create when new, update when existing. A clean
    /// existing entity is a no-op; an update whose input carries only the
    /// id is marked clean without a transport call. On a successful create
    /// the server id replaces the local token exactly once and the entity
    /// joins the cache.
    pub async fn save(&self, entity: &Entity) -> Result<()> {
        if !entity.is_new() && !entity.is_dirty() {
            debug!(type_name = entity.type_name(), id = %entity.id(), "save skipped, clean");
            return Ok(());
        }

        let built = entity.to_input()?;
        if built.is_empty_update() {
            debug!(type_name = entity.type_name(), id = %entity.id(), "no changes to save");
            entity.mark_clean();
            return Ok(());
        }

        let type_name = entity.type_name().to_string();
        let operation = match built.kind {
            InputKind::Create => ops::create_operation(&type_name),
            InputKind::Update => ops::update_operation(&type_name),
        };

        let result = self
            .transport
            .execute(&operation, json!({ "input": built.input }))
            .await?;

        let returned = result
            .get(&operation)
            .and_then(JsonValue::as_object)
            .ok_or_else(|| {
                StoreError::Payload(format!("missing '{}' in mutation response", operation))
            })?;

        if built.kind == InputKind::Create {
            let server_id = returned
                .get("id")
                .and_then(JsonValue::as_str)
                .ok_or_else(|| {
                    StoreError::Payload(format!("'{}' returned no id", operation))
                })?;
            entity.update_id(server_id)?;
            self.insert_cache(entity.clone());
        }

        entity.mark_clean();
        Ok(())
    }

    /// Destroy the remote entity and drop its cache entry.
    pub async fn delete(&self, entity: &Entity) -> Result<()> {
        let id = entity.id();
        require_numeric_id(&id)?;
        let type_name = entity.type_name().to_string();
        let operation = ops::destroy_operation(&type_name);
        self.transport
            .execute(&operation, json!({ "id": id }))
            .await?;
        self.invalidate(&type_name, &id);
        Ok(())
    }

    pub fn invalidate(&self, type_name: &str, id: &str) {
        let mut inner = self.lock();
        if inner
            .cache
            .remove(&(type_name.to_string(), id.to_string()))
            .is_some()
        {
            debug!(type_name, id, "invalidated");
        }
    }

    /// Drop every cached entry of one type.
    pub fn invalidate_type(&self, type_name: &str) {
        let mut inner = self.lock();
        let before = inner.cache.len();
        inner.cache.retain(|key, _| key.0 != type_name);
        debug!(
            type_name,
            removed = before - inner.cache.len(),
            "invalidated type"
        );
    }

    pub fn invalidate_all(&self) {
        let mut inner = self.lock();
        let count = inner.cache.len();
        inner.cache.clear();
        debug!(count, "invalidated entire cache");
    }

    /// Per-type TTL override; `None` restores the store default.
    pub fn set_ttl(&self, type_name: &str, ttl: Option<Duration>) {
        let mut inner = self.lock();
        match ttl {
            Some(_) => {
                inner.type_ttls.insert(type_name.to_string(), ttl);
            }
            None => {
                inner.type_ttls.remove(type_name);
            }
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        let inner = self.lock();
        let mut stats = CacheStats {
            total_entries: inner.cache.len(),
            ..CacheStats::default()
        };
        for (key, entry) in inner.cache.iter() {
            *stats.by_type.entry(key.0.clone()).or_insert(0) += 1;
            if entry.is_expired() {
                stats.expired_count += 1;
            }
        }
        stats
    }

    /// Every live (non-expired) cached entity of a type.
    pub fn all_cached(&self, type_name: &str) -> Vec<Entity> {
        self.snapshot_type(type_name)
    }

    /// Predicate filter over the live cache of a type. No transport calls;
    /// the cache is snapshotted under the lock and the predicate runs
    /// outside it.
    pub fn filter_cached<F>(&self, type_name: &str, predicate: F) -> Vec<Entity>
    where
        F: Fn(&Entity) -> bool,
    {
        self.snapshot_type(type_name)
            .into_iter()
            .filter(|e| predicate(e))
            .collect()
    }

    pub(crate) fn snapshot_type(&self, type_name: &str) -> Vec<Entity> {
        let inner = self.lock();
        inner
            .cache
            .iter()
            .filter(|(key, entry)| key.0 == type_name && !entry.is_expired())
            .map(|(_, entry)| entry.entity.clone())
            .collect()
    }

    pub(crate) fn insert_cache(&self, entity: Entity) {
        let mut inner = self.lock();
        let type_name = entity.type_name().to_string();
        let ttl = self.ttl_for(&inner, &type_name);
        let key = (type_name, entity.id());
        inner.cache.insert(key, CacheEntry::new(entity, ttl));
    }
}

pub(crate) fn require_numeric_id(id: &str) -> Result<()> {
    let valid = id
        .parse::<u64>()
        .map(|n| n > 0)
        .unwrap_or(false);
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(id.to_string()))
    }
}
