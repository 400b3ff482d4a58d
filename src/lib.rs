// ============================================================================
// graphstore Library
// ============================================================================

pub mod connection;
pub mod core;
pub mod entity;
pub mod ops;
pub mod schema;
pub mod store;
pub mod transport;

// Re-export main types for convenience
pub use connection::{ConnectionConfig, Scheme};
pub use core::{FuzzyDate, Maybe, Related, Result, StoreError, Timestamp, TransportError, Value};
pub use entity::{Entity, EntityInput, InputKind};
pub use schema::{
    default_registry, EntitySchema, FieldType, QueryStrategy, Relationship, SchemaRegistry,
    WrapperSpec,
};
pub use store::{CacheStats, EntityStore, FindQuery, PopulateStats};
pub use transport::{SubscriptionStream, Transport, TransportResult};

use std::sync::Arc;

use serde_json::{json, Value as JsonValue};
use tracing::debug;

// ============================================================================
// High-level client facade
// ============================================================================

/// Client owning a transport and an entity store.
///
/// This is the recommended entry point: construct it once from a
/// [`ConnectionConfig`] and a transport implementation, then work through
/// the store it exposes. The configuration is read at construction; the
/// transport is treated as opaque afterwards.
pub struct Client {
    config: ConnectionConfig,
    store: Arc<EntityStore>,
}

impl Client {
    /// Connect with the built-in media-catalog schemas.
    pub fn connect(config: ConnectionConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let registry = default_registry()?;
        Ok(Self::with_registry(config, transport, registry))
    }

    /// Connect with a custom schema registry.
    pub fn with_registry(
        config: ConnectionConfig,
        transport: Arc<dyn Transport>,
        registry: SchemaRegistry,
    ) -> Self {
        debug!(url = %config.url(), "client constructed");
        let store = Arc::new(EntityStore::new(transport, registry));
        Self { config, store }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    /// Read-through fetch by id.
    pub async fn get(&self, type_name: &str, id: &str) -> Result<Option<Entity>> {
        self.store.get(type_name, id).await
    }

    /// Filtered search; see [`EntityStore::find`].
    pub async fn find(&self, type_name: &str, query: &FindQuery) -> Result<Vec<Entity>> {
        self.store.find(type_name, query).await
    }

    pub async fn find_one(&self, type_name: &str, query: &FindQuery) -> Result<Option<Entity>> {
        self.store.find_one(type_name, query).await
    }

    /// Persist an entity (create or update, chosen from its lifecycle).
    pub async fn save(&self, entity: &Entity) -> Result<()> {
        self.store.save(entity).await
    }

    /// Destroy the remote entity and invalidate its cache entry.
    pub async fn delete(&self, entity: &Entity) -> Result<()> {
        self.store.delete(entity).await
    }

    /// Update general server settings.
    ///
    /// Known-dangerous server-side path keys are refused before any
    /// transport call; a successful write to one of them could repoint the
    /// server's storage out from under it.
    pub async fn configure_general(&self, input: JsonValue) -> Result<JsonValue> {
        let Some(map) = input.as_object() else {
            return Err(StoreError::Configuration(
                "configure_general expects an object input".to_string(),
            ));
        };
        for key in map.keys() {
            if ops::PROTECTED_CONFIG_KEYS.contains(key.as_str()) {
                return Err(StoreError::ProtectedConfiguration(key.clone()));
            }
        }

        let result = self
            .store
            .transport()
            .execute("configureGeneral", json!({ "input": input }))
            .await?;
        Ok(result
            .get("configureGeneral")
            .cloned()
            .unwrap_or(JsonValue::Null))
    }

    /// Subscribe to a named operation for live updates, when the transport
    /// supports it.
    pub async fn subscribe(
        &self,
        operation: &str,
        variables: JsonValue,
    ) -> Result<SubscriptionStream> {
        Ok(self
            .store
            .transport()
            .subscribe(operation, variables)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct RejectingTransport;

    #[async_trait]
    impl Transport for RejectingTransport {
        async fn execute(
            &self,
            _operation: &str,
            _variables: JsonValue,
        ) -> TransportResult<JsonValue> {
            Err(TransportError::Connection("unreachable".to_string()))
        }
    }

    fn client() -> Client {
        Client::connect(
            ConnectionConfig::new("localhost", 9999),
            Arc::new(RejectingTransport),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_protected_configuration_refused_before_transport() {
        let err = client()
            .configure_general(json!({ "databasePath": "/tmp/evil.db" }))
            .await
            .unwrap_err();
        // The transport always fails; reaching it would surface Transport.
        assert!(matches!(err, StoreError::ProtectedConfiguration(ref k) if k == "databasePath"));
    }

    #[tokio::test]
    async fn test_safe_configuration_reaches_transport() {
        let err = client()
            .configure_general(json!({ "soundOnPreview": true }))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Transport(_)));
    }

    #[tokio::test]
    async fn test_default_subscribe_is_unsupported() {
        let err = match client().subscribe("sceneUpdates", json!({})).await {
            Ok(_) => panic!("expected subscribe to fail"),
            Err(e) => e,
        };
        assert!(matches!(
            err,
            StoreError::Transport(TransportError::SubscriptionUnsupported)
        ));
    }
}
