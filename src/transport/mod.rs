//! Abstract transport capability.
//!
//! The runtime never builds GraphQL documents itself; it sends a named
//! operation with variables and consumes the parsed result. Concrete
//! transports (HTTP, websocket, test stubs) live outside the core.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value as JsonValue;

pub use crate::core::error::TransportError;

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Stream of incremental results for a subscription operation.
pub type SubscriptionStream = BoxStream<'static, TransportResult<JsonValue>>;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a named operation and return the parsed result object.
    async fn execute(&self, operation: &str, variables: JsonValue) -> TransportResult<JsonValue>;

    /// Subscribe to a named operation for live updates. Optional; the
    /// default refuses.
    async fn subscribe(
        &self,
        _operation: &str,
        _variables: JsonValue,
    ) -> TransportResult<SubscriptionStream> {
        Err(TransportError::SubscriptionUnsupported)
    }
}
