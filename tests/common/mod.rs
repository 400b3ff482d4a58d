//! Shared test fixtures: a scriptable transport stub and store builders.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use graphstore::{
    default_registry, EntityStore, Transport, TransportError, TransportResult,
};
use serde_json::Value as JsonValue;

/// Transport stub that replays canned responses in FIFO order and records
/// every call for assertion.
#[derive(Default)]
pub struct RecordingTransport {
    responses: Mutex<VecDeque<JsonValue>>,
    calls: Mutex<Vec<(String, JsonValue)>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_response(&self, response: JsonValue) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> Vec<(String, JsonValue)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn execute(&self, operation: &str, variables: JsonValue) -> TransportResult<JsonValue> {
        self.calls
            .lock()
            .unwrap()
            .push((operation.to_string(), variables));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TransportError::Server(format!("no canned response for {}", operation)))
    }
}

pub fn store_with(transport: Arc<RecordingTransport>) -> EntityStore {
    EntityStore::new(transport, default_registry().unwrap())
}

pub fn fresh_store() -> (EntityStore, Arc<RecordingTransport>) {
    let transport = RecordingTransport::new();
    (store_with(transport.clone()), transport)
}
