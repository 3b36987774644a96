// Canonical event envelope and the request projection it is built from

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub const TRANSPORT_HTTP: &str = "http";
pub const EVENT_VERSION: &str = "1.0";
pub const CHANNEL_REST: &str = "REST";

/// Who triggered an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Actor {
    /// Actor for requests that carried no verified identity
    pub fn anonymous() -> Self {
        Self {
            kind: "user".to_string(),
            id: None,
        }
    }

    pub fn user(id: impl Into<String>) -> Self {
        Self {
            kind: "user".to_string(),
            id: Some(id.into()),
        }
    }
}

/// Framework-neutral representation of one inbound request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalEvent {
    pub id: String,
    pub endpoint: String,
    pub time: DateTime<Utc>,
    pub transport: String,
    pub version: String,
    pub data: Value,
    pub channel: String,
    pub actor: Actor,
    pub metadata: Map<String, Value>,
}

/// Allow-listed projection of an HTTP request.
///
/// Only these fields ever reach an event; connection and server internals
/// have no representation here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InboundRequest {
    pub method: String,
    pub url: String,
    pub path: String,
    pub query: Map<String, Value>,
    pub params: Map<String, Value>,
    pub headers: Map<String, Value>,
    pub body: Value,
}

impl InboundRequest {
    /// Merge the request fields and its headers into one payload object
    pub fn to_payload(&self) -> Value {
        let mut payload = Map::new();
        payload.insert("method".to_string(), Value::String(self.method.clone()));
        payload.insert("url".to_string(), Value::String(self.url.clone()));
        payload.insert("path".to_string(), Value::String(self.path.clone()));
        payload.insert("query".to_string(), Value::Object(self.query.clone()));
        payload.insert("params".to_string(), Value::Object(self.params.clone()));
        payload.insert("body".to_string(), self.body.clone());
        payload.insert("headers".to_string(), Value::Object(self.headers.clone()));
        Value::Object(payload)
    }
}

/// Build the canonical event for one request.
pub fn create_event(request: &InboundRequest, endpoint: &str, actor: Actor) -> CanonicalEvent {
    CanonicalEvent {
        id: Uuid::new_v4().to_string(),
        endpoint: endpoint.to_string(),
        time: Utc::now(),
        transport: TRANSPORT_HTTP.to_string(),
        version: EVENT_VERSION.to_string(),
        data: request.to_payload(),
        channel: CHANNEL_REST.to_string(),
        actor,
        metadata: Map::new(),
    }
}

/// Context handed to the processor next to the event: the route key under
/// the reserved `key` field plus every route config field.
#[derive(Debug, Clone, PartialEq)]
pub struct EventContext {
    key: String,
    config: Map<String, Value>,
}

impl EventContext {
    pub fn new(key: impl Into<String>, mut config: Map<String, Value>) -> Self {
        config.remove("key");
        Self {
            key: key.into(),
            config,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    pub fn get(&self, field: &str) -> Option<Value> {
        if field == "key" {
            return Some(Value::String(self.key.clone()));
        }
        self.config.get(field).cloned()
    }

    pub fn to_value(&self) -> Value {
        let mut merged = self.config.clone();
        merged.insert("key".to_string(), Value::String(self.key.clone()));
        Value::Object(merged)
    }
}

/// Processor verdict for one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl StatusResult {
    pub fn ok(data: impl Into<Value>) -> Self {
        Self {
            code: None,
            data: Some(data.into()),
        }
    }

    pub fn with_code(code: u16, data: impl Into<Value>) -> Self {
        Self {
            code: Some(code),
            data: Some(data.into()),
        }
    }

    /// Status to send: `code` when present and non-zero, else 200
    pub fn effective_code(&self) -> u16 {
        match self.code {
            Some(code) if code != 0 => code,
            _ => 200,
        }
    }
}
