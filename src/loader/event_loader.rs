// YAML event definitions - route key -> { authn, ...route config }

use crate::core::errors::EventSourceError;
use crate::core::route::{RouteKey, RouteMeta};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// One declared route
#[derive(Debug, Clone, PartialEq)]
pub struct EventDefinition {
    pub route_key: String,
    pub meta: RouteMeta,
    pub config: Map<String, Value>,
}

/// Event definitions loaded from a YAML mapping, in file order
#[derive(Debug, Clone, Default)]
pub struct EventLoader {
    definitions: Vec<EventDefinition>,
}

impl EventLoader {
    /// Load event definitions from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, EventSourceError> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(EventSourceError::ConfigurationError(format!(
                "Events file not found at {:?}",
                path_ref
            )));
        }

        let yaml_content = fs::read_to_string(path_ref).map_err(|e| {
            EventSourceError::ConfigurationError(format!("Failed to read events file: {}", e))
        })?;

        Self::from_yaml_str(&yaml_content)
    }

    /// Parse event definitions and validate every route key
    pub fn from_yaml_str(yaml_content: &str) -> Result<Self, EventSourceError> {
        let entries: serde_yaml::Mapping = serde_yaml::from_str(yaml_content).map_err(|e| {
            EventSourceError::ConfigurationError(format!("Failed to parse events YAML: {}", e))
        })?;

        let mut definitions = Vec::with_capacity(entries.len());
        for (key, body) in entries {
            let route_key = key
                .as_str()
                .ok_or_else(|| {
                    EventSourceError::ConfigurationError(format!("Event key {:?} is not a string", key))
                })?
                .to_string();
            RouteKey::parse(&route_key)?;

            let value: Value = serde_json::to_value(&body).map_err(|e| {
                EventSourceError::ConfigurationError(format!(
                    "Event '{}' is not representable as JSON: {}",
                    route_key, e
                ))
            })?;
            let mut config = match value {
                Value::Object(map) => map,
                Value::Null => Map::new(),
                _ => {
                    return Err(EventSourceError::ConfigurationError(format!(
                        "Event '{}' must be a mapping",
                        route_key
                    )))
                }
            };

            let authn = match config.remove("authn") {
                None | Some(Value::Null) => false,
                Some(Value::Bool(authn)) => authn,
                Some(other) => {
                    return Err(EventSourceError::ConfigurationError(format!(
                        "Event '{}' has non-boolean authn: {}",
                        route_key, other
                    )))
                }
            };

            definitions.push(EventDefinition {
                route_key,
                meta: RouteMeta::new(authn),
                config,
            });
        }

        Ok(Self { definitions })
    }

    pub fn definitions(&self) -> &[EventDefinition] {
        &self.definitions
    }

    /// Whether any declared route needs a JWT verifier
    pub fn requires_authentication(&self) -> bool {
        self.definitions.iter().any(|d| d.meta.authn)
    }
}
