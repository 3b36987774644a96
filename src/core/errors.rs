// Domain error types - no transport or key material leaks into user messages

use thiserror::Error;

/// Main error type for the event source
#[derive(Error, Debug)]
pub enum EventSourceError {
    /// Configuration error (HTTP 500)
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Route key does not have the `<protocol>.<method>.<path>` shape
    #[error("Invalid route key: {0}")]
    InvalidRouteKey(String),

    /// Path template placeholder cannot be translated
    #[error("Invalid path template: {0}")]
    InvalidPathTemplate(String),

    /// Route already registered for this method and path
    #[error("Duplicate route: {method} {path}")]
    DuplicateRoute { method: String, path: String },

    /// `subscribe_to_event` called before `init_client`
    #[error("Client not initialized")]
    ClientNotInitialized,

    /// Bearer token missing or rejected (HTTP 401)
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// Request body over the configured limit (HTTP 413)
    #[error("Payload too large: limit is {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// Request body could not be parsed (HTTP 400)
    #[error("Malformed body: {0}")]
    MalformedBody(String),

    /// Path parameter is not valid UTF-8 after percent-decoding (HTTP 400)
    #[error("Invalid path parameter: {0}")]
    InvalidPathParam(String),

    /// Processor returned an error (HTTP 500)
    #[error("Processor error: {0}")]
    ProcessorError(String),

    /// I/O Error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl EventSourceError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            EventSourceError::AuthenticationError(_) => 401,
            EventSourceError::PayloadTooLarge { .. } => 413,
            EventSourceError::MalformedBody(_) | EventSourceError::InvalidPathParam(_) => 400,
            EventSourceError::ConfigurationError(_)
            | EventSourceError::InvalidRouteKey(_)
            | EventSourceError::InvalidPathTemplate(_)
            | EventSourceError::DuplicateRoute { .. }
            | EventSourceError::ClientNotInitialized
            | EventSourceError::ProcessorError(_)
            | EventSourceError::IoError(_) => 500,
        }
    }

    /// Get user-friendly error message (no sensitive information)
    pub fn user_message(&self) -> String {
        match self {
            EventSourceError::AuthenticationError(_) => "Unauthorized".to_string(),
            EventSourceError::PayloadTooLarge { .. } => "Payload too large".to_string(),
            EventSourceError::MalformedBody(reason) => format!("Malformed body: {}", reason),
            EventSourceError::InvalidPathParam(_) => "Invalid path parameter".to_string(),
            _ => "Internal error".to_string(),
        }
    }
}
