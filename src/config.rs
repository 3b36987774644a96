// Configuration management

use crate::core::errors::EventSourceError;
use secrecy::{ExposeSecret, Secret, SecretString};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_BODY_LIMIT: usize = 50 * 1024 * 1024;

/// Settings for the HTTP listener of one event source.
///
/// Deserializable so a host can hand it over as YAML/JSON; `from_env` covers
/// the standalone binary.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Limit for URL-encoded bodies, in bytes
    #[serde(default = "default_body_limit")]
    pub request_body_limit: usize,

    /// Limit for JSON bodies, in bytes
    #[serde(default = "default_body_limit")]
    pub file_size_limit: usize,

    #[serde(default)]
    pub jwt: Option<JwtSettings>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

fn default_body_limit() -> usize {
    DEFAULT_BODY_LIMIT
}

fn default_true() -> bool {
    true
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            request_body_limit: DEFAULT_BODY_LIMIT,
            file_size_limit: DEFAULT_BODY_LIMIT,
            jwt: None,
        }
    }
}

/// Bearer token verification settings.
#[derive(Deserialize)]
pub struct JwtSettings {
    /// HMAC secret, or a PEM encoded RSA/EC public key
    #[serde(alias = "secretOrKey")]
    pub secret_or_key: SecretString,

    #[serde(default)]
    pub audience: Option<String>,

    #[serde(default)]
    pub issuer: Option<String>,

    /// When set, tokens past their `exp` are still accepted
    #[serde(default = "default_true", alias = "ignoreExpiration")]
    pub ignore_expiration: bool,
}

impl JwtSettings {
    pub fn new(secret_or_key: impl Into<String>) -> Self {
        Self {
            secret_or_key: Secret::new(secret_or_key.into()),
            audience: None,
            issuer: None,
            ignore_expiration: true,
        }
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_ignore_expiration(mut self, ignore_expiration: bool) -> Self {
        self.ignore_expiration = ignore_expiration;
        self
    }
}

impl Clone for JwtSettings {
    fn clone(&self) -> Self {
        Self {
            secret_or_key: Secret::new(self.secret_or_key.expose_secret().clone()),
            audience: self.audience.clone(),
            issuer: self.issuer.clone(),
            ignore_expiration: self.ignore_expiration,
        }
    }
}

impl fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret_or_key", &"[REDACTED]")
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .field("ignore_expiration", &self.ignore_expiration)
            .finish()
    }
}

/// Process-level settings for the standalone binary
#[derive(Debug, Clone)]
pub struct Config {
    pub http: HttpConfig,
    pub events_yaml_path: Option<PathBuf>,
    pub log_level: String,
    pub log_format: String, // "json" or "text"
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Supports `.env` file loading in development (via dotenv crate).
    pub fn from_env() -> Result<Self, EventSourceError> {
        #[cfg(not(test))]
        {
            dotenv::dotenv().ok(); // file may not exist
        }

        let jwt = match Self::get_optional_env("JWT_SECRET_OR_KEY") {
            Some(secret) => Some(JwtSettings {
                secret_or_key: Secret::new(secret),
                audience: Self::get_optional_env("JWT_AUDIENCE"),
                issuer: Self::get_optional_env("JWT_ISSUER"),
                ignore_expiration: Self::parse_bool_or_default("JWT_IGNORE_EXPIRATION", true)?,
            }),
            None => None,
        };

        let config = Self {
            http: HttpConfig {
                port: Self::parse_port()?,
                bind_address: Self::get_env_or_default("BIND_ADDRESS", DEFAULT_BIND_ADDRESS),
                request_body_limit: Self::parse_usize_or_default("REQUEST_BODY_LIMIT", DEFAULT_BODY_LIMIT)?,
                file_size_limit: Self::parse_usize_or_default("FILE_SIZE_LIMIT", DEFAULT_BODY_LIMIT)?,
                jwt,
            },
            events_yaml_path: Self::get_optional_env("EVENTS_YAML_PATH").map(PathBuf::from),
            log_level: Self::get_env_or_default("LOG_LEVEL", "info"),
            log_format: Self::get_env_or_default("LOG_FORMAT", "text"),
        };

        config.validate()?;

        Ok(config)
    }

    fn get_env_or_default(key: &str, default: &str) -> String {
        env::var(key).unwrap_or_else(|_| default.to_string())
    }

    fn get_optional_env(key: &str) -> Option<String> {
        match env::var(key) {
            Ok(value) if !value.is_empty() => Some(value),
            _ => None,
        }
    }

    /// Parse port from PORT environment variable
    fn parse_port() -> Result<u16, EventSourceError> {
        let port_str = env::var("PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string());
        let port = port_str.parse::<u16>().map_err(|e| {
            EventSourceError::ConfigurationError(format!("Invalid PORT value '{}': {}", port_str, e))
        })?;

        if port == 0 {
            return Err(EventSourceError::ConfigurationError(
                "PORT must be between 1 and 65535".to_string(),
            ));
        }

        Ok(port)
    }

    fn parse_usize_or_default(key: &str, default: usize) -> Result<usize, EventSourceError> {
        match env::var(key) {
            Ok(value) => {
                let parsed = value.parse::<usize>().map_err(|e| {
                    EventSourceError::ConfigurationError(format!("Invalid {} value '{}': {}", key, value, e))
                })?;

                if parsed == 0 {
                    return Err(EventSourceError::ConfigurationError(format!(
                        "{} must be greater than 0",
                        key
                    )));
                }

                Ok(parsed)
            }
            _ => Ok(default),
        }
    }

    fn parse_bool_or_default(key: &str, default: bool) -> Result<bool, EventSourceError> {
        match env::var(key) {
            Ok(value) => match value.to_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(EventSourceError::ConfigurationError(format!(
                    "Invalid {} value '{}': expected true or false",
                    key, value
                ))),
            },
            _ => Ok(default),
        }
    }

    /// Validate all configuration values
    fn validate(&self) -> Result<(), EventSourceError> {
        if let Some(ref path) = self.events_yaml_path {
            if !path.is_file() {
                return Err(EventSourceError::ConfigurationError(format!(
                    "Events file not found at {:?}",
                    path
                )));
            }
        }

        Self::validate_log_level(&self.log_level)?;
        Self::validate_log_format(&self.log_format)?;

        Ok(())
    }

    fn validate_log_level(level: &str) -> Result<(), EventSourceError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&level.to_lowercase().as_str()) {
            return Err(EventSourceError::ConfigurationError(format!(
                "Invalid LOG_LEVEL '{}': must be one of {}",
                level,
                valid_levels.join(", ")
            )));
        }
        Ok(())
    }

    fn validate_log_format(format: &str) -> Result<(), EventSourceError> {
        if format != "json" && format != "text" {
            return Err(EventSourceError::ConfigurationError(format!(
                "Invalid LOG_FORMAT '{}': must be 'json' or 'text'",
                format
            )));
        }
        Ok(())
    }
}
