// Library root for the HTTP event source

pub mod api;
pub mod auth;
pub mod config;
pub mod core;
pub mod loader;
pub mod source;

pub use crate::api::HttpClient;
pub use crate::config::{HttpConfig, JwtSettings};
pub use crate::core::errors::EventSourceError;
pub use crate::core::event::{Actor, CanonicalEvent, EventContext, StatusResult};
pub use crate::core::route::RouteMeta;
pub use crate::source::{EventProcessor, EventSource, HttpEventSource};
