//! Event source contract and its HTTP implementation.
//!
//! A host drives every event source the same way: `init_client` once, then
//! `subscribe_to_event` per declared route. Each inbound trigger becomes a
//! [`CanonicalEvent`] handed to the route's [`EventProcessor`].

use async_trait::async_trait;
use axum::routing::{on, MethodFilter};
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::handlers::{dispatch_handler, RouteDescriptor};
use crate::api::HttpClient;
use crate::auth::auth_middleware::{auth_middleware, AuthGate};
use crate::auth::jwt::JwtVerifier;
use crate::config::HttpConfig;
use crate::core::errors::EventSourceError;
use crate::core::event::{CanonicalEvent, EventContext, StatusResult};
use crate::core::route::{RouteKey, RouteMeta};

/// Business logic invoked once per accepted event.
#[async_trait]
pub trait EventProcessor: Send + Sync {
    async fn process_event(
        &self,
        event: CanonicalEvent,
        context: EventContext,
    ) -> Result<StatusResult, EventSourceError>;
}

#[async_trait]
impl<F, Fut> EventProcessor for F
where
    F: Fn(CanonicalEvent, EventContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<StatusResult, EventSourceError>> + Send + 'static,
{
    async fn process_event(
        &self,
        event: CanonicalEvent,
        context: EventContext,
    ) -> Result<StatusResult, EventSourceError> {
        (self)(event, context).await
    }
}

/// Lifecycle every transport adapter implements.
#[async_trait]
pub trait EventSource: Send + Sync {
    type Client: Send + Sync;

    /// Create the transport client and start receiving. Called once.
    async fn init_client(&mut self) -> Result<&Self::Client, EventSourceError>;

    /// Route events matching `route_key` to `processor`.
    async fn subscribe_to_event(
        &self,
        route_key: &str,
        route_config: Map<String, Value>,
        processor: Arc<dyn EventProcessor>,
        route_meta: RouteMeta,
    ) -> Result<(), EventSourceError>;
}

/// HTTP event source: one listener, routes declared as
/// `http.<method>.<path template>`.
pub struct HttpEventSource {
    config: HttpConfig,
    verifier: Option<Arc<JwtVerifier>>,
    client: Option<HttpClient>,
}

impl HttpEventSource {
    pub fn new(config: HttpConfig) -> Self {
        Self {
            config,
            verifier: None,
            client: None,
        }
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    pub fn client(&self) -> Option<&HttpClient> {
        self.client.as_ref()
    }
}

#[async_trait]
impl EventSource for HttpEventSource {
    type Client = HttpClient;

    async fn init_client(&mut self) -> Result<&HttpClient, EventSourceError> {
        if self.client.is_some() {
            return Err(EventSourceError::ConfigurationError(
                "client already initialized".to_string(),
            ));
        }

        if let Some(ref settings) = self.config.jwt {
            let verifier = JwtVerifier::new(settings)?;
            if !verifier.checks_expiration() {
                warn!("JWT expiration checking is disabled: expired bearer tokens are accepted");
            }
            self.verifier = Some(Arc::new(verifier));
        }

        let client = HttpClient::bind(&self.config).await?;
        let client = self.client.insert(client);
        Ok(&*client)
    }

    async fn subscribe_to_event(
        &self,
        route_key: &str,
        route_config: Map<String, Value>,
        processor: Arc<dyn EventProcessor>,
        route_meta: RouteMeta,
    ) -> Result<(), EventSourceError> {
        let client = self
            .client
            .as_ref()
            .ok_or(EventSourceError::ClientNotInitialized)?;

        let key = RouteKey::parse(route_key)?;
        let filter = MethodFilter::try_from(key.method().clone()).map_err(|_| {
            EventSourceError::InvalidRouteKey(format!("'{}' method cannot be routed", route_key))
        })?;
        let gate = AuthGate::for_route(route_meta.authn, self.verifier.as_ref(), key.as_str())?;
        let authn = gate.is_required();

        let method = key.method().clone();
        let path = key.path().to_string();
        let descriptor = Arc::new(RouteDescriptor {
            key,
            config: route_config,
            meta: route_meta,
            processor,
            limits: client.limits(),
        });

        let method_router = on(filter, dispatch_handler)
            .route_layer(axum::middleware::from_fn_with_state(gate, auth_middleware))
            .with_state(descriptor);

        client.routes().register(&method, &path, method_router)?;

        info!(route = %route_key, method = %method, path = %path, authn, "Route registered");
        Ok(())
    }
}
