// Per-route request handler

use axum::{
    extract::{rejection::RawPathParamsRejection, RawPathParams, Request, State},
    response::Response,
    Extension,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::api::request::{extract_inbound_request, BodyLimits};
use crate::api::responses::{status_response, ApiError};
use crate::auth::jwt::Principal;
use crate::core::errors::EventSourceError;
use crate::core::event::{create_event, Actor, EventContext};
use crate::core::route::{RouteKey, RouteMeta};
use crate::source::EventProcessor;

/// Everything a registered route needs at dispatch time.
///
/// Built once by `subscribe_to_event` and handed to the handler as state.
pub struct RouteDescriptor {
    pub key: RouteKey,
    pub config: Map<String, Value>,
    pub meta: RouteMeta,
    pub processor: Arc<dyn EventProcessor>,
    pub limits: BodyLimits,
}

/// Handler behind every subscribed route
///
/// Request flow (after the auth gate has let the request through):
/// 1. Project the request and read its body within the route's limits
/// 2. Build the canonical event for the translated endpoint
/// 3. Await the processor with the event and the route context
/// 4. Translate the status result into the HTTP response
pub async fn dispatch_handler(
    State(route): State<Arc<RouteDescriptor>>,
    principal: Option<Extension<Principal>>,
    params: Result<RawPathParams, RawPathParamsRejection>,
    request: Request,
) -> Result<Response, ApiError> {
    let params: Map<String, Value> = match params {
        Ok(params) => params
            .iter()
            .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
            .collect(),
        Err(RawPathParamsRejection::InvalidUtf8InPathParam(e)) => {
            warn!(route = %route.key, error = %e.body_text(), "Rejected undecodable path parameter");
            return Err(EventSourceError::InvalidPathParam(e.body_text()).into());
        }
        // Routes without placeholders carry no params
        Err(_) => Map::new(),
    };

    let inbound = extract_inbound_request(request, params, &route.limits).await?;

    let actor = principal
        .map(|Extension(principal)| principal.actor())
        .unwrap_or_else(Actor::anonymous);
    let event = create_event(&inbound, route.key.path(), actor);
    let event_id = event.id.clone();

    debug!(
        route = %route.key,
        event_id = %event_id,
        method = %inbound.method,
        path = %inbound.path,
        "Dispatching event"
    );

    let context = EventContext::new(route.key.as_str(), route.config.clone());
    let result = route
        .processor
        .process_event(event, context)
        .await
        .map_err(|e| {
            error!(error = %e, route = %route.key, event_id = %event_id, "Event processing failed");
            ApiError::from_event_source_error_with_id(e, event_id.clone())
        })?;

    status_response(result).map_err(|e| {
        error!(error = %e, route = %route.key, event_id = %event_id, "Invalid status result");
        ApiError::from_event_source_error_with_id(e, event_id)
    })
}
