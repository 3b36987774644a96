// Axum authentication middleware

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::api::responses::ApiError;
use crate::auth::audit_logger::{AuditLogger, AuthEvent};
use crate::auth::jwt::JwtVerifier;
use crate::core::errors::EventSourceError;

/// Per-route authentication decision, fixed when the route is registered.
#[derive(Clone)]
pub enum AuthGate {
    Required {
        verifier: Arc<JwtVerifier>,
        audit_logger: AuditLogger,
    },
    PassThrough,
}

impl AuthGate {
    /// Build the gate for a route.
    ///
    /// A route that needs authentication while no verifier was configured is a
    /// configuration error, reported now rather than on the first request.
    pub fn for_route(
        authn: bool,
        verifier: Option<&Arc<JwtVerifier>>,
        route_key: &str,
    ) -> Result<Self, EventSourceError> {
        if !authn {
            return Ok(AuthGate::PassThrough);
        }

        let verifier = verifier.ok_or_else(|| {
            EventSourceError::ConfigurationError(format!(
                "route '{}' requires authentication but no JWT settings were configured",
                route_key
            ))
        })?;

        Ok(AuthGate::Required {
            verifier: verifier.clone(),
            audit_logger: AuditLogger::new(route_key),
        })
    }

    pub fn is_required(&self) -> bool {
        matches!(self, AuthGate::Required { .. })
    }
}

/// Authentication middleware function
///
/// Verifies the `Authorization: Bearer` token on gated routes and stores the
/// resulting `Principal` in request extensions. Rejected requests never reach
/// the handler.
pub async fn auth_middleware(
    State(gate): State<AuthGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (verifier, audit_logger) = match gate {
        AuthGate::PassThrough => return Ok(next.run(request).await),
        AuthGate::Required {
            verifier,
            audit_logger,
        } => (verifier, audit_logger),
    };

    let ip_address = extract_ip_address(request.headers());
    let user_agent = extract_user_agent(request.headers());

    let verified = match extract_bearer_token(request.headers()) {
        Some(token) => verifier.verify(token),
        None => Err(EventSourceError::AuthenticationError(
            "Missing bearer token".to_string(),
        )),
    };

    match verified {
        Ok(principal) => {
            audit_logger.log_auth_event(
                &AuthEvent::AuthSuccess {
                    subject: principal.subject.clone(),
                },
                ip_address.as_deref(),
                user_agent.as_deref(),
            );
            request.extensions_mut().insert(principal);
            Ok(next.run(request).await)
        }
        Err(e) => {
            audit_logger.log_auth_event(
                &AuthEvent::AuthFailure {
                    reason: e.to_string(),
                },
                ip_address.as_deref(),
                user_agent.as_deref(),
            );
            Err(ApiError::from(e))
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Extract IP address from request headers
///
/// Checks `X-Forwarded-For` first (for proxied requests), then `X-Real-IP`.
fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    headers
        .get("X-Forwarded-For")
        .or_else(|| headers.get("X-Real-IP"))
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}
