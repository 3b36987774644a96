// Middleware stack shared by every route of a client

use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::api::request::BodyLimits;

/// Tracing middleware
///
/// One span per request with method, URI and status.
pub fn tracing_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
}

/// Body size limit middleware
///
/// Caps every body at the larger of the two configured limits; the handler
/// applies the per content type limit. Returns 413 Payload Too Large.
pub fn body_size_limit_layer(limits: &BodyLimits) -> RequestBodyLimitLayer {
    RequestBodyLimitLayer::new(limits.max())
}

/// Cross-origin policy: any origin, method and header
pub fn cors_layer() -> CorsLayer {
    CorsLayer::permissive()
}
