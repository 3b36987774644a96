// Projection of an axum request into an InboundRequest

use axum::{
    body::Bytes,
    extract::Request,
    http::{header, HeaderMap, Uri},
};
use http_body_util::LengthLimitError;
use serde_json::{Map, Value};

use crate::config::HttpConfig;
use crate::core::errors::EventSourceError;
use crate::core::event::InboundRequest;

/// Body size limits per body kind, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyLimits {
    pub urlencoded: usize,
    pub json: usize,
}

impl BodyLimits {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            urlencoded: config.request_body_limit,
            json: config.file_size_limit,
        }
    }

    /// Largest body any route accepts
    pub fn max(&self) -> usize {
        self.urlencoded.max(self.json)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    UrlEncoded,
    Other,
}

impl BodyKind {
    fn from_headers(headers: &HeaderMap) -> Self {
        let essence = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .unwrap_or_default();

        if essence == "application/json" || essence.ends_with("+json") {
            BodyKind::Json
        } else if essence == "application/x-www-form-urlencoded" {
            BodyKind::UrlEncoded
        } else {
            BodyKind::Other
        }
    }

    fn limit(self, limits: &BodyLimits) -> usize {
        match self {
            BodyKind::Json => limits.json,
            BodyKind::UrlEncoded => limits.urlencoded,
            BodyKind::Other => limits.max(),
        }
    }
}

/// Read the body and project the request onto the allow-listed fields.
pub async fn extract_inbound_request(
    request: Request,
    params: Map<String, Value>,
    limits: &BodyLimits,
) -> Result<InboundRequest, EventSourceError> {
    let (parts, body) = request.into_parts();
    let kind = BodyKind::from_headers(&parts.headers);
    let limit = kind.limit(limits);

    if let Some(length) = content_length(&parts.headers) {
        if length > limit {
            return Err(EventSourceError::PayloadTooLarge { limit });
        }
    }

    let bytes = axum::body::to_bytes(body, limit).await.map_err(|e| {
        if is_length_limit(&e) {
            EventSourceError::PayloadTooLarge { limit }
        } else {
            EventSourceError::MalformedBody("failed to read request body".to_string())
        }
    })?;

    Ok(InboundRequest {
        method: parts.method.as_str().to_string(),
        url: request_url(&parts.uri),
        path: parts.uri.path().to_string(),
        query: parse_form(parts.uri.query().unwrap_or_default().as_bytes()),
        params,
        headers: headers_to_map(&parts.headers),
        body: parse_body(kind, &bytes)?,
    })
}

/// The outer body limit layer reports through the same error type, possibly
/// wrapped, so the whole source chain is checked.
fn is_length_limit(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<LengthLimitError>() {
            return true;
        }
        current = e.source();
    }
    false
}

fn content_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
}

fn request_url(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}

fn parse_body(kind: BodyKind, bytes: &Bytes) -> Result<Value, EventSourceError> {
    if bytes.is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    match kind {
        BodyKind::Json => serde_json::from_slice(bytes)
            .map_err(|e| EventSourceError::MalformedBody(format!("invalid JSON: {}", e))),
        BodyKind::UrlEncoded => Ok(Value::Object(parse_form(bytes))),
        BodyKind::Other => Ok(match std::str::from_utf8(bytes) {
            Ok(text) => Value::String(text.to_string()),
            Err(_) => Value::Object(Map::new()),
        }),
    }
}

/// Decode `application/x-www-form-urlencoded` pairs; repeated keys collect
/// into an array in order of appearance.
pub fn parse_form(input: &[u8]) -> Map<String, Value> {
    let mut map = Map::new();
    for (key, value) in url::form_urlencoded::parse(input) {
        let value = Value::String(value.into_owned());
        match map.get_mut(&*key) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(key.into_owned(), value);
            }
        }
    }
    map
}

/// Header names are lowercase; repeated headers are joined with ", "
pub fn headers_to_map(headers: &HeaderMap) -> Map<String, Value> {
    let mut map = Map::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        map.insert(name.as_str().to_string(), Value::String(joined));
    }
    map
}
