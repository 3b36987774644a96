// Route keys and path template translation

use crate::core::errors::EventSourceError;
use axum::http::Method;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Route-level metadata supplied next to the route config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMeta {
    /// Whether a verified bearer token is required before processing
    #[serde(default)]
    pub authn: bool,
}

impl RouteMeta {
    pub fn new(authn: bool) -> Self {
        Self { authn }
    }
}

/// Parsed `<protocol>.<method>.<pathTemplate>` route key.
///
/// Only the first two dots separate segments, so templates such as
/// `/files/{name}.json` keep their dots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteKey {
    raw: String,
    protocol: String,
    method: Method,
    template: String,
    path: String,
}

impl RouteKey {
    pub fn parse(raw: &str) -> Result<Self, EventSourceError> {
        let mut segments = raw.splitn(3, '.');
        let (protocol, method, template) = match (segments.next(), segments.next(), segments.next()) {
            (Some(p), Some(m), Some(t)) if !p.is_empty() && !m.is_empty() && !t.is_empty() => (p, m, t),
            _ => {
                return Err(EventSourceError::InvalidRouteKey(format!(
                    "'{}' must have the form <protocol>.<method>.<path>",
                    raw
                )))
            }
        };

        let method = parse_method(method).ok_or_else(|| {
            EventSourceError::InvalidRouteKey(format!("'{}' has unsupported HTTP method '{}'", raw, method))
        })?;
        let path = translate_path_template(template)?;

        Ok(Self {
            raw: raw.to_string(),
            protocol: protocol.to_string(),
            method,
            template: template.to_string(),
            path,
        })
    }

    /// The key exactly as declared
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path template as declared, with `{name}` placeholders
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Router path with `:name` parameters
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_method(method: &str) -> Option<Method> {
    match method.to_ascii_lowercase().as_str() {
        "get" => Some(Method::GET),
        "post" => Some(Method::POST),
        "put" => Some(Method::PUT),
        "patch" => Some(Method::PATCH),
        "delete" => Some(Method::DELETE),
        "head" => Some(Method::HEAD),
        "options" => Some(Method::OPTIONS),
        "trace" => Some(Method::TRACE),
        _ => None,
    }
}

/// Rewrite every `{name}` placeholder to the router's `:name` syntax.
///
/// A placeholder must fill a whole path segment and its name must be an
/// identifier. Nested, unbalanced and empty placeholders are rejected, as are
/// literal `:` and `*` which the router would treat as wildcards.
pub fn translate_path_template(template: &str) -> Result<String, EventSourceError> {
    let invalid = |reason: &str| {
        EventSourceError::InvalidPathTemplate(format!("'{}': {}", template, reason))
    };

    if !template.starts_with('/') {
        return Err(invalid("must start with '/'"));
    }

    let mut segments = Vec::new();
    for segment in template.split('/').skip(1) {
        if let Some(inner) = segment.strip_prefix('{') {
            let name = inner
                .strip_suffix('}')
                .ok_or_else(|| invalid("placeholder must be a whole segment"))?;
            if name.contains('{') || name.contains('}') {
                return Err(invalid("nested placeholders are not supported"));
            }
            if !is_identifier(name) {
                return Err(invalid("placeholder name must be an identifier"));
            }
            segments.push(format!(":{}", name));
        } else if segment.contains('{') || segment.contains('}') {
            return Err(invalid("placeholder must be a whole segment"));
        } else if segment.contains(':') || segment.contains('*') {
            return Err(invalid("':' and '*' are reserved by the router"));
        } else {
            segments.push(segment.to_string());
        }
    }

    Ok(format!("/{}", segments.join("/")))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Whether two translated paths would collide in the router because they
/// bind differently named parameters at the same position.
pub fn params_conflict(a: &str, b: &str) -> bool {
    for (left, right) in a.split('/').zip(b.split('/')) {
        match (left.strip_prefix(':'), right.strip_prefix(':')) {
            (Some(l), Some(r)) if l != r => return true,
            (Some(_), Some(_)) => continue,
            (None, None) if left == right => continue,
            _ => return false,
        }
    }
    false
}
