// Response types and status result translation

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Number, Value};

use crate::core::errors::EventSourceError;
use crate::core::event::StatusResult;

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// API error type that converts domain errors to HTTP responses
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub request_id: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: String) -> Self {
        Self {
            status,
            message,
            request_id: None,
        }
    }

    pub fn from_event_source_error(err: EventSourceError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, err.user_message())
    }

    pub fn from_event_source_error_with_id(err: EventSourceError, request_id: String) -> Self {
        let mut api_error = Self::from_event_source_error(err);
        api_error.request_id = Some(request_id);
        api_error
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
            request_id: self.request_id,
        });
        (self.status, body).into_response()
    }
}

impl From<EventSourceError> for ApiError {
    fn from(err: EventSourceError) -> Self {
        ApiError::from_event_source_error(err)
    }
}

/// Turn a processor verdict into the HTTP response.
///
/// Integer data is sent as its decimal text so it is never mistaken for a
/// status code; strings go out as plain text and every other value as JSON.
pub fn status_response(result: StatusResult) -> Result<Response, EventSourceError> {
    let code = result.effective_code();
    let status = StatusCode::from_u16(code).map_err(|_| {
        EventSourceError::ProcessorError(format!("processor returned invalid status code {}", code))
    })?;

    let response = match result.data {
        None | Some(Value::Null) => (status, Body::empty()).into_response(),
        Some(Value::String(text)) => plain_text(status, text),
        Some(Value::Number(number)) => match integer_text(&number) {
            Some(text) => plain_text(status, text),
            None => (status, Json(Value::Number(number))).into_response(),
        },
        Some(other) => (status, Json(other)).into_response(),
    };

    Ok(response)
}

fn plain_text(status: StatusCode, text: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        text,
    )
        .into_response()
}

fn integer_text(number: &Number) -> Option<String> {
    if let Some(i) = number.as_i64() {
        return Some(i.to_string());
    }
    if let Some(u) = number.as_u64() {
        return Some(u.to_string());
    }
    number
        .as_f64()
        .filter(|f| f.is_finite() && f.fract() == 0.0)
        .map(|f| format!("{}", f))
}
