// Integration tests for translating processor results into responses

use crate::common::*;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use http_eventsource::StatusResult;
use serde_json::json;
use std::sync::Arc;

async fn respond_with(processor: Arc<RecordingProcessor>) -> Response {
    let source = started_source(test_config()).await;
    subscribe(&source, "http.post./result", false, processor)
        .await
        .unwrap();
    send(&source, Request::post("/result").body(Body::empty()).unwrap()).await
}

fn content_type(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

#[tokio::test]
async fn test_code_and_string_data() {
    let response = respond_with(RecordingProcessor::returning(StatusResult::with_code(201, "ok"))).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_integer_data_sent_as_text_with_default_status() {
    let response = respond_with(RecordingProcessor::returning(StatusResult::ok(42))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        content_type(&response).as_deref(),
        Some("text/plain; charset=utf-8")
    );
    assert_eq!(body_string(response).await, "42");
}

#[tokio::test]
async fn test_empty_result_is_ok_with_empty_body() {
    let response = respond_with(RecordingProcessor::returning(StatusResult::default())).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "");
}

#[tokio::test]
async fn test_zero_code_falls_back_to_ok() {
    let result = StatusResult {
        code: Some(0),
        data: Some(json!("fine")),
    };
    let response = respond_with(RecordingProcessor::returning(result)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "fine");
}

#[tokio::test]
async fn test_object_data_sent_as_json() {
    let result = StatusResult::with_code(202, json!({"accepted": true, "items": [1, 2]}));
    let response = respond_with(RecordingProcessor::returning(result)).await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(content_type(&response).as_deref(), Some("application/json"));
    assert_eq!(body_json(response).await, json!({"accepted": true, "items": [1, 2]}));
}

#[tokio::test]
async fn test_processor_error_is_internal_error_with_event_id() {
    let processor = RecordingProcessor::failing("database unavailable");
    let response = respond_with(processor.clone()).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], json!("Internal error"));
    assert_eq!(body["request_id"], json!(processor.last_event().id));
    assert!(!body.to_string().contains("database unavailable"));
}

#[tokio::test]
async fn test_invalid_status_code_is_internal_error() {
    let result = StatusResult {
        code: Some(1000),
        data: None,
    };
    let response = respond_with(RecordingProcessor::returning(result)).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
