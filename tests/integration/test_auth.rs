// Integration tests for the per-route bearer token gate

use crate::common::*;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_eventsource::{Actor, JwtSettings, StatusResult};
use serde_json::json;

fn auth_request(token: Option<&str>) -> Request<Body> {
    let mut builder = Request::get("/private");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_open_route_ignores_authorization_header() {
    let source = started_source(test_config_with_jwt(JwtSettings::new(TEST_SECRET))).await;
    let processor = RecordingProcessor::returning(StatusResult::default());
    subscribe(&source, "http.get./private", false, processor.clone())
        .await
        .unwrap();

    let response = send(&source, auth_request(Some("not-a-jwt"))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(processor.calls(), 1);
    assert_eq!(processor.last_event().actor, Actor::anonymous());
}

#[tokio::test]
async fn test_valid_token_reaches_processor_with_subject() {
    let source = started_source(test_config_with_jwt(JwtSettings::new(TEST_SECRET))).await;
    let processor = RecordingProcessor::returning(StatusResult::default());
    subscribe(&source, "http.get./private", true, processor.clone())
        .await
        .unwrap();

    let token = sign_token(json!({"sub": "user-7", "exp": 4_102_444_800u64}));
    let response = send(&source, auth_request(Some(&token))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(processor.calls(), 1);
    assert_eq!(processor.last_event().actor, Actor::user("user-7"));
}

#[tokio::test]
async fn test_expired_token_accepted_by_default() {
    let source = started_source(test_config_with_jwt(JwtSettings::new(TEST_SECRET))).await;
    let processor = RecordingProcessor::returning(StatusResult::default());
    subscribe(&source, "http.get./private", true, processor.clone())
        .await
        .unwrap();

    let token = sign_token(json!({"sub": "user-7", "exp": 1_000}));
    let response = send(&source, auth_request(Some(&token))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(processor.calls(), 1);
}

#[tokio::test]
async fn test_expired_token_rejected_when_expiration_checked() {
    let settings = JwtSettings::new(TEST_SECRET).with_ignore_expiration(false);
    let source = started_source(test_config_with_jwt(settings)).await;
    let processor = RecordingProcessor::returning(StatusResult::default());
    subscribe(&source, "http.get./private", true, processor.clone())
        .await
        .unwrap();

    let token = sign_token(json!({"sub": "user-7", "exp": 1_000}));
    let response = send(&source, auth_request(Some(&token))).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(processor.calls(), 0);
}

#[tokio::test]
async fn test_missing_token_rejected() {
    let source = started_source(test_config_with_jwt(JwtSettings::new(TEST_SECRET))).await;
    let processor = RecordingProcessor::returning(StatusResult::default());
    subscribe(&source, "http.get./private", true, processor.clone())
        .await
        .unwrap();

    let response = send(&source, auth_request(None)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], json!("Unauthorized"));
    assert_eq!(processor.calls(), 0);
}

#[tokio::test]
async fn test_bad_signature_rejected() {
    let source = started_source(test_config_with_jwt(JwtSettings::new("another-secret"))).await;
    let processor = RecordingProcessor::returning(StatusResult::default());
    subscribe(&source, "http.get./private", true, processor.clone())
        .await
        .unwrap();

    let token = sign_token(json!({"sub": "user-7"}));
    let response = send(&source, auth_request(Some(&token))).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(processor.calls(), 0);
}

#[tokio::test]
async fn test_audience_and_issuer_enforced() {
    let settings = JwtSettings::new(TEST_SECRET)
        .with_audience("orders")
        .with_issuer("auth.example.com");
    let source = started_source(test_config_with_jwt(settings)).await;
    let processor = RecordingProcessor::returning(StatusResult::default());
    subscribe(&source, "http.get./private", true, processor.clone())
        .await
        .unwrap();

    let wrong_audience = sign_token(json!({"sub": "u", "aud": "billing", "iss": "auth.example.com"}));
    let response = send(&source, auth_request(Some(&wrong_audience))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let wrong_issuer = sign_token(json!({"sub": "u", "aud": "orders", "iss": "elsewhere"}));
    let response = send(&source, auth_request(Some(&wrong_issuer))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let good = sign_token(json!({"sub": "u", "aud": "orders", "iss": "auth.example.com"}));
    let response = send(&source, auth_request(Some(&good))).await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(processor.calls(), 1);
}

#[tokio::test]
async fn test_token_without_audience_or_issuer_rejected() {
    let settings = JwtSettings::new(TEST_SECRET)
        .with_audience("orders")
        .with_issuer("auth.example.com");
    let source = started_source(test_config_with_jwt(settings)).await;
    let processor = RecordingProcessor::returning(StatusResult::default());
    subscribe(&source, "http.get./private", true, processor.clone())
        .await
        .unwrap();

    let bare = sign_token(json!({"sub": "mallory"}));
    let response = send(&source, auth_request(Some(&bare))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let no_audience = sign_token(json!({"sub": "mallory", "iss": "auth.example.com"}));
    let response = send(&source, auth_request(Some(&no_audience))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let no_issuer = sign_token(json!({"sub": "mallory", "aud": "orders"}));
    let response = send(&source, auth_request(Some(&no_issuer))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(processor.calls(), 0);
}

#[tokio::test]
async fn test_non_bearer_scheme_rejected() {
    let source = started_source(test_config_with_jwt(JwtSettings::new(TEST_SECRET))).await;
    let processor = RecordingProcessor::returning(StatusResult::default());
    subscribe(&source, "http.get./private", true, processor.clone())
        .await
        .unwrap();

    let token = sign_token(json!({"sub": "user-7"}));
    let request = Request::get("/private")
        .header(header::AUTHORIZATION, format!("Basic {}", token))
        .body(Body::empty())
        .unwrap();
    let response = send(&source, request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(processor.calls(), 0);
}
