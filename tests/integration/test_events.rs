// Integration tests for the canonical event built from each request

use crate::common::*;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_eventsource::{Actor, EventSource, HttpConfig, RouteMeta, StatusResult};
use serde_json::{json, Map};

#[tokio::test]
async fn test_event_carries_request_projection() {
    let source = started_source(test_config()).await;
    let processor = RecordingProcessor::returning(StatusResult::default());
    subscribe(&source, "http.post./orders/{orderId}/items", false, processor.clone())
        .await
        .unwrap();

    let request = Request::post("/orders/9/items?expand=lines&tag=a&tag=b")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-trace", "t-1")
        .body(Body::from(r#"{"sku":"A-1","qty":2}"#))
        .unwrap();
    let response = send(&source, request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let event = processor.last_event();
    assert!(uuid_like(&event.id));
    assert_eq!(event.endpoint, "/orders/:orderId/items");
    assert_eq!(event.transport, "http");
    assert_eq!(event.channel, "REST");
    assert_eq!(event.version, "1.0");
    assert_eq!(event.actor, Actor::anonymous());
    assert!(event.metadata.is_empty());

    assert_eq!(event.data["method"], json!("POST"));
    assert_eq!(event.data["url"], json!("/orders/9/items?expand=lines&tag=a&tag=b"));
    assert_eq!(event.data["path"], json!("/orders/9/items"));
    assert_eq!(event.data["params"], json!({"orderId": "9"}));
    assert_eq!(event.data["query"], json!({"expand": "lines", "tag": ["a", "b"]}));
    assert_eq!(event.data["body"], json!({"sku": "A-1", "qty": 2}));
    assert_eq!(event.data["headers"]["x-trace"], json!("t-1"));
    assert_eq!(event.data["headers"]["content-type"], json!("application/json"));

    let fields: Vec<&String> = event.data.as_object().unwrap().keys().collect();
    assert_eq!(fields.len(), 7, "unexpected fields: {:?}", fields);
}

fn uuid_like(id: &str) -> bool {
    id.len() == 36 && id.chars().filter(|c| *c == '-').count() == 4
}

#[tokio::test]
async fn test_event_ids_are_unique() {
    let source = started_source(test_config()).await;
    let processor = RecordingProcessor::returning(StatusResult::default());
    subscribe(&source, "http.get./ping", false, processor.clone())
        .await
        .unwrap();

    send(&source, Request::get("/ping").body(Body::empty()).unwrap()).await;
    let first = processor.last_event().id;
    send(&source, Request::get("/ping").body(Body::empty()).unwrap()).await;
    let second = processor.last_event().id;

    assert_ne!(first, second);
}

#[tokio::test]
async fn test_context_holds_route_key_and_config() {
    let source = started_source(test_config()).await;
    let processor = RecordingProcessor::returning(StatusResult::default());

    let mut config = Map::new();
    config.insert("fn".to_string(), json!("orders.create"));
    config.insert("key".to_string(), json!("overridden"));
    source
        .subscribe_to_event("http.post./orders", config, processor.clone(), RouteMeta::default())
        .await
        .unwrap();

    send(&source, Request::post("/orders").body(Body::empty()).unwrap()).await;

    let context = processor.last_context();
    assert_eq!(context.key(), "http.post./orders");
    assert_eq!(context.get("fn"), Some(json!("orders.create")));
    assert_eq!(
        context.to_value(),
        json!({"key": "http.post./orders", "fn": "orders.create"})
    );
}

#[tokio::test]
async fn test_form_body_parsed() {
    let source = started_source(test_config()).await;
    let processor = RecordingProcessor::returning(StatusResult::default());
    subscribe(&source, "http.post./forms", false, processor.clone())
        .await
        .unwrap();

    let request = Request::post("/forms")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("name=Ada+Lovelace&lang=en&lang=fr"))
        .unwrap();
    let response = send(&source, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        processor.last_event().data["body"],
        json!({"name": "Ada Lovelace", "lang": ["en", "fr"]})
    );
}

#[tokio::test]
async fn test_empty_and_text_bodies() {
    let source = started_source(test_config()).await;
    let processor = RecordingProcessor::returning(StatusResult::default());
    subscribe(&source, "http.post./notes", false, processor.clone())
        .await
        .unwrap();

    send(&source, Request::post("/notes").body(Body::empty()).unwrap()).await;
    assert_eq!(processor.last_event().data["body"], json!({}));

    let request = Request::post("/notes")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("remember the milk"))
        .unwrap();
    send(&source, request).await;
    assert_eq!(processor.last_event().data["body"], json!("remember the milk"));
}

#[tokio::test]
async fn test_malformed_json_rejected() {
    let source = started_source(test_config()).await;
    let processor = RecordingProcessor::returning(StatusResult::default());
    subscribe(&source, "http.post./orders", false, processor.clone())
        .await
        .unwrap();

    let request = Request::post("/orders")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = send(&source, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(processor.calls(), 0);
}

#[tokio::test]
async fn test_oversized_json_body_rejected() {
    let config = HttpConfig {
        request_body_limit: 1024,
        file_size_limit: 32,
        ..test_config()
    };
    let source = started_source(config).await;
    let processor = RecordingProcessor::returning(StatusResult::default());
    subscribe(&source, "http.post./upload", false, processor.clone())
        .await
        .unwrap();

    let payload = json!({"data": "x".repeat(100)}).to_string();
    let request = Request::post("/upload")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.clone()))
        .unwrap();
    let response = send(&source, request).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let declared = Request::post("/upload")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, payload.len())
        .body(Body::from(payload))
        .unwrap();
    let response = send(&source, declared).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    assert_eq!(processor.calls(), 0);
}

#[tokio::test]
async fn test_oversized_form_body_rejected() {
    let config = HttpConfig {
        request_body_limit: 16,
        file_size_limit: 1024,
        ..test_config()
    };
    let source = started_source(config).await;
    let processor = RecordingProcessor::returning(StatusResult::default());
    subscribe(&source, "http.post./forms", false, processor.clone())
        .await
        .unwrap();

    let request = Request::post("/forms")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("note={}", "y".repeat(64))))
        .unwrap();
    let response = send(&source, request).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(processor.calls(), 0);
}

#[tokio::test]
async fn test_cors_headers_present() {
    let source = started_source(test_config()).await;
    let processor = RecordingProcessor::returning(StatusResult::default());
    subscribe(&source, "http.post./orders", false, processor.clone())
        .await
        .unwrap();

    let preflight = Request::options("/orders")
        .header(header::ORIGIN, "https://app.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = send(&source, preflight).await;
    assert!(response.status().is_success());
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    assert_eq!(processor.calls(), 0);

    let actual = Request::post("/orders")
        .header(header::ORIGIN, "https://app.example.com")
        .body(Body::empty())
        .unwrap();
    let response = send(&source, actual).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}
