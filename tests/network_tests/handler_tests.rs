//! Tests for the HTTP handlers
//!
//! These tests verify:
//! - PUT answers 201 and stores the raw body
//! - GET answers 200 with the raw value, 404 with the error text when absent
//! - DELETE answers 200 for present and absent keys
//! - Non-UTF-8 bodies are rejected
//! - Mutations made over HTTP reach the transaction log

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use kvlog::network::router;
use kvlog::tlog::{EventType, TransactionLogger};
use kvlog::Engine;
use tower::ServiceExt;

use crate::common::{put, MemoryBackend, MemoryHandle};

// =============================================================================
// Helper Functions
// =============================================================================

async fn setup_app(events: Vec<kvlog::tlog::Event>) -> (Router, Engine, MemoryHandle) {
    let (backend, handle) = MemoryBackend::with_events(events);
    let logger = TransactionLogger::new(Box::new(backend), 16, 4);
    let engine = Engine::start(logger).await.unwrap();
    (router(engine.clone()), engine, handle)
}

async fn send(app: &Router, method: Method, uri: &str, body: impl Into<Body>) -> (StatusCode, String) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(body.into())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

/// Wait for the worker to drain everything enqueued so far
async fn flush(engine: &Engine) {
    engine
        .logger()
        .write_delete("__flush__")
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();
}

// =============================================================================
// PUT / GET Tests
// =============================================================================

#[tokio::test]
async fn test_put_returns_created_with_empty_body() {
    let (app, engine, _handle) = setup_app(Vec::new()).await;

    let (status, body) = send(&app, Method::PUT, "/v1/key/greeting", "hello world").await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body.is_empty());
    assert_eq!(engine.get("greeting").unwrap(), "hello world");
}

#[tokio::test]
async fn test_get_returns_raw_value() {
    let (app, _engine, _handle) = setup_app(Vec::new()).await;

    send(&app, Method::PUT, "/v1/key/k", "some value").await;
    let (status, body) = send(&app, Method::GET, "/v1/key/k", Body::empty()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "some value");
}

#[tokio::test]
async fn test_get_missing_key_is_not_found() {
    let (app, _engine, _handle) = setup_app(Vec::new()).await;

    let (status, body) = send(&app, Method::GET, "/v1/key/missing", Body::empty()).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "No such key");
}

#[tokio::test]
async fn test_get_serves_replayed_state() {
    let (app, _engine, _handle) = setup_app(vec![put(1, "restored", "yes")]).await;

    let (status, body) = send(&app, Method::GET, "/v1/key/restored", Body::empty()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "yes");
}

#[tokio::test]
async fn test_put_rejects_non_utf8_body() {
    let (app, engine, _handle) = setup_app(Vec::new()).await;

    let (status, _) = send(&app, Method::PUT, "/v1/key/bin", vec![0xff, 0xfe, 0x00]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(engine.get("bin").is_err());
}

#[tokio::test]
async fn test_percent_encoded_key_is_decoded() {
    let (app, engine, _handle) = setup_app(Vec::new()).await;

    let (status, _) = send(&app, Method::PUT, "/v1/key/hello%20there", "v").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(engine.get("hello there").unwrap(), "v");
}

// =============================================================================
// DELETE Tests
// =============================================================================

#[tokio::test]
async fn test_delete_removes_key() {
    let (app, _engine, _handle) = setup_app(Vec::new()).await;

    send(&app, Method::PUT, "/v1/key/k", "v").await;
    let (status, _) = send(&app, Method::DELETE, "/v1/key/k", Body::empty()).await;
    let (after, _) = send(&app, Method::GET, "/v1/key/k", Body::empty()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(after, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_absent_key_is_ok() {
    let (app, _engine, _handle) = setup_app(Vec::new()).await;

    let (status, _) = send(&app, Method::DELETE, "/v1/key/nothing", Body::empty()).await;

    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Logging Tests
// =============================================================================

#[tokio::test]
async fn test_http_mutations_reach_the_log() {
    let (app, engine, handle) = setup_app(Vec::new()).await;

    send(&app, Method::PUT, "/v1/key/a", "1").await;
    send(&app, Method::DELETE, "/v1/key/a", Body::empty()).await;
    flush(&engine).await;

    let events = handle.events();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].event_type, EventType::Put);
    assert_eq!(events[0].value, "1");
    assert_eq!(events[1].event_type, EventType::Delete);
}

#[tokio::test]
async fn test_put_succeeds_even_when_persistence_fails() {
    let (app, engine, handle) = setup_app(Vec::new()).await;
    handle.set_fail_appends(true);

    let (status, _) = send(&app, Method::PUT, "/v1/key/k", "v").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(engine.get("k").unwrap(), "v");
}

#[tokio::test]
async fn test_health() {
    let (app, _engine, _handle) = setup_app(Vec::new()).await;

    let (status, body) = send(&app, Method::GET, "/health", Body::empty()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}
