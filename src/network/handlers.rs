//! Request Handlers
//!
//! Thin adapters: decode the path key and body, call the engine, map the
//! result to a status code.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Router,
};
use bytes::Bytes;
use tower_http::trace::TraceLayer;

use crate::engine::Engine;
use crate::error::KvError;

/// Build the HTTP router over a live engine
pub fn router(engine: Engine) -> Router {
    Router::new()
        .route("/v1/key/{key}", put(put_key).get(get_key).delete(delete_key))
        .route("/health", get(|| async { "ok" }))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
        .with_state(engine)
}

async fn put_key(State(engine): State<Engine>, Path(key): Path<String>, body: Bytes) -> Response {
    let value = match String::from_utf8(body.to_vec()) {
        Ok(value) => value,
        Err(_) => return (StatusCode::BAD_REQUEST, "value must be valid UTF-8").into_response(),
    };

    // Durability is reported through the logger's error stream, not here.
    match engine.put(&key, &value).await {
        Ok(_receipt) => StatusCode::CREATED.into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_key(State(engine): State<Engine>, Path(key): Path<String>) -> Response {
    match engine.get(&key) {
        Ok(value) => (StatusCode::OK, value).into_response(),
        Err(e) => error_response(e),
    }
}

async fn delete_key(State(engine): State<Engine>, Path(key): Path<String>) -> Response {
    match engine.delete(&key).await {
        Ok(_receipt) => StatusCode::OK.into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(e: KvError) -> Response {
    let status = match e {
        KvError::KeyNotFound => StatusCode::NOT_FOUND,
        KvError::InvalidKey => StatusCode::BAD_REQUEST,
        _ => {
            tracing::warn!(error = %e, "Request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.to_string()).into_response()
}
