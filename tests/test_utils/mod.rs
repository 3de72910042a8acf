//! Test utilities for integration tests
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, body::Body};

use errorify::api::AppState;
use errorify::api::app;
use errorify::core::AppConfig;

/// Relay configuration pointing at `upstream_base`, typically a
/// `mockito` server url.
pub fn test_config(upstream_base: &str, shared_secret: Option<&str>) -> AppConfig {
    AppConfig {
        upstream_url: format!("{}/v1/chat/completions", upstream_base),
        upstream_api_key: String::from("test-api-key"),
        upstream_timeout: Duration::from_secs(5),
        default_model: String::from("gpt-4o"),
        max_tokens: 256,
        window_size: 12,
        shared_secret: shared_secret.map(String::from),
        allowed_origins: vec![],
    }
}

/// Creates a test application router for the given config.
pub fn test_app(config: AppConfig) -> Router {
    app(Arc::new(AppState::new(config)))
}

/// Serve the app on an ephemeral port and return its base url.
pub async fn spawn_app(config: AppConfig) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().unwrap();
    let app = test_app(config);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body is not utf-8")
}
