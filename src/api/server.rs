use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use http::{HeaderName, HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::routes;
use super::routes::chat::PASSWORD_HEADER;
use crate::api::state::AppState;
use crate::core::{AppConfig, init_tracing, server_filter};

/// Permissive when no origins are configured, otherwise only the listed
/// origins may call the relay.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid allowed origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(PASSWORD_HEADER)])
}

pub fn app(shared_state: Arc<AppState>) -> Router {
    let cors = cors_layer(&shared_state.config.allowed_origins);

    Router::new()
        // API routes
        .nest("/api", routes::router(Arc::clone(&shared_state)))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

// Run the server
pub async fn serve(host: String, port: String, config: AppConfig) -> Result<()> {
    init_tracing(&server_filter());

    if config.shared_secret.is_none() {
        tracing::warn!("No shared secret configured, the relay accepts all requests");
    }
    if config.allowed_origins.is_empty() {
        tracing::warn!("No allowed origins configured, CORS is permissive");
    }

    let app = app(Arc::new(AppState::new(config)));

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;

    tracing::debug!("Server started. Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
