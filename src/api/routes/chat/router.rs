//! Router for the chat relay API

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::post,
};
use http::header;
use serde_json::Value;

use super::public;
use crate::api::public::ApiError;
use crate::api::state::AppState;
use crate::openai::{completion, completion_payload, window};

type SharedState = Arc<AppState>;

pub const PASSWORD_HEADER: &str = "x-errorify-password";

/// Compare without short-circuiting on the first differing byte, so the
/// response time does not reveal how much of the secret was guessed.
fn secret_matches(provided: &str, secret: &str) -> bool {
    let (a, b) = (provided.as_bytes(), secret.as_bytes());
    if a.len() != b.len() {
        return false;
    }

    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Reject requests without the shared secret when one is configured.
/// The secret may arrive in the header or the `password` query param.
async fn require_secret(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(secret) = state.config.shared_secret.as_deref() else {
        return Ok(next.run(request).await);
    };

    let header_matches = request
        .headers()
        .get(PASSWORD_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| secret_matches(v, secret));
    let query_matches = Query::<public::AuthQuery>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(q)| q.password)
        .is_some_and(|v| secret_matches(&v, secret));

    if header_matches || query_matches {
        Ok(next.run(request).await)
    } else {
        Err(ApiError::Unauthorized)
    }
}

/// Decode the relay request, insisting on a `messages` array.
fn parse_request(body: &[u8]) -> Result<public::ChatRequest, ApiError> {
    let value: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
    if !value.get("messages").is_some_and(Value::is_array) {
        return Err(ApiError::BadRequest(String::from("Missing messages array")));
    }

    serde_json::from_value(value)
        .map_err(|e| ApiError::BadRequest(format!("Invalid messages: {}", e)))
}

/// Forward the windowed transcript upstream and relay the reply
async fn chat_relay(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request = parse_request(&body)?;
    let config = &state.config;
    let model = request
        .model_override()
        .unwrap_or(config.default_model.as_str());
    let messages = window(&request.messages, config.window_size);

    tracing::debug!(
        "Relaying {} of {} messages to {} using {}",
        messages.len(),
        request.messages.len(),
        config.upstream_url,
        model
    );

    let payload = completion_payload(messages, model, config.max_tokens);
    let upstream = completion(
        &state.http,
        &config.upstream_url,
        &config.upstream_api_key,
        &payload,
        config.upstream_timeout,
    )
    .await?;

    if upstream.is_success() {
        return Ok((
            upstream.status,
            [(header::CONTENT_TYPE, upstream.content_type)],
            upstream.body,
        )
            .into_response());
    }

    tracing::warn!("Upstream responded with {}", upstream.status);

    // Mirror the upstream status, keeping JSON bodies as JSON
    let response = match serde_json::from_slice::<Value>(&upstream.body) {
        Ok(json) => (upstream.status, Json(json)).into_response(),
        Err(_) => (
            upstream.status,
            String::from_utf8_lossy(&upstream.body).into_owned(),
        )
            .into_response(),
    };

    Ok(response)
}

/// Echo the last user message without calling upstream
async fn chat_mock(body: Bytes) -> Result<Json<public::MockResponse>, ApiError> {
    let request = parse_request(&body)?;
    let content = request.last_user_content().unwrap_or_default();
    Ok(Json(public::MockResponse::reply_to(content)))
}

/// Create the chat router
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/chat", post(chat_relay))
        .route("/chat-mock", post(chat_mock))
        .route_layer(middleware::from_fn_with_state(state, require_secret))
}
