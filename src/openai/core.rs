use std::time::Duration;

use anyhow::{Error, Result};
use axum::body::Bytes;
use http::{HeaderValue, StatusCode, header};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "user")]
    User,
}

/// A single entry in a chat transcript.
///
/// `timestamp` is a display string for the transcript view and is never
/// sent over the wire.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing)]
    pub timestamp: Option<String>,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Self {
        Message {
            role,
            content: content.to_string(),
            timestamp: None,
        }
    }

    /// Stamp the message with the local wall clock time.
    pub fn stamped(mut self) -> Self {
        self.timestamp = Some(chrono::Local::now().format("%H:%M").to_string());
        self
    }
}

/// Returns the last `size` messages of the transcript. Earlier context
/// is dropped.
pub fn window(messages: &[Message], size: usize) -> &[Message] {
    let start = messages.len().saturating_sub(size);
    &messages[start..]
}

/// The upstream reply, untouched, so it can be relayed verbatim.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: HeaderValue,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Build the completion request body sent upstream.
pub fn completion_payload(messages: &[Message], model: &str, max_tokens: u32) -> Value {
    json!({
        "model": model,
        "messages": messages,
        "max_tokens": max_tokens,
    })
}

/// Send a completion request and return the raw upstream response
/// regardless of status. Only transport failures are errors.
pub async fn completion(
    client: &reqwest::Client,
    api_url: &str,
    api_key: &str,
    payload: &Value,
    timeout: Duration,
) -> Result<UpstreamResponse, Error> {
    let response = client
        .post(api_url)
        .bearer_auth(api_key)
        .header("Content-Type", "application/json")
        .timeout(timeout)
        .json(payload)
        .send()
        .await?;

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/json"));
    let body = response.bytes().await?;

    Ok(UpstreamResponse {
        status,
        content_type,
        body,
    })
}
