use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tokio_stream::StreamExt;

use super::stream::{Reveal, RevealOutcome, reveal};
use crate::api::public::chat::ChatRequest;
use crate::api::routes::chat::PASSWORD_HEADER;
use crate::core::ClientConfig;
use crate::openai::{Message, Role, error_message, extract_text};

pub const HTML_ERROR_MESSAGE: &str = "Server error, check backend URL";

/// Why a turn failed. `Display` is what the user sees.
#[derive(Debug, Error, PartialEq)]
pub enum RelayError {
    #[error("Network error. {0}")]
    Network(String),
    #[error("{message}")]
    Server { status: u16, message: String },
}

/// Where transcript updates are rendered.
pub trait View {
    /// Called after every transcript mutation.
    fn scroll_to_latest(&mut self, transcript: &[Message]);
    fn show_banner(&mut self, banner: Option<&str>);
}

/// Turn an error response body into something fit for a chat bubble.
pub fn normalize_error_body(body: &str) -> String {
    let head = body.trim_start().to_ascii_lowercase();
    if head.starts_with("<!doctype") || head.starts_with("<html") {
        return String::from(HTML_ERROR_MESSAGE);
    }

    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| error_message(&v))
        .unwrap_or_else(|| body.to_string())
}

/// Sends transcripts to the relay endpoint.
#[derive(Clone, Debug)]
pub struct RelayClient {
    config: ClientConfig,
    http: reqwest::Client,
}

impl RelayClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Send the transcript and return the assistant text.
    pub async fn send(&self, transcript: &[Message]) -> Result<String, RelayError> {
        let payload = ChatRequest::new(transcript, self.config.model.as_deref());
        let mut request = self.http.post(&self.config.endpoint).json(&payload);
        if let Some(secret) = &self.config.shared_secret {
            request = request.header(PASSWORD_HEADER, secret);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RelayError::Network(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RelayError::Network(e.to_string()))?;

        if !status.is_success() {
            tracing::debug!("Relay responded with {}: {}", status, body);
            return Err(RelayError::Server {
                status: status.as_u16(),
                message: normalize_error_body(&body),
            });
        }

        let json: Value = serde_json::from_str(&body).map_err(|e| RelayError::Server {
            status: status.as_u16(),
            message: format!("Invalid response from server: {}", e),
        })?;

        Ok(extract_text(&json))
    }
}

/// One chat session: the transcript, the banner, and the view they are
/// rendered into.
pub struct Conversation<V: View> {
    client: RelayClient,
    transcript: Vec<Message>,
    banner: Option<String>,
    view: V,
}

impl<V: View> Conversation<V> {
    pub fn new(client: RelayClient, view: V) -> Self {
        Self {
            client,
            transcript: Vec::new(),
            banner: None,
            view,
        }
    }

    /// Seed the transcript, e.g. with a system message.
    pub fn with_transcript(mut self, transcript: Vec<Message>) -> Self {
        self.transcript = transcript;
        self
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    fn push(&mut self, msg: Message) {
        self.transcript.push(msg);
        self.view.scroll_to_latest(&self.transcript);
    }

    fn set_banner(&mut self, banner: Option<String>) {
        self.banner = banner;
        self.view.show_banner(self.banner.as_deref());
    }

    /// Append the user's message, relay the transcript, and append the
    /// reply. Returns `Ok(None)` without sending when `text` is blank.
    ///
    /// Failures are also recorded in the transcript as an assistant
    /// message and shown as the banner.
    pub async fn send_turn(&mut self, text: &str) -> Result<Option<String>, RelayError> {
        let Some(reply) = self.request_reply(text).await? else {
            return Ok(None);
        };
        self.push(Message::new(Role::Assistant, &reply).stamped());
        Ok(Some(reply))
    }

    /// Like `send_turn` but the reply is revealed a token at a time into
    /// a new assistant message. The returned `Reveal` must be driven with
    /// `play`.
    pub async fn send_turn_streaming(
        &mut self,
        text: &str,
        interval: Duration,
    ) -> Result<Option<Reveal>, RelayError> {
        let Some(reply) = self.request_reply(text).await? else {
            return Ok(None);
        };
        self.push(Message::new(Role::Assistant, "").stamped());
        Ok(Some(reveal(&reply, interval)))
    }

    /// Apply revealed tokens to the last assistant message until the
    /// animation ends.
    pub async fn play(&mut self, mut reveal: Reveal) -> anyhow::Result<RevealOutcome> {
        while let Some(part) = reveal.tokens.next().await {
            self.append_to_latest(&part);
        }
        reveal.finish().await
    }

    /// Append text in place to the newest assistant message.
    pub fn append_to_latest(&mut self, part: &str) {
        if let Some(last) = self
            .transcript
            .last_mut()
            .filter(|m| m.role == Role::Assistant)
        {
            last.content.push_str(part);
            self.view.scroll_to_latest(&self.transcript);
        }
    }

    async fn request_reply(&mut self, text: &str) -> Result<Option<String>, RelayError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        if self.banner.is_some() {
            self.set_banner(None);
        }
        self.push(Message::new(Role::User, text).stamped());

        match self.client.send(&self.transcript).await {
            Ok(reply) => Ok(Some(reply)),
            Err(err) => {
                let message = err.to_string();
                self.push(Message::new(Role::Assistant, &message).stamped());
                self.set_banner(Some(message));
                Err(err)
            }
        }
    }
}
