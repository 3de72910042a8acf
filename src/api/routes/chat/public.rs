//! Public types for the chat relay API
use serde::{Deserialize, Serialize};

use crate::openai::{Message, Role};

#[derive(Deserialize, Serialize, Debug)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ChatRequest {
    pub fn new(messages: &[Message], model: Option<&str>) -> Self {
        Self {
            messages: messages.to_vec(),
            model: model.map(String::from),
        }
    }

    /// The caller's model, ignoring blanks.
    pub fn model_override(&self) -> Option<&str> {
        self.model.as_deref().map(str::trim).filter(|m| !m.is_empty())
    }

    pub fn last_user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

#[derive(Deserialize)]
pub struct AuthQuery {
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct MockMessage {
    role: Role,
    content: String,
}

#[derive(Serialize)]
pub struct MockChoice {
    message: MockMessage,
}

/// Reply of the mock endpoint, shaped like a chat completion.
#[derive(Serialize)]
pub struct MockResponse {
    choices: Vec<MockChoice>,
}

impl MockResponse {
    pub fn reply_to(user_content: &str) -> Self {
        Self {
            choices: vec![MockChoice {
                message: MockMessage {
                    role: Role::Assistant,
                    content: format!("Mock reply to: \"{}\"", user_content),
                },
            }],
        }
    }
}
