//! Decoding of provider reply and error bodies.
//!
//! Providers (and proxies in front of them) do not agree on a reply
//! shape, so each known shape is tried in priority order and the first
//! one that yields text wins.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

// {"choices": [{"message": {"content": "..."}}]}
#[derive(Debug, Deserialize)]
struct ChoicesShape {
    choices: Vec<Choice>,
}

// {"output": "..."} or {"output": ["...", ...]}
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Output {
    Text(String),
    List(Vec<Value>),
}

#[derive(Debug, Deserialize)]
struct OutputShape {
    output: Output,
}

// {"result": ...}
#[derive(Debug, Deserialize)]
struct ResultShape {
    result: Value,
}

/// A known reply shape. Decoding the shape may succeed and still yield
/// no text (e.g. an empty `choices` array), in which case the next shape
/// gets its turn.
trait Shape: for<'de> Deserialize<'de> {
    fn text(self) -> Option<String>;
}

impl Shape for ChoicesShape {
    fn text(self) -> Option<String> {
        self.choices.into_iter().next().map(|c| c.message.content)
    }
}

impl Shape for OutputShape {
    fn text(self) -> Option<String> {
        match self.output {
            Output::Text(s) => Some(s),
            Output::List(items) => match items.into_iter().next() {
                Some(Value::String(s)) => Some(s),
                _ => None,
            },
        }
    }
}

impl Shape for ResultShape {
    fn text(self) -> Option<String> {
        match self.result {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

fn try_shape<S: Shape>(body: &Value) -> Option<String> {
    S::deserialize(body).ok().and_then(S::text)
}

type Extractor = fn(&Value) -> Option<String>;

// Priority order
const EXTRACTORS: &[Extractor] = &[
    try_shape::<ChoicesShape>,
    try_shape::<OutputShape>,
    try_shape::<ResultShape>,
];

/// Extract the assistant text from a provider reply. Falls back to the
/// serialized envelope when no known shape yields text.
pub fn extract_text(body: &Value) -> String {
    EXTRACTORS
        .iter()
        .find_map(|extract| extract(body))
        .unwrap_or_else(|| body.to_string())
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    // {"error": {"message": "..."}}
    Nested { error: ErrorDetail },
    // {"error": "..."}
    Flat { error: String },
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Pull a human readable message out of a JSON error body, if it has one.
pub fn error_message(body: &Value) -> Option<String> {
    match ErrorBody::deserialize(body).ok()? {
        ErrorBody::Nested { error } => Some(error.message),
        ErrorBody::Flat { error } => Some(error),
    }
}
