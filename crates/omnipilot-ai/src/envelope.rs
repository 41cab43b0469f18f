//! Normalizes provider error bodies into a single display message.

use serde_json::{Map, Value};

const ERROR_KEYWORDS: [&str; 6] = [
    "error",
    "fail",
    "not found",
    "invalid",
    "unauthorized",
    "forbidden",
];
const MAX_SCANNED_MESSAGE_CHARS: usize = 300;

/// Recognized error body shapes, tried in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorEnvelope {
    /// `{"message": "..."}` (OpenRouter and most gateways).
    TopLevelMessage(String),
    /// `{"error": {"type": "...", "message": "..."}}` (Anthropic, OpenAI).
    TypedError { kind: String, message: String },
    /// `{"error": {"message": "..."}}`
    NestedError(String),
    /// `{"detail": "..."}`
    Detail(String),
    /// `{"msg": "..."}`
    Msg(String),
    /// Any short top-level string that reads like an error.
    KeywordField(String),
}

impl ErrorEnvelope {
    pub fn parse(body: &Value) -> Option<Self> {
        let object = body.as_object()?;

        if let Some(message) = string_field(object, "message") {
            return Some(Self::TopLevelMessage(message.to_string()));
        }

        if let Some(error) = object.get("error").and_then(Value::as_object) {
            match (string_field(error, "type"), string_field(error, "message")) {
                (Some(kind), Some(message)) => {
                    return Some(Self::TypedError {
                        kind: kind.to_string(),
                        message: message.to_string(),
                    });
                }
                (None, Some(message)) => return Some(Self::NestedError(message.to_string())),
                _ => {}
            }
        }

        if let Some(detail) = string_field(object, "detail") {
            return Some(Self::Detail(detail.to_string()));
        }
        if let Some(msg) = string_field(object, "msg") {
            return Some(Self::Msg(msg.to_string()));
        }

        object
            .values()
            .filter_map(Value::as_str)
            .find(|value| looks_like_error(value))
            .map(|value| Self::KeywordField(value.to_string()))
    }

    pub fn into_message(self) -> String {
        match self {
            Self::TypedError { kind, message } => format!("{kind}: {message}"),
            Self::TopLevelMessage(message)
            | Self::NestedError(message)
            | Self::Detail(message)
            | Self::Msg(message)
            | Self::KeywordField(message) => message,
        }
    }
}

/// Message for a non-2xx response: `[{status}] {message}` when the body yields
/// one, otherwise `HTTP error! status: {status}`.
pub fn normalize_error_body(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .as_ref()
        .and_then(ErrorEnvelope::parse)
        .map(ErrorEnvelope::into_message)
        .filter(|message| !message.is_empty())
        .map(|message| format!("[{status}] {message}"))
        .unwrap_or_else(|| format!("HTTP error! status: {status}"))
}

fn string_field<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str)
}

fn looks_like_error(value: &str) -> bool {
    let length = value.chars().count();
    if length == 0 || length >= MAX_SCANNED_MESSAGE_CHARS {
        return false;
    }
    let lower = value.to_lowercase();
    ERROR_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}
