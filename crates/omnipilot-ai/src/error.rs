use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OmniAiErrorCode {
    ProviderAuthMissing,
    ProviderHttp,
    ProviderTransport,
    ProviderProtocol,
    ResponseBodyMissing,
    TokenExchange,
    Timeout,
}

/// Error surfaced by every fallible operation in this crate.
///
/// `message` is already normalized and suitable for direct display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OmniAiError {
    pub code: OmniAiErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl OmniAiError {
    pub fn new(code: OmniAiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub(crate) fn http(status: u16, message: impl Into<String>) -> Self {
        Self::new(OmniAiErrorCode::ProviderHttp, message).with_details(json!({ "status": status }))
    }

    /// HTTP status of the failed response, when the error came from one.
    pub fn http_status(&self) -> Option<u16> {
        self.details
            .as_ref()
            .and_then(|details| details.get("status"))
            .and_then(Value::as_u64)
            .and_then(|status| u16::try_from(status).ok())
    }

    pub fn as_compact_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                "{{\"code\":\"provider_protocol\",\"message\":\"{}\"}}",
                self.message.replace('\"', "\\\"")
            )
        })
    }
}

impl Display for OmniAiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for OmniAiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_errors_expose_their_status() {
        let error = OmniAiError::http(429, "[429] Rate limit exceeded");
        assert_eq!(error.http_status(), Some(429));
        assert_eq!(error.to_string(), "[429] Rate limit exceeded");
    }

    #[test]
    fn compact_json_uses_snake_case_codes() {
        let error = OmniAiError::new(OmniAiErrorCode::TokenExchange, "bad token");
        assert_eq!(
            error.as_compact_json(),
            r#"{"code":"token_exchange","message":"bad token"}"#
        );
        assert_eq!(error.http_status(), None);
    }
}
