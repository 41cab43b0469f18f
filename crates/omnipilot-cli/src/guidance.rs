//! Turns a normalized provider error into user-facing guidance.

use omnipilot_ai::{OmniAiError, OmniAiErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    ModelNotFound,
    InvalidApiKey,
    RateLimited,
    InsufficientFunds,
    Timeout,
    Connection,
    Unknown,
}

impl ErrorCategory {
    /// Case-sensitive substring rules, checked in declaration order.
    pub fn classify(message: &str) -> Self {
        if contains_any(message, &["model not found", "model_not_found"]) {
            Self::ModelNotFound
        } else if contains_any(message, &["Invalid API key", "Unauthorized", "401"]) {
            Self::InvalidApiKey
        } else if contains_any(message, &["Rate limit", "429"]) {
            Self::RateLimited
        } else if contains_any(message, &["insufficient", "quota", "credits"]) {
            Self::InsufficientFunds
        } else if contains_any(message, &["timeout", "timed out"]) {
            Self::Timeout
        } else if contains_any(message, &["network", "connection", "fetch"]) {
            Self::Connection
        } else {
            Self::Unknown
        }
    }

    /// Uses the error code when it already pins the category.
    pub fn from_error(error: &OmniAiError) -> Self {
        match error.code {
            OmniAiErrorCode::Timeout => Self::Timeout,
            OmniAiErrorCode::ProviderTransport => Self::Connection,
            _ => Self::classify(&error.message),
        }
    }

    fn heading(self) -> &'static str {
        match self {
            Self::ModelNotFound => "Model not found",
            Self::InvalidApiKey => "Invalid API key",
            Self::RateLimited => "Rate limit exceeded",
            Self::InsufficientFunds => "Insufficient funds",
            Self::Timeout => "Request timeout",
            Self::Connection => "Connection error",
            Self::Unknown => "Unknown error",
        }
    }

    fn explanation(self) -> &'static str {
        match self {
            Self::ModelNotFound => "The specified model does not exist or is not available.",
            Self::InvalidApiKey => "Your API key is invalid or has expired.",
            Self::RateLimited => "You've made too many requests too quickly.",
            Self::InsufficientFunds => {
                "You don't have enough credits or have exceeded your quota."
            }
            Self::Timeout => "The request took too long to process.",
            Self::Connection => "Could not establish connection to the AI service.",
            Self::Unknown => "An unexpected error occurred.",
        }
    }

    fn solutions(self) -> [&'static str; 3] {
        match self {
            Self::ModelNotFound => [
                "Check the model name in omnipilot.toml",
                "List available models with `omnipilot models`",
                "Use a common model like \"gpt-4o-mini\"",
            ],
            Self::InvalidApiKey => [
                "Verify the API key in omnipilot.toml or its api_key_env variable",
                "Make sure the key hasn't expired",
                "Generate a new API key if necessary",
            ],
            Self::RateLimited => [
                "Wait a few minutes before trying again",
                "Reduce the frequency of your queries",
                "Consider upgrading your plan if needed",
            ],
            Self::InsufficientFunds => [
                "Top up your account in the provider dashboard",
                "Check your spending limits",
                "Consider switching to a more economical model",
            ],
            Self::Timeout => [
                "Try again in a few moments",
                "Reduce the complexity of your query",
                "Check your internet connection",
            ],
            Self::Connection => [
                "Check your internet connection",
                "Try again in a few moments",
                "Verify that the API URL is correct",
            ],
            Self::Unknown => [
                "Check your configuration with `omnipilot status`",
                "Try again in a few moments",
                "Run with RUST_LOG=debug and inspect omnipilot.log",
            ],
        }
    }
}

fn contains_any(message: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| message.contains(needle))
}

pub fn format_error_guidance(message: &str) -> String {
    render(ErrorCategory::classify(message), message)
}

pub fn format_provider_error(error: &OmniAiError) -> String {
    match error.code {
        OmniAiErrorCode::Timeout | OmniAiErrorCode::ProviderTransport => {
            render(ErrorCategory::from_error(error), &error.message)
        }
        _ => format_error_guidance(&error.message),
    }
}

fn render(category: ErrorCategory, message: &str) -> String {
    let mut out = String::from("**Error processing your request**\n\n");
    out.push_str(&format!("### {}\n\n", category.heading()));
    out.push_str(category.explanation());
    out.push_str("\n\n**Solutions:**\n");
    for solution in category.solutions() {
        out.push_str(&format!("- {solution}\n"));
    }
    out.push_str(&format!("\n**Technical error:** {message}"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_follows_rule_order() {
        assert_eq!(
            ErrorCategory::classify("[404] model_not_found: no such model (401)"),
            ErrorCategory::ModelNotFound
        );
        assert_eq!(
            ErrorCategory::classify("[401] invalid_request_error: Invalid API key"),
            ErrorCategory::InvalidApiKey
        );
        assert_eq!(
            ErrorCategory::classify("[429] Rate limit exceeded"),
            ErrorCategory::RateLimited
        );
        assert_eq!(
            ErrorCategory::classify("[402] insufficient credits"),
            ErrorCategory::InsufficientFunds
        );
        assert_eq!(
            ErrorCategory::classify("Stream timed out after 5.0s without data"),
            ErrorCategory::Timeout
        );
        assert_eq!(
            ErrorCategory::classify("connection reset by peer"),
            ErrorCategory::Connection
        );
        assert_eq!(ErrorCategory::classify("boom"), ErrorCategory::Unknown);
    }

    #[test]
    fn classification_is_case_sensitive() {
        assert_eq!(ErrorCategory::classify("RATE LIMIT"), ErrorCategory::Unknown);
    }

    #[test]
    fn transport_errors_are_connection_errors() {
        let error = OmniAiError::new(
            OmniAiErrorCode::ProviderTransport,
            "Network request to http://127.0.0.1:1/v1/chat/completions failed: refused",
        );
        assert_eq!(ErrorCategory::from_error(&error), ErrorCategory::Connection);
    }

    #[test]
    fn guidance_ends_with_technical_error_line() {
        let rendered = format_error_guidance("[401] invalid_request_error: Invalid API key");
        assert!(rendered.contains("### Invalid API key"));
        assert!(rendered.contains("- Make sure the key hasn't expired"));
        assert!(rendered
            .ends_with("**Technical error:** [401] invalid_request_error: Invalid API key"));
    }

    #[test]
    fn provider_errors_use_code_or_message() {
        let http = OmniAiError::new(OmniAiErrorCode::ProviderHttp, "[429] Rate limit exceeded");
        assert_eq!(
            format_provider_error(&http),
            format_error_guidance("[429] Rate limit exceeded")
        );

        let transport = OmniAiError::new(OmniAiErrorCode::ProviderTransport, "refused");
        assert!(format_provider_error(&transport).contains("### Connection error"));
    }
}
