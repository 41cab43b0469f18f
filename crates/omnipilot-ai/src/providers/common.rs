use std::sync::OnceLock;

use reqwest::{Client, RequestBuilder, Response};
use tracing::warn;

use crate::envelope::normalize_error_body;
use crate::error::{OmniAiError, OmniAiErrorCode};
use crate::types::ChatOptions;

pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    if base_url.ends_with('/') {
        format!("{base_url}{path}")
    } else {
        format!("{base_url}/{path}")
    }
}

pub(crate) fn shared_http_client(base_url: &str) -> &'static Client {
    static DEFAULT_CLIENT: OnceLock<Client> = OnceLock::new();
    static LOOPBACK_CLIENT: OnceLock<Client> = OnceLock::new();

    if is_loopback_base_url(base_url) {
        LOOPBACK_CLIENT.get_or_init(|| {
            Client::builder()
                .no_proxy()
                .build()
                .unwrap_or_else(|_| Client::new())
        })
    } else {
        DEFAULT_CLIENT.get_or_init(Client::new)
    }
}

pub(crate) fn is_loopback_base_url(base_url: &str) -> bool {
    let Ok(url) = reqwest::Url::parse(base_url) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    host.eq_ignore_ascii_case("localhost") || host == "127.0.0.1" || host == "[::1]"
}

pub(crate) fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or(0)
}

/// Short, log-safe preview of a credential.
pub(crate) fn mask_token(token: &str) -> String {
    let visible = token.chars().take(4).collect::<String>();
    if token.chars().count() <= 8 {
        return "****".to_string();
    }
    format!("{visible}****")
}

pub(crate) fn apply_extra_headers(
    mut request: RequestBuilder,
    options: &ChatOptions,
) -> RequestBuilder {
    if let Some(headers) = options.headers.as_ref() {
        for (name, value) in headers {
            request = request.header(name, value);
        }
    }
    request
}

pub(crate) fn transport_error(endpoint: &str, error: reqwest::Error) -> OmniAiError {
    OmniAiError::new(
        OmniAiErrorCode::ProviderTransport,
        format!("Network request to {endpoint} failed: {error}"),
    )
}

/// Passes 2xx responses through; otherwise reads the body and converts it to
/// a normalized HTTP error.
pub(crate) async fn ensure_success(response: Response) -> Result<Response, OmniAiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let status = status.as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = normalize_error_body(status, &body);
    warn!(status, message = %message, "provider returned an error status");
    Err(OmniAiError::http(status, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_handles_trailing_slash() {
        assert_eq!(
            join_url("https://openrouter.ai/api/v1", "models"),
            "https://openrouter.ai/api/v1/models"
        );
        assert_eq!(
            join_url("https://openrouter.ai/api/v1/", "chat/completions"),
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }

    #[test]
    fn loopback_urls_use_dedicated_client() {
        assert!(is_loopback_base_url("http://127.0.0.1:8080/v1"));
        assert!(is_loopback_base_url("http://localhost/v1"));
        assert!(!is_loopback_base_url("https://api.openai.com/v1"));
        assert!(!is_loopback_base_url("not a url"));

        let first = shared_http_client("https://api.openai.com/v1");
        let second = shared_http_client("https://openrouter.ai/api/v1");
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn mask_token_hides_most_of_the_secret() {
        assert_eq!(mask_token("ghu_abcdefghijkl"), "ghu_****");
        assert_eq!(mask_token("short"), "****");
    }
}
