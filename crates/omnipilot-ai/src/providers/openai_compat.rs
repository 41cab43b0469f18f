use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::{Value, json};
use tracing::debug;

use super::common::{
    apply_extra_headers, ensure_success, join_url, shared_http_client, transport_error,
};
use crate::error::OmniAiError;
use crate::transport::{ResponseBody, decode_body};
use crate::types::{AssembledResponse, ChatOptions, Message, ProviderConfig};

pub(crate) async fn stream_openai_compatible<F>(
    config: &ProviderConfig,
    messages: &[Message],
    options: &ChatOptions,
    on_chunk: F,
) -> Result<AssembledResponse, OmniAiError>
where
    F: FnMut(&str) + Send,
{
    let endpoint = join_url(&config.api_url, "chat/completions");
    let payload = build_payload(&config.model, messages, options);
    debug!(endpoint = %endpoint, model = %config.model, "sending chat completion request");

    let request = shared_http_client(&config.api_url)
        .post(endpoint.as_str())
        .header(AUTHORIZATION, format!("Bearer {}", config.api_key))
        .header(CONTENT_TYPE, "application/json");
    let response = apply_extra_headers(request, options)
        .json(&payload)
        .send()
        .await
        .map_err(|error| transport_error(&endpoint, error))?;
    let response = ensure_success(response).await?;

    decode_body(
        ResponseBody::from_response(response),
        options.idle_timeout,
        on_chunk,
    )
    .await
}

fn build_payload(model: &str, messages: &[Message], options: &ChatOptions) -> Value {
    let mut payload = json!({
        "model": model,
        "messages": messages,
        "stream": true,
    });
    if let Some(max_tokens) = options.max_tokens {
        payload["max_tokens"] = json!(max_tokens);
    }
    if let Some(temperature) = options.temperature {
        payload["temperature"] = json!(temperature);
    }
    payload
}
