use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde_json::{Value, json};
use tracing::debug;

use super::common::{
    apply_extra_headers, ensure_success, join_url, shared_http_client, transport_error,
};
use crate::credentials::{COPILOT_INTEGRATION_ID, CopilotTokenManager};
use crate::error::OmniAiError;
use crate::transport::{ResponseBody, decode_body};
use crate::types::{AssembledResponse, ChatOptions, Message};

const DEFAULT_MAX_TOKENS: u32 = 4000;
const DEFAULT_TEMPERATURE: f64 = 0.3;

pub(crate) async fn stream_copilot<F>(
    tokens: &CopilotTokenManager,
    model: &str,
    messages: &[Message],
    options: &ChatOptions,
    on_chunk: F,
) -> Result<AssembledResponse, OmniAiError>
where
    F: FnMut(&str) + Send,
{
    let bearer = tokens.get_token().await?;
    let endpoints = tokens.endpoints();
    let endpoint = join_url(&endpoints.chat_base_url, "chat/completions");
    let payload = build_copilot_payload(model, messages, options);
    debug!(endpoint = %endpoint, model, "sending Copilot chat completion request");

    let request = shared_http_client(&endpoints.chat_base_url)
        .post(endpoint.as_str())
        .header(AUTHORIZATION, format!("Bearer {bearer}"))
        .header(CONTENT_TYPE, "application/json")
        .header("Copilot-Integration-Id", COPILOT_INTEGRATION_ID)
        .header(USER_AGENT, endpoints.user_agent.as_str());
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

fn build_copilot_payload(model: &str, messages: &[Message], options: &ChatOptions) -> Value {
    json!({
        "model": model,
        "messages": messages,
        "stream": true,
        "max_tokens": options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        "temperature": options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
    })
}
