//! Routes chat, model-listing and validation calls to the right backend.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::callbacks::StreamCallbacks;
use crate::credentials::{CopilotEndpoints, CopilotTokenManager};
use crate::error::{OmniAiError, OmniAiErrorCode};
use crate::models::discover_models;
use crate::providers::ProviderFamily;
use crate::providers::copilot::stream_copilot;
use crate::providers::openai_compat::stream_openai_compatible;
use crate::types::{
    AssembledResponse, ChatOptions, Message, ModelListing, ProviderConfig, TokenValidation,
};

/// Two-message conversation used by one-shot commands.
pub fn ask_messages(system_prompt: &str, query: &str) -> Vec<Message> {
    vec![Message::system(system_prompt), Message::user(query)]
}

/// Entry point for every provider call.
///
/// Holds one [`CopilotTokenManager`] per Copilot access token so the bearer
/// token cache survives across calls without being shared between accounts.
#[derive(Default)]
pub struct Dispatcher {
    copilot_endpoints: CopilotEndpoints,
    copilot_accounts: Mutex<HashMap<String, Arc<CopilotTokenManager>>>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let accounts = self
            .copilot_accounts
            .lock()
            .map(|accounts| accounts.len())
            .unwrap_or_default();
        f.debug_struct("Dispatcher")
            .field("copilot_endpoints", &self.copilot_endpoints)
            .field("copilot_accounts", &accounts)
            .finish()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_copilot_endpoints(endpoints: CopilotEndpoints) -> Self {
        Self {
            copilot_endpoints: endpoints,
            copilot_accounts: Mutex::new(HashMap::new()),
        }
    }

    pub fn copilot_token_manager(&self, access_token: &str) -> Arc<CopilotTokenManager> {
        let mut accounts = self
            .copilot_accounts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(
            accounts
                .entry(access_token.to_string())
                .or_insert_with(|| {
                    Arc::new(CopilotTokenManager::with_endpoints(
                        access_token,
                        self.copilot_endpoints.clone(),
                    ))
                }),
        )
    }

    /// Streams a chat completion, reporting deltas through `callbacks`.
    ///
    /// On failure the error callback runs and the same error is returned.
    pub async fn stream_chat_completion(
        &self,
        config: &ProviderConfig,
        messages: &[Message],
        options: &ChatOptions,
        callbacks: StreamCallbacks,
    ) -> Result<AssembledResponse, OmniAiError> {
        let StreamCallbacks {
            mut on_chunk,
            on_complete,
            on_error,
        } = callbacks;
        let emit = |delta: &str| {
            if let Some(callback) = on_chunk.as_mut() {
                callback(delta);
            }
        };

        let family = ProviderFamily::detect(config);
        debug!(provider = %config.name, ?family, model = %config.model, "dispatching chat completion");
        let result = match family {
            ProviderFamily::GitHubCopilot => {
                let tokens = self.copilot_token_manager(&config.api_key);
                stream_copilot(&tokens, &config.model, messages, options, emit).await
            }
            ProviderFamily::OpenAiCompatible => {
                stream_openai_compatible(config, messages, options, emit).await
            }
        };

        match result {
            Ok(response) => {
                if let Some(callback) = on_complete {
                    callback(&response);
                }
                Ok(response)
            }
            Err(error) => {
                warn!(provider = %config.name, error = %error.as_compact_json(), "chat completion failed");
                if let Some(callback) = on_error {
                    callback(&error);
                }
                Err(error)
            }
        }
    }

    /// Sends `query` under `system_prompt`. Blank queries are rejected before
    /// any request is made.
    pub async fn ask(
        &self,
        config: &ProviderConfig,
        system_prompt: &str,
        query: &str,
        options: &ChatOptions,
        callbacks: StreamCallbacks,
    ) -> Result<AssembledResponse, OmniAiError> {
        if query.trim().is_empty() {
            let error = OmniAiError::new(OmniAiErrorCode::ProviderProtocol, "No query provided");
            if let Some(callback) = callbacks.on_error {
                callback(&error);
            }
            return Err(error);
        }
        let messages = ask_messages(system_prompt, query);
        self.stream_chat_completion(config, &messages, options, callbacks)
            .await
    }

    pub async fn list_models(&self, config: &ProviderConfig) -> ModelListing {
        discover_models(config).await
    }

    /// Configuration health check. Only Copilot configurations touch the
    /// network.
    pub async fn validate_config(&self, config: &ProviderConfig) -> TokenValidation {
        if config.api_key.trim().is_empty() {
            return TokenValidation::invalid("API key is required");
        }
        match ProviderFamily::detect(config) {
            ProviderFamily::GitHubCopilot => {
                self.copilot_token_manager(&config.api_key)
                    .validate_token()
                    .await
            }
            ProviderFamily::OpenAiCompatible => TokenValidation::valid(),
        }
    }
}
