//! GitHub Copilot token exchange.
//!
//! A long-lived GitHub access token is exchanged for a short-lived Copilot
//! bearer token. The bearer token is cached per manager and reused until
//! `expires_at - buffer`, after which the next request performs a new
//! exchange and replaces the cached value wholesale.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{OmniAiError, OmniAiErrorCode};
use crate::providers::common::{mask_token, now_millis, shared_http_client};
use crate::types::TokenValidation;

pub const COPILOT_CHAT_BASE_URL: &str = "https://api.githubcopilot.com";
pub const COPILOT_TOKEN_URL: &str = "https://api.github.com/copilot_internal/v2/token";
pub const COPILOT_INTEGRATION_ID: &str = "vscode-chat";
pub const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Endpoints and client identity used for Copilot requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopilotEndpoints {
    pub chat_base_url: String,
    pub token_url: String,
    pub user_agent: String,
}

impl Default for CopilotEndpoints {
    fn default() -> Self {
        Self {
            chat_base_url: COPILOT_CHAT_BASE_URL.to_string(),
            token_url: COPILOT_TOKEN_URL.to_string(),
            user_agent: format!("OmniPilot/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub token: String,
    /// Epoch milliseconds after which the token must not be used; already
    /// reduced by the expiry buffer.
    pub expires_at_ms: i64,
}

impl CachedToken {
    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        now_ms < self.expires_at_ms
    }
}

#[derive(Debug, Deserialize)]
struct CopilotTokenResponse {
    token: String,
    expires_at: i64,
    #[serde(default)]
    #[allow(dead_code)]
    refresh_token: Option<String>,
}

pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

pub struct CopilotTokenManager {
    access_token: String,
    endpoints: CopilotEndpoints,
    buffer: Duration,
    clock: Clock,
    cache: Mutex<Option<CachedToken>>,
}

impl fmt::Debug for CopilotTokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CopilotTokenManager")
            .field("access_token", &mask_token(&self.access_token))
            .field("token_url", &self.endpoints.token_url)
            .field("buffer", &self.buffer)
            .finish_non_exhaustive()
    }
}

impl CopilotTokenManager {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_endpoints(access_token, CopilotEndpoints::default())
    }

    pub fn with_endpoints(access_token: impl Into<String>, endpoints: CopilotEndpoints) -> Self {
        Self {
            access_token: access_token.into(),
            endpoints,
            buffer: TOKEN_EXPIRY_BUFFER,
            clock: Arc::new(now_millis),
            cache: Mutex::new(None),
        }
    }

    /// Replaces the wall clock, in epoch milliseconds.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn endpoints(&self) -> &CopilotEndpoints {
        &self.endpoints
    }

    /// Returns a valid bearer token, exchanging the access token only when the
    /// cache is empty or expired. The cache lock is held across the exchange
    /// so concurrent callers share a single refresh.
    pub async fn get_token(&self) -> Result<String, OmniAiError> {
        if self.access_token.trim().is_empty() {
            return Err(OmniAiError::new(
                OmniAiErrorCode::ProviderAuthMissing,
                "GitHub Copilot access token is required",
            ));
        }

        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.is_valid_at((self.clock)()) {
                debug!("reusing cached Copilot token");
                return Ok(cached.token.clone());
            }
        }

        let fresh = self.exchange().await?;
        let token = fresh.token.clone();
        *cache = Some(fresh);
        Ok(token)
    }

    /// Health check for the configured access token. Never fails.
    pub async fn validate_token(&self) -> TokenValidation {
        match self.get_token().await {
            Ok(_) => TokenValidation::valid(),
            Err(error) => TokenValidation::invalid(error.message),
        }
    }

    pub async fn cached_token(&self) -> Option<CachedToken> {
        self.cache.lock().await.clone()
    }

    async fn exchange(&self) -> Result<CachedToken, OmniAiError> {
        let token_url = self.endpoints.token_url.as_str();
        debug!(
            token_preview = %mask_token(&self.access_token),
            "exchanging access token for Copilot token"
        );

        let response = shared_http_client(token_url)
            .get(token_url)
            .header(AUTHORIZATION, format!("token {}", self.access_token))
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, self.endpoints.user_agent.as_str())
            .send()
            .await
            .map_err(|error| {
                OmniAiError::new(
                    OmniAiErrorCode::TokenExchange,
                    format!("Copilot token request failed: {error}"),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let status = status.as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = token_error_message(status, &body);
            warn!(status, message = %message, "Copilot token exchange rejected");
            return Err(
                OmniAiError::new(OmniAiErrorCode::TokenExchange, message)
                    .with_details(json!({ "status": status })),
            );
        }

        let payload: CopilotTokenResponse = response.json().await.map_err(|error| {
            OmniAiError::new(
                OmniAiErrorCode::TokenExchange,
                format!("Invalid Copilot token response: {error}"),
            )
        })?;

        let buffer_ms = i64::try_from(self.buffer.as_millis()).unwrap_or(i64::MAX);
        let cached = CachedToken {
            expires_at_ms: payload.expires_at.saturating_mul(1000).saturating_sub(buffer_ms),
            token: payload.token,
        };
        info!(
            expires_at_ms = cached.expires_at_ms,
            token_preview = %mask_token(&cached.token),
            "Copilot token obtained"
        );
        Ok(cached)
    }
}

fn token_error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(Value::as_str)
                .filter(|message| !message.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("Failed to get Copilot token: {status}"))
}
