//! Model discovery against `{api_url}/models`.

use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{OmniAiError, OmniAiErrorCode};
use crate::providers::common::{
    ensure_success, join_url, now_millis, shared_http_client, transport_error,
};
use crate::types::{ModelInfo, ModelListing, ProviderConfig};

/// Accepted listing shapes, tried in this order.
#[derive(Debug, Clone, PartialEq)]
enum ModelEnvelope {
    Bare(Vec<Value>),
    Data(Vec<Value>),
    Models(Vec<Value>),
}

impl ModelEnvelope {
    fn parse(body: Value) -> Option<Self> {
        match body {
            Value::Array(entries) => Some(Self::Bare(entries)),
            Value::Object(mut object) => {
                if let Some(Value::Array(entries)) = object.remove("data") {
                    return Some(Self::Data(entries));
                }
                if let Some(Value::Array(entries)) = object.remove("models") {
                    return Some(Self::Models(entries));
                }
                None
            }
            _ => None,
        }
    }

    fn into_entries(self) -> Vec<Value> {
        match self {
            Self::Bare(entries) | Self::Data(entries) | Self::Models(entries) => entries,
        }
    }
}

/// Maps a listing body to models with non-blank ids, sorted by id.
pub fn normalize_model_listing(body: Value) -> Result<Vec<ModelInfo>, OmniAiError> {
    let entries = ModelEnvelope::parse(body)
        .ok_or_else(|| {
            OmniAiError::new(
                OmniAiErrorCode::ProviderProtocol,
                "Unexpected model listing format",
            )
        })?
        .into_entries();

    let mut models = entries
        .iter()
        .filter_map(model_from_entry)
        .collect::<Vec<_>>();
    models.sort_by(|left, right| left.id.cmp(&right.id));
    Ok(models)
}

fn model_from_entry(entry: &Value) -> Option<ModelInfo> {
    let non_blank = |key: &str| {
        entry
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.trim().is_empty())
    };
    let id = non_blank("id").or_else(|| non_blank("name"))?;

    Some(ModelInfo {
        id: id.to_string(),
        object: entry
            .get("object")
            .and_then(Value::as_str)
            .map(str::to_string),
        created: entry.get("created").and_then(Value::as_i64),
        owned_by: entry
            .get("owned_by")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Fetches the provider's model list. Failures are reported in the returned
/// listing rather than as an error.
pub async fn discover_models(config: &ProviderConfig) -> ModelListing {
    match fetch_models(config).await {
        Ok(models) => ModelListing {
            models,
            is_available: true,
            error_message: None,
            fetched_at: now_millis(),
        },
        Err(error) => {
            warn!(provider = %config.name, error = %error.message, "model discovery failed");
            ModelListing {
                models: Vec::new(),
                is_available: false,
                error_message: Some(error.message),
                fetched_at: now_millis(),
            }
        }
    }
}

async fn fetch_models(config: &ProviderConfig) -> Result<Vec<ModelInfo>, OmniAiError> {
    let endpoint = join_url(&config.api_url, "models");
    debug!(endpoint = %endpoint, "fetching model listing");

    let response = shared_http_client(&config.api_url)
        .get(endpoint.as_str())
        .header(AUTHORIZATION, format!("Bearer {}", config.api_key))
        .send()
        .await
        .map_err(|error| transport_error(&endpoint, error))?;
    let response = ensure_success(response).await?;

    let body: Value = response.json().await.map_err(|error| {
        OmniAiError::new(
            OmniAiErrorCode::ProviderProtocol,
            format!("Invalid model listing: {error}"),
        )
    })?;
    normalize_model_listing(body)
}
