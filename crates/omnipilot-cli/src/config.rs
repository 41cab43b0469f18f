//! `omnipilot.toml` loading and active provider resolution.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use omnipilot_ai::ProviderConfig;
use serde::Deserialize;

use crate::error::CliError;
use crate::home::CONFIG_FILE_NAME;

pub const CONFIG_SAMPLE: &str = include_str!("../omnipilot.toml.sample");
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer concisely.";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OmniPilotToml {
    #[serde(default)]
    pub active: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub idle_timeout_ms: Option<u64>,
    #[serde(default)]
    pub log: LogSection,
    #[serde(default)]
    pub providers: Vec<ProviderEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogSection {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub stdout: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderEntry {
    pub name: String,
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_key_env: Option<String>,
    pub model: String,
    #[serde(default, rename = "default")]
    pub is_default: bool,
}

impl ProviderEntry {
    /// Literal `api_key`, else the value of `api_key_env`, else empty.
    pub fn resolved_api_key(&self) -> String {
        self.resolved_api_key_with(|name| std::env::var(name).ok())
    }

    fn resolved_api_key_with(&self, lookup: impl Fn(&str) -> Option<String>) -> String {
        if !self.api_key.trim().is_empty() {
            return self.api_key.clone();
        }
        self.api_key_env
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .and_then(lookup)
            .unwrap_or_default()
    }

    pub fn has_api_key(&self) -> bool {
        !self.resolved_api_key().is_empty()
    }

    pub fn to_provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            name: self.name.clone(),
            api_url: self.api_url.clone(),
            api_key: self.resolved_api_key(),
            model: self.model.clone(),
        }
    }
}

impl OmniPilotToml {
    pub fn config_path(conf_dir: &Path) -> PathBuf {
        conf_dir.join(CONFIG_FILE_NAME)
    }

    /// Reads `<conf_dir>/omnipilot.toml`. A missing file is an empty
    /// configuration.
    pub fn load(conf_dir: &Path) -> Result<Self, CliError> {
        let path = Self::config_path(conf_dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path).map_err(|source| CliError::ReadConfig {
            path: path.clone(),
            source,
        })?;
        Self::parse(&path, &content)
    }

    pub fn parse(path: &Path, content: &str) -> Result<Self, CliError> {
        toml::from_str(content).map_err(|source| CliError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolution order: `explicit` name, then `active`, then the first entry
    /// marked `default`, then the first entry. A stale `active` name falls
    /// through; an unknown `explicit` name is an error.
    pub fn active_provider(&self, explicit: Option<&str>) -> Result<Option<&ProviderEntry>, CliError> {
        if let Some(name) = explicit {
            return self
                .find_provider(name)
                .map(Some)
                .ok_or_else(|| CliError::UnknownProvider(name.to_string()));
        }

        if let Some(entry) = self.active.as_deref().and_then(|name| self.find_provider(name)) {
            return Ok(Some(entry));
        }

        Ok(self
            .providers
            .iter()
            .find(|entry| entry.is_default)
            .or_else(|| self.providers.first()))
    }

    pub fn find_provider(&self, name: &str) -> Option<&ProviderEntry> {
        self.providers.iter().find(|entry| entry.name == name)
    }

    pub fn system_prompt(&self) -> &str {
        self.system_prompt
            .as_deref()
            .filter(|prompt| !prompt.trim().is_empty())
            .unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_ms
            .filter(|millis| *millis > 0)
            .map(Duration::from_millis)
    }

    pub fn log_level(&self) -> String {
        self.log
            .level
            .clone()
            .filter(|level| !level.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
    }
}

/// Writes the sample configuration unless one already exists. Returns
/// whether a file was created.
pub fn init_config(conf_dir: &Path) -> Result<bool, CliError> {
    fs::create_dir_all(conf_dir).map_err(|source| CliError::WriteConfig {
        path: conf_dir.to_path_buf(),
        source,
    })?;

    let path = OmniPilotToml::config_path(conf_dir);
    if path.exists() {
        return Ok(false);
    }
    fs::write(&path, CONFIG_SAMPLE).map_err(|source| CliError::WriteConfig {
        path: path.clone(),
        source,
    })?;
    Ok(true)
}
