use omnipilot_ai::detect_provider;

use crate::config::{OmniPilotToml, ProviderEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessStatus {
    Ready,
    NoConfigurations,
    NoApiKeys,
    NoActiveConfiguration,
    ActiveMissingApiKey,
}

impl ReadinessStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::NoConfigurations => "No configurations found",
            Self::NoApiKeys => "No API keys configured",
            Self::NoActiveConfiguration => "No active configuration selected",
            Self::ActiveMissingApiKey => "Active configuration missing API key",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusReport {
    pub total_configs: usize,
    pub configs_with_keys: usize,
    pub active: Option<ProviderEntry>,
    pub active_has_key: bool,
    pub status: ReadinessStatus,
}

impl StatusReport {
    pub fn collect(config: &OmniPilotToml, explicit: Option<&str>) -> Self {
        let total_configs = config.providers.len();
        let configs_with_keys = config
            .providers
            .iter()
            .filter(|entry| entry.has_api_key())
            .count();
        let active = config.active_provider(explicit).ok().flatten().cloned();
        let active_has_key = active.as_ref().is_some_and(ProviderEntry::has_api_key);

        let status = if total_configs == 0 {
            ReadinessStatus::NoConfigurations
        } else if configs_with_keys == 0 {
            ReadinessStatus::NoApiKeys
        } else if active.is_none() {
            ReadinessStatus::NoActiveConfiguration
        } else if !active_has_key {
            ReadinessStatus::ActiveMissingApiKey
        } else {
            ReadinessStatus::Ready
        };

        Self {
            total_configs,
            configs_with_keys,
            active,
            active_has_key,
            status,
        }
    }

    pub fn description(&self) -> String {
        match (self.status, self.active.as_ref()) {
            (ReadinessStatus::NoConfigurations, _) => {
                "No provider configurations found. Run `omnipilot config init` to add one."
                    .to_string()
            }
            (ReadinessStatus::NoApiKeys, _) => format!(
                "{} configuration(s) found, but no API keys are set. Add api_key or api_key_env to omnipilot.toml.",
                self.total_configs
            ),
            (ReadinessStatus::ActiveMissingApiKey, Some(active)) => format!(
                "Active configuration \"{}\" is missing an API key. Update it in omnipilot.toml.",
                active.name
            ),
            (ReadinessStatus::Ready, Some(active)) => format!(
                "Using \"{}\" with model \"{}\" via {}",
                active.name,
                active.model,
                detect_provider(&active.api_url).display_name
            ),
            _ => format!(
                "{} valid configuration(s) available, but none is active. Set `active` in omnipilot.toml.",
                self.configs_with_keys
            ),
        }
    }
}
