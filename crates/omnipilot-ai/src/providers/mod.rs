use crate::types::ProviderConfig;

pub(crate) mod common;
pub(crate) mod copilot;
pub(crate) mod openai_compat;

const COPILOT_HOST_MARKERS: [&str; 2] = ["githubcopilot.com", "api.github.com"];
const COPILOT_CONFIG_NAME: &str = "GitHub Copilot";

/// Which request path and auth scheme a configuration uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFamily {
    GitHubCopilot,
    OpenAiCompatible,
}

impl ProviderFamily {
    pub fn detect(config: &ProviderConfig) -> Self {
        let api_url = config.api_url.to_ascii_lowercase();
        if config.name == COPILOT_CONFIG_NAME
            || COPILOT_HOST_MARKERS
                .iter()
                .any(|marker| api_url.contains(marker))
        {
            Self::GitHubCopilot
        } else {
            Self::OpenAiCompatible
        }
    }
}
