//! Known provider identities, detected from an API URL or a name.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub display_name: &'static str,
    pub color: &'static str,
    pub hostnames: &'static [&'static str],
}

pub const CUSTOM_PROVIDER: ProviderInfo = ProviderInfo {
    id: "unknown",
    name: "Unknown",
    display_name: "Custom Provider",
    color: "#6B7280",
    hostnames: &[],
};

pub const PROVIDERS: &[ProviderInfo] = &[
    ProviderInfo {
        id: "openai",
        name: "OpenAI",
        display_name: "OpenAI",
        color: "#10A37F",
        hostnames: &["api.openai.com", "openai.com"],
    },
    ProviderInfo {
        id: "anthropic",
        name: "Anthropic",
        display_name: "Anthropic",
        color: "#D97706",
        hostnames: &["api.anthropic.com", "anthropic.com"],
    },
    ProviderInfo {
        id: "google",
        name: "Google",
        display_name: "Google Gemini",
        color: "#4285F4",
        hostnames: &["generativelanguage.googleapis.com", "google.com", "ai.google"],
    },
    ProviderInfo {
        id: "openrouter",
        name: "OpenRouter",
        display_name: "OpenRouter",
        color: "#8B5CF6",
        hostnames: &["openrouter.ai"],
    },
    ProviderInfo {
        id: "copilot",
        name: "GitHub Copilot",
        display_name: "GitHub Copilot",
        color: "#24292F",
        hostnames: &["githubcopilot.com", "api.github.com"],
    },
    ProviderInfo {
        id: "mistral",
        name: "Mistral AI",
        display_name: "Mistral AI",
        color: "#FF6B6B",
        hostnames: &["api.mistral.ai", "mistral.ai"],
    },
    ProviderInfo {
        id: "cohere",
        name: "Cohere",
        display_name: "Cohere",
        color: "#39C5BB",
        hostnames: &["api.cohere.ai", "cohere.ai"],
    },
    ProviderInfo {
        id: "deepseek",
        name: "DeepSeek",
        display_name: "DeepSeek",
        color: "#1E293B",
        hostnames: &["api.deepseek.com", "deepseek.com"],
    },
    ProviderInfo {
        id: "xai",
        name: "xAI",
        display_name: "xAI (Grok)",
        color: "#000000",
        hostnames: &["api.x.ai", "x.ai"],
    },
    ProviderInfo {
        id: "meta",
        name: "Meta",
        display_name: "Meta Llama",
        color: "#1877F2",
        hostnames: &["meta.ai", "llama.meta.com"],
    },
    ProviderInfo {
        id: "nvidia",
        name: "NVIDIA",
        display_name: "NVIDIA",
        color: "#76B900",
        hostnames: &["api.nvidia.com", "nvidia.com"],
    },
    ProviderInfo {
        id: "nous",
        name: "Nous Research",
        display_name: "Nous Research",
        color: "#EF4444",
        hostnames: &["inference-api.nousresearch.com", "nousresearch.com"],
    },
    ProviderInfo {
        id: "asi1",
        name: "ASI:ONE",
        display_name: "ASI:ONE",
        color: "#10B981",
        hostnames: &["api.asi1.ai", "asi1.ai"],
    },
    ProviderInfo {
        id: "aionlabs",
        name: "AionLabs",
        display_name: "AionLabs",
        color: "#8B5A3C",
        hostnames: &["api.aionlabs.ai", "aionlabs.ai"],
    },
    ProviderInfo {
        id: "alibaba",
        name: "Alibaba",
        display_name: "Alibaba Qwen",
        color: "#FF6A00",
        hostnames: &["dashscope.aliyuncs.com", "qwen.alibaba.com", "alibaba.com"],
    },
];

/// Hostname match first, then a name/id substring match, else
/// [`CUSTOM_PROVIDER`].
pub fn detect_provider(input: &str) -> &'static ProviderInfo {
    if input.trim().is_empty() {
        return &CUSTOM_PROVIDER;
    }

    let hostname = extract_hostname(input);
    if let Some(provider) = PROVIDERS.iter().find(|provider| {
        provider
            .hostnames
            .iter()
            .any(|host| hostname.contains(&host.to_ascii_lowercase()))
    }) {
        return provider;
    }

    let lower = input.to_lowercase();
    PROVIDERS
        .iter()
        .find(|provider| {
            lower.contains(&provider.name.to_lowercase()) || lower.contains(provider.id)
        })
        .unwrap_or(&CUSTOM_PROVIDER)
}

fn extract_hostname(input: &str) -> String {
    if input.starts_with("http://") || input.starts_with("https://") {
        if let Some(host) = reqwest::Url::parse(input)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
        {
            return host.to_ascii_lowercase();
        }
    }
    input.to_lowercase()
}
