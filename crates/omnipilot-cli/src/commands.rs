use std::io::{self, IsTerminal, Read, Write};
use std::path::Path;

use omnipilot_ai::{ChatOptions, Dispatcher, ProviderConfig, StreamCallbacks};
use tracing::info;

use crate::config::{OmniPilotToml, init_config};
use crate::error::CliError;
use crate::status::StatusReport;

#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    pub query: Vec<String>,
    pub system: Option<String>,
    pub model: Option<String>,
    pub provider: Option<String>,
}

fn resolve_provider(
    config: &OmniPilotToml,
    explicit: Option<&str>,
) -> Result<ProviderConfig, CliError> {
    config
        .active_provider(explicit)?
        .map(|entry| entry.to_provider_config())
        .ok_or(CliError::NoProvider)
}

fn read_query(args: &[String]) -> Result<String, CliError> {
    let joined = args.join(" ");
    if !joined.trim().is_empty() {
        return Ok(joined);
    }
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(String::new());
    }
    let mut query = String::new();
    stdin
        .lock()
        .read_to_string(&mut query)
        .map_err(CliError::Stdin)?;
    Ok(query.trim().to_string())
}

pub async fn run_ask(conf_dir: &Path, options: AskOptions) -> Result<(), CliError> {
    let config = OmniPilotToml::load(conf_dir)?;
    let mut provider = resolve_provider(&config, options.provider.as_deref())?;
    if let Some(model) = options.model.filter(|model| !model.trim().is_empty()) {
        provider.model = model;
    }
    let system_prompt = options
        .system
        .unwrap_or_else(|| config.system_prompt().to_string());
    let query = read_query(&options.query)?;
    let chat_options = ChatOptions {
        idle_timeout: config.idle_timeout(),
        ..ChatOptions::default()
    };
    info!(provider = %provider.name, model = %provider.model, "asking provider");

    let callbacks = StreamCallbacks::new().on_chunk(|delta| {
        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(delta.as_bytes());
        let _ = stdout.flush();
    });
    let response = Dispatcher::new()
        .ask(&provider, &system_prompt, &query, &chat_options, callbacks)
        .await?;

    if !response.full_text.ends_with('\n') {
        println!();
    }
    if let Some(usage) = response.usage {
        eprintln!(
            "usage: prompt={} completion={} total={}",
            usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
        );
    }
    Ok(())
}

pub async fn run_models(conf_dir: &Path, provider: Option<String>) -> Result<(), CliError> {
    let config = OmniPilotToml::load(conf_dir)?;
    let provider = resolve_provider(&config, provider.as_deref())?;
    let listing = Dispatcher::new().list_models(&provider).await;

    if !listing.is_available {
        return Err(CliError::Failed(listing.error_message.unwrap_or_else(|| {
            format!("model listing unavailable for {}", provider.name)
        })));
    }
    for model in &listing.models {
        println!("{}", model.id);
    }
    Ok(())
}

pub async fn run_validate(conf_dir: &Path, provider: Option<String>) -> Result<(), CliError> {
    let config = OmniPilotToml::load(conf_dir)?;
    let provider = resolve_provider(&config, provider.as_deref())?;
    let validation = Dispatcher::new().validate_config(&provider).await;

    if validation.valid {
        println!("valid: {}", provider.name);
        Ok(())
    } else {
        Err(CliError::Failed(format!(
            "{}: {}",
            provider.name,
            validation
                .error
                .unwrap_or_else(|| "validation failed".to_string())
        )))
    }
}

pub fn run_status(conf_dir: &Path, provider: Option<String>) -> Result<(), CliError> {
    let config = OmniPilotToml::load(conf_dir)?;
    let report = StatusReport::collect(&config, provider.as_deref());

    println!("conf_dir: {}", conf_dir.display());
    println!("configurations: {}", report.total_configs);
    println!("with api keys: {}", report.configs_with_keys);
    println!(
        "active: {}",
        report
            .active
            .as_ref()
            .map(|entry| entry.name.as_str())
            .unwrap_or("(none)")
    );
    println!("status: {}", report.status.as_str());
    println!("{}", report.description());
    Ok(())
}

pub fn run_config_init(conf_dir: &Path) -> Result<(), CliError> {
    let path = OmniPilotToml::config_path(conf_dir);
    if init_config(conf_dir)? {
        println!("created: {}", path.display());
    } else {
        println!("kept: {}", path.display());
    }
    Ok(())
}
