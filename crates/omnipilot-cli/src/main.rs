use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use omnipilot_cli::CliError;
use omnipilot_cli::commands::{self, AskOptions};
use omnipilot_cli::config::OmniPilotToml;
use omnipilot_cli::guidance::format_provider_error;
use omnipilot_cli::home::resolve_conf_dir;
use omnipilot_cli::logging::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "omnipilot", version, about = "Streaming chat across LLM providers")]
struct Cli {
    #[arg(long, global = true)]
    conf_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: RootCommand,
}

#[derive(Subcommand, Debug, Clone)]
enum RootCommand {
    /// Send a one-shot query and stream the answer.
    Ask(AskArgs),
    /// List models offered by a provider.
    Models(ProviderArgs),
    /// Check a provider configuration.
    Validate(ProviderArgs),
    /// Summarize the configured providers.
    Status(ProviderArgs),
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
struct AskArgs {
    /// Query text; read from stdin when omitted.
    query: Vec<String>,
    #[arg(long)]
    system: Option<String>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    provider: Option<String>,
}

#[derive(Args, Debug, Clone)]
struct ProviderArgs {
    #[arg(long)]
    provider: Option<String>,
}

#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
enum ConfigSubcommand {
    /// Write a starter omnipilot.toml without overwriting an existing one.
    Init,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let conf_dir = resolve_conf_dir(cli.conf_dir.as_deref());
    if let Ok(config) = OmniPilotToml::load(&conf_dir) {
        init_tracing(&conf_dir, &config);
    }

    let result = match cli.command {
        RootCommand::Ask(args) => {
            commands::run_ask(
                &conf_dir,
                AskOptions {
                    query: args.query,
                    system: args.system,
                    model: args.model,
                    provider: args.provider,
                },
            )
            .await
        }
        RootCommand::Models(args) => commands::run_models(&conf_dir, args.provider).await,
        RootCommand::Validate(args) => commands::run_validate(&conf_dir, args.provider).await,
        RootCommand::Status(args) => commands::run_status(&conf_dir, args.provider),
        RootCommand::Config(args) => match args.command {
            ConfigSubcommand::Init => commands::run_config_init(&conf_dir),
        },
    };

    if let Err(error) = result {
        match error {
            CliError::Provider(error) => eprintln!("{}", format_provider_error(&error)),
            other => eprintln!("error: {other}"),
        }
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_accepts_ask_with_flags() {
        let parsed = Cli::try_parse_from([
            "omnipilot",
            "ask",
            "--provider",
            "OpenAI",
            "--model",
            "gpt-4o",
            "what",
            "is",
            "rust",
        ])
        .expect("ask should parse");
        match parsed.command {
            RootCommand::Ask(args) => {
                assert_eq!(args.query, vec!["what", "is", "rust"]);
                assert_eq!(args.provider.as_deref(), Some("OpenAI"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn cli_accepts_conf_dir_global_flag() {
        let parsed = Cli::try_parse_from(["omnipilot", "status", "--conf-dir", "/tmp/omni"]);
        assert!(parsed.is_ok(), "--conf-dir should be accepted after the subcommand");
    }

    #[test]
    fn cli_accepts_config_init() {
        let parsed = Cli::try_parse_from(["omnipilot", "config", "init"]);
        assert!(parsed.is_ok(), "config init should be accepted");
    }

    #[test]
    fn cli_requires_a_subcommand() {
        assert!(Cli::try_parse_from(["omnipilot"]).is_err());
    }
}
