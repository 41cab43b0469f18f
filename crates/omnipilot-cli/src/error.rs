use std::io;
use std::path::PathBuf;

use omnipilot_ai::OmniAiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("read {path} failed: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parse {path} failed: {source}")]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("write {path} failed: {source}")]
    WriteConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no provider named \"{0}\" in configuration")]
    UnknownProvider(String),

    #[error("no provider configured; run `omnipilot config init` and add an API key")]
    NoProvider,

    #[error("read stdin failed: {0}")]
    Stdin(#[source] io::Error),

    #[error("{0}")]
    Provider(#[from] OmniAiError),

    #[error("{0}")]
    Failed(String),
}
