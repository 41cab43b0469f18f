//! Terminal front end for `omnipilot-ai`.

pub mod commands;
pub mod config;
pub mod error;
pub mod guidance;
pub mod home;
pub mod logging;
pub mod status;

pub use error::CliError;
