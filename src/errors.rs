use std::result::Result as StdResult;

use thiserror::Error;

use dues_config::ConfigError;
use dues_core::CoreError;

/// Failures raised below the CLI: accounting, storage and configuration.
#[derive(Debug, Error)]
pub enum DuesError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = StdResult<T, DuesError>;

impl From<std::io::Error> for DuesError {
    fn from(err: std::io::Error) -> Self {
        DuesError::Core(CoreError::Io(err))
    }
}

impl From<serde_json::Error> for DuesError {
    fn from(err: serde_json::Error) -> Self {
        DuesError::Core(CoreError::Serde(err.to_string()))
    }
}

/// User-facing CLI error wrapper.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] DuesError),
    #[error("Invalid input: {0}")]
    Input(String),
    #[error("Command failed: {0}")]
    Command(String),
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        CliError::Core(DuesError::Core(err))
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::Core(DuesError::Config(err))
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Command(err.to_string())
    }
}

impl From<rustyline::error::ReadlineError> for CliError {
    fn from(err: rustyline::error::ReadlineError) -> Self {
        CliError::Command(err.to_string())
    }
}

impl From<dialoguer::Error> for CliError {
    fn from(err: dialoguer::Error) -> Self {
        CliError::Input(err.to_string())
    }
}
