//! Shared runtime state for CLI interactions and command execution.

use std::{
    path::PathBuf,
    sync::{Arc, RwLock},
};

use dialoguer::theme::ColorfulTheme;

use dues_config::{Config, ConfigManager};
use dues_core::Clock;
use dues_storage_json::JsonDuesStorage;

use super::registry::CommandRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

pub struct ShellContext {
    pub mode: CliMode,
    pub registry: CommandRegistry,
    pub storage: Arc<JsonDuesStorage>,
    pub clock: Arc<dyn Clock>,
    pub theme: ColorfulTheme,
    pub config_manager: ConfigManager,
    pub config: Arc<RwLock<Config>>,
    pub data_root: PathBuf,
    pub last_command: Option<String>,
    pub running: bool,
}
