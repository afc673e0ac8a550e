//! Core CLI dispatch, error reporting and shell context helpers.

use std::{
    env, io,
    path::PathBuf,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use chrono::{DateTime, NaiveDate, Utc};
use dialoguer::theme::ColorfulTheme;
use thiserror::Error;
use uuid::Uuid;

use dues_config::{Config, ConfigManager, DATA_ROOT_ENV};
use dues_core::{Clock, CoreError, MemberService};
use dues_domain::{Member, Payment};
use dues_storage_json::{JsonDuesStorage, StoragePaths};

pub use crate::errors::CliError;
use crate::errors::DuesError;

use super::commands;
use super::io as cli_io;
use super::output::{self, OutputPreferences};
use super::registry::{CommandEntry, CommandRegistry};
use super::system_clock::SystemClock;
pub use crate::cli::shell_context::{CliMode, ShellContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub type CommandResult = Result<(), CommandError>;

impl ShellContext {
    /// Opens the shell against `$DUES_TRACKER_HOME` or `~/.dues_tracker`.
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        let base = Config::default().resolve_data_root();
        Self::open(mode, base, Arc::new(SystemClock))
    }

    /// Opens the shell with configuration stored under `base`.
    pub fn open(mode: CliMode, base: PathBuf, clock: Arc<dyn Clock>) -> Result<Self, CliError> {
        let mut registry = CommandRegistry::new();
        commands::register_all(&mut registry);

        let config_manager = ConfigManager::with_base_dir(base.clone())?;
        let config = config_manager.load()?;
        output::set_preferences(OutputPreferences {
            color_enabled: config.ui_color_enabled && mode == CliMode::Interactive,
        });

        let data_root = match env::var_os(DATA_ROOT_ENV).filter(|value| !value.is_empty()) {
            Some(root) => PathBuf::from(root),
            None => config.data_root.clone().unwrap_or_else(|| base.clone()),
        };
        let storage = JsonDuesStorage::with_retention(
            StoragePaths::under(&data_root),
            config.backup_retention,
        )?;
        tracing::debug!(root = %data_root.display(), ?mode, "shell context ready");

        Ok(ShellContext {
            mode,
            registry,
            storage: Arc::new(storage),
            clock,
            theme: ColorfulTheme::default(),
            config_manager,
            config: Arc::new(RwLock::new(config)),
            data_root,
            last_command: None,
            running: true,
        })
    }

    pub(crate) fn mode(&self) -> CliMode {
        self.mode
    }

    pub(crate) fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn store(&self) -> &JsonDuesStorage {
        &self.storage
    }

    pub(crate) fn config_read(&self) -> RwLockReadGuard<'_, Config> {
        self.config.read().expect("Config lock poisoned")
    }

    pub(crate) fn config_write(&self) -> RwLockWriteGuard<'_, Config> {
        self.config.write().expect("Config lock poisoned")
    }

    pub(crate) fn persist_config(&self) -> CommandResult {
        let config = self.config_read();
        self.config_manager.save(&config).map_err(CommandError::from)
    }

    /// Formats an amount with the configured currency symbol.
    pub(crate) fn money(&self, amount: f64) -> String {
        self.config_read().format_amount(amount)
    }

    pub(crate) fn prompt(&self) -> String {
        "dues> ".to_string()
    }

    pub(crate) fn command(&self, name: &str) -> Option<&CommandEntry> {
        self.registry.get(name)
    }

    pub(crate) fn command_names(&self) -> Vec<&'static str> {
        self.registry.names().collect()
    }

    /// Asks before destructive work. Scripts run unattended and always proceed.
    pub(crate) fn confirm(&self, prompt: &str) -> Result<bool, CommandError> {
        match self.mode {
            CliMode::Script => Ok(true),
            CliMode::Interactive => cli_io::confirm_action(&self.theme, prompt, false),
        }
    }

    pub(crate) fn resolve_member(&self, token: &str) -> Result<Member, CommandError> {
        MemberService::resolve(self.store(), token).map_err(CommandError::from)
    }

    /// Finds a payment by full id or unique id prefix.
    pub(crate) fn resolve_payment(&self, token: &str) -> Result<Payment, CommandError> {
        let token = token.trim().to_lowercase();
        let payments = dues_core::DuesStorage::list_payments(self.store(), None)?;
        if let Ok(id) = Uuid::parse_str(&token) {
            return payments
                .into_iter()
                .find(|payment| payment.id == id)
                .ok_or_else(|| CoreError::PaymentNotFound(id).into());
        }
        let mut matches: Vec<_> = payments
            .into_iter()
            .filter(|payment| payment.id.to_string().starts_with(&token))
            .collect();
        match matches.len() {
            0 => Err(CommandError::InvalidArguments(format!(
                "No payment id starts with `{}`",
                token
            ))),
            1 => Ok(matches.remove(0)),
            n => Err(CommandError::InvalidArguments(format!(
                "`{}` matches {} payments; use more of the id",
                token, n
            ))),
        }
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        if let Some(handler) = self.registry.handler(command) {
            match handler(self, args) {
                Ok(()) => Ok(LoopControl::Continue),
                Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
                Err(err) => Err(err),
            }
        } else {
            self.suggest_command(raw);
            Ok(LoopControl::Continue)
        }
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        cli_io::print_warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));
        if let Some(best) = self.registry.closest(input, 3) {
            cli_io::print_info(format!("Suggestion: `{}`?", best));
        }
    }

    pub(crate) fn confirm_exit(&self) -> Result<bool, CliError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        cli_io::confirm_action(&self.theme, "Exit shell?", true).map_err(CliError::from)
    }

    pub(crate) fn report_error(&self, err: CommandError) -> Result<(), CliError> {
        match err {
            CommandError::ExitRequested => Ok(()),
            CommandError::InvalidArguments(message) => {
                cli_io::print_error(&message);
                cli_io::print_hint("Use `help <command>` for usage details.");
                Ok(())
            }
            CommandError::Core(DuesError::Core(CoreError::NotRevertible(period))) => {
                cli_io::print_error(CoreError::NotRevertible(period));
                cli_io::print_hint(
                    "Run `history <member>` and remove the originating payment with `pay delete <id>`.",
                );
                Ok(())
            }
            other => {
                cli_io::print_error(other);
                Ok(())
            }
        }
    }

    pub(crate) fn print_warning(&self, message: &str) {
        cli_io::print_warning(message);
    }

    #[cfg(test)]
    pub(crate) fn process_line(&mut self, line: &str) -> Result<LoopControl, CommandError> {
        let tokens = match crate::cli::shell::parse_command_line(line) {
            Ok(tokens) => tokens,
            Err(err) => {
                self.print_warning(&err.to_string());
                return Ok(LoopControl::Continue);
            }
        };

        if tokens.is_empty() {
            return Ok(LoopControl::Continue);
        }

        let command = tokens[0].to_lowercase();
        let args: Vec<&str> = tokens.iter().skip(1).map(String::as_str).collect();
        self.dispatch(&command, &tokens[0], &args)
    }
}

/// Errors surfaced by individual commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Core(#[from] DuesError),
    #[error(transparent)]
    Dialoguer(#[from] dialoguer::Error),
    #[error("exit requested")]
    ExitRequested,
}

impl CommandError {
    pub(crate) fn usage(usage: &str) -> Self {
        CommandError::InvalidArguments(format!("Usage: {}", usage))
    }
}

impl From<CoreError> for CommandError {
    fn from(err: CoreError) -> Self {
        CommandError::Core(DuesError::Core(err))
    }
}

impl From<dues_config::ConfigError> for CommandError {
    fn from(err: dues_config::ConfigError) -> Self {
        CommandError::Core(DuesError::Config(err))
    }
}

impl From<CliError> for CommandError {
    fn from(err: CliError) -> Self {
        match err {
            CliError::Core(inner) => CommandError::Core(inner),
            CliError::Input(message) | CliError::Command(message) => {
                CommandError::InvalidArguments(message)
            }
        }
    }
}

impl From<CommandError> for CliError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Core(inner) => CliError::Core(inner),
            other => CliError::Command(other.to_string()),
        }
    }
}

/// Runs `lines` in script mode against data stored under `root`.
#[cfg(test)]
pub(crate) fn process_script_at(
    root: &std::path::Path,
    clock: Arc<dyn Clock>,
    lines: &[&str],
) -> Result<ShellContext, CliError> {
    let mut app = ShellContext::open(CliMode::Script, root.to_path_buf(), clock)?;
    for line in lines {
        match app.process_line(line)? {
            LoopControl::Continue => {}
            LoopControl::Exit => break,
        }
    }
    Ok(app)
}
