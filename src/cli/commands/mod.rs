pub mod backup;
pub mod config;
pub mod dashboard;
pub mod ledger;
pub mod member;
pub mod payment;
pub mod system;

use std::collections::HashMap;

use chrono::NaiveDate;

use dues_domain::MonthKey;

use crate::cli::core::CommandError;
use crate::cli::registry::{CommandEntry, CommandRegistry};

const ROOT_COMMAND_ORDER: &[&str] = &[
    "member",
    "pay",
    "toggle",
    "ledger",
    "history",
    "dashboard",
    "report",
    "stats",
    "backup",
    "backups",
    "restore",
    "export",
    "import",
    "reset",
    "config",
    "help",
    "version",
    "exit",
];

pub(crate) fn all_entries() -> Vec<CommandEntry> {
    let mut commands = Vec::new();
    commands.extend(member::definitions());
    commands.extend(payment::definitions());
    commands.extend(ledger::definitions());
    commands.extend(dashboard::definitions());
    commands.extend(backup::definitions());
    commands.extend(config::definitions());
    commands.extend(system::definitions());
    commands
}

pub(crate) fn register_all(registry: &mut CommandRegistry) {
    let mut entries = all_entries();
    entries.sort_by_key(|entry| {
        ROOT_COMMAND_ORDER
            .iter()
            .position(|name| entry.name.eq_ignore_ascii_case(name))
            .unwrap_or(ROOT_COMMAND_ORDER.len())
    });
    for entry in entries {
        registry.register(entry);
    }
}

/// Positional arguments plus `--flag value` options and bare `--switch`es.
#[derive(Debug, Default)]
pub(crate) struct ParsedArgs<'a> {
    pub positional: Vec<&'a str>,
    options: HashMap<String, &'a str>,
    switches: Vec<String>,
}

impl<'a> ParsedArgs<'a> {
    /// Splits `args`; flags listed in `value_flags` consume the following token.
    pub fn parse(args: &[&'a str], value_flags: &[&str]) -> Result<Self, CommandError> {
        let mut parsed = ParsedArgs::default();
        let mut iter = args.iter().copied();
        while let Some(arg) = iter.next() {
            let Some(flag) = arg.strip_prefix("--") else {
                parsed.positional.push(arg);
                continue;
            };
            let flag = flag.to_ascii_lowercase();
            if value_flags.contains(&flag.as_str()) {
                let value = iter.next().ok_or_else(|| {
                    CommandError::InvalidArguments(format!("`--{}` needs a value", flag))
                })?;
                parsed.options.insert(flag, value);
            } else {
                parsed.switches.push(flag);
            }
        }
        Ok(parsed)
    }

    pub fn option(&self, name: &str) -> Option<&'a str> {
        self.options.get(name).copied()
    }

    pub fn switch(&self, name: &str) -> bool {
        self.switches.iter().any(|flag| flag == name)
    }

    pub fn positional(&self, index: usize) -> Option<&'a str> {
        self.positional.get(index).copied()
    }
}

pub(crate) fn parse_month(value: &str) -> Result<MonthKey, CommandError> {
    value
        .parse::<MonthKey>()
        .map_err(|err| CommandError::InvalidArguments(err.to_string()))
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, CommandError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        CommandError::InvalidArguments(format!("invalid date `{}` (use YYYY-MM-DD)", value))
    })
}

/// Parses a money amount, tolerating a leading currency symbol and thousands separators.
pub(crate) fn parse_amount(value: &str) -> Result<f64, CommandError> {
    let cleaned: String = value
        .trim()
        .trim_start_matches(|c: char| !c.is_ascii_digit() && c != '-' && c != '.')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    match cleaned.parse::<f64>() {
        Ok(amount) if amount.is_finite() => Ok(amount),
        _ => Err(CommandError::InvalidArguments(format!(
            "invalid amount `{}`",
            value
        ))),
    }
}

pub(crate) fn parse_bool(value: &str) -> Result<bool, CommandError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(CommandError::InvalidArguments(format!(
            "expected true or false, got `{}`",
            other
        ))),
    }
}

/// First eight characters of an id, enough to reference it in later commands.
pub(crate) fn short_id(id: &uuid::Uuid) -> String {
    id.to_string().chars().take(8).collect()
}
