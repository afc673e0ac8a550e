use dues_config::Config;

use crate::cli::core::{CliMode, CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::{self, section as output_section, two_column, OutputPreferences};
use crate::cli::registry::CommandEntry;

const CONFIG_USAGE: &str =
    "config [show|get <key>|set <key> <value>|backup [note]|backups|restore <name>]";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "config",
        "View and manage preferences",
        CONFIG_USAGE,
        cmd_config,
    )]
}

fn cmd_config(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if args.is_empty() || args[0].eq_ignore_ascii_case("show") {
        return show_config(context);
    }

    match args[0].to_lowercase().as_str() {
        "get" => {
            let [_, key] = args else {
                return Err(CommandError::usage("config get <key>"));
            };
            let value = context.config_read().get(&key.to_lowercase())?;
            io::print_info(format!("{} = {}", key, value));
            Ok(())
        }
        "set" => {
            if args.len() < 3 {
                return Err(CommandError::InvalidArguments(format!(
                    "usage: config set <{}> <value>",
                    Config::KEYS.join("|")
                )));
            }
            let key = args[1].to_lowercase();
            let value = args[2..].join(" ");
            set_config_value(context, &key, value.trim())
        }
        "backup" => {
            let note = (args.len() > 1).then(|| args[1..].join(" "));
            let name = {
                let config = context.config_read();
                context.config_manager.backup(&config, note.as_deref())?
            };
            io::print_success(format!("Configuration backed up as {}.", name));
            Ok(())
        }
        "backups" => {
            let backups = context.config_manager.list_backups()?;
            if backups.is_empty() {
                io::print_info("No configuration backups yet.");
            }
            for (index, name) in backups.iter().enumerate() {
                io::print_info(format!("  {:>2}. {}", index + 1, name));
            }
            Ok(())
        }
        "restore" => {
            let [_, reference] = args else {
                return Err(CommandError::usage("config restore <name|index>"));
            };
            restore_config(context, reference)
        }
        other => Err(CommandError::InvalidArguments(format!(
            "unknown config subcommand `{}`",
            other
        ))),
    }
}

fn show_config(context: &ShellContext) -> CommandResult {
    let config = context.config_read();
    output_section("Configuration");
    let mut rows = Vec::with_capacity(Config::KEYS.len());
    for key in Config::KEYS {
        rows.push((key, config.get(key)?));
    }
    two_column(&rows);
    io::print_info(format!(
        "  Stored at {}",
        context.config_manager.config_path().display()
    ));
    Ok(())
}

fn set_config_value(context: &mut ShellContext, key: &str, value: &str) -> CommandResult {
    context.config_write().set(key, value)?;
    context.persist_config()?;
    apply_runtime_preferences(context);
    io::print_success(format!("{} set to {}.", key, context.config_read().get(key)?));
    if matches!(key, "data_root" | "backup_retention") {
        io::print_hint("Restart the shell for this setting to take effect.");
    }
    Ok(())
}

fn restore_config(context: &mut ShellContext, reference: &str) -> CommandResult {
    let backups = context.config_manager.list_backups()?;
    let name = match reference.parse::<usize>() {
        Ok(index) => index
            .checked_sub(1)
            .and_then(|idx| backups.get(idx))
            .cloned()
            .ok_or_else(|| {
                CommandError::InvalidArguments(format!("no configuration backup #{}", index))
            })?,
        Err(_) => reference.to_string(),
    };
    let restored = context.config_manager.restore(&name)?;
    *context.config_write() = restored;
    apply_runtime_preferences(context);
    io::print_success(format!("Configuration restored from {}.", name));
    Ok(())
}

fn apply_runtime_preferences(context: &ShellContext) {
    let color_enabled = context.config_read().ui_color_enabled;
    output::set_preferences(OutputPreferences {
        color_enabled: color_enabled && context.mode() == CliMode::Interactive,
    });
}
