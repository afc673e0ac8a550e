use std::path::PathBuf;

use dues_core::{storage::integrity_warnings, DuesStorage};
use dues_storage_json::BackupInfo;

use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::{section as output_section, two_column};
use crate::cli::registry::CommandEntry;
use crate::cli::table::{Table, TableColumn};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "backup",
            "Back up the data file",
            "backup [note]",
            cmd_backup,
        ),
        CommandEntry::new("backups", "List data backups", "backups", cmd_backups),
        CommandEntry::new(
            "restore",
            "Replace all data with a backup",
            "restore <index|name>",
            cmd_restore,
        ),
        CommandEntry::new(
            "export",
            "Write every member and payment to a snapshot file",
            "export <path>",
            cmd_export,
        ),
        CommandEntry::new(
            "import",
            "Replace all data with a snapshot file",
            "import <path>",
            cmd_import,
        ),
        CommandEntry::new(
            "reset",
            "Delete every member and payment",
            "reset",
            cmd_reset,
        ),
        CommandEntry::new(
            "stats",
            "Show record counts, storage paths and integrity warnings",
            "stats",
            cmd_stats,
        ),
    ]
}

fn cmd_backup(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let note = (!args.is_empty()).then(|| args.join(" "));
    let info = context.store().backup(note.as_deref())?;
    io::print_success(format!("Backup created: {}", info.id));
    Ok(())
}

fn cmd_backups(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let backups = context.store().list_backups()?;
    if backups.is_empty() {
        io::print_info("No backups yet. Use `backup [note]` to create one.");
        return Ok(());
    }
    let mut table = Table::new(
        Some("Backups"),
        vec![
            TableColumn::right("#"),
            TableColumn::left("Name"),
            TableColumn::left("Created"),
            TableColumn::right("Size"),
        ],
    );
    for (index, backup) in backups.iter().enumerate() {
        table.add_row(vec![
            (index + 1).to_string(),
            backup.id.clone(),
            backup
                .created_at
                .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".into()),
            format!("{} B", backup.size_bytes),
        ]);
    }
    table.render();
    Ok(())
}

fn cmd_restore(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [reference] = args else {
        return Err(CommandError::usage("restore <index|name>"));
    };
    let backups = context.store().list_backups()?;
    let backup = select_backup(&backups, reference)?;
    let prompt = format!(
        "Replace all current data with `{}`? The current data is backed up first.",
        backup.id
    );
    if !context.confirm(&prompt)? {
        io::print_info("Operation cancelled.");
        return Ok(());
    }
    let snapshot = context.store().restore_backup(backup)?;
    io::print_success(format!(
        "Restored {} member(s) and {} payment(s) from {}.",
        snapshot.members.len(),
        snapshot.payments.len(),
        backup.id
    ));
    Ok(())
}

/// Picks a backup by 1-based index from `backups` or by (partial) file name.
fn select_backup<'a>(backups: &'a [BackupInfo], reference: &str) -> Result<&'a BackupInfo, CommandError> {
    if let Ok(index) = reference.parse::<usize>() {
        return index
            .checked_sub(1)
            .and_then(|idx| backups.get(idx))
            .ok_or_else(|| {
                CommandError::InvalidArguments(format!("no backup #{}", index))
            });
    }
    let mut matches = backups
        .iter()
        .filter(|backup| backup.id == reference || backup.id.contains(reference));
    match (matches.next(), matches.next()) {
        (Some(backup), None) => Ok(backup),
        (None, _) => Err(CommandError::InvalidArguments(format!(
            "no backup matches `{}`",
            reference
        ))),
        (Some(_), Some(_)) => Err(CommandError::InvalidArguments(format!(
            "`{}` matches several backups; use its number from `backups`",
            reference
        ))),
    }
}

fn cmd_export(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [path] = args else {
        return Err(CommandError::usage("export <path>"));
    };
    let path = PathBuf::from(path);
    let snapshot = context.store().export_to_path(&path)?;
    io::print_success(format!(
        "Exported {} member(s) and {} payment(s) to {}.",
        snapshot.members.len(),
        snapshot.payments.len(),
        path.display()
    ));
    Ok(())
}

fn cmd_import(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [path] = args else {
        return Err(CommandError::usage("import <path>"));
    };
    let path = PathBuf::from(path);
    if !path.exists() {
        return Err(CommandError::InvalidArguments(format!(
            "file not found: {}",
            path.display()
        )));
    }
    if !context.confirm("Importing replaces all current members and payments. Continue?")? {
        io::print_info("Operation cancelled.");
        return Ok(());
    }
    let snapshot = context.store().import_from_path(&path)?;
    io::print_success(format!(
        "Imported {} member(s) and {} payment(s).",
        snapshot.members.len(),
        snapshot.payments.len()
    ));
    Ok(())
}

fn cmd_reset(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let (members, payments) = context.store().counts()?;
    let prompt = format!(
        "Delete all {} member(s) and {} payment(s)? A backup is taken first.",
        members, payments
    );
    if !context.confirm(&prompt)? {
        io::print_info("Operation cancelled.");
        return Ok(());
    }
    context.store().clear()?;
    io::print_success("All data cleared.");
    Ok(())
}

fn cmd_stats(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let (member_count, payment_count) = context.store().counts()?;
    let backups = context.store().list_backups()?.len();
    output_section("Data");
    two_column(&[
        ("Members", member_count.to_string()),
        ("Payments", payment_count.to_string()),
        ("Backups", backups.to_string()),
        ("Data file", context.store().data_path().display().to_string()),
        ("Config file", context.config_manager.config_path().display().to_string()),
    ]);

    let members = context.store().list_members()?;
    let payments = context.store().list_payments(None)?;
    let warnings = integrity_warnings(&members, &payments);
    if warnings.is_empty() {
        io::print_success("No integrity issues found.");
    }
    for warning in warnings {
        io::print_warning(warning);
    }
    Ok(())
}
