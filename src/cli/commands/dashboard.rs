use dues_core::{compute_dashboard, DuesStorage, ReportRange, ReportService};

use crate::cli::commands::{member, short_id};
use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::{section as output_section, two_column};
use crate::cli::registry::CommandEntry;
use crate::cli::table::{Table, TableColumn};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "dashboard",
            "Show collection totals and members with dues",
            "dashboard",
            cmd_dashboard,
        ),
        CommandEntry::new(
            "report",
            "List collected payments for a period",
            "report [today|month|all]",
            cmd_report,
        ),
    ]
}

fn cmd_dashboard(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let members = context.store().list_members()?;
    let payments = context.store().list_payments(None)?;
    let stats = compute_dashboard(&members, &payments, context.today());

    output_section("Dashboard");
    two_column(&[
        (
            "Members",
            format!("{} ({} active)", stats.total_members, stats.active_members),
        ),
        ("Total collected", context.money(stats.total_collected)),
        ("Total pending", context.money(stats.total_pending)),
        ("Members with dues", stats.pending_members.len().to_string()),
    ]);

    if stats.pending_members.is_empty() {
        io::print_success("Nobody owes anything.");
        return Ok(());
    }
    let mut pending: Vec<_> = stats
        .pending_members
        .into_iter()
        .map(|entry| (entry.member, entry.summary))
        .collect();
    pending.sort_by(|a, b| b.1.balance.total_cmp(&a.1.balance));
    member::render_member_table(context, "Pending dues", &pending);
    Ok(())
}

fn cmd_report(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let range = match args.first() {
        Some(value) => ReportRange::parse(value).ok_or_else(|| {
            CommandError::InvalidArguments(format!(
                "unknown report range `{}` (today, month, all)",
                value
            ))
        })?,
        None => ReportRange::default(),
    };
    let members = context.store().list_members()?;
    let payments = context.store().list_payments(None)?;
    let report = ReportService::collection(&members, &payments, range, context.today());

    output_section(format!("Collections: {}", report.range));
    if report.rows.is_empty() {
        io::print_info("No payments in this period.");
    } else {
        let mut table = Table::new(
            None,
            vec![
                TableColumn::left("Id"),
                TableColumn::left("Date"),
                TableColumn::left("Member"),
                TableColumn::left("For"),
                TableColumn::left("Mode"),
                TableColumn::right("Amount"),
            ],
        );
        for row in &report.rows {
            table.add_row(vec![
                short_id(&row.payment_id),
                row.date.format("%Y-%m-%d").to_string(),
                row.member_name.clone(),
                row.period_label.clone(),
                row.mode.to_string(),
                context.money(row.amount),
            ]);
        }
        table.render();
    }
    io::print_info(format!(
        "Total collected: {} across {} payment(s)",
        context.money(report.total_collected),
        report.rows.len()
    ));
    Ok(())
}
