use dues_core::{
    CoverageService, MemberService, PaymentService, ToggleAction, ToggleOutcome, ToggleTarget,
};
use dues_domain::{CoverageStatus, Payment, PeriodEntry};

use crate::cli::commands::{parse_month, short_id};
use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::table::{Table, TableColumn};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "ledger",
            "Show a member's month-by-month coverage",
            "ledger <member> [--all]",
            cmd_ledger,
        ),
        CommandEntry::new(
            "toggle",
            "Mark a month paid, or revert the payment tagged to it",
            "toggle <member> <YYYY-MM|opening>",
            cmd_toggle,
        ),
    ]
}

fn cmd_ledger(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some(token) = args.first() else {
        return Err(CommandError::usage("ledger <member> [--all]"));
    };
    let member = context.resolve_member(token)?;
    let detail = MemberService::detail(context.store(), member.id, context.today())?;
    output::section(format!("Ledger: {}", member.name));
    if args.iter().any(|arg| arg.eq_ignore_ascii_case("--all")) {
        render_ledger(context, &detail.ledger);
    } else {
        let outstanding: Vec<PeriodEntry> = detail
            .ledger
            .iter()
            .filter(|entry| entry.status.is_outstanding() || entry.is_opening())
            .cloned()
            .collect();
        render_ledger(context, &outstanding);
        io::print_hint("Use `ledger <member> --all` to include paid months.");
    }
    io::print_info(format!(
        "Outstanding months to date: {}",
        CoverageService::outstanding_months(&detail.ledger, context.today())
    ));
    Ok(())
}

/// Renders ledger entries newest month first with the opening entry last.
pub(crate) fn render_ledger(context: &ShellContext, entries: &[PeriodEntry]) {
    if entries.is_empty() {
        io::print_info("No billing periods yet.");
        return;
    }
    let mut table = Table::new(
        Some("Coverage"),
        vec![
            TableColumn::left("Period"),
            TableColumn::left("Status"),
            TableColumn::right("Covered"),
            TableColumn::right("Due"),
        ],
    );
    for entry in entries.iter().rev() {
        table.add_row(vec![
            entry.label(),
            status_marker(entry.status),
            context.money(entry.coverage_amount),
            context.money(entry.due_amount),
        ]);
    }
    table.render();
}

fn status_marker(status: CoverageStatus) -> String {
    match status {
        CoverageStatus::Paid => format!("[x] {}", status),
        CoverageStatus::Partial => format!("[~] {}", status),
        CoverageStatus::Unpaid => format!("[ ] {}", status),
    }
}

pub(crate) fn render_payments(context: &ShellContext, title: &str, payments: &[Payment], limit: usize) {
    if payments.is_empty() {
        io::print_info("No payments recorded.");
        return;
    }
    let mut table = Table::new(
        Some(title),
        vec![
            TableColumn::left("Id"),
            TableColumn::left("Recorded"),
            TableColumn::right("Amount"),
            TableColumn::left("For"),
            TableColumn::left("Mode"),
        ],
    );
    for payment in payments.iter().take(limit) {
        table.add_row(vec![
            short_id(&payment.id),
            payment.date.format("%Y-%m-%d %H:%M").to_string(),
            context.money(payment.amount),
            payment.period_label(),
            payment.mode.to_string(),
        ]);
    }
    table.render();
    if payments.len() > limit {
        io::print_hint(format!(
            "{} older payment(s) hidden; see `history <member>`.",
            payments.len() - limit
        ));
    }
}

fn cmd_toggle(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [token, period] = args else {
        return Err(CommandError::usage("toggle <member> <YYYY-MM|opening>"));
    };
    let member = context.resolve_member(token)?;
    let target = if period.eq_ignore_ascii_case("opening") {
        ToggleTarget::Opening
    } else {
        ToggleTarget::Month(parse_month(period)?)
    };

    let action =
        PaymentService::plan_toggle(context.store(), context.clock.as_ref(), member.id, target)?;
    if let ToggleAction::Revert { payment } = &action {
        if !context.confirm(&revert_prompt(context, &member.name, payment))? {
            io::print_info("Toggle cancelled.");
            return Ok(());
        }
    }

    let outcome =
        PaymentService::apply_toggle(context.store(), context.clock.as_ref(), member.id, action)?;
    match outcome {
        ToggleOutcome::Recorded(payment) => io::print_success(format!(
            "Recorded {} for {} ({}).",
            context.money(payment.amount),
            payment.period_label(),
            member.name
        )),
        ToggleOutcome::Reverted(payment) => io::print_success(format!(
            "Reverted {} payment of {} ({}).",
            payment.period_label(),
            context.money(payment.amount),
            member.name
        )),
    }
    Ok(())
}

fn revert_prompt(context: &ShellContext, member_name: &str, payment: &Payment) -> String {
    format!(
        "Delete {}'s {} payment of {} recorded {}?",
        member_name,
        payment.period_label(),
        context.money(payment.amount),
        payment.date.format("%Y-%m-%d")
    )
}
