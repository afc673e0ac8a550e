use dues_core::{MemberService, PaymentService};
use dues_domain::Payment;

use crate::cli::commands::{ledger, parse_amount, parse_month, ParsedArgs};
use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::registry::CommandEntry;

const PAY_USAGE: &str =
    "pay full <member> <YYYY-MM> | pay custom <member> <amount> [YYYY-MM] | pay delete <payment-id>";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new("pay", "Record or delete payments", PAY_USAGE, cmd_pay),
        CommandEntry::new(
            "history",
            "List a member's payments, newest first",
            "history <member> [--month-wise]",
            cmd_history,
        ),
    ]
}

fn cmd_pay(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some(action) = args.first() else {
        return Err(CommandError::usage(PAY_USAGE));
    };
    match action.to_lowercase().as_str() {
        "full" => handle_full(context, &args[1..]),
        "custom" | "partial" => handle_custom(context, &args[1..]),
        "delete" | "revert" | "rm" => handle_delete(context, &args[1..]),
        other => Err(CommandError::InvalidArguments(format!(
            "unknown pay subcommand `{}`",
            other
        ))),
    }
}

fn handle_full(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [token, period] = args else {
        return Err(CommandError::usage("pay full <member> <YYYY-MM>"));
    };
    let period = parse_month(period)?;
    let member = context.resolve_member(token)?;
    let payment = PaymentService::record_full(
        context.store(),
        context.clock.as_ref(),
        member.id,
        period,
    )?;
    announce(context, &member.name, &payment);
    Ok(())
}

fn handle_custom(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (token, amount, period) = match args {
        [token, amount] => (token, amount, None),
        [token, amount, period] => (token, amount, Some(parse_month(period)?)),
        _ => {
            return Err(CommandError::usage(
                "pay custom <member> <amount> [YYYY-MM]",
            ))
        }
    };
    let amount = parse_amount(amount)?;
    let member = context.resolve_member(token)?;
    let payment = PaymentService::record_custom(
        context.store(),
        context.clock.as_ref(),
        member.id,
        amount,
        period,
    )?;
    announce(context, &member.name, &payment);
    Ok(())
}

fn announce(context: &ShellContext, name: &str, payment: &Payment) {
    io::print_success(format!(
        "Recorded {} from {} ({}).",
        context.money(payment.amount),
        name,
        payment.period_label()
    ));
    if let Ok(summary) = MemberService::balance(context.store(), payment.member_id, context.today())
    {
        io::print_info(format!(
            "Standing: {}",
            crate::cli::commands::member::standing(context, &summary)
        ));
    }
}

fn handle_delete(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [token] = args else {
        return Err(CommandError::usage("pay delete <payment-id>"));
    };
    let payment = context.resolve_payment(token)?;
    let prompt = format!(
        "Delete payment of {} recorded {} ({})?",
        context.money(payment.amount),
        payment.date.format("%Y-%m-%d"),
        payment.period_label()
    );
    if !context.confirm(&prompt)? {
        io::print_info("Operation cancelled.");
        return Ok(());
    }
    let removed = PaymentService::revert(context.store(), payment.id)?;
    io::print_success(format!(
        "Payment of {} deleted.",
        context.money(removed.amount)
    ));
    Ok(())
}

fn cmd_history(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let parsed = ParsedArgs::parse(args, &[])?;
    let Some(token) = parsed.positional(0) else {
        return Err(CommandError::usage("history <member> [--month-wise]"));
    };
    let month_wise = parsed.switch("month-wise") || parsed.switch("monthwise");
    let member = context.resolve_member(token)?;
    let payments = PaymentService::history(context.store(), member.id, month_wise)?;
    let title = if month_wise {
        format!("Month-wise payments: {}", member.name)
    } else {
        format!("Payments: {}", member.name)
    };
    ledger::render_payments(context, &title, &payments, usize::MAX);
    Ok(())
}
