use dialoguer::Select;

use dues_core::{MemberService, MemberDetail};
use dues_domain::{BalanceSummary, Member, MemberUpdate, NewMember, SubscriptionType};

use crate::cli::commands::{ledger, parse_amount, parse_bool, parse_date, short_id, ParsedArgs};
use crate::cli::core::{CliMode, CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::{section as output_section, two_column};
use crate::cli::registry::CommandEntry;
use crate::cli::table::{Table, TableColumn};

const MEMBER_USAGE: &str = "member <add|list|show|edit|delete|search>";
const ADD_USAGE: &str = "member add <name> <phone> [fee] [--opening <amount>] [--joined <YYYY-MM-DD>] [--email <email>] [--type <Monthly|Yearly|One-Time>]";
const EDIT_USAGE: &str =
    "member edit <member> <field=value>... (fields: name, phone, email, fee, type, joined, active)";
const ACTIONS: [&str; 6] = ["add", "list", "show", "edit", "delete", "search"];

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "member",
        "Register, inspect and maintain members",
        MEMBER_USAGE,
        cmd_member,
    )]
}

fn cmd_member(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if args.is_empty() {
        if context.mode() == CliMode::Script {
            return Err(CommandError::usage(MEMBER_USAGE));
        }
        let choice = Select::with_theme(&context.theme)
            .with_prompt("Member action")
            .items(&ACTIONS)
            .default(1)
            .interact_opt()?;
        return match choice {
            Some(index) => dispatch_member_action(context, ACTIONS[index], &[]),
            None => {
                io::print_info("Operation cancelled.");
                Ok(())
            }
        };
    }
    dispatch_member_action(context, args[0], &args[1..])
}

fn dispatch_member_action(context: &mut ShellContext, action: &str, args: &[&str]) -> CommandResult {
    match action.to_lowercase().as_str() {
        "add" | "new" => handle_add(context, args),
        "list" | "ls" => handle_list(context),
        "show" | "view" => handle_show(context, args),
        "edit" => handle_edit(context, args),
        "delete" | "remove" | "rm" => handle_delete(context, args),
        "search" | "find" => handle_search(context, args),
        other => Err(CommandError::InvalidArguments(format!(
            "unknown member subcommand `{}`",
            other
        ))),
    }
}

fn handle_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let parsed = ParsedArgs::parse(args, &["opening", "joined", "email", "type"])?;
    let input = if parsed.positional.is_empty() && context.mode() == CliMode::Interactive {
        prompt_new_member(context)?
    } else {
        new_member_from_args(context, &parsed)?
    };
    let member = MemberService::add(context.store(), context.clock.as_ref(), input)?;
    io::print_success(format!(
        "Member `{}` added ({}).",
        member.name,
        short_id(&member.id)
    ));
    Ok(())
}

fn new_member_from_args(
    context: &ShellContext,
    parsed: &ParsedArgs<'_>,
) -> Result<NewMember, CommandError> {
    let (Some(name), Some(phone)) = (parsed.positional(0), parsed.positional(1)) else {
        return Err(CommandError::usage(ADD_USAGE));
    };
    let (default_fee, default_type) = {
        let config = context.config_read();
        (
            config.default_subscription_amount,
            config.default_subscription_type.clone(),
        )
    };
    let fee = match parsed.positional(2) {
        Some(value) => parse_amount(value)?,
        None => default_fee,
    };
    let mut input = NewMember::new(name, phone, fee, context.today());
    if let Some(opening) = parsed.option("opening") {
        input.opening_balance = parse_amount(opening)?;
    }
    if let Some(joined) = parsed.option("joined") {
        input.join_date = parse_date(joined)?;
    }
    input.email = parsed.option("email").map(str::to_string);
    input.subscription_type = parse_subscription_type(parsed.option("type").unwrap_or(default_type.as_str()))?;
    Ok(input)
}

fn prompt_new_member(context: &ShellContext) -> Result<NewMember, CommandError> {
    let (default_fee, default_type) = {
        let config = context.config_read();
        (
            config.default_subscription_amount,
            config.default_subscription_type.clone(),
        )
    };
    let name = io::prompt_text(&context.theme, "Name", None)?;
    let phone = io::prompt_text(&context.theme, "Phone", None)?;
    let email = io::prompt_text(&context.theme, "Email (optional)", Some(""))?;
    let fee = parse_amount(&io::prompt_text(
        &context.theme,
        "Monthly fee",
        Some(&format!("{:.2}", default_fee)),
    )?)?;
    let kind = parse_subscription_type(&io::prompt_text(
        &context.theme,
        "Subscription type",
        Some(&default_type),
    )?)?;
    let opening = parse_amount(&io::prompt_text(
        &context.theme,
        "Opening dues",
        Some("0"),
    )?)?;
    let joined = parse_date(&io::prompt_text(
        &context.theme,
        "Join date (YYYY-MM-DD)",
        Some(&context.today().format("%Y-%m-%d").to_string()),
    )?)?;

    let mut input = NewMember::new(name, phone, fee, joined).with_opening_balance(opening);
    input.email = Some(email);
    input.subscription_type = kind;
    Ok(input)
}

fn parse_subscription_type(value: &str) -> Result<SubscriptionType, CommandError> {
    SubscriptionType::parse(value).ok_or_else(|| {
        CommandError::InvalidArguments(format!(
            "unknown subscription type `{}` (Monthly, Yearly, One-Time)",
            value
        ))
    })
}

fn handle_list(context: &mut ShellContext) -> CommandResult {
    let members = MemberService::list(context.store())?;
    if members.is_empty() {
        io::print_info("No members yet. Use `member add` to register one.");
        return Ok(());
    }
    let today = context.today();
    let mut rows = Vec::with_capacity(members.len());
    for member in members {
        let summary = MemberService::balance(context.store(), member.id, today)?;
        rows.push((member, summary));
    }
    render_member_table(context, "Members", &rows);
    Ok(())
}

fn handle_search(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if args.is_empty() {
        return Err(CommandError::usage("member search <text>"));
    }
    let needle = args.join(" ");
    let matches = MemberService::search(context.store(), &needle)?;
    if matches.is_empty() {
        io::print_info(format!("No member matches `{}`.", needle));
        return Ok(());
    }
    let today = context.today();
    let mut rows = Vec::with_capacity(matches.len());
    for member in matches {
        let summary = MemberService::balance(context.store(), member.id, today)?;
        rows.push((member, summary));
    }
    render_member_table(context, &format!("Matches for `{}`", needle), &rows);
    Ok(())
}

pub(crate) fn render_member_table(
    context: &ShellContext,
    title: &str,
    rows: &[(Member, BalanceSummary)],
) {
    let mut table = Table::new(
        Some(title),
        vec![
            TableColumn::left("Id"),
            TableColumn::left("Name"),
            TableColumn::left("Phone"),
            TableColumn::right("Fee"),
            TableColumn::left("Standing"),
        ],
    );
    for (member, summary) in rows {
        let mut name = member.name.clone();
        if !member.active {
            name.push_str(" (inactive)");
        }
        table.add_row(vec![
            short_id(&member.id),
            name,
            member.phone.clone(),
            context.money(member.subscription_amount),
            standing(context, summary),
        ]);
    }
    table.render();
}

pub(crate) fn standing(context: &ShellContext, summary: &BalanceSummary) -> String {
    if summary.owes() {
        format!(
            "Owes {} ({} months)",
            context.money(summary.total_due),
            summary.unpaid_months_count
        )
    } else if summary.has_credit() {
        format!("Credit {}", context.money(summary.advance_credit))
    } else {
        "Settled".to_string()
    }
}

fn member_argument(context: &ShellContext, args: &[&str], usage: &str) -> Result<Member, CommandError> {
    match args.first() {
        Some(token) => context.resolve_member(token),
        None => Err(CommandError::usage(usage)),
    }
}

fn handle_show(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let member = match args.first() {
        Some(_) => member_argument(context, args, "member show <member>")?,
        None if context.mode() == CliMode::Interactive => {
            let token = io::prompt_text(&context.theme, "Member", None)?;
            context.resolve_member(&token)?
        }
        None => return Err(CommandError::usage("member show <member>")),
    };
    let detail = MemberService::detail(context.store(), member.id, context.today())?;
    render_detail(context, &detail);
    Ok(())
}

fn render_detail(context: &ShellContext, detail: &MemberDetail) {
    let member = &detail.member;
    let summary = &detail.summary;
    output_section(format!("{} ({})", member.name, short_id(&member.id)));
    two_column(&[
        ("Phone", member.phone.clone()),
        ("Email", member.email.clone().unwrap_or_else(|| "-".into())),
        (
            "Subscription",
            format!(
                "{} {}",
                context.money(member.subscription_amount),
                member.subscription_type
            ),
        ),
        ("Joined", member.join_date.format("%d %b %Y").to_string()),
        ("Opening dues", context.money(summary.opening_dues)),
        ("Total paid", context.money(summary.total_paid)),
        ("Standing", standing(context, summary)),
        (
            "Months",
            format!(
                "{} billed, {} outstanding",
                summary.total_months_count, summary.unpaid_months_count
            ),
        ),
        (
            "Ledger",
            format!(
                "{} paid, {} part paid, {} unpaid",
                detail.counts.paid, detail.counts.partial, detail.counts.unpaid
            ),
        ),
    ]);
    ledger::render_ledger(context, &detail.ledger);
    ledger::render_payments(context, "Recent payments", &detail.payments, 10);
}

fn handle_edit(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let member = member_argument(context, args, EDIT_USAGE)?;
    let update = if args.len() > 1 {
        parse_update(&args[1..])?
    } else if context.mode() == CliMode::Interactive {
        prompt_update(context, &member)?
    } else {
        return Err(CommandError::usage(EDIT_USAGE));
    };
    if update.is_empty() {
        io::print_info("Nothing to change.");
        return Ok(());
    }
    let updated = MemberService::update(context.store(), member.id, update)?;
    io::print_success(format!("Member `{}` updated.", updated.name));
    Ok(())
}

fn parse_update(pairs: &[&str]) -> Result<MemberUpdate, CommandError> {
    let mut update = MemberUpdate::default();
    for pair in pairs {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            CommandError::InvalidArguments(format!("expected field=value, got `{}`", pair))
        })?;
        match key.trim().to_lowercase().as_str() {
            "name" => update.name = Some(value.to_string()),
            "phone" => update.phone = Some(value.to_string()),
            "email" => {
                let value = value.trim();
                update.email = Some((!value.is_empty()).then(|| value.to_string()));
            }
            "fee" | "amount" | "subscription" => {
                update.subscription_amount = Some(parse_amount(value)?)
            }
            "type" => update.subscription_type = Some(parse_subscription_type(value)?),
            "joined" | "join_date" => update.join_date = Some(parse_date(value)?),
            "active" => update.active = Some(parse_bool(value)?),
            "opening" | "opening_balance" => {
                return Err(CommandError::InvalidArguments(
                    "the opening balance is fixed once a member is registered".into(),
                ))
            }
            other => {
                return Err(CommandError::InvalidArguments(format!(
                    "unknown member field `{}`",
                    other
                )))
            }
        }
    }
    Ok(update)
}

fn prompt_update(context: &ShellContext, member: &Member) -> Result<MemberUpdate, CommandError> {
    let name = io::prompt_text(&context.theme, "Name", Some(&member.name))?;
    let phone = io::prompt_text(&context.theme, "Phone", Some(&member.phone))?;
    let email = io::prompt_text(
        &context.theme,
        "Email",
        Some(member.email.as_deref().unwrap_or("")),
    )?;
    let fee = parse_amount(&io::prompt_text(
        &context.theme,
        "Monthly fee",
        Some(&format!("{:.2}", member.subscription_amount)),
    )?)?;

    let mut update = MemberUpdate::default();
    if name.trim() != member.name {
        update.name = Some(name);
    }
    if phone.trim() != member.phone {
        update.phone = Some(phone);
    }
    let email = email.trim();
    if member.email.as_deref().unwrap_or("") != email {
        update.email = Some((!email.is_empty()).then(|| email.to_string()));
    }
    if fee != member.subscription_amount {
        update.subscription_amount = Some(fee);
    }
    Ok(update)
}

fn handle_delete(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let member = member_argument(context, args, "member delete <member>")?;
    let payments = dues_core::DuesStorage::list_payments(context.store(), Some(member.id))?.len();
    let prompt = format!(
        "Delete `{}` and {} recorded payment(s)? This cannot be undone.",
        member.name, payments
    );
    if !context.confirm(&prompt)? {
        io::print_info("Operation cancelled.");
        return Ok(());
    }
    let removed = MemberService::remove(context.store(), member.id)?;
    io::print_success(format!(
        "Member `{}` deleted with {} payment(s).",
        member.name, removed
    ));
    Ok(())
}
