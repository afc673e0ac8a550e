use std::{
    borrow::Cow,
    fmt,
    io::{self, BufRead},
};

use rustyline::{
    completion::{Completer, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::Hinter,
    history::DefaultHistory,
    validate::{ValidationContext, ValidationResult, Validator},
    Cmd, Context as ReadlineContext, Editor, Helper, KeyEvent,
};
use shell_words::{quote, split};

use dues_core::DuesStorage;

use crate::cli::core::{CliError, CliMode, CommandError, LoopControl, ShellContext};
use crate::cli::output::{self, MessageKind};

/// Setting this variable switches the shell to line-by-line stdin processing.
pub const SCRIPT_ENV: &str = "DUES_CLI_SCRIPT";

pub fn run_cli() -> Result<(), CliError> {
    let mode = if std::env::var_os(SCRIPT_ENV).is_some() {
        CliMode::Script
    } else {
        CliMode::Interactive
    };

    let mut context = ShellContext::new(mode)?;
    tracing::info!(?mode, root = %context.data_root.display(), "shell started");

    match mode {
        CliMode::Interactive => run_interactive(&mut context),
        CliMode::Script => run_script(&mut context),
    }
}

/// How a single input line ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineOutcome {
    Skipped,
    Succeeded,
    Failed,
    Exit,
}

/// Counts reported once a script has been drained.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ScriptSummary {
    executed: usize,
    failed: usize,
}

fn run_interactive(context: &mut ShellContext) -> Result<(), CliError> {
    output::info("Dues Tracker. Type `help` to list commands, `exit` to leave.");
    let mut editor = Editor::<ShellHelper, DefaultHistory>::new()?;
    editor.set_helper(Some(ShellHelper::for_context(context)));
    editor.bind_sequence(KeyEvent::from('?'), Cmd::Complete);

    while context.running {
        let line = match editor.readline(&context.prompt()) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                if context.confirm_exit()? {
                    break;
                }
                continue;
            }
            Err(ReadlineError::Eof) => {
                output::info("Exiting shell.");
                break;
            }
            Err(err) => return Err(err.into()),
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        editor.add_history_entry(line).ok();

        match execute(context, line)? {
            LineOutcome::Exit => break,
            LineOutcome::Succeeded => {
                if let Some(helper) = editor.helper_mut() {
                    helper.set_members(member_names(context));
                }
            }
            LineOutcome::Skipped | LineOutcome::Failed => {}
        }
    }

    Ok(())
}

fn run_script(context: &mut ShellContext) -> Result<(), CliError> {
    let stdin = io::stdin();
    let summary = run_lines(context, stdin.lock())?;
    tracing::info!(
        executed = summary.executed,
        failed = summary.failed,
        "script finished"
    );
    if summary.failed > 0 {
        output::warning(format!(
            "{} of {} command(s) failed.",
            summary.failed, summary.executed
        ));
    }
    Ok(())
}

/// Feeds every non-blank, non-comment line of `reader` to the shell.
fn run_lines<R: BufRead>(context: &mut ShellContext, reader: R) -> Result<ScriptSummary, CliError> {
    let mut summary = ScriptSummary::default();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        summary.executed += 1;
        match execute(context, line)? {
            LineOutcome::Failed => summary.failed += 1,
            LineOutcome::Exit => break,
            LineOutcome::Skipped | LineOutcome::Succeeded => {}
        }
        if !context.running {
            break;
        }
    }
    Ok(summary)
}

/// Runs one line, reporting command failures instead of propagating them.
fn execute(context: &mut ShellContext, line: &str) -> Result<LineOutcome, CliError> {
    let tokens = match parse_command_line(line) {
        Ok(tokens) if tokens.is_empty() => return Ok(LineOutcome::Skipped),
        Ok(tokens) => tokens,
        Err(err) => {
            context.print_warning(&err.message);
            return Ok(LineOutcome::Failed);
        }
    };

    let raw = tokens[0].as_str();
    let args: Vec<&str> = tokens[1..].iter().map(String::as_str).collect();
    context.last_command = Some(line.to_string());

    match context.dispatch(&raw.to_lowercase(), raw, &args) {
        Ok(LoopControl::Continue) => Ok(LineOutcome::Succeeded),
        Ok(LoopControl::Exit) | Err(CommandError::ExitRequested) => {
            context.running = false;
            Ok(LineOutcome::Exit)
        }
        Err(err) => {
            tracing::debug!(command = raw, error = %err, "command failed");
            context.report_error(err)?;
            Ok(LineOutcome::Failed)
        }
    }
}

fn member_names(context: &ShellContext) -> Vec<String> {
    match context.store().list_members() {
        Ok(members) => members.into_iter().map(|member| member.name).collect(),
        Err(err) => {
            tracing::debug!(error = %err, "member names unavailable for completion");
            Vec::new()
        }
    }
}

/// Whether the word after `words` names a member.
fn takes_member(words: &[String]) -> bool {
    match words {
        [command] => matches!(command.as_str(), "ledger" | "toggle" | "history"),
        [command, action] => match command.as_str() {
            "member" => matches!(action.as_str(), "show" | "view" | "edit" | "delete" | "remove" | "rm"),
            "pay" => matches!(action.as_str(), "full" | "custom" | "partial"),
            _ => false,
        },
        _ => false,
    }
}

/// Completes command names and member names, and hints at usage.
struct ShellHelper {
    commands: Vec<(String, &'static str)>,
    members: Vec<String>,
}

impl ShellHelper {
    fn new(commands: impl IntoIterator<Item = (&'static str, &'static str)>) -> Self {
        let mut commands: Vec<(String, &'static str)> = commands
            .into_iter()
            .map(|(name, usage)| (name.to_ascii_lowercase(), usage))
            .collect();
        commands.sort_by(|a, b| a.0.cmp(&b.0));
        commands.dedup_by(|a, b| a.0 == b.0);
        Self {
            commands,
            members: Vec::new(),
        }
    }

    fn for_context(context: &ShellContext) -> Self {
        let entries = context
            .command_names()
            .into_iter()
            .filter_map(|name| context.command(name))
            .map(|entry| (entry.name, entry.usage))
            .collect::<Vec<_>>();
        let mut helper = Self::new(entries);
        helper.set_members(member_names(context));
        helper
    }

    fn set_members(&mut self, mut names: Vec<String>) {
        names.sort_by_key(|name| name.to_lowercase());
        names.dedup();
        self.members = names;
    }

    fn usage(&self, name: &str) -> Option<&'static str> {
        self.commands
            .iter()
            .find(|(command, _)| command == name)
            .map(|(_, usage)| *usage)
    }

    fn candidates(&self, words: &[String], needle: &str) -> Vec<Pair> {
        if words.is_empty() {
            return self
                .commands
                .iter()
                .filter(|(name, _)| name.starts_with(needle))
                .map(|(name, _)| Pair {
                    display: name.clone(),
                    replacement: name.clone(),
                })
                .collect();
        }
        if !takes_member(words) {
            return Vec::new();
        }
        self.members
            .iter()
            .filter(|name| name.to_lowercase().starts_with(needle))
            .map(|name| Pair {
                display: name.clone(),
                replacement: quote(name).into_owned(),
            })
            .collect()
    }
}

impl Helper for ShellHelper {}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &ReadlineContext<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let prefix = &line[..pos];
        let start = prefix
            .rfind(char::is_whitespace)
            .map(|idx| idx + 1)
            .unwrap_or(0);
        let words: Vec<String> = prefix[..start]
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        let needle = prefix[start..].to_lowercase();
        Ok((start, self.candidates(&words, &needle)))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &ReadlineContext<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        let name = line.strip_suffix(' ')?.trim_start();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return None;
        }
        let usage = self.usage(&name.to_lowercase())?;
        usage
            .split_once(' ')
            .map(|(_, rest)| rest.to_string())
    }
}

impl Highlighter for ShellHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        Cow::Borrowed(line)
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        if output::preferences().color_enabled {
            Cow::Owned(output::style(MessageKind::Hint, hint))
        } else {
            Cow::Borrowed(hint)
        }
    }
}

impl Validator for ShellHelper {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        if split(ctx.input()).is_err() {
            return Ok(ValidationResult::Invalid(Some("  (unbalanced quotes)".into())));
        }
        Ok(ValidationResult::Valid(None))
    }
}

pub(crate) fn parse_command_line(input: &str) -> Result<Vec<String>, ParseError> {
    split(input).map_err(|err| ParseError {
        message: err.to_string(),
    })
}

#[derive(Debug)]
pub(crate) struct ParseError {
    message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{io::Cursor, sync::Arc};

    use chrono::NaiveDate;
    use dues_core::FixedClock;
    use tempfile::TempDir;

    fn words(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    fn helper() -> ShellHelper {
        let mut helper = ShellHelper::new(vec![
            ("pay", "pay full <member> <YYYY-MM>"),
            ("Member", "member add <name> <phone> <fee>"),
            ("pay", "pay full <member> <YYYY-MM>"),
            ("ledger", "ledger <member> [--all]"),
        ]);
        helper.set_members(vec!["Ravi".into(), "Asha Rao".into(), "Ravi".into()]);
        helper
    }

    fn replacements(pairs: Vec<Pair>) -> Vec<String> {
        pairs.into_iter().map(|pair| pair.replacement).collect()
    }

    #[test]
    fn quoted_arguments_stay_together() {
        let tokens = parse_command_line("member add \"Asha Rao\" '98450 12345' 500").unwrap();
        assert_eq!(tokens, vec!["member", "add", "Asha Rao", "98450 12345", "500"]);
    }

    #[test]
    fn unbalanced_quotes_are_reported() {
        let err = parse_command_line("member add \"Asha").unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn helper_deduplicates_commands_and_members() {
        let helper = helper();
        let names: Vec<&str> = helper.commands.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["ledger", "member", "pay"]);
        assert_eq!(helper.members, vec!["Asha Rao", "Ravi"]);
    }

    #[test]
    fn member_slots_complete_quoted_names() {
        let helper = helper();
        assert_eq!(replacements(helper.candidates(&[], "le")), vec!["ledger"]);
        assert_eq!(
            replacements(helper.candidates(&words("ledger"), "a")),
            vec!["'Asha Rao'"]
        );
        assert_eq!(
            replacements(helper.candidates(&words("pay full"), "r")),
            vec!["Ravi"]
        );
        assert!(helper.candidates(&words("pay full ravi"), "r").is_empty());
        assert!(helper.candidates(&words("member add"), "r").is_empty());
    }

    #[test]
    fn usage_hint_follows_a_complete_command_name() {
        let helper = helper();
        let history = DefaultHistory::new();
        let ctx = ReadlineContext::new(&history);
        assert_eq!(
            helper.hint("ledger ", 7, &ctx).as_deref(),
            Some("<member> [--all]")
        );
        assert_eq!(helper.hint("Ledger", 6, &ctx), None);
        assert_eq!(helper.hint("unknown ", 8, &ctx), None);
        assert!(takes_member(&words("toggle")));
        assert!(!takes_member(&words("dashboard")));
    }

    #[test]
    fn scripts_count_failures_and_skip_comments() {
        let root = TempDir::new().expect("tempdir");
        let clock = Arc::new(FixedClock::on(
            NaiveDate::from_ymd_opt(2025, 3, 10).expect("date"),
        ));
        let mut context =
            ShellContext::open(CliMode::Script, root.path().to_path_buf(), clock).expect("context");
        let script = "# members\n\
                      member add Ravi 1 500 --joined 2025-01-01\n\
                      \n\
                      pay custom ravi -5\n\
                      pay full ravi 2025-01\n\
                      exit\n\
                      pay full ravi 2025-02\n";

        let summary = run_lines(&mut context, Cursor::new(script)).expect("script runs");
        assert_eq!(summary, ScriptSummary { executed: 4, failed: 1 });
        assert!(!context.running);
        assert_eq!(context.store().list_payments(None).expect("payments").len(), 1);
    }
}
