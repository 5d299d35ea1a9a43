use crate::application::commands::{
    AppState, add_task_impl, delete_task_impl, list_tasks_impl, toggle_task_impl,
};
use crate::domain::models::{Task, format_reminder_label};
use crate::infrastructure::error::InfraError;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub const REMINDER_HINT: &str = "Set reminder to get notified 1hr before & at 9 AM on task day";
const EMPTY_LIST: &str = "No tasks yet. Add one with `add <text>`.";
const PROMPT: &str = "> ";

const HELP: &str = "\
Commands:
  add <text> [@ <YYYY-MM-DD> <HH:MM>]  add a task, optionally with a reminder
  toggle <id>                          mark a task done / not done (alias: done)
  delete <id>                          remove a task (alias: rm)
  list                                 show all tasks (alias: ls)
  help                                 show this help
  quit                                 leave (alias: exit)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Add {
        text: String,
        reminder_date: Option<String>,
        reminder_time: Option<String>,
    },
    Toggle(u64),
    Delete(u64),
    List,
    Help,
    Quit,
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "add" => parse_add(rest),
        "toggle" | "done" => ConsoleCommand::Toggle(parse_id(rest)?),
        "delete" | "rm" => ConsoleCommand::Delete(parse_id(rest)?),
        "list" | "ls" => ConsoleCommand::List,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(format!("unknown command '{other}' (try `help`)")),
    };
    Ok(Some(command))
}

fn parse_add(rest: &str) -> ConsoleCommand {
    let (text, schedule) = match rest.rsplit_once(" @") {
        Some((text, schedule)) => (text, Some(schedule)),
        None => (rest, None),
    };

    let mut parts = schedule.unwrap_or_default().split_whitespace();
    let reminder_date = parts.next().map(ToOwned::to_owned);
    let reminder_time = parts.next().map(ToOwned::to_owned);

    ConsoleCommand::Add {
        text: text.to_string(),
        reminder_date,
        reminder_time,
    }
}

fn parse_id(raw: &str) -> Result<u64, String> {
    let raw = raw.trim().trim_start_matches('#');
    if raw.is_empty() {
        return Err("a task id is required".to_string());
    }
    raw.parse::<u64>()
        .map_err(|_| format!("'{raw}' is not a task id"))
}

pub fn render_task_list(title: &str, tasks: &[Task]) -> String {
    let mut lines = vec![title.to_string(), "-".repeat(title.chars().count().max(8))];

    if tasks.is_empty() {
        lines.push(EMPTY_LIST.to_string());
    } else {
        for task in tasks {
            let check = if task.completed { "[x]" } else { "[ ]" };
            let mut row = format!("{check} #{} {}", task.id, task.text);
            if let Some(reminder) = task.reminder_date_time {
                row.push_str(&format!("  (reminder: {})", format_reminder_label(reminder)));
            }
            lines.push(row);
        }
        let remaining = tasks.iter().filter(|task| !task.completed).count();
        lines.push(format!("{remaining} task(s) remaining"));
    }

    lines.join("\n")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleOutcome {
    pub output: Option<String>,
    pub quit: bool,
}

impl ConsoleOutcome {
    fn show(output: String) -> Self {
        Self {
            output: Some(output),
            quit: false,
        }
    }

    fn silent() -> Self {
        Self {
            output: None,
            quit: false,
        }
    }
}

/// Applies a command to the shared state. Mutations that find nothing to act
/// on stay silent.
pub fn execute_command(
    state: &AppState,
    command: ConsoleCommand,
) -> Result<ConsoleOutcome, InfraError> {
    let outcome = match command {
        ConsoleCommand::Add {
            text,
            reminder_date,
            reminder_time,
        } => match add_task_impl(state, text, reminder_date, reminder_time)? {
            Some(_) => ConsoleOutcome::show(render_state(state)?),
            None => ConsoleOutcome::silent(),
        },
        ConsoleCommand::Toggle(task_id) => match toggle_task_impl(state, task_id)? {
            Some(_) => ConsoleOutcome::show(render_state(state)?),
            None => ConsoleOutcome::silent(),
        },
        ConsoleCommand::Delete(task_id) => {
            if delete_task_impl(state, task_id)? {
                ConsoleOutcome::show(render_state(state)?)
            } else {
                ConsoleOutcome::silent()
            }
        }
        ConsoleCommand::List => ConsoleOutcome::show(render_state(state)?),
        ConsoleCommand::Help => ConsoleOutcome::show(format!("{HELP}\n\n{REMINDER_HINT}")),
        ConsoleCommand::Quit => ConsoleOutcome {
            output: None,
            quit: true,
        },
    };
    Ok(outcome)
}

pub fn render_state(state: &AppState) -> Result<String, InfraError> {
    let tasks = list_tasks_impl(state)?;
    Ok(render_task_list(&state.config().app_name, &tasks))
}

/// Reads commands line by line until `quit` or end of input.
pub async fn run_console<R, W>(state: &AppState, reader: R, writer: &mut W) -> Result<(), InfraError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(writer, "{}\n\n{REMINDER_HINT}\nType `help` for commands.", render_state(state)?)?;
    write!(writer, "{PROMPT}")?;
    writer.flush()?;

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let outcome = match parse_command(&line) {
            Ok(Some(command)) => match execute_command(state, command) {
                Ok(outcome) => outcome,
                Err(error) => ConsoleOutcome::show(format!(
                    "error: {}",
                    state.command_error("console", &error)
                )),
            },
            Ok(None) => ConsoleOutcome::silent(),
            Err(message) => ConsoleOutcome::show(message),
        };

        if let Some(output) = outcome.output {
            writeln!(writer, "{output}")?;
        }
        if outcome.quit {
            break;
        }
        write!(writer, "{PROMPT}")?;
        writer.flush()?;
    }

    writer.flush()?;
    Ok(())
}
