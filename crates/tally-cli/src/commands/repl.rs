//! REPL command implementation
//!
//! Each line is a command invocation such as `selftest timer`: the command
//! picks a namespace and the rest of the line filters its tests. A line with
//! no filter uses the configured default filter, as `tally run` does.

use crate::testing::suites;
use crate::testing::{Session, TestReporter};
use anyhow::Result;
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::borrow::Cow;
use tally_runner::{CommandTable, Invocation};

/// What the loop should do with one line of input
#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Quit,
    Help,
    List,
    Empty,
    Invoke(&'a str),
}

fn classify(line: &str) -> Line<'_> {
    match line.trim() {
        "" => Line::Empty,
        ":quit" | ":q" => Line::Quit,
        ":help" | ":h" => Line::Help,
        ":list" | ":l" => Line::List,
        other => Line::Invoke(other),
    }
}

/// Append `default` to an invocation that names no filter of its own
fn with_default_filter<'a>(invocation: &'a str, default: Option<&str>) -> Cow<'a, str> {
    match (Invocation::parse(invocation), default) {
        (Ok(Invocation { command, filter: None }), Some(filter)) if !filter.trim().is_empty() => {
            Cow::Owned(format!("{} {}", command, filter))
        }
        _ => Cow::Borrowed(invocation),
    }
}

/// Run the interactive prompt
///
/// If `no_history` is true, history is neither loaded nor saved.
pub fn run(
    no_history: bool,
    verbose: bool,
    cli_config: &crate::config::Config,
    config: &tally_config::Config,
) -> Result<()> {
    if cli_config.no_color || !config.color() {
        colored::control::set_override(false);
    }

    let table = suites::command_table(config.commands())?;
    let verbose = verbose || config.verbose();
    let session = Session::new(TestReporter::new(verbose), config.defer_delay())?;

    let mut rl = DefaultEditor::new()?;
    let no_history = no_history || cli_config.no_history;
    let history_path = cli_config.get_history_path();
    if !no_history {
        if let Some(ref path) = history_path {
            let _ = rl.load_history(path);
        }
    }

    println!("Tally v{} test prompt", tally_runner::VERSION);
    println!("Type a command with an optional filter, or :quit to exit");
    println!();

    loop {
        match rl.readline("tally> ") {
            Ok(line) => match classify(&line) {
                Line::Quit => {
                    println!("Goodbye!");
                    break;
                }
                Line::Help => print_help(&table),
                Line::List => print_commands(&table),
                Line::Empty => {}
                Line::Invoke(invocation) => {
                    let _ = rl.add_history_entry(invocation);
                    let invocation = with_default_filter(invocation, config.default_filter());
                    match session.dispatch(&table, &invocation) {
                        Ok(_) => println!(),
                        Err(err) => eprintln!("{} {}", "error:".red().bold(), err),
                    }
                }
            },
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                println!("Use :quit or :q to exit");
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    if !no_history {
        if let Some(path) = history_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = rl.save_history(&path);
        }
    }

    Ok(())
}

fn print_help(table: &CommandTable) {
    println!("Prompt Commands:");
    println!("  :quit, :q         Exit the prompt");
    println!("  :list, :l         Show bound commands");
    println!("  :help, :h         Show this help message");
    println!();
    println!("Any other line runs a command: <command> [filter]");
    println!("Examples:");
    for (command, _) in table.commands().take(2) {
        println!("  tally> {}", command);
    }
    println!("  tally> selftest timer");
}

fn print_commands(table: &CommandTable) {
    for (command, namespace) in table.commands() {
        let count = table.suite(namespace).map_or(0, |suite| suite.len());
        println!("  {} -> {} ({} tests)", command.bold(), namespace, count);
    }
}
