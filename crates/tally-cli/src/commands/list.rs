//! List command - show namespaces, their tests, and command bindings

use crate::testing::suites;
use anyhow::{anyhow, Result};
use colored::*;

/// Print the built-in namespaces (or just one) and the bound commands
pub fn run(namespace: Option<&str>, config: &tally_config::Config) -> Result<()> {
    let table = suites::command_table(config.commands())?;

    let namespaces: Vec<&str> = match namespace {
        Some(name) if table.suite(name).is_some() => vec![name],
        Some(name) => return Err(anyhow!("unknown namespace '{}'", name)),
        None => table.namespaces().collect(),
    };

    println!("{}", "Namespaces:".bold());
    for name in namespaces {
        let Some(suite) = table.suite(name) else {
            continue;
        };
        println!("  {} ({} tests)", name.bold(), suite.len());
        for test in suite.names() {
            println!("    {}", test);
        }
    }

    println!();
    println!("{}", "Commands:".bold());
    for (command, namespace) in table.commands() {
        println!("  {} -> {}", command.bold(), namespace);
    }

    Ok(())
}
