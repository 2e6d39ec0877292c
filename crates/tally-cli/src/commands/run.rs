//! Run command - execute one namespace's suite

use crate::testing::suites;
use crate::testing::{RunSummary, Session, TestReporter};
use anyhow::{anyhow, Result};
use colored::*;
use std::time::Duration;
use tally_config::OutputFormat;
use tally_runner::NameFilter;

/// Arguments for the run command
#[derive(Debug, Clone)]
pub struct RunArgs {
    /// Namespace whose suite is run
    pub namespace: String,
    /// Filter tests by name pattern
    pub filter: Option<String>,
    /// Show elapsed time per test
    pub verbose: bool,
    /// Disable colored output
    pub no_color: bool,
    /// Output in JSON format
    pub json: bool,
    /// Delay between tests in milliseconds (overrides tally.toml)
    pub delay_ms: Option<u64>,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            namespace: suites::DEFAULT_NAMESPACE.to_string(),
            filter: None,
            verbose: false,
            no_color: false,
            json: false,
            delay_ms: None,
        }
    }
}

/// Run the selected suite to completion and return its summary
pub fn run(args: RunArgs, config: &tally_config::Config) -> Result<RunSummary> {
    if args.no_color || !config.color() {
        colored::control::set_override(false);
    }

    let table = suites::command_table(config.commands())?;
    let suite = table
        .suite(&args.namespace)
        .ok_or_else(|| anyhow!("unknown namespace '{}'", args.namespace))?;

    // Command-line flags override tally.toml and TALLY_* variables
    let filter = args
        .filter
        .as_deref()
        .or_else(|| config.default_filter());
    let json = args.json || config.output_format() == OutputFormat::Json;
    let verbose = args.verbose || config.verbose();
    let delay = args
        .delay_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.defer_delay());

    if !json {
        let selected = suite.matching(&NameFilter::new(filter)).count();
        println!(
            "{} {} ({} test{})",
            "Running".bold(),
            args.namespace.bold(),
            selected,
            if selected == 1 { "" } else { "s" }
        );
        println!();
    }

    tracing::debug!(namespace = %args.namespace, ?filter, ?delay, "running suite");
    let session = Session::new(TestReporter::new(verbose).with_json(json), delay)?;
    let summary = session.run_suite(suite, filter);

    if json {
        let report = session.reporter().json_report(&args.namespace, summary);
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if args.no_color || !config.color() {
        colored::control::unset_override();
    }

    Ok(summary)
}
