use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod testing;

/// Sequential runner for asynchronous tests.
///
/// Tests run one at a time, in registration order. Each test reports its own
/// result whenever its work completes, and the next test starts only after
/// that report. A summary is printed once every test has reported.
///
/// EXAMPLES:
///     tally run                      Run the runtime self-checks
///     tally run demo                 Run the demo suite
///     tally run runtime timer        Run tests whose names match "timer"
///     tally list                     Show namespaces and commands
///     tally repl                     Start the interactive prompt
///
/// ENVIRONMENT VARIABLES:
///     TALLY_LOG             Log filter (falls back to RUST_LOG, default "warn")
///     TALLY_DEFER_DELAY_MS  Delay between tests in milliseconds
///     TALLY_FILTER          Default test name filter
///     TALLY_OUTPUT_FORMAT   'text' or 'json'
///     TALLY_NO_HISTORY      Set to '1' to disable prompt history
///     NO_COLOR              Set to disable colored output
#[derive(Parser)]
#[command(name = "tally")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to tally.toml (default: search upward from the current directory)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tests of one namespace
    ///
    /// Registers every test of the namespace whose name matches the filter,
    /// then runs them one after another. Exits with status 1 when any test
    /// fails.
    ///
    /// EXAMPLES:
    ///     tally run                        Run the runtime namespace
    ///     tally run demo                   Run the demo namespace
    ///     tally run runtime '^sync'        Filter by regex
    ///     tally run --json                 Output results as JSON
    ///     tally run --delay 50             Wait 50ms between tests
    #[command(visible_alias = "r")]
    Run {
        /// Namespace to run
        #[arg(default_value = testing::suites::DEFAULT_NAMESPACE)]
        namespace: String,
        /// Only run tests whose names match this pattern
        filter: Option<String>,
        /// Output results in JSON format
        #[arg(long)]
        json: bool,
        /// Disable colored output
        #[arg(long)]
        no_color: bool,
        /// Show elapsed time for each test
        #[arg(long, short = 'v')]
        verbose: bool,
        /// Delay between tests in milliseconds
        #[arg(long, short = 'd')]
        delay: Option<u64>,
    },

    /// List namespaces, their tests, and command bindings
    ///
    /// EXAMPLES:
    ///     tally list                 Everything
    ///     tally list demo            Only the demo namespace
    #[command(visible_alias = "ls")]
    List {
        /// Only show this namespace
        namespace: Option<String>,
    },

    /// Start an interactive prompt
    ///
    /// Each line names a command bound in tally.toml (or a built-in one),
    /// optionally followed by a filter.
    ///
    /// PROMPT COMMANDS:
    ///     :help, :h      Show help
    ///     :list, :l      Show bound commands
    ///     :quit, :q      Exit
    ///
    /// EXAMPLES:
    ///     tally repl                    Start the prompt
    ///     tally repl --no-history       Disable history persistence
    Repl {
        /// Disable history persistence
        #[arg(long, env = "TALLY_NO_HISTORY")]
        no_history: bool,
        /// Show elapsed time for each test
        #[arg(long, short = 'v')]
        verbose: bool,
    },

    /// Generate shell completions
    ///
    /// EXAMPLES:
    ///     tally completions bash > ~/.local/share/bash-completion/completions/tally
    ///     tally completions zsh > ~/.zfunc/_tally
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TALLY_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<tally_config::Config> {
    let loader = tally_config::ConfigLoader::new();
    let config = match path {
        Some(path) => loader.load_from_file(path),
        None => loader.load_from_directory(&std::env::current_dir()?),
    };
    config.context("failed to load tally.toml")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cli_config = config::Config::from_env();
    let config = load_config(cli.config.as_ref())?;
    if let Some(root) = config.project_root() {
        tracing::debug!(root = %root.display(), "loaded project config");
    }

    match cli.command {
        Commands::Run {
            namespace,
            filter,
            json,
            no_color,
            verbose,
            delay,
        } => {
            let args = commands::run::RunArgs {
                namespace,
                filter,
                verbose,
                no_color: no_color || cli_config.no_color,
                json,
                delay_ms: delay,
            };
            let summary = commands::run::run(args, &config)?;
            if !summary.is_success() {
                std::process::exit(1);
            }
        }
        Commands::List { namespace } => {
            commands::list::run(namespace.as_deref(), &config)?;
        }
        Commands::Repl {
            no_history,
            verbose,
        } => {
            commands::repl::run(no_history, verbose, &cli_config, &config)?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
        }
    }

    Ok(())
}
