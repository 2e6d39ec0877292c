//! Command table - binds command names to suites
//!
//! Hosts expose runs through named commands. Each command is bound to a
//! namespace, and each namespace holds one [`TestSuite`]. Dispatching an
//! invocation such as `selftest timer` registers the matching tests of the
//! bound suite and starts the runner.

use crate::runner::TestRunner;
use crate::suite::TestSuite;
use indexmap::IndexMap;
use thiserror::Error;

/// Errors raised while binding or dispatching commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command invocation")]
    EmptyInvocation,

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("unknown namespace '{0}'")]
    UnknownNamespace(String),

    #[error("a test run is already in progress")]
    RunInProgress,
}

/// A parsed invocation: command name plus optional filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation<'a> {
    pub command: &'a str,
    pub filter: Option<&'a str>,
}

impl<'a> Invocation<'a> {
    /// Split `"<command> [filter...]"`; the filter is the trimmed remainder.
    pub fn parse(text: &'a str) -> Result<Self, CommandError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CommandError::EmptyInvocation);
        }
        let (command, rest) = match text.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (text, ""),
        };
        Ok(Self {
            command,
            filter: (!rest.is_empty()).then_some(rest),
        })
    }
}

/// Command name -> namespace -> suite
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    suites: IndexMap<String, TestSuite>,
    commands: IndexMap<String, String>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the suite for a namespace
    pub fn add_suite(&mut self, namespace: impl Into<String>, suite: TestSuite) {
        self.suites.insert(namespace.into(), suite);
    }

    /// Bind a command name to an existing namespace
    pub fn bind(
        &mut self,
        command: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Result<(), CommandError> {
        let namespace = namespace.into();
        if !self.suites.contains_key(&namespace) {
            return Err(CommandError::UnknownNamespace(namespace));
        }
        self.commands.insert(command.into(), namespace);
        Ok(())
    }

    /// Register the bound suite (filtered) on `runner` and start it
    ///
    /// Returns the number of tests registered. Nothing is registered when
    /// the runner is already running.
    pub fn dispatch(&self, runner: &TestRunner, invocation: &str) -> Result<usize, CommandError> {
        let invocation = Invocation::parse(invocation)?;
        let namespace = self
            .commands
            .get(invocation.command)
            .ok_or_else(|| CommandError::UnknownCommand(invocation.command.to_string()))?;
        let suite = self
            .suites
            .get(namespace)
            .ok_or_else(|| CommandError::UnknownNamespace(namespace.clone()))?;

        if runner.is_running() {
            return Err(CommandError::RunInProgress);
        }

        tracing::info!(
            command = invocation.command,
            namespace = %namespace,
            filter = invocation.filter.unwrap_or(""),
            "dispatching test command"
        );
        let added = runner.register_filtered(suite, invocation.filter);
        runner.start();
        Ok(added)
    }

    /// Bound command names with their namespaces, in binding order
    pub fn commands(&self) -> impl Iterator<Item = (&str, &str)> {
        self.commands
            .iter()
            .map(|(command, namespace)| (command.as_str(), namespace.as_str()))
    }

    /// Registered namespaces, in insertion order
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.suites.keys().map(String::as_str)
    }

    pub fn suite(&self, namespace: &str) -> Option<&TestSuite> {
        self.suites.get(namespace)
    }
}
