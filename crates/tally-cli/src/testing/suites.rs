//! Built-in suites and the default command table
//!
//! `runtime` checks the continuation engine itself against the tokio host
//! loop. `demo` shows what passing, failing and value-less reports look like.

use anyhow::{Context, Result};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use tally_config::CommandConfig;
use tally_runner::{CommandTable, Reporter, TestSuite};

/// Namespace run when none is given
pub const DEFAULT_NAMESPACE: &str = "runtime";

/// Commands bound before any from tally.toml
const DEFAULT_COMMANDS: &[(&str, &str)] = &[("selftest", "runtime"), ("demo", "demo")];

/// Self-checks of the async continuation engine
pub fn runtime_suite() -> TestSuite {
    // Set by one test, read by the next: proves the previous test's spawned
    // work finished before the next test started.
    let handoff = Rc::new(Cell::new(false));
    let writer = handoff.clone();

    TestSuite::new()
        .with_test("sync_report", |r: Reporter| r.pass())
        .with_test("timer_report", |r: Reporter| {
            tokio::task::spawn_local(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                r.pass();
            });
        })
        .with_test("spawned_task_report", |r: Reporter| {
            tokio::task::spawn_local(async move {
                let answer = tokio::task::spawn_local(async { 21 * 2 }).await;
                r.report(matches!(answer, Ok(42)));
            });
        })
        .with_test("channel_report", |r: Reporter| {
            let (tx, rx) = tokio::sync::oneshot::channel();
            tokio::task::spawn_local(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                let _ = tx.send("pong");
            });
            tokio::task::spawn_local(async move {
                r.report(matches!(rx.await, Ok("pong")));
            });
        })
        .with_test("handoff_write", move |r: Reporter| {
            let writer = writer.clone();
            tokio::task::spawn_local(async move {
                tokio::task::yield_now().await;
                writer.set(true);
                r.pass();
            });
        })
        .with_test("handoff_read", move |r: Reporter| r.report(handoff.replace(false)))
}

/// A small suite with one pass, one fail, and one report without a value
pub fn demo_suite() -> TestSuite {
    TestSuite::new()
        .with_test("always_passes", |r: Reporter| r.pass())
        .with_test("always_fails", |r: Reporter| r.fail())
        .with_test("reports_nothing", |r: Reporter| r.report(()))
}

/// Built-in namespaces with the default bindings plus any from tally.toml
pub fn command_table(extra: &[CommandConfig]) -> Result<CommandTable> {
    let mut table = CommandTable::new();
    table.add_suite("runtime", runtime_suite());
    table.add_suite("demo", demo_suite());

    for (command, namespace) in DEFAULT_COMMANDS {
        table.bind(*command, *namespace)?;
    }
    for command in extra {
        table
            .bind(command.name.as_str(), command.namespace.as_str())
            .with_context(|| format!("cannot bind command '{}'", command.name))?;
    }
    Ok(table)
}
