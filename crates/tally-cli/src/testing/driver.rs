//! Host loop - drive a runner on a tokio `LocalSet` until it summarizes

use crate::testing::reporter::{RunSummary, TestReporter};
use anyhow::{Context, Result};
use std::time::Duration;
use tally_runner::{CommandError, CommandTable, LocalScheduler, TestRunner, TestSuite};
use tokio::runtime::Runtime;
use tokio::task::LocalSet;

/// A runner bound to a current-thread runtime
///
/// Every run is driven to its summary before control returns. A test that
/// never reports blocks forever; there is no timeout.
pub struct Session {
    runtime: Runtime,
    local: LocalSet,
    runner: TestRunner,
    reporter: TestReporter,
}

impl Session {
    /// Create a session whose runner waits `delay` between tests
    pub fn new(reporter: TestReporter, delay: Duration) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start the tokio runtime")?;
        let runner = TestRunner::new(reporter.clone(), LocalScheduler::new().with_delay(delay));

        Ok(Self {
            runtime,
            local: LocalSet::new(),
            runner,
            reporter,
        })
    }

    /// Register the matching tests of `suite` and run them
    pub fn run_suite(&self, suite: &TestSuite, filter: Option<&str>) -> RunSummary {
        let Self {
            runtime,
            local,
            runner,
            reporter,
        } = self;

        local.block_on(runtime, async {
            runner.register_filtered(suite, filter);
            runner.start();
            reporter.finished().await
        })
    }

    /// Dispatch a command line through `table` and wait for the run
    pub fn dispatch(&self, table: &CommandTable, line: &str) -> Result<RunSummary, CommandError> {
        let Self {
            runtime,
            local,
            runner,
            reporter,
        } = self;

        local.block_on(runtime, async {
            table.dispatch(runner, line)?;
            Ok::<_, CommandError>(reporter.finished().await)
        })
    }

    pub fn reporter(&self) -> &TestReporter {
        &self.reporter
    }
}
