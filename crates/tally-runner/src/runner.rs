//! Test runner - sequential execution with deferred continuations
//!
//! A [`TestRunner`] owns an ordered queue of tests and the results reported so
//! far. [`TestRunner::start`] runs the first test; every report either
//! finalizes the round or asks the [`Scheduler`] to run the next test on a
//! later turn. Exactly one test is in flight at any time.
//!
//! A test that never reports leaves the runner in [`RunPhase::Running`]
//! forever. There is no timeout.

use crate::outcome::Outcome;
use crate::scheduler::Scheduler;
use crate::sink::{OutputSink, RunEvent};
use crate::suite::{NameFilter, TestAction, TestSuite};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Instant;

/// Whether a round is in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Running,
}

/// A registered test
#[derive(Clone)]
struct TestCase {
    name: String,
    action: TestAction,
}

struct RunState {
    queue: Vec<TestCase>,
    /// 1-based index -> outcome
    results: BTreeMap<usize, Outcome>,
    phase: RunPhase,
    /// Bumped by every `start`; reporters and continuations from an older
    /// round carry a stale value and are ignored.
    generation: u64,
    started_at: Option<Instant>,
}

struct RunnerInner {
    state: RefCell<RunState>,
    sink: Box<dyn OutputSink>,
    scheduler: Box<dyn Scheduler>,
}

/// Sequential asynchronous test runner
///
/// Cloning yields another handle to the same runner. Independent runners are
/// created with [`TestRunner::new`].
#[derive(Clone)]
pub struct TestRunner {
    inner: Rc<RunnerInner>,
}

impl TestRunner {
    /// Create an idle runner with an empty queue
    pub fn new<S, D>(sink: S, scheduler: D) -> Self
    where
        S: OutputSink + 'static,
        D: Scheduler + 'static,
    {
        Self {
            inner: Rc::new(RunnerInner {
                state: RefCell::new(RunState {
                    queue: Vec::new(),
                    results: BTreeMap::new(),
                    phase: RunPhase::Idle,
                    generation: 0,
                    started_at: None,
                }),
                sink: Box::new(sink),
                scheduler: Box::new(scheduler),
            }),
        }
    }

    /// Append a test to the end of the queue
    pub fn register<F>(&self, name: impl Into<String>, action: F)
    where
        F: Fn(Reporter) + 'static,
    {
        self.push(name.into(), Rc::new(action));
    }

    /// Register the tests of `suite` whose names match `filter`
    ///
    /// Returns how many tests were added.
    pub fn register_filtered(&self, suite: &TestSuite, filter: Option<&str>) -> usize {
        let filter = NameFilter::new(filter);
        let mut added = 0;
        for (name, action) in suite.matching(&filter) {
            self.push(name.to_string(), action.clone());
            added += 1;
        }
        tracing::debug!(added, total = suite.len(), "registered filtered suite");
        added
    }

    fn push(&self, name: String, action: TestAction) {
        let mut state = self.inner.state.borrow_mut();
        if state.phase == RunPhase::Running {
            tracing::warn!(test = %name, "registering while a run is in progress extends the current run");
        }
        state.queue.push(TestCase { name, action });
    }

    /// Begin a round over the registered tests
    ///
    /// With an empty queue this finalizes immediately with a 0/0 summary.
    /// Calling it while a round is running does nothing.
    pub fn start(&self) {
        let first = {
            let mut state = self.inner.state.borrow_mut();
            if state.phase == RunPhase::Running {
                tracing::warn!(
                    completed = state.results.len(),
                    total = state.queue.len(),
                    "start ignored, a run is already in progress"
                );
                return;
            }
            state.generation += 1;
            state.results.clear();
            if state.queue.is_empty() {
                None
            } else {
                state.phase = RunPhase::Running;
                tracing::info!(total = state.queue.len(), "starting test run");
                Some(state.generation)
            }
        };

        match first {
            Some(generation) => execute(&self.inner, 1, generation),
            None => finalize(&self.inner),
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.inner.state.borrow().phase
    }

    pub fn is_running(&self) -> bool {
        self.phase() == RunPhase::Running
    }

    /// Number of registered tests
    pub fn len(&self) -> usize {
        self.inner.state.borrow().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of tests that have reported in the current round
    pub fn completed(&self) -> usize {
        self.inner.state.borrow().results.len()
    }
}

impl fmt::Debug for TestRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("TestRunner")
            .field("phase", &state.phase)
            .field("queued", &state.queue.len())
            .field("completed", &state.results.len())
            .finish()
    }
}

/// One-shot completion handle passed to a test
///
/// Consumed by [`Reporter::report`], so each handle reports at most once.
/// Dropping it without reporting stalls the run.
pub struct Reporter {
    runner: Weak<RunnerInner>,
    index: usize,
    generation: u64,
    reported: bool,
}

impl Reporter {
    /// 1-based position of the test this reporter belongs to
    pub fn index(&self) -> usize {
        self.index
    }

    /// Report the outcome of the test
    ///
    /// Anything other than an explicit `true` is recorded as a failure.
    pub fn report(mut self, outcome: impl Into<Outcome>) {
        self.reported = true;
        let outcome = outcome.into();
        match self.runner.upgrade() {
            Some(inner) => report(&inner, self.index, self.generation, outcome),
            None => tracing::debug!(index = self.index, "runner dropped before report"),
        }
    }

    pub fn pass(self) {
        self.report(true)
    }

    pub fn fail(self) {
        self.report(false)
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        if self.reported || std::thread::panicking() {
            return;
        }
        let Some(inner) = self.runner.upgrade() else {
            return;
        };
        let Ok(state) = inner.state.try_borrow() else {
            return;
        };
        if state.generation == self.generation && state.phase == RunPhase::Running {
            let name = state
                .queue
                .get(self.index - 1)
                .map(|case| case.name.as_str())
                .unwrap_or("<unknown>");
            tracing::warn!(
                index = self.index,
                test = name,
                "reporter dropped without reporting, the run cannot complete"
            );
        }
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("index", &self.index)
            .field("generation", &self.generation)
            .finish()
    }
}

/// Run the test at `index` (1-based) and return without waiting for it.
fn execute(inner: &Rc<RunnerInner>, index: usize, generation: u64) {
    let case = {
        let mut state = inner.state.borrow_mut();
        if state.generation != generation || state.phase != RunPhase::Running {
            tracing::debug!(index, "skipping continuation from a finished run");
            return;
        }
        let Some(case) = state.queue.get(index - 1).cloned() else {
            tracing::warn!(index, "no test registered at this position");
            return;
        };
        state.started_at = Some(Instant::now());
        case
    };

    tracing::debug!(index, test = %case.name, "starting test");
    inner.sink.emit(&RunEvent::Started {
        index,
        name: &case.name,
    });

    let reporter = Reporter {
        runner: Rc::downgrade(inner),
        index,
        generation,
        reported: false,
    };
    (case.action)(reporter);
}

enum Next {
    Execute(usize),
    Finalize,
}

fn report(inner: &Rc<RunnerInner>, index: usize, generation: u64, outcome: Outcome) {
    let (name, elapsed) = {
        let state = inner.state.borrow();
        if state.generation != generation || state.phase != RunPhase::Running {
            tracing::warn!(index, %outcome, "ignoring report from a finished run");
            return;
        }
        if state.results.contains_key(&index) {
            tracing::warn!(index, %outcome, "ignoring duplicate report");
            return;
        }
        let name = state
            .queue
            .get(index - 1)
            .map(|case| case.name.clone())
            .unwrap_or_default();
        let elapsed = state
            .started_at
            .map(|at| at.elapsed())
            .unwrap_or_default();
        (name, elapsed)
    };

    tracing::debug!(index, test = %name, %outcome, ?elapsed, "test reported");
    inner.sink.emit(&RunEvent::Reported {
        index,
        name: &name,
        outcome,
        elapsed,
    });

    let next = {
        let mut state = inner.state.borrow_mut();
        state.results.insert(index, outcome);
        state.started_at = None;
        if state.results.len() == state.queue.len() {
            Next::Finalize
        } else {
            Next::Execute(index + 1)
        }
    };

    match next {
        Next::Finalize => finalize(inner),
        Next::Execute(next_index) => {
            let runner = Rc::downgrade(inner);
            inner.scheduler.defer(Box::new(move || {
                if let Some(inner) = runner.upgrade() {
                    execute(&inner, next_index, generation);
                }
            }));
        }
    }
}

/// Print per-test lines and the summary, then reset for the next round.
fn finalize(inner: &Rc<RunnerInner>) {
    let (queue, results) = {
        let mut state = inner.state.borrow_mut();
        state.phase = RunPhase::Idle;
        state.started_at = None;
        (
            std::mem::take(&mut state.queue),
            std::mem::take(&mut state.results),
        )
    };

    let mut passed = 0;
    for (offset, case) in queue.iter().enumerate() {
        let outcome = results
            .get(&(offset + 1))
            .copied()
            .unwrap_or(Outcome::Failed);
        if outcome.is_pass() {
            passed += 1;
        }
        inner.sink.emit(&RunEvent::Finished {
            name: &case.name,
            outcome,
        });
    }

    let total = queue.len();
    tracing::info!(passed, total, "test run finished");
    inner.sink.emit(&RunEvent::Summary { passed, total });
}
