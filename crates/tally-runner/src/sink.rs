//! Output sink - where the runner sends its lines
//!
//! The runner never formats for a terminal. It emits one [`RunEvent`] per
//! line, and the event's `Display` impl is the canonical plain-text line.
//! Hosts that want color or structured output match on the variant instead.

use crate::outcome::Outcome;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// A single line of runner output
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent<'a> {
    /// Test at `index` (1-based) is about to run
    Started { index: usize, name: &'a str },
    /// Test at `index` reported its outcome
    Reported {
        index: usize,
        name: &'a str,
        outcome: Outcome,
        elapsed: Duration,
    },
    /// Per-test line printed during finalize, in registration order
    Finished { name: &'a str, outcome: Outcome },
    /// Last line of a run
    Summary { passed: usize, total: usize },
}

impl fmt::Display for RunEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunEvent::Started { index, name } => write!(f, "Running test #{}: {}", index, name),
            RunEvent::Reported { index, outcome, .. } => write!(f, "Test #{} {}", index, outcome),
            RunEvent::Finished { name, outcome } => write!(f, "{}: {}", outcome, name),
            RunEvent::Summary { passed, total } => {
                write!(f, "Total {}/{} tests passed.", passed, total)
            }
        }
    }
}

/// Line-oriented sink consumed by the runner
pub trait OutputSink {
    fn emit(&self, event: &RunEvent<'_>);
}

impl<F> OutputSink for F
where
    F: Fn(&RunEvent<'_>),
{
    fn emit(&self, event: &RunEvent<'_>) {
        self(event)
    }
}

/// Sink that records every rendered line
///
/// Clones share the same buffer, so one clone can be handed to the runner
/// while another is kept for inspection.
#[derive(Debug, Clone, Default)]
pub struct CaptureSink {
    lines: Rc<RefCell<Vec<String>>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines captured so far
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    /// Remove and return the captured lines
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.borrow_mut())
    }
}

impl OutputSink for CaptureSink {
    fn emit(&self, event: &RunEvent<'_>) {
        self.lines.borrow_mut().push(event.to_string());
    }
}
