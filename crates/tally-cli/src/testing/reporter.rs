//! Test reporter - display test results
//!
//! [`TestReporter`] is the output sink handed to the runner. In text mode it
//! prints every line as it arrives; in JSON mode it stays quiet and collects
//! records for a single document printed at the end. Either way it tracks
//! the summary so the host loop can wait for a run to finish.

use colored::*;
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tally_runner::{OutputSink, Outcome, RunEvent};
use tokio::sync::Notify;

/// Counts from the summary line of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub passed: usize,
    pub total: usize,
}

impl RunSummary {
    pub fn failed(&self) -> usize {
        self.total - self.passed
    }

    pub fn is_success(&self) -> bool {
        self.passed == self.total
    }
}

/// One reported test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestRecord {
    pub index: usize,
    pub name: String,
    pub passed: bool,
    pub duration_ms: u128,
}

#[derive(Default)]
struct Progress {
    records: RefCell<Vec<TestRecord>>,
    summary: Cell<Option<RunSummary>>,
    finished: Notify,
}

/// Test reporter with output configuration
#[derive(Clone)]
pub struct TestReporter {
    /// Show elapsed time on result lines
    verbose: bool,
    /// Collect instead of printing
    json: bool,
    progress: Rc<Progress>,
}

impl Default for TestReporter {
    fn default() -> Self {
        Self::new(false)
    }
}

impl TestReporter {
    /// Create a new test reporter
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            json: false,
            progress: Rc::new(Progress::default()),
        }
    }

    /// Collect results for a JSON document instead of printing lines
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Wait until the current run prints its summary
    pub async fn finished(&self) -> RunSummary {
        loop {
            if let Some(summary) = self.progress.summary.take() {
                return summary;
            }
            self.progress.finished.notified().await;
        }
    }

    /// Records collected since the last call
    pub fn take_records(&self) -> Vec<TestRecord> {
        std::mem::take(&mut *self.progress.records.borrow_mut())
    }

    /// JSON document for a finished run
    pub fn json_report(&self, namespace: &str, summary: RunSummary) -> serde_json::Value {
        serde_json::json!({
            "namespace": namespace,
            "tests": summary.total,
            "passed": summary.passed,
            "failed": summary.failed(),
            "results": self.take_records(),
        })
    }

    fn print_event(&self, event: &RunEvent<'_>) {
        match event {
            RunEvent::Started { index, name } => {
                println!("{} {}", format!("Running test #{}:", index).dimmed(), name);
            }
            RunEvent::Reported {
                index,
                outcome,
                elapsed,
                ..
            } => {
                if self.verbose {
                    println!("Test #{} {} ({:.2?})", index, paint(*outcome), elapsed);
                } else {
                    println!("Test #{} {}", index, paint(*outcome));
                }
            }
            RunEvent::Finished { name, outcome } => {
                println!("{}: {}", paint(*outcome), name);
            }
            RunEvent::Summary { passed, total } => {
                let line = event.to_string();
                if passed == total {
                    println!("{}", line.green().bold());
                } else {
                    println!("{}", line.red().bold());
                }
            }
        }
    }
}

impl OutputSink for TestReporter {
    fn emit(&self, event: &RunEvent<'_>) {
        match event {
            RunEvent::Reported {
                index,
                name,
                outcome,
                elapsed,
            } => {
                self.progress.records.borrow_mut().push(TestRecord {
                    index: *index,
                    name: name.to_string(),
                    passed: outcome.is_pass(),
                    duration_ms: elapsed.as_millis(),
                });
            }
            RunEvent::Summary { passed, total } => {
                self.progress.summary.set(Some(RunSummary {
                    passed: *passed,
                    total: *total,
                }));
                self.progress.finished.notify_one();
            }
            _ => {}
        }

        if !self.json {
            self.print_event(event);
        }
    }
}

fn paint(outcome: Outcome) -> ColoredString {
    match outcome {
        Outcome::Passed => outcome.label().green().bold(),
        Outcome::Failed => outcome.label().red().bold(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn reported(index: usize, name: &str, outcome: Outcome) -> RunEvent<'_> {
        RunEvent::Reported {
            index,
            name,
            outcome,
            elapsed: Duration::from_millis(3),
        }
    }

    #[test]
    fn test_reporter_collects_records() {
        let reporter = TestReporter::new(false).with_json(true);
        reporter.emit(&RunEvent::Started { index: 1, name: "a" });
        reporter.emit(&reported(1, "a", Outcome::Passed));
        reporter.emit(&reported(2, "b", Outcome::Failed));

        let records = reporter.take_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "a");
        assert!(records[0].passed);
        assert!(!records[1].passed);
        assert_eq!(records[1].duration_ms, 3);
        assert!(reporter.take_records().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_reporter_finished_after_summary() {
        let reporter = TestReporter::new(false).with_json(true);
        reporter.emit(&RunEvent::Summary { passed: 1, total: 2 });

        let summary = reporter.finished().await;
        assert_eq!(summary, RunSummary { passed: 1, total: 2 });
        assert_eq!(summary.failed(), 1);
        assert!(!summary.is_success());
    }

    #[test]
    fn test_json_report_shape() {
        let reporter = TestReporter::new(false).with_json(true);
        reporter.emit(&reported(1, "always_passes", Outcome::Passed));

        let report = reporter.json_report("demo", RunSummary { passed: 1, total: 1 });
        insta::assert_json_snapshot!(report, @r###"
        {
          "failed": 0,
          "namespace": "demo",
          "passed": 1,
          "results": [
            {
              "duration_ms": 3,
              "index": 1,
              "name": "always_passes",
              "passed": true
            }
          ],
          "tests": 1
        }
        "###);
    }

    #[test]
    fn test_reporter_text_mode_does_not_panic() {
        colored::control::set_override(false);
        let reporter = TestReporter::new(true);
        reporter.emit(&RunEvent::Started { index: 1, name: "a" });
        reporter.emit(&reported(1, "a", Outcome::Passed));
        reporter.emit(&RunEvent::Finished {
            name: "a",
            outcome: Outcome::Passed,
        });
        reporter.emit(&RunEvent::Summary { passed: 1, total: 1 });
        colored::control::unset_override();
    }
}
