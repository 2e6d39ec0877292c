//! Tally - a sequential asynchronous test runner
//!
//! Tests are registered by name with an action that receives a one-shot
//! [`Reporter`]. A run executes them strictly one at a time, in registration
//! order. Each test may report synchronously or from any later turn of the
//! host's event loop; the runner moves on only after the report arrives, and
//! always through the injected [`Scheduler`] rather than inline.
//!
//! # Example
//!
//! ```
//! use tally_runner::{CaptureSink, ManualScheduler, Reporter, TestRunner};
//!
//! let sink = CaptureSink::new();
//! let scheduler = ManualScheduler::new();
//! let runner = TestRunner::new(sink.clone(), scheduler.clone());
//!
//! runner.register("adds", |r: Reporter| r.report(1 + 1 == 2));
//! runner.register("fails", |r: Reporter| r.fail());
//! runner.start();
//! scheduler.run_until_idle();
//!
//! assert_eq!(sink.lines().last().unwrap(), "Total 1/2 tests passed.");
//! ```

pub mod command;
pub mod outcome;
pub mod runner;
pub mod scheduler;
pub mod sink;
pub mod suite;

pub use command::{CommandError, CommandTable, Invocation};
pub use outcome::Outcome;
pub use runner::{Reporter, RunPhase, TestRunner};
pub use scheduler::{Continuation, LocalScheduler, ManualScheduler, Scheduler};
pub use sink::{CaptureSink, OutputSink, RunEvent};
pub use suite::{NameFilter, TestAction, TestSuite};

/// Tally version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
