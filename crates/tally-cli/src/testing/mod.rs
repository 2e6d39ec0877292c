//! Test hosting for the tally CLI
//!
//! Provides the built-in suites, the tokio host loop that drives a runner to
//! completion, and the console/JSON reporter.

pub mod driver;
pub mod reporter;
pub mod suites;

pub use driver::Session;
pub use reporter::{RunSummary, TestReporter};
