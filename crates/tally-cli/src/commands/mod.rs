//! CLI command implementations

pub mod list;
pub mod repl;
pub mod run;
