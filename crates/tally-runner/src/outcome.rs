//! Test outcomes and their normalization.

use std::fmt;

/// Final state of a single test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Passed,
    Failed,
}

impl Outcome {
    /// Check if this outcome is a pass
    pub fn is_pass(self) -> bool {
        matches!(self, Outcome::Passed)
    }

    /// Token printed in every line that mentions this outcome
    pub fn label(self) -> &'static str {
        match self {
            Outcome::Passed => "PASSED",
            Outcome::Failed => "FAILED",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<bool> for Outcome {
    fn from(passed: bool) -> Self {
        if passed {
            Outcome::Passed
        } else {
            Outcome::Failed
        }
    }
}

/// An absent value counts as a failure.
impl From<Option<bool>> for Outcome {
    fn from(value: Option<bool>) -> Self {
        Outcome::from(value.unwrap_or(false))
    }
}

/// Reporting with no value at all counts as a failure.
impl From<()> for Outcome {
    fn from(_: ()) -> Self {
        Outcome::Failed
    }
}
