//! Test suites and name filtering

use crate::runner::Reporter;
use indexmap::IndexMap;
use regex::Regex;
use std::fmt;
use std::rc::Rc;

/// Body of a test: receives the one-shot reporter for its slot
pub type TestAction = Rc<dyn Fn(Reporter)>;

/// An insertion-ordered set of named test actions
///
/// Suites are cheap to clone and are not consumed by registration, so a host
/// can register the same suite on every run.
#[derive(Clone, Default)]
pub struct TestSuite {
    tests: IndexMap<String, TestAction>,
}

impl TestSuite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a test, builder style
    pub fn with_test<F>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(Reporter) + 'static,
    {
        self.insert(name, action);
        self
    }

    /// Add a test. Re-inserting a name replaces its action and keeps its
    /// original position.
    pub fn insert<F>(&mut self, name: impl Into<String>, action: F)
    where
        F: Fn(Reporter) + 'static,
    {
        self.tests.insert(name.into(), Rc::new(action));
    }

    /// Names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tests.keys().map(String::as_str)
    }

    /// Entries whose name passes `filter`, in registration order
    pub fn matching<'a>(
        &'a self,
        filter: &'a NameFilter,
    ) -> impl Iterator<Item = (&'a str, &'a TestAction)> + 'a {
        self.tests
            .iter()
            .filter(move |(name, _)| filter.matches(name))
            .map(|(name, action)| (name.as_str(), action))
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

impl fmt::Debug for TestSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.tests.keys()).finish()
    }
}

/// Name filter used by batch registration
///
/// The pattern is a regular expression matched anywhere in the name. A
/// pattern that does not compile is matched as a literal substring instead.
/// No pattern, or a blank one, matches everything.
#[derive(Debug, Clone, Default)]
pub enum NameFilter {
    #[default]
    All,
    Pattern(Regex),
    Literal(String),
}

impl NameFilter {
    pub fn new(pattern: Option<&str>) -> Self {
        let Some(pattern) = pattern.map(str::trim).filter(|p| !p.is_empty()) else {
            return NameFilter::All;
        };

        match Regex::new(pattern) {
            Ok(regex) => NameFilter::Pattern(regex),
            Err(err) => {
                tracing::debug!(pattern, error = %err, "filter is not a valid regex, matching literally");
                NameFilter::Literal(pattern.to_string())
            }
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            NameFilter::All => true,
            NameFilter::Pattern(regex) => regex.is_match(name),
            NameFilter::Literal(needle) => name.contains(needle.as_str()),
        }
    }
}
