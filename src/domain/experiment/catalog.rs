//! Statically declared experiment definitions

use std::fmt::Debug;

#[cfg(test)]
use mockall::automock;

use super::alternative::AlternativeInput;

/// A statically declared experiment, used when no alternatives are supplied
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentDefinition {
    pub alternatives: Vec<AlternativeInput>,
    pub goals: Vec<String>,
    pub algorithm: Option<String>,
    pub resettable: bool,
}

impl ExperimentDefinition {
    /// Create a resettable definition with the given alternatives
    pub fn new<I, A>(alternatives: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<AlternativeInput>,
    {
        Self {
            alternatives: alternatives.into_iter().map(Into::into).collect(),
            goals: Vec::new(),
            algorithm: None,
            resettable: true,
        }
    }

    /// Set the goals
    pub fn with_goals<I, S>(mut self, goals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.goals = goals.into_iter().map(Into::into).collect();
        self
    }

    /// Set the selection algorithm by registered name
    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = Some(algorithm.into());
        self
    }

    /// Set the resettable flag
    pub fn with_resettable(mut self, resettable: bool) -> Self {
        self.resettable = resettable;
        self
    }
}

/// Resolves statically declared experiments by name
#[cfg_attr(test, automock)]
pub trait ExperimentCatalog: Send + Sync + Debug {
    /// Get the declared definition for an experiment, if any
    fn experiment_for(&self, name: &str) -> Option<ExperimentDefinition>;
}
