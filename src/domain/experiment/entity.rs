//! Experiment domain entities

use serde::Serialize;

use super::alternative::{expand_alternative_inputs, Alternative, AlternativeInput};
use super::validation::base_experiment_name;
use crate::domain::store::{experiment_config_key, goals_key, versioned_key};
use crate::domain::DomainError;

// ============================================================================
// ExperimentOptions
// ============================================================================

/// Desired definition supplied when constructing an experiment
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentOptions {
    pub alternatives: Vec<AlternativeInput>,
    pub goals: Option<Vec<String>>,
    pub algorithm: Option<String>,
    pub resettable: bool,
}

impl Default for ExperimentOptions {
    fn default() -> Self {
        Self {
            alternatives: Vec::new(),
            goals: None,
            algorithm: None,
            resettable: true,
        }
    }
}

impl ExperimentOptions {
    /// Create options with no alternatives
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the alternatives
    pub fn with_alternatives<I, A>(mut self, alternatives: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<AlternativeInput>,
    {
        self.alternatives = alternatives.into_iter().map(Into::into).collect();
        self
    }

    /// Set the goals
    pub fn with_goals<I, S>(mut self, goals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.goals = Some(goals.into_iter().map(Into::into).collect());
        self
    }

    /// Set the selection algorithm by registered name
    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = Some(algorithm.into());
        self
    }

    /// Set whether the experiment may be reset by assignment code
    pub fn with_resettable(mut self, resettable: bool) -> Self {
        self.resettable = resettable;
        self
    }
}

// ============================================================================
// ExperimentLabel
// ============================================================================

/// Label used by `find_or_create`: a bare name, or a name with inline goals
#[derive(Debug, Clone, PartialEq)]
pub enum ExperimentLabel {
    Name(String),
    WithGoals { name: String, goals: Vec<String> },
}

impl ExperimentLabel {
    /// Create a label declaring goals inline
    pub fn with_goals<I, S>(name: impl Into<String>, goals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::WithGoals {
            name: name.into(),
            goals: goals.into_iter().map(Into::into).collect(),
        }
    }

    /// Split into the unversioned experiment name and its goals
    pub fn into_parts(self) -> (String, Vec<String>) {
        let (label, goals) = match self {
            Self::Name(name) => (name, Vec::new()),
            Self::WithGoals { name, goals } => (name, goals),
        };

        (base_experiment_name(&label).to_string(), goals)
    }
}

impl From<&str> for ExperimentLabel {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for ExperimentLabel {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

// ============================================================================
// Experiment
// ============================================================================

/// A named, versioned bundle of alternatives persisted in the key-value store
///
/// Instances are disposable views. The store is the only source of truth;
/// the sole cached value is the generation counter, memoized on first read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Experiment {
    name: String,
    alternatives: Vec<Alternative>,
    #[serde(skip_serializing_if = "Option::is_none")]
    goals: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    algorithm: Option<String>,
    resettable: bool,
    #[serde(skip)]
    version: Option<u64>,
}

impl Experiment {
    /// Create an experiment with no alternatives
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alternatives: Vec::new(),
            goals: None,
            algorithm: None,
            resettable: true,
            version: None,
        }
    }

    /// Create an experiment from explicit options, without any fallback
    pub fn from_options(
        name: impl Into<String>,
        options: ExperimentOptions,
    ) -> Result<Self, DomainError> {
        let mut experiment = Self::new(name);
        experiment.set_alternatives(options.alternatives)?;
        experiment.goals = options.goals;
        experiment.algorithm = options.algorithm;
        experiment.resettable = options.resettable;
        Ok(experiment)
    }

    // Getters

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alternatives(&self) -> &[Alternative] {
        &self.alternatives
    }

    /// Alternative names in declared order
    pub fn alternative_names(&self) -> Vec<String> {
        self.alternatives
            .iter()
            .map(|a| a.name().to_string())
            .collect()
    }

    pub fn goals(&self) -> Option<&[String]> {
        self.goals.as_deref()
    }

    /// Registered name of the selection algorithm, if one was chosen
    pub fn algorithm(&self) -> Option<&str> {
        self.algorithm.as_deref()
    }

    pub fn resettable(&self) -> bool {
        self.resettable
    }

    /// The control is the first declared alternative
    pub fn control(&self) -> Option<&Alternative> {
        self.alternatives.first()
    }

    /// Look up an alternative by name
    pub fn alternative(&self, name: &str) -> Option<&Alternative> {
        self.alternatives.iter().find(|a| a.name() == name)
    }

    /// Generation counter if it has already been read from the store
    pub fn cached_version(&self) -> Option<u64> {
        self.version
    }

    /// Event namespace for the given generation
    pub fn key_for_version(&self, version: u64) -> String {
        versioned_key(&self.name, version)
    }

    pub fn goals_key(&self) -> String {
        goals_key(&self.name)
    }

    pub fn config_key(&self) -> String {
        experiment_config_key(&self.name)
    }

    // Setters

    /// Replace the alternatives, expanding a sole mapping declaration
    pub fn set_alternatives(&mut self, inputs: Vec<AlternativeInput>) -> Result<(), DomainError> {
        self.alternatives = expand_alternative_inputs(inputs)
            .into_iter()
            .map(|input| Alternative::from_input(input, &self.name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(())
    }

    pub fn set_goals(&mut self, goals: Option<Vec<String>>) {
        self.goals = goals;
    }

    pub fn set_algorithm(&mut self, algorithm: Option<String>) {
        self.algorithm = algorithm;
    }

    pub fn set_resettable(&mut self, resettable: bool) {
        self.resettable = resettable;
    }

    pub(crate) fn cache_version(&mut self, version: u64) {
        self.version = Some(version);
    }
}
