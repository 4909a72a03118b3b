//! Alternative entity and the inputs it is declared from

use serde::Serialize;

use crate::domain::store::{alternative_key, is_reserved_alternative_name};
use crate::domain::DomainError;

/// Default selection weight for an alternative declared by name only
pub const DEFAULT_WEIGHT: f64 = 1.0;

// ============================================================================
// AlternativeInput
// ============================================================================

/// How a caller declares an alternative
#[derive(Debug, Clone, PartialEq)]
pub enum AlternativeInput {
    /// A bare name with the default weight
    Name(String),
    /// A name with an explicit weight
    Weighted(String, f64),
    /// A name -> weight mapping
    ///
    /// As the only element of a declaration it expands into one alternative
    /// per entry. Anywhere else it must hold exactly one entry.
    Mapping(Vec<(String, f64)>),
}

impl AlternativeInput {
    /// Create a mapping input from name/weight pairs
    pub fn mapping<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self::Mapping(
            entries
                .into_iter()
                .map(|(name, weight)| (name.into(), weight))
                .collect(),
        )
    }
}

impl From<&str> for AlternativeInput {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for AlternativeInput {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<(&str, f64)> for AlternativeInput {
    fn from((name, weight): (&str, f64)) -> Self {
        Self::Weighted(name.to_string(), weight)
    }
}

impl From<(String, f64)> for AlternativeInput {
    fn from((name, weight): (String, f64)) -> Self {
        Self::Weighted(name, weight)
    }
}

/// Expand a sole mapping declaration into one weighted input per entry
pub fn expand_alternative_inputs(inputs: Vec<AlternativeInput>) -> Vec<AlternativeInput> {
    match <[AlternativeInput; 1]>::try_from(inputs) {
        Ok([AlternativeInput::Mapping(entries)]) => entries
            .into_iter()
            .map(|(name, weight)| AlternativeInput::Weighted(name, weight))
            .collect(),
        Ok([single]) => vec![single],
        Err(inputs) => inputs,
    }
}

// ============================================================================
// Alternative
// ============================================================================

/// One variant of an experiment, owned by exactly one experiment by name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alternative {
    name: String,
    experiment_name: String,
    weight: f64,
}

impl Alternative {
    /// Create an alternative with the default weight
    pub fn new(name: impl Into<String>, experiment_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            experiment_name: experiment_name.into(),
            weight: DEFAULT_WEIGHT,
        }
    }

    /// Set the selection weight
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Build an alternative from a declaration
    pub fn from_input(
        input: AlternativeInput,
        experiment_name: &str,
    ) -> Result<Self, DomainError> {
        match input {
            AlternativeInput::Name(name) => Ok(Self::new(name, experiment_name)),
            AlternativeInput::Weighted(name, weight) => {
                Ok(Self::new(name, experiment_name).with_weight(weight))
            }
            AlternativeInput::Mapping(entries) => match <[(String, f64); 1]>::try_from(entries) {
                Ok([(name, weight)]) => Ok(Self::new(name, experiment_name).with_weight(weight)),
                Err(entries) => Err(DomainError::validation(format!(
                    "Alternative mapping for experiment '{}' must hold exactly one entry, got {}",
                    experiment_name,
                    entries.len()
                ))),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn experiment_name(&self) -> &str {
        &self.experiment_name
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Hash key holding this alternative's counters
    pub fn key(&self) -> String {
        alternative_key(&self.experiment_name, &self.name)
    }

    /// Check the alternative is well formed
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation(format!(
                "Alternative name for experiment '{}' cannot be empty",
                self.experiment_name
            )));
        }

        if is_reserved_alternative_name(&self.name) {
            return Err(DomainError::validation(format!(
                "Alternative name '{}' for experiment '{}' is reserved",
                self.name, self.experiment_name
            )));
        }

        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(DomainError::validation(format!(
                "Alternative '{}' has invalid weight {}",
                self.name, self.weight
            )));
        }

        Ok(())
    }
}
