//! Selection algorithm registry
//!
//! Maps persisted algorithm names to concrete strategies.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::block_randomization::BlockRandomization;
use super::weighted_sample::WeightedSample;
use crate::domain::experiment::SelectionAlgorithm;
use crate::domain::DomainError;

/// A strategy resolved from the registry together with its registered name
#[derive(Debug, Clone)]
pub struct ResolvedAlgorithm {
    pub name: String,
    pub algorithm: Arc<dyn SelectionAlgorithm>,
}

/// Registry of selection strategies keyed by name
#[derive(Debug, Clone)]
pub struct AlgorithmRegistry {
    algorithms: HashMap<String, Arc<dyn SelectionAlgorithm>>,
    default_name: String,
}

impl AlgorithmRegistry {
    /// Create an empty registry whose default is `default_name`
    pub fn new(default_name: impl Into<String>) -> Self {
        Self {
            algorithms: HashMap::new(),
            default_name: default_name.into(),
        }
    }

    /// Create a registry holding the built-in strategies
    pub fn with_builtins() -> Self {
        Self::new(WeightedSample::NAME)
            .with_algorithm(WeightedSample::NAME, Arc::new(WeightedSample::new()))
            .with_algorithm(BlockRandomization::NAME, Arc::new(BlockRandomization::new()))
    }

    /// Register a strategy under a name, replacing any previous one
    pub fn with_algorithm(
        mut self,
        name: impl Into<String>,
        algorithm: Arc<dyn SelectionAlgorithm>,
    ) -> Self {
        let name = name.into();
        debug!(algorithm = %name, "Registering selection algorithm");
        self.algorithms.insert(name, algorithm);
        self
    }

    /// Change the process-wide default strategy
    pub fn with_default(mut self, name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();

        if !self.algorithms.contains_key(&name) {
            return Err(unknown_algorithm(&name));
        }

        self.default_name = name;
        Ok(self)
    }

    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.algorithms.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve a strategy by name, falling back to the default when unset
    pub fn resolve(&self, name: Option<&str>) -> Result<ResolvedAlgorithm, DomainError> {
        let name = name.unwrap_or(&self.default_name);

        self.algorithms
            .get(name)
            .map(|algorithm| ResolvedAlgorithm {
                name: name.to_string(),
                algorithm: Arc::clone(algorithm),
            })
            .ok_or_else(|| unknown_algorithm(name))
    }
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn unknown_algorithm(name: &str) -> DomainError {
    DomainError::configuration(format!("Unknown selection algorithm: {}", name))
}
