//! Catalog of experiments declared in application configuration

use std::collections::HashMap;

use tracing::debug;

use crate::config::{AlternativeEntryConfig, AlternativesConfig, ExperimentConfig};
use crate::domain::experiment::{
    parse_goals, AlternativeInput, ExperimentCatalog, ExperimentDefinition,
};
use crate::domain::DomainError;

/// Immutable catalog resolved once at configuration-load time
#[derive(Debug, Clone, Default)]
pub struct StaticExperimentCatalog {
    definitions: HashMap<String, ExperimentDefinition>,
}

impl StaticExperimentCatalog {
    /// Create a catalog with no declared experiments
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a catalog from already resolved definitions
    pub fn with_definitions<I, S>(definitions: I) -> Self
    where
        I: IntoIterator<Item = (S, ExperimentDefinition)>,
        S: Into<String>,
    {
        Self {
            definitions: definitions
                .into_iter()
                .map(|(name, definition)| (name.into(), definition))
                .collect(),
        }
    }

    /// Resolve every configured experiment, failing on the first malformed entry
    pub fn from_config(
        experiments: &HashMap<String, ExperimentConfig>,
    ) -> Result<Self, DomainError> {
        let mut definitions = HashMap::with_capacity(experiments.len());

        for (name, config) in experiments {
            let definition = resolve_definition(name, config)?;
            debug!(experiment = %name, alternatives = definition.alternatives.len(), "Loaded experiment definition");
            definitions.insert(name.clone(), definition);
        }

        Ok(Self { definitions })
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl ExperimentCatalog for StaticExperimentCatalog {
    fn experiment_for(&self, name: &str) -> Option<ExperimentDefinition> {
        self.definitions.get(name).cloned()
    }
}

fn resolve_definition(
    name: &str,
    config: &ExperimentConfig,
) -> Result<ExperimentDefinition, DomainError> {
    let alternatives = match &config.alternatives {
        Some(AlternativesConfig::List(entries)) => entries.iter().map(entry_to_input).collect(),
        Some(AlternativesConfig::Weights(weights)) => weights
            .iter()
            .map(|(alt, weight)| AlternativeInput::Weighted(alt.clone(), *weight))
            .collect(),
        None => {
            return Err(DomainError::configuration(format!(
                "Experiment configuration for '{}' is missing alternatives",
                name
            )));
        }
    };

    let goals = match &config.goals {
        Some(value) => parse_goals(value)?,
        None => Vec::new(),
    };

    Ok(ExperimentDefinition {
        alternatives,
        goals,
        algorithm: config.algorithm.clone(),
        resettable: config.resettable,
    })
}

fn entry_to_input(entry: &AlternativeEntryConfig) -> AlternativeInput {
    match entry {
        AlternativeEntryConfig::Name(name) => AlternativeInput::Name(name.clone()),
        AlternativeEntryConfig::Detailed { name, weight } => {
            AlternativeInput::Weighted(name.clone(), *weight)
        }
        AlternativeEntryConfig::Weights(weights) => AlternativeInput::mapping(
            weights.iter().map(|(name, weight)| (name.clone(), *weight)),
        ),
    }
}
