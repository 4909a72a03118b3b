//! Experiment domain module for A/B testing
//!
//! Entities and traits describing experiments whose authoritative state
//! lives in a shared key-value store.

mod algorithm;
mod alternative;
mod catalog;
mod entity;
mod validation;

// Re-export all public types
pub use algorithm::SelectionAlgorithm;
pub use alternative::{expand_alternative_inputs, Alternative, AlternativeInput, DEFAULT_WEIGHT};
pub use catalog::{ExperimentCatalog, ExperimentDefinition};
pub use entity::{Experiment, ExperimentLabel, ExperimentOptions};
pub use validation::{base_experiment_name, parse_goals, validate_experiment_name};

#[cfg(test)]
pub use algorithm::MockSelectionAlgorithm;
#[cfg(test)]
pub use catalog::MockExperimentCatalog;
