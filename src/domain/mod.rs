//! Domain layer - Core entities, traits and errors

pub mod error;
pub mod experiment;
pub mod store;

pub use error::DomainError;
pub use experiment::{
    Alternative, AlternativeInput, Experiment, ExperimentCatalog, ExperimentDefinition,
    ExperimentLabel, ExperimentOptions, SelectionAlgorithm,
};
pub use store::{KeyType, KeyValueStore};
