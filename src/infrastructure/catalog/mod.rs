//! Experiment catalog implementations

mod static_catalog;

pub use static_catalog::StaticExperimentCatalog;
