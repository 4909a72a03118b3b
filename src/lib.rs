//! PMP Experiment Store
//!
//! Persistence and versioning engine for A/B test experiments whose
//! authoritative state lives in a shared key-value store:
//! - Create-or-reconcile of experiment definitions with reset on structural change
//! - Version-aware key derivation across resets
//! - Transparent upgrade of the legacy set-typed alternative storage
//! - Pluggable selection algorithms and winner override

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use tracing::info;

use domain::KeyValueStore;
use infrastructure::{
    algorithm::AlgorithmRegistry, catalog::StaticExperimentCatalog, services::ExperimentService,
    store::StoreFactory,
};

/// Create the experiment service with configuration loaded from the environment
pub async fn create_experiment_service() -> anyhow::Result<ExperimentService<dyn KeyValueStore>> {
    let config = AppConfig::load()?;
    create_experiment_service_with_config(&config).await
}

/// Create the experiment service from an explicit configuration
pub async fn create_experiment_service_with_config(
    config: &AppConfig,
) -> anyhow::Result<ExperimentService<dyn KeyValueStore>> {
    info!("Store backend: {}", config.store.store_type);
    let store = StoreFactory::new().create(&config.store).await?;

    let mut algorithms = AlgorithmRegistry::with_builtins();
    if let Some(default_algorithm) = &config.selection.default_algorithm {
        algorithms = algorithms.with_default(default_algorithm.as_str())?;
    }
    info!("Default selection algorithm: {}", algorithms.default_name());

    let catalog = StaticExperimentCatalog::from_config(&config.experiments)?;
    info!("Declared experiments: {}", catalog.len());

    Ok(ExperimentService::new(
        store,
        Arc::new(algorithms),
        Arc::new(catalog),
    ))
}
