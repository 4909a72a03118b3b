//! Key-value store domain - The narrow operation set the experiment engine depends on

mod keys;
mod repository;

pub use keys::{
    alternative_key, experiment_config_key, goals_key, is_reserved_alternative_name, version_key,
    versioned_key, EXPERIMENTS_REGISTRY_KEY, EXPERIMENT_START_TIMES_KEY, EXPERIMENT_WINNER_KEY,
};
pub use repository::{KeyType, KeyValueStore};

#[cfg(test)]
pub use repository::mock::FailingStore;
