use std::collections::HashMap;

use serde::Deserialize;

use super::experiments::ExperimentConfig;
use crate::infrastructure::store::StoreConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub store: StoreConfig,
    pub selection: SelectionConfig,
    pub experiments: HashMap<String, ExperimentConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Registered algorithm used when an experiment does not name one
    pub default_algorithm: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    /// Load `config/default`, `config/local` and `APP__*` environment variables
    ///
    /// A source that is present but does not deserialize is an error.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_with(environment())
    }

    /// Load the config files with `overrides` applied on top
    pub fn load_with<S>(overrides: S) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(overrides)
            .build()?;

        config.try_deserialize()
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("APP")
        .separator("__")
        .try_parsing(true)
}
