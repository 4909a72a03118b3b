//! Application configuration

mod app_config;
mod experiments;

pub use app_config::{AppConfig, LogFormat, LoggingConfig, SelectionConfig};
pub use experiments::{AlternativeEntryConfig, AlternativesConfig, ExperimentConfig};
