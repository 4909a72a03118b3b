//! Statically declared experiments

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

/// One experiment declared in configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentConfig {
    #[serde(default)]
    pub alternatives: Option<AlternativesConfig>,
    /// Kept untyped so malformed goals are reported as a validation error
    #[serde(default)]
    pub goals: Option<Value>,
    #[serde(default)]
    pub algorithm: Option<String>,
    #[serde(default = "default_resettable")]
    pub resettable: bool,
}

fn default_resettable() -> bool {
    true
}

/// Alternatives as a list of entries, or as a name -> weight table
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AlternativesConfig {
    List(Vec<AlternativeEntryConfig>),
    Weights(BTreeMap<String, f64>),
}

/// One entry of an alternatives list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AlternativeEntryConfig {
    Name(String),
    Detailed { name: String, weight: f64 },
    Weights(BTreeMap<String, f64>),
}
