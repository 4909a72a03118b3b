//! Experiment validation utilities

use serde_json::Value;

use crate::domain::DomainError;

/// Separator between an experiment name and a version annotation
pub const VERSION_SEPARATOR: char = ':';

/// Strip any `:`-separated suffix from an experiment label
///
/// Suffixes are reserved for version annotations; keeping them would
/// create a versioned duplicate of the experiment.
pub fn base_experiment_name(label: &str) -> &str {
    label.split(VERSION_SEPARATOR).next().unwrap_or(label)
}

/// Validate an experiment name
pub fn validate_experiment_name(name: &str) -> Result<(), DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("Experiment name cannot be empty"));
    }

    Ok(())
}

/// Parse an untyped goals declaration into an ordered list of labels
///
/// Nested lists are flattened in order. Anything other than a list of
/// strings is a caller contract violation.
pub fn parse_goals(value: &Value) -> Result<Vec<String>, DomainError> {
    let Value::Array(items) = value else {
        return Err(DomainError::validation("Goals must be an array"));
    };

    let mut goals = Vec::with_capacity(items.len());

    for item in items {
        match item {
            Value::String(goal) => goals.push(goal.clone()),
            Value::Array(_) => goals.extend(parse_goals(item)?),
            other => {
                return Err(DomainError::validation(format!(
                    "Goal labels must be strings, got {}",
                    other
                )));
            }
        }
    }

    Ok(goals)
}
