//! Storage key naming for experiments and alternatives

/// Set holding the name of every registered experiment
pub const EXPERIMENTS_REGISTRY_KEY: &str = "experiments";

/// Hash of experiment name to first-creation timestamp
pub const EXPERIMENT_START_TIMES_KEY: &str = "experiment_start_times";

/// Hash of experiment name to declared winner
pub const EXPERIMENT_WINNER_KEY: &str = "experiment_winner";

/// Event namespace for one generation of an experiment
///
/// Version 0 is unversioned and uses the bare name.
pub fn versioned_key(name: &str, version: u64) -> String {
    if version > 0 {
        format!("{}:{}", name, version)
    } else {
        name.to_string()
    }
}

/// Counter holding the current generation of an experiment
pub fn version_key(name: &str) -> String {
    format!("{}:version", name)
}

/// List of goal labels; goals are never versioned
pub fn goals_key(name: &str) -> String {
    format!("{}:goals", name)
}

/// Hash of per-experiment configuration fields
pub fn experiment_config_key(name: &str) -> String {
    format!("experiment_configurations/{}", name)
}

/// Hash of counters for one alternative
pub fn alternative_key(experiment_name: &str, alternative_name: &str) -> String {
    format!("{}:{}", experiment_name, alternative_name)
}

/// Whether an alternative name would share a key with the experiment itself
///
/// Counter hashes live at `<experiment>:<alternative>`, alongside the
/// version counter, the goals list, the finished key and the `<name>:<n>`
/// generation keys.
pub fn is_reserved_alternative_name(name: &str) -> bool {
    matches!(name, "version" | "goals" | "finished")
        || (!name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()))
}
