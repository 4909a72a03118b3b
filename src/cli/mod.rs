//! CLI module for the experiment store
//!
//! Administrative subcommands operating directly on the shared store.

pub mod experiment;

use clap::{Parser, Subcommand};

use crate::domain::AlternativeInput;

/// PMP Experiment Store - Manage A/B test experiments kept in a key-value store
#[derive(Parser)]
#[command(name = "pmp-experiment-store")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List every registered experiment
    List,

    /// Show an experiment with its version, winner and counters
    Show {
        name: String,
    },

    /// Create an experiment, resetting it if its alternatives or goals changed
    Create(CreateArgs),

    /// Pick the next alternative for a participant
    Choose {
        name: String,

        /// Count the participant against the chosen alternative
        #[arg(long)]
        record: bool,
    },

    /// Declare a winner, or clear it when no alternative is given
    Winner {
        name: String,
        alternative: Option<String>,
    },

    /// Zero all counters and start a new version
    Reset {
        name: String,
    },

    /// Remove an experiment and all of its keys
    Delete {
        name: String,
    },
}

#[derive(clap::Args)]
pub struct CreateArgs {
    pub name: String,

    /// Alternatives as `name` or `name=weight`; the first one is the control
    #[arg(required = true, value_parser = parse_alternative)]
    pub alternatives: Vec<AlternativeInput>,

    /// Goal label, may be repeated
    #[arg(long = "goal")]
    pub goals: Vec<String>,

    /// Registered selection algorithm
    #[arg(long)]
    pub algorithm: Option<String>,

    /// Mark the experiment as not resettable
    #[arg(long)]
    pub not_resettable: bool,
}

fn parse_alternative(value: &str) -> Result<AlternativeInput, String> {
    match value.split_once('=') {
        Some((name, weight)) => weight
            .parse::<f64>()
            .map(|weight| AlternativeInput::Weighted(name.to_string(), weight))
            .map_err(|e| format!("invalid weight '{}': {}", weight, e)),
        None => Ok(AlternativeInput::Name(value.to_string())),
    }
}
