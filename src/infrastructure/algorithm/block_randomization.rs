//! Balanced selection by participant count

use rand::seq::SliceRandom;

use crate::domain::experiment::{Alternative, Experiment, SelectionAlgorithm};
use crate::domain::DomainError;

/// Picks uniformly among the alternatives with the fewest participants
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockRandomization;

impl BlockRandomization {
    pub const NAME: &'static str = "block_randomization";

    pub fn new() -> Self {
        Self
    }
}

impl SelectionAlgorithm for BlockRandomization {
    fn choose_alternative(
        &self,
        experiment: &Experiment,
        participant_counts: &[u64],
    ) -> Result<Alternative, DomainError> {
        let alternatives = experiment.alternatives();

        if participant_counts.len() != alternatives.len() {
            return Err(DomainError::internal(format!(
                "Expected {} participant counts for experiment '{}', got {}",
                alternatives.len(),
                experiment.name(),
                participant_counts.len()
            )));
        }

        let Some(minimum) = participant_counts.iter().copied().min() else {
            return Err(DomainError::internal(format!(
                "Experiment '{}' has no alternatives to choose from",
                experiment.name()
            )));
        };

        let least_used: Vec<&Alternative> = alternatives
            .iter()
            .zip(participant_counts)
            .filter(|(_, count)| **count == minimum)
            .map(|(alternative, _)| alternative)
            .collect();

        least_used
            .choose(&mut rand::thread_rng())
            .map(|alternative| (*alternative).clone())
            .ok_or_else(|| DomainError::internal("No alternative matched the minimum count"))
    }
}
