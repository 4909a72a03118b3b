//! Pluggable selection strategy

use std::fmt::Debug;

#[cfg(test)]
use mockall::automock;

use super::alternative::Alternative;
use super::entity::Experiment;
use crate::domain::DomainError;

/// Chooses one alternative of an experiment
///
/// Only invoked when the experiment has at least two alternatives and no
/// declared winner. Strategies are registered and persisted by name.
#[cfg_attr(test, automock)]
pub trait SelectionAlgorithm: Send + Sync + Debug {
    /// Choose an alternative
    ///
    /// `participant_counts` is aligned with `experiment.alternatives()`.
    fn choose_alternative(
        &self,
        experiment: &Experiment,
        participant_counts: &[u64],
    ) -> Result<Alternative, DomainError>;
}
