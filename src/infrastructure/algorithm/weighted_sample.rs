//! Weighted random selection

use rand::Rng;

use crate::domain::experiment::{Alternative, Experiment, SelectionAlgorithm};
use crate::domain::DomainError;

/// Picks an alternative with probability proportional to its weight
///
/// Falls back to a uniform draw when every weight is zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedSample;

impl WeightedSample {
    pub const NAME: &'static str = "weighted_sample";

    pub fn new() -> Self {
        Self
    }

    fn pick<R: Rng + ?Sized>(alternatives: &[Alternative], rng: &mut R) -> usize {
        let total: f64 = alternatives.iter().map(|a| a.weight().max(0.0)).sum();

        if total <= 0.0 {
            return rng.gen_range(0..alternatives.len());
        }

        let mut target = rng.gen_range(0.0..total);

        for (index, alternative) in alternatives.iter().enumerate() {
            let weight = alternative.weight().max(0.0);

            if weight <= 0.0 {
                continue;
            }

            if target < weight {
                return index;
            }

            target -= weight;
        }

        alternatives.len() - 1
    }
}

impl SelectionAlgorithm for WeightedSample {
    fn choose_alternative(
        &self,
        experiment: &Experiment,
        _participant_counts: &[u64],
    ) -> Result<Alternative, DomainError> {
        let alternatives = experiment.alternatives();

        if alternatives.is_empty() {
            return Err(DomainError::internal(format!(
                "Experiment '{}' has no alternatives to choose from",
                experiment.name()
            )));
        }

        let index = Self::pick(alternatives, &mut rand::thread_rng());
        Ok(alternatives[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::experiment::{AlternativeInput, ExperimentOptions};

    fn experiment(alternatives: Vec<AlternativeInput>) -> Experiment {
        Experiment::from_options(
            "link_color",
            ExperimentOptions::new().with_alternatives(alternatives),
        )
        .unwrap()
    }

    #[test]
    fn test_zero_weight_is_never_chosen() {
        let exp = experiment(vec![("blue", 1.0).into(), ("red", 0.0).into()]);

        for _ in 0..200 {
            let chosen = WeightedSample.choose_alternative(&exp, &[0, 0]).unwrap();
            assert_eq!(chosen.name(), "blue");
        }
    }

    #[test]
    fn test_all_zero_weights_fall_back_to_uniform() {
        let exp = experiment(vec![("blue", 0.0).into(), ("red", 0.0).into()]);

        let chosen = WeightedSample.choose_alternative(&exp, &[0, 0]).unwrap();
        assert!(["blue", "red"].contains(&chosen.name()));
    }

    #[test]
    fn test_distribution_follows_weights() {
        let exp = experiment(vec![("blue", 3.0).into(), ("red", 1.0).into()]);
        let mut blue = 0;

        for _ in 0..4000 {
            if WeightedSample.choose_alternative(&exp, &[0, 0]).unwrap().name() == "blue" {
                blue += 1;
            }
        }

        // Expect roughly 75%
        assert!(blue > 2700 && blue < 3300, "blue chosen {} times", blue);
    }

    #[test]
    fn test_empty_experiment_is_an_error() {
        let exp = Experiment::new("empty");
        assert!(WeightedSample.choose_alternative(&exp, &[]).is_err());
    }
}
