//! Alternative service - Per-alternative participation and conversion counters

use std::sync::Arc;

use tracing::debug;

use crate::domain::experiment::Alternative;
use crate::domain::{DomainError, KeyValueStore};

/// Hash field counting participants assigned to an alternative
pub const PARTICIPANT_COUNT_FIELD: &str = "participant_count";

/// Hash field counting participants who completed a goal
pub const COMPLETED_COUNT_FIELD: &str = "completed_count";

/// Counter bookkeeping for alternatives, stored in one hash per alternative
#[derive(Debug)]
pub struct AlternativeService<S: KeyValueStore + ?Sized> {
    store: Arc<S>,
}

impl<S: KeyValueStore + ?Sized> Clone for AlternativeService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: KeyValueStore + ?Sized> AlternativeService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn participant_count(&self, alternative: &Alternative) -> Result<u64, DomainError> {
        self.read_counter(alternative, PARTICIPANT_COUNT_FIELD).await
    }

    pub async fn completed_count(&self, alternative: &Alternative) -> Result<u64, DomainError> {
        self.read_counter(alternative, COMPLETED_COUNT_FIELD).await
    }

    /// Record one more participant, returning the new count
    pub async fn increment_participation(
        &self,
        alternative: &Alternative,
    ) -> Result<u64, DomainError> {
        let count = self
            .store
            .hincrby(&alternative.key(), PARTICIPANT_COUNT_FIELD, 1)
            .await?;
        to_counter(&alternative.key(), count)
    }

    /// Record one more completion, returning the new count
    pub async fn increment_completion(
        &self,
        alternative: &Alternative,
    ) -> Result<u64, DomainError> {
        let count = self
            .store
            .hincrby(&alternative.key(), COMPLETED_COUNT_FIELD, 1)
            .await?;
        to_counter(&alternative.key(), count)
    }

    /// Completions per participant, 0.0 when nobody participated yet
    pub async fn conversion_rate(&self, alternative: &Alternative) -> Result<f64, DomainError> {
        let participants = self.participant_count(alternative).await?;
        if participants == 0 {
            return Ok(0.0);
        }

        let completed = self.completed_count(alternative).await?;
        Ok(completed as f64 / participants as f64)
    }

    /// Zero both counters
    pub async fn reset(&self, alternative: &Alternative) -> Result<(), DomainError> {
        let key = alternative.key();
        debug!(alternative = %key, "Resetting alternative counters");

        self.store.hset(&key, PARTICIPANT_COUNT_FIELD, "0").await?;
        self.store.hset(&key, COMPLETED_COUNT_FIELD, "0").await?;
        Ok(())
    }

    /// Remove the alternative's counter hash entirely
    pub async fn delete(&self, alternative: &Alternative) -> Result<(), DomainError> {
        let key = alternative.key();
        debug!(alternative = %key, "Deleting alternative");

        self.store.delete(&key).await?;
        Ok(())
    }

    async fn read_counter(&self, alternative: &Alternative, field: &str) -> Result<u64, DomainError> {
        let key = alternative.key();

        match self.store.hget(&key, field).await? {
            Some(raw) => raw.parse().map_err(|_| {
                DomainError::storage(format!(
                    "Counter '{}' of '{}' is not a non-negative integer: {}",
                    field, key, raw
                ))
            }),
            None => Ok(0),
        }
    }
}

fn to_counter(key: &str, value: i64) -> Result<u64, DomainError> {
    u64::try_from(value)
        .map_err(|_| DomainError::storage(format!("Counter of '{}' went negative: {}", key, value)))
}
