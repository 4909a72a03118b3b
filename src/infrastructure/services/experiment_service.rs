//! Experiment service - Persistence, versioning and selection for experiments
//!
//! The store is the only source of truth. `Experiment` values handed out by
//! this service are disposable views; every operation goes back to the
//! store, composing single-command primitives without transactions.
//!
//! Concurrent structural saves of the same experiment may both observe a
//! change, both reset and both rewrite the lists. The last writer's lists
//! win and the version may advance twice.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::alternative_service::AlternativeService;
use crate::domain::experiment::{
    validate_experiment_name, Alternative, AlternativeInput, Experiment, ExperimentCatalog,
    ExperimentLabel, ExperimentOptions,
};
use crate::domain::store::{
    version_key, versioned_key, KeyType, EXPERIMENTS_REGISTRY_KEY, EXPERIMENT_START_TIMES_KEY,
    EXPERIMENT_WINNER_KEY,
};
use crate::domain::{DomainError, KeyValueStore};
use crate::infrastructure::algorithm::{AlgorithmRegistry, ResolvedAlgorithm};

const RESETTABLE_FIELD: &str = "resettable";
const ALGORITHM_FIELD: &str = "algorithm";

/// Experiment engine over a shared key-value store
#[derive(Debug)]
pub struct ExperimentService<S: KeyValueStore + ?Sized> {
    store: Arc<S>,
    alternatives: AlternativeService<S>,
    algorithms: Arc<AlgorithmRegistry>,
    catalog: Arc<dyn ExperimentCatalog>,
}

impl<S: KeyValueStore + ?Sized> ExperimentService<S> {
    pub fn new(
        store: Arc<S>,
        algorithms: Arc<AlgorithmRegistry>,
        catalog: Arc<dyn ExperimentCatalog>,
    ) -> Self {
        Self {
            alternatives: AlternativeService::new(Arc::clone(&store)),
            store,
            algorithms,
            catalog,
        }
    }

    /// Counter bookkeeping for the alternatives of managed experiments
    pub fn alternatives(&self) -> &AlternativeService<S> {
        &self.alternatives
    }

    pub fn algorithms(&self) -> &AlgorithmRegistry {
        &self.algorithms
    }

    // ========================================================================
    // Construction & Lookup
    // ========================================================================

    /// Construct an experiment, falling back to the catalog when no
    /// alternatives are supplied
    ///
    /// An experiment with neither explicit nor declared alternatives is
    /// still returned; it fails validation on save.
    pub fn build(&self, name: &str, options: ExperimentOptions) -> Result<Experiment, DomainError> {
        let mut experiment = Experiment::from_options(name, options)?;

        if experiment.alternatives().is_empty() {
            self.adopt_definition(&mut experiment)?;
        }

        Ok(experiment)
    }

    /// Hydrate an experiment from the store, `None` when nothing is stored
    pub async fn find(&self, name: &str) -> Result<Option<Experiment>, DomainError> {
        debug!(experiment = %name, "Finding experiment");

        if !self.store.exists(name).await? {
            return Ok(None);
        }

        let mut experiment = Experiment::new(name);
        self.load_from_store(&mut experiment).await?;
        Ok(Some(experiment))
    }

    /// Every registered experiment that still has stored state
    pub async fn all(&self) -> Result<Vec<Experiment>, DomainError> {
        let mut names = self.store.smembers(EXPERIMENTS_REGISTRY_KEY).await?;
        names.sort();

        let mut experiments = Vec::with_capacity(names.len());
        for name in names {
            match self.find(&name).await? {
                Some(experiment) => experiments.push(experiment),
                None => debug!(experiment = %name, "Skipping registered experiment without stored state"),
            }
        }

        Ok(experiments)
    }

    /// Construct, validate and save in one step
    ///
    /// Any `:` suffix on the label is dropped so a version annotation never
    /// creates a duplicate experiment.
    pub async fn find_or_create(
        &self,
        label: impl Into<ExperimentLabel>,
        alternatives: Vec<AlternativeInput>,
    ) -> Result<Experiment, DomainError> {
        let (name, goals) = label.into().into_parts();

        let options = ExperimentOptions {
            alternatives,
            goals: Some(goals),
            ..ExperimentOptions::default()
        };

        let mut experiment = self.build(&name, options)?;
        self.save(&mut experiment).await?;
        Ok(experiment)
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Check the experiment can be persisted
    pub fn validate(&self, experiment: &Experiment) -> Result<(), DomainError> {
        validate_experiment_name(experiment.name())?;

        if experiment.alternatives().is_empty()
            && self.catalog.experiment_for(experiment.name()).is_none()
        {
            return Err(DomainError::not_found(format!(
                "Experiment '{}' not found",
                experiment.name()
            )));
        }

        for alternative in experiment.alternatives() {
            alternative.validate()?;
        }

        Ok(())
    }

    /// True when nothing is stored under the experiment's name
    pub async fn is_new_record(&self, experiment: &Experiment) -> Result<bool, DomainError> {
        Ok(!self.store.exists(experiment.name()).await?)
    }

    /// Reconcile the desired definition against the stored one
    ///
    /// A new experiment is registered and written. An existing one whose
    /// alternative or goal lists differ is reset and rewritten under a new
    /// version. The configuration hash is rewritten in every case.
    pub async fn save(&self, experiment: &mut Experiment) -> Result<(), DomainError> {
        self.validate(experiment)?;

        if experiment.alternatives().is_empty() {
            self.adopt_definition(experiment)?;
        }

        let algorithm = self.algorithm_for(experiment)?;
        let name = experiment.name().to_string();

        if self.is_new_record(experiment).await? {
            info!(experiment = %name, alternatives = experiment.alternatives().len(), "Creating experiment");

            self.store.sadd(EXPERIMENTS_REGISTRY_KEY, &name).await?;
            self.store
                .hset(EXPERIMENT_START_TIMES_KEY, &name, &Utc::now().to_rfc3339())
                .await?;
            self.write_lists(experiment).await?;
        } else {
            let stored_alternatives = self.load_alternative_names(&name).await?;
            let stored_goals = self.store.lrange(&experiment.goals_key(), 0, -1).await?;

            let desired_goals = experiment.goals().unwrap_or_default();

            if stored_alternatives == experiment.alternative_names()
                && stored_goals.as_slice() == desired_goals
            {
                debug!(experiment = %name, "Stored definition unchanged");
            } else {
                info!(
                    experiment = %name,
                    stored = ?stored_alternatives,
                    desired = ?experiment.alternative_names(),
                    "Structural change detected, resetting experiment"
                );

                self.reset(experiment).await?;

                for stored in &stored_alternatives {
                    self.alternatives
                        .delete(&Alternative::new(stored.as_str(), name.as_str()))
                        .await?;
                }
                for alternative in experiment.alternatives() {
                    self.alternatives.delete(alternative).await?;
                }

                self.store.delete(&experiment.goals_key()).await?;
                self.store.delete(&name).await?;
                self.write_lists(experiment).await?;
            }
        }

        let config_key = experiment.config_key();
        self.store
            .hset(&config_key, RESETTABLE_FIELD, &experiment.resettable().to_string())
            .await?;
        self.store
            .hset(&config_key, ALGORITHM_FIELD, &algorithm.name)
            .await?;

        experiment.set_algorithm(Some(algorithm.name));
        Ok(())
    }

    /// Populate an experiment purely from stored state
    ///
    /// Only mutates the store to upgrade a legacy set of alternatives.
    pub async fn load_from_store(&self, experiment: &mut Experiment) -> Result<(), DomainError> {
        let name = experiment.name().to_string();
        let config = self.store.hgetall(&experiment.config_key()).await?;

        let resettable = config
            .get(RESETTABLE_FIELD)
            .map(|value| value == "true")
            .unwrap_or(true);

        let algorithm = match config.get(ALGORITHM_FIELD).filter(|value| !value.is_empty()) {
            Some(stored) => Some(self.algorithms.resolve(Some(stored.as_str()))?.name),
            None => None,
        };

        let alternatives = self
            .load_alternative_names(&name)
            .await?
            .into_iter()
            .map(AlternativeInput::Name)
            .collect();
        let goals = self.store.lrange(&experiment.goals_key(), 0, -1).await?;

        experiment.set_alternatives(alternatives)?;
        experiment.set_goals(Some(goals));
        experiment.set_algorithm(algorithm);
        experiment.set_resettable(resettable);

        debug!(
            experiment = %name,
            alternatives = experiment.alternatives().len(),
            "Loaded experiment from store"
        );
        Ok(())
    }

    // ========================================================================
    // Winner & Statistics
    // ========================================================================

    /// The administratively declared winner, if any
    pub async fn winner(&self, experiment: &Experiment) -> Result<Option<Alternative>, DomainError> {
        let winner = self
            .store
            .hget(EXPERIMENT_WINNER_KEY, experiment.name())
            .await?;

        Ok(winner.map(|name| {
            experiment
                .alternative(&name)
                .cloned()
                .unwrap_or_else(|| Alternative::new(name, experiment.name()))
        }))
    }

    /// Declare a winner, overriding algorithmic selection
    pub async fn set_winner(
        &self,
        experiment: &Experiment,
        alternative_name: &str,
    ) -> Result<(), DomainError> {
        if experiment.alternative(alternative_name).is_none() {
            return Err(DomainError::validation(format!(
                "'{}' is not an alternative of experiment '{}'",
                alternative_name,
                experiment.name()
            )));
        }

        info!(experiment = %experiment.name(), winner = %alternative_name, "Setting winner");
        self.store
            .hset(EXPERIMENT_WINNER_KEY, experiment.name(), alternative_name)
            .await
    }

    pub async fn reset_winner(&self, experiment: &Experiment) -> Result<(), DomainError> {
        self.store
            .hdel(EXPERIMENT_WINNER_KEY, experiment.name())
            .await?;
        Ok(())
    }

    /// When the experiment was first created
    pub async fn start_time(
        &self,
        experiment: &Experiment,
    ) -> Result<Option<DateTime<Utc>>, DomainError> {
        let Some(raw) = self
            .store
            .hget(EXPERIMENT_START_TIMES_KEY, experiment.name())
            .await?
        else {
            return Ok(None);
        };

        DateTime::parse_from_rfc3339(&raw)
            .map(|time| Some(time.with_timezone(&Utc)))
            .map_err(|e| {
                DomainError::storage(format!(
                    "Invalid start time for experiment '{}': {}",
                    experiment.name(),
                    e
                ))
            })
    }

    /// Participants across all alternatives
    pub async fn participant_count(&self, experiment: &Experiment) -> Result<u64, DomainError> {
        let mut total = 0;
        for alternative in experiment.alternatives() {
            total += self.alternatives.participant_count(alternative).await?;
        }
        Ok(total)
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// The winner when declared, otherwise an algorithmic choice
    pub async fn next_alternative(&self, experiment: &Experiment) -> Result<Alternative, DomainError> {
        match self.winner(experiment).await? {
            Some(winner) => Ok(winner),
            None => self.random_alternative(experiment).await,
        }
    }

    /// Choose via the selection algorithm
    ///
    /// A single alternative is returned without consulting the algorithm.
    pub async fn random_alternative(
        &self,
        experiment: &Experiment,
    ) -> Result<Alternative, DomainError> {
        match experiment.alternatives() {
            [] => Err(DomainError::not_found(format!(
                "Experiment '{}' has no alternatives",
                experiment.name()
            ))),
            [only] => Ok(only.clone()),
            alternatives => {
                let mut counts = Vec::with_capacity(alternatives.len());
                for alternative in alternatives {
                    counts.push(self.alternatives.participant_count(alternative).await?);
                }

                let resolved = self.algorithm_for(experiment)?;
                debug!(experiment = %experiment.name(), algorithm = %resolved.name, "Choosing alternative");
                resolved.algorithm.choose_alternative(experiment, &counts)
            }
        }
    }

    /// The experiment's selection strategy, or the registry default
    pub fn algorithm_for(&self, experiment: &Experiment) -> Result<ResolvedAlgorithm, DomainError> {
        self.algorithms.resolve(experiment.algorithm())
    }

    // ========================================================================
    // Versioning
    // ========================================================================

    /// Generation counter, read once and then memoized on the experiment
    pub async fn version(&self, experiment: &mut Experiment) -> Result<u64, DomainError> {
        if let Some(version) = experiment.cached_version() {
            return Ok(version);
        }

        let key = version_key(experiment.name());
        let version = match self.store.get(&key).await? {
            Some(raw) => raw.parse().map_err(|_| {
                DomainError::storage(format!("Version '{}' is not a non-negative integer: {}", key, raw))
            })?,
            None => 0,
        };

        experiment.cache_version(version);
        Ok(version)
    }

    /// Atomically bump the generation counter, caching the returned value
    pub async fn increment_version(&self, experiment: &mut Experiment) -> Result<u64, DomainError> {
        let key = version_key(experiment.name());
        let raw = self.store.increment(&key, 1).await?;
        let version = u64::try_from(raw)
            .map_err(|_| DomainError::storage(format!("Version '{}' went negative: {}", key, raw)))?;

        experiment.cache_version(version);
        Ok(version)
    }

    /// Namespace of the current generation's events
    pub async fn key(&self, experiment: &mut Experiment) -> Result<String, DomainError> {
        let version = self.version(experiment).await?;
        Ok(versioned_key(experiment.name(), version))
    }

    pub async fn finished_key(&self, experiment: &mut Experiment) -> Result<String, DomainError> {
        Ok(format!("{}:finished", self.key(experiment).await?))
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Zero every counter, clear the winner and start a new generation
    pub async fn reset(&self, experiment: &mut Experiment) -> Result<(), DomainError> {
        for alternative in experiment.alternatives() {
            self.alternatives.reset(alternative).await?;
        }
        self.reset_winner(experiment).await?;
        let version = self.increment_version(experiment).await?;

        info!(experiment = %experiment.name(), version, "Experiment reset");
        Ok(())
    }

    /// Remove the experiment and every key it owns, bumping the version
    pub async fn delete(&self, experiment: &mut Experiment) -> Result<(), DomainError> {
        for alternative in experiment.alternatives() {
            self.alternatives.delete(alternative).await?;
        }
        self.reset_winner(experiment).await?;

        let name = experiment.name().to_string();
        self.store.srem(EXPERIMENTS_REGISTRY_KEY, &name).await?;
        self.store.delete(&name).await?;
        self.store.delete(&experiment.goals_key()).await?;
        let version = self.increment_version(experiment).await?;

        info!(experiment = %name, version, "Experiment deleted");
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn adopt_definition(&self, experiment: &mut Experiment) -> Result<(), DomainError> {
        let Some(definition) = self.catalog.experiment_for(experiment.name()) else {
            return Ok(());
        };

        debug!(experiment = %experiment.name(), "Using declared experiment definition");

        experiment.set_alternatives(definition.alternatives)?;
        experiment.set_goals(Some(definition.goals));
        experiment.set_algorithm(definition.algorithm);
        experiment.set_resettable(definition.resettable);
        Ok(())
    }

    /// Push alternatives and goals so the stored lists keep declared order
    async fn write_lists(&self, experiment: &Experiment) -> Result<(), DomainError> {
        for alternative in experiment.alternatives().iter().rev() {
            self.store.lpush(experiment.name(), alternative.name()).await?;
        }

        if let Some(goals) = experiment.goals() {
            let goals_key = experiment.goals_key();
            for goal in goals.iter().rev() {
                self.store.lpush(&goals_key, goal).await?;
            }
        }

        Ok(())
    }

    /// Read stored alternative names, upgrading the legacy set format in place
    async fn load_alternative_names(&self, name: &str) -> Result<Vec<String>, DomainError> {
        if self.store.key_type(name).await? == KeyType::Set {
            warn!(experiment = %name, "Upgrading legacy alternative set to a list");

            let members = self.store.smembers(name).await?;
            self.store.delete(name).await?;
            for member in members.iter().rev() {
                self.store.lpush(name, member).await?;
            }
        }

        self.store.lrange(name, 0, -1).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::experiment::{ExperimentDefinition, MockSelectionAlgorithm};
    use crate::domain::store::FailingStore;
    use crate::infrastructure::catalog::StaticExperimentCatalog;
    use crate::infrastructure::store::InMemoryStore;

    fn create_service_with(
        catalog: StaticExperimentCatalog,
        registry: AlgorithmRegistry,
    ) -> (Arc<InMemoryStore>, ExperimentService<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let service = ExperimentService::new(
            Arc::clone(&store),
            Arc::new(registry),
            Arc::new(catalog),
        );
        (store, service)
    }

    fn create_service() -> (Arc<InMemoryStore>, ExperimentService<InMemoryStore>) {
        create_service_with(StaticExperimentCatalog::empty(), AlgorithmRegistry::with_builtins())
    }

    fn never_called() -> Arc<MockSelectionAlgorithm> {
        let mut algorithm = MockSelectionAlgorithm::new();
        algorithm.expect_choose_alternative().never();
        Arc::new(algorithm)
    }

    fn always_second() -> Arc<MockSelectionAlgorithm> {
        let mut algorithm = MockSelectionAlgorithm::new();
        algorithm
            .expect_choose_alternative()
            .returning(|experiment, _| Ok(experiment.alternatives()[1].clone()));
        Arc::new(algorithm)
    }

    fn options(alternatives: &[&str]) -> ExperimentOptions {
        ExperimentOptions::new().with_alternatives(alternatives.iter().copied())
    }

    #[tokio::test]
    async fn test_create_then_read_round_trip() {
        let (_, service) = create_service();
        let mut exp = service
            .build("link_color", options(&["A", "B", "C"]).with_goals(["g1", "g2"]))
            .unwrap();
        service.save(&mut exp).await.unwrap();

        let found = service.find("link_color").await.unwrap().unwrap();

        assert_eq!(found.alternative_names(), vec!["A", "B", "C"]);
        assert_eq!(found.goals().unwrap(), &["g1".to_string(), "g2".to_string()]);
        assert_eq!(found.control().unwrap().name(), "A");
        assert!(found.resettable());
        assert_eq!(found.algorithm(), Some("weighted_sample"));
    }

    #[tokio::test]
    async fn test_create_registers_and_records_start_time() {
        let (store, service) = create_service();
        let before = Utc::now();

        let exp = service
            .find_or_create("link_color", vec!["blue".into(), "red".into()])
            .await
            .unwrap();

        assert_eq!(
            store.smembers(EXPERIMENTS_REGISTRY_KEY).await.unwrap(),
            vec!["link_color"]
        );
        let started = service.start_time(&exp).await.unwrap().unwrap();
        assert!(started >= before - chrono::Duration::seconds(1));
    }

    #[tokio::test]
    async fn test_absent_goals_are_not_written() {
        let (store, service) = create_service();
        let mut exp = service.build("link_color", options(&["blue", "red"])).unwrap();
        service.save(&mut exp).await.unwrap();

        assert!(!store.exists("link_color:goals").await.unwrap());
    }

    #[tokio::test]
    async fn test_idempotent_save_keeps_version_and_rewrites_config() {
        let (store, service) = create_service();
        let mut first = service.build("link_color", options(&["blue", "red"])).unwrap();
        service.save(&mut first).await.unwrap();
        service
            .alternatives()
            .increment_participation(first.control().unwrap())
            .await
            .unwrap();

        let mut second = service
            .build(
                "link_color",
                options(&["blue", "red"])
                    .with_resettable(false)
                    .with_algorithm("block_randomization"),
            )
            .unwrap();
        service.save(&mut second).await.unwrap();

        assert_eq!(service.version(&mut second).await.unwrap(), 0);
        assert_eq!(
            service
                .alternatives()
                .participant_count(second.control().unwrap())
                .await
                .unwrap(),
            1
        );

        let config = store
            .hgetall("experiment_configurations/link_color")
            .await
            .unwrap();
        assert_eq!(config.get("resettable").map(String::as_str), Some("false"));
        assert_eq!(
            config.get("algorithm").map(String::as_str),
            Some("block_randomization")
        );
    }

    #[tokio::test]
    async fn test_start_time_is_recorded_once() {
        let (store, service) = create_service();
        service
            .find_or_create("link_color", vec!["A".into(), "B".into()])
            .await
            .unwrap();
        store
            .hset(EXPERIMENT_START_TIMES_KEY, "link_color", "2020-01-01T00:00:00+00:00")
            .await
            .unwrap();

        let exp = service
            .find_or_create("link_color", vec!["A".into(), "C".into()])
            .await
            .unwrap();

        let started = service.start_time(&exp).await.unwrap().unwrap();
        assert_eq!(started.to_rfc3339(), "2020-01-01T00:00:00+00:00");
    }

    #[tokio::test]
    async fn test_structural_change_triggers_reset() {
        let (store, service) = create_service();
        let first = service
            .find_or_create("link_color", vec!["A".into(), "B".into()])
            .await
            .unwrap();
        for alternative in first.alternatives() {
            service
                .alternatives()
                .increment_participation(alternative)
                .await
                .unwrap();
        }

        let mut second = service
            .find_or_create("link_color", vec!["A".into(), "C".into()])
            .await
            .unwrap();

        assert_eq!(service.version(&mut second).await.unwrap(), 1);
        assert_eq!(
            service
                .alternatives()
                .participant_count(second.control().unwrap())
                .await
                .unwrap(),
            0
        );
        assert!(!store.exists("link_color:B").await.unwrap());
        assert_eq!(
            store.lrange("link_color", 0, -1).await.unwrap(),
            vec!["A", "C"]
        );
    }

    #[tokio::test]
    async fn test_goal_change_triggers_reset() {
        let (store, service) = create_service();
        service
            .find_or_create(
                ExperimentLabel::with_goals("link_color", ["purchase"]),
                vec!["A".into(), "B".into()],
            )
            .await
            .unwrap();

        let mut exp = service
            .find_or_create(
                ExperimentLabel::with_goals("link_color", ["purchase", "refund"]),
                vec!["A".into(), "B".into()],
            )
            .await
            .unwrap();

        assert_eq!(service.version(&mut exp).await.unwrap(), 1);
        assert_eq!(
            store.lrange("link_color:goals", 0, -1).await.unwrap(),
            vec!["purchase", "refund"]
        );
    }

    #[tokio::test]
    async fn test_reordered_alternatives_is_a_structural_change() {
        let (_, service) = create_service();
        service
            .find_or_create("link_color", vec!["A".into(), "B".into()])
            .await
            .unwrap();

        let mut exp = service
            .find_or_create("link_color", vec!["B".into(), "A".into()])
            .await
            .unwrap();

        assert_eq!(service.version(&mut exp).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_version_aware_key_derivation() {
        let (_, service) = create_service();
        let mut exp = service
            .find_or_create("link_color", vec!["A".into(), "B".into()])
            .await
            .unwrap();

        assert_eq!(service.key(&mut exp).await.unwrap(), "link_color");
        assert_eq!(exp.goals_key(), "link_color:goals");

        service.reset(&mut exp).await.unwrap();

        assert_eq!(service.key(&mut exp).await.unwrap(), "link_color:1");
        assert_eq!(
            service.finished_key(&mut exp).await.unwrap(),
            "link_color:1:finished"
        );
        assert_eq!(exp.goals_key(), "link_color:goals");
    }

    #[tokio::test]
    async fn test_version_is_memoized_until_incremented() {
        let (store, service) = create_service();
        let mut exp = service
            .find_or_create("link_color", vec!["A".into(), "B".into()])
            .await
            .unwrap();

        assert_eq!(service.version(&mut exp).await.unwrap(), 0);
        store.increment("link_color:version", 5).await.unwrap();
        assert_eq!(service.version(&mut exp).await.unwrap(), 0);

        assert_eq!(service.increment_version(&mut exp).await.unwrap(), 6);
        assert_eq!(exp.cached_version(), Some(6));
    }

    #[tokio::test]
    async fn test_single_alternative_skips_algorithm() {
        let registry = AlgorithmRegistry::new("mock").with_algorithm("mock", never_called());
        let (_, service) = create_service_with(StaticExperimentCatalog::empty(), registry);

        let exp = service
            .find_or_create("only_one", vec!["solo".into()])
            .await
            .unwrap();

        for _ in 0..10 {
            let chosen = service.random_alternative(&exp).await.unwrap();
            assert_eq!(chosen.name(), "solo");
        }
    }

    #[tokio::test]
    async fn test_random_alternative_passes_participant_counts() {
        let mut algorithm = MockSelectionAlgorithm::new();
        algorithm
            .expect_choose_alternative()
            .withf(|_, counts| counts.to_vec() == vec![2, 0])
            .times(1)
            .returning(|experiment, _| Ok(experiment.alternatives()[1].clone()));
        let registry = AlgorithmRegistry::new("mock").with_algorithm("mock", Arc::new(algorithm));
        let (_, service) = create_service_with(StaticExperimentCatalog::empty(), registry);

        let exp = service
            .find_or_create("link_color", vec!["blue".into(), "red".into()])
            .await
            .unwrap();
        for _ in 0..2 {
            service
                .alternatives()
                .increment_participation(exp.control().unwrap())
                .await
                .unwrap();
        }

        let chosen = service.random_alternative(&exp).await.unwrap();
        assert_eq!(chosen.name(), "red");
    }

    #[tokio::test]
    async fn test_winner_overrides_selection() {
        let registry = AlgorithmRegistry::new("mock").with_algorithm("mock", always_second());
        let (_, service) = create_service_with(StaticExperimentCatalog::empty(), registry);
        let mut exp = service
            .find_or_create("link_color", vec!["blue".into(), "red".into()])
            .await
            .unwrap();

        assert_eq!(service.next_alternative(&exp).await.unwrap().name(), "red");

        service.set_winner(&exp, "blue").await.unwrap();
        for _ in 0..5 {
            assert_eq!(service.next_alternative(&exp).await.unwrap().name(), "blue");
        }

        service.reset(&mut exp).await.unwrap();
        assert!(service.winner(&exp).await.unwrap().is_none());

        service.set_winner(&exp, "blue").await.unwrap();
        service.delete(&mut exp).await.unwrap();
        assert!(service.winner(&exp).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_winner_survives_version_increment() {
        let (_, service) = create_service();
        let mut exp = service
            .find_or_create("link_color", vec!["blue".into(), "red".into()])
            .await
            .unwrap();

        service.set_winner(&exp, "red").await.unwrap();
        service.increment_version(&mut exp).await.unwrap();

        assert_eq!(service.winner(&exp).await.unwrap().unwrap().name(), "red");
    }

    #[tokio::test]
    async fn test_set_winner_rejects_unknown_alternative() {
        let (_, service) = create_service();
        let exp = service
            .find_or_create("link_color", vec!["blue".into(), "red".into()])
            .await
            .unwrap();

        let err = service.set_winner(&exp, "purple").await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_legacy_set_is_upgraded_on_read() {
        let (store, service) = create_service();
        for member in ["red", "blue", "green"] {
            store.sadd("link_color", member).await.unwrap();
        }
        store
            .sadd(EXPERIMENTS_REGISTRY_KEY, "link_color")
            .await
            .unwrap();

        let first = service.find("link_color").await.unwrap().unwrap();
        assert_eq!(store.key_type("link_color").await.unwrap(), KeyType::List);

        let mut names = first.alternative_names();
        names.sort();
        assert_eq!(names, vec!["blue", "green", "red"]);

        for _ in 0..3 {
            let again = service.find("link_color").await.unwrap().unwrap();
            assert_eq!(again.alternative_names(), first.alternative_names());
        }
    }

    #[tokio::test]
    async fn test_delete_fully_tombstones() {
        let (store, service) = create_service();
        let mut exp = service
            .find_or_create(
                ExperimentLabel::with_goals("link_color", ["purchase"]),
                vec!["blue".into(), "red".into()],
            )
            .await
            .unwrap();
        service
            .alternatives()
            .increment_participation(exp.control().unwrap())
            .await
            .unwrap();
        let before = service.version(&mut exp).await.unwrap();

        service.delete(&mut exp).await.unwrap();

        assert!(store.smembers(EXPERIMENTS_REGISTRY_KEY).await.unwrap().is_empty());
        assert!(!store.exists("link_color:goals").await.unwrap());
        assert!(!store.exists("link_color").await.unwrap());
        assert!(!store.exists("link_color:blue").await.unwrap());
        assert!(service.find("link_color").await.unwrap().is_none());

        let mut recreated = service
            .find_or_create("link_color", vec!["blue".into(), "red".into()])
            .await
            .unwrap();
        assert!(service.version(&mut recreated).await.unwrap() > before);
    }

    #[tokio::test]
    async fn test_reset_keeps_registration_and_lists() {
        let (store, service) = create_service();
        let mut exp = service
            .find_or_create("link_color", vec!["blue".into(), "red".into()])
            .await
            .unwrap();

        service.reset(&mut exp).await.unwrap();

        assert!(service.find("link_color").await.unwrap().is_some());
        assert_eq!(
            store.smembers(EXPERIMENTS_REGISTRY_KEY).await.unwrap(),
            vec!["link_color"]
        );
    }

    #[tokio::test]
    async fn test_find_or_create_strips_version_suffix() {
        let (store, service) = create_service();

        let exp = service
            .find_or_create("link_color:2", vec!["blue".into(), "red".into()])
            .await
            .unwrap();

        assert_eq!(exp.name(), "link_color");
        assert!(store.exists("link_color").await.unwrap());
        assert!(!store.exists("link_color:2").await.unwrap());
    }

    #[tokio::test]
    async fn test_find_missing_returns_none() {
        let (_, service) = create_service();
        assert!(service.find("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_all_lists_registered_experiments() {
        let (store, service) = create_service();
        service
            .find_or_create("link_color", vec!["blue".into(), "red".into()])
            .await
            .unwrap();
        service
            .find_or_create("button_size", vec!["small".into(), "large".into()])
            .await
            .unwrap();
        store
            .sadd(EXPERIMENTS_REGISTRY_KEY, "ghost")
            .await
            .unwrap();

        let names: Vec<String> = service
            .all()
            .await
            .unwrap()
            .iter()
            .map(|e| e.name().to_string())
            .collect();

        assert_eq!(names, vec!["button_size", "link_color"]);
    }

    #[tokio::test]
    async fn test_undeclared_experiment_is_not_found() {
        let (store, service) = create_service();
        let mut exp = service.build("unknown", ExperimentOptions::new()).unwrap();

        let err = service.save(&mut exp).await.unwrap_err();

        assert!(err.is_not_found());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_catalog_definition_is_adopted() {
        let catalog = StaticExperimentCatalog::with_definitions([(
            "button_size",
            ExperimentDefinition::new(["small", "large"])
                .with_goals(["click"])
                .with_algorithm("block_randomization")
                .with_resettable(false),
        )]);
        let (_, service) = create_service_with(catalog, AlgorithmRegistry::with_builtins());

        let exp = service.find_or_create("button_size", Vec::new()).await.unwrap();

        assert_eq!(exp.alternative_names(), vec!["small", "large"]);
        assert_eq!(exp.goals().unwrap(), &["click".to_string()]);
        assert_eq!(exp.algorithm(), Some("block_randomization"));
        assert!(!exp.resettable());

        let found = service.find("button_size").await.unwrap().unwrap();
        assert_eq!(found.algorithm(), Some("block_randomization"));
        assert!(!found.resettable());
    }

    #[tokio::test]
    async fn test_catalog_consulted_by_name_with_mock() {
        let mut catalog = crate::domain::experiment::MockExperimentCatalog::new();
        catalog
            .expect_experiment_for()
            .withf(|name| name == "link_color")
            .returning(|_| Some(ExperimentDefinition::new(["blue", "red"])));
        let store = Arc::new(InMemoryStore::new());
        let service = ExperimentService::new(
            store,
            Arc::new(AlgorithmRegistry::with_builtins()),
            Arc::new(catalog),
        );

        let exp = service.build("link_color", ExperimentOptions::new()).unwrap();

        assert_eq!(exp.alternative_names(), vec!["blue", "red"]);
        assert!(service.validate(&exp).is_ok());
    }

    #[tokio::test]
    async fn test_explicit_alternatives_bypass_catalog() {
        let catalog = StaticExperimentCatalog::with_definitions([(
            "link_color",
            ExperimentDefinition::new(["configured"]),
        )]);
        let (_, service) = create_service_with(catalog, AlgorithmRegistry::with_builtins());

        let exp = service.build("link_color", options(&["blue", "red"])).unwrap();

        assert_eq!(exp.alternative_names(), vec!["blue", "red"]);
    }

    #[tokio::test]
    async fn test_invalid_alternative_fails_validation() {
        let (_, service) = create_service();
        let mut exp = service
            .build(
                "link_color",
                ExperimentOptions::new().with_alternatives([("blue", -1.0), ("red", 1.0)]),
            )
            .unwrap();

        let err = service.save(&mut exp).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_alternative_names_clashing_with_experiment_keys_are_rejected() {
        let (store, service) = create_service();

        for reserved in ["version", "goals", "1"] {
            let err = service
                .find_or_create(
                    ExperimentLabel::with_goals("exp", ["g1"]),
                    vec![reserved.into(), "B".into()],
                )
                .await
                .unwrap_err();

            assert!(matches!(err, DomainError::Validation { .. }));
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_algorithm_is_configuration_error() {
        let (store, service) = create_service();
        let mut exp = service
            .build("link_color", options(&["blue", "red"]).with_algorithm("bandit"))
            .unwrap();

        let err = service.save(&mut exp).await.unwrap_err();

        assert!(matches!(err, DomainError::Configuration { .. }));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_participant_count_sums_alternatives() {
        let (_, service) = create_service();
        let exp = service
            .find_or_create("link_color", vec!["blue".into(), "red".into()])
            .await
            .unwrap();
        for alternative in exp.alternatives() {
            service
                .alternatives()
                .increment_participation(alternative)
                .await
                .unwrap();
        }

        assert_eq!(service.participant_count(&exp).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_propagates_unmodified() {
        let service: ExperimentService<dyn KeyValueStore> = ExperimentService::new(
            Arc::new(FailingStore::new("connection refused")),
            Arc::new(AlgorithmRegistry::with_builtins()),
            Arc::new(StaticExperimentCatalog::empty()),
        );

        let err = service
            .find_or_create("link_color", vec!["blue".into(), "red".into()])
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Storage error: connection refused");
    }
}
