//! Experiment commands - run one administrative operation against the store

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::{Command, CreateArgs};
use crate::config::AppConfig;
use crate::domain::{DomainError, Experiment, ExperimentOptions, KeyValueStore};
use crate::infrastructure::logging;
use crate::infrastructure::services::ExperimentService;

type Service = ExperimentService<dyn KeyValueStore>;

/// Snapshot of an experiment as printed by `show`
#[derive(Debug, Serialize)]
struct ExperimentSummary {
    #[serde(flatten)]
    experiment: Experiment,
    version: u64,
    key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    winner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_time: Option<DateTime<Utc>>,
    counters: Vec<AlternativeCounters>,
}

#[derive(Debug, Serialize)]
struct AlternativeCounters {
    alternative: String,
    participant_count: u64,
    completed_count: u64,
    conversion_rate: f64,
}

/// Load configuration, build the service and run a single command
pub async fn run(command: Command) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);

    let service = crate::create_experiment_service_with_config(&config).await?;

    match command {
        Command::List => list(&service).await,
        Command::Show { name } => show(&service, &name).await,
        Command::Create(args) => create(&service, args).await,
        Command::Choose { name, record } => choose(&service, &name, record).await,
        Command::Winner { name, alternative } => {
            winner(&service, &name, alternative.as_deref()).await
        }
        Command::Reset { name } => reset(&service, &name).await,
        Command::Delete { name } => delete(&service, &name).await,
    }
}

async fn list(service: &Service) -> anyhow::Result<()> {
    for experiment in service.all().await? {
        println!("{}", experiment.name());
    }
    Ok(())
}

async fn show(service: &Service, name: &str) -> anyhow::Result<()> {
    let experiment = require(service, name).await?;
    let summary = summarize(service, experiment).await?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn create(service: &Service, args: CreateArgs) -> anyhow::Result<()> {
    let mut options = ExperimentOptions::new()
        .with_alternatives(args.alternatives)
        .with_goals(args.goals)
        .with_resettable(!args.not_resettable);
    if let Some(algorithm) = args.algorithm {
        options = options.with_algorithm(algorithm);
    }

    let mut experiment = service.build(&args.name, options)?;
    service.save(&mut experiment).await?;

    let version = service.version(&mut experiment).await?;
    info!(experiment = %experiment.name(), version, "Experiment saved");
    println!("{} (version {})", experiment.name(), version);
    Ok(())
}

async fn choose(service: &Service, name: &str, record: bool) -> anyhow::Result<()> {
    let experiment = require(service, name).await?;
    let alternative = service.next_alternative(&experiment).await?;

    if record {
        service
            .alternatives()
            .increment_participation(&alternative)
            .await?;
    }

    println!("{}", alternative.name());
    Ok(())
}

async fn winner(service: &Service, name: &str, alternative: Option<&str>) -> anyhow::Result<()> {
    let experiment = require(service, name).await?;

    match alternative {
        Some(alternative) => service.set_winner(&experiment, alternative).await?,
        None => service.reset_winner(&experiment).await?,
    }
    Ok(())
}

async fn reset(service: &Service, name: &str) -> anyhow::Result<()> {
    let mut experiment = require(service, name).await?;
    service.reset(&mut experiment).await?;

    println!("{}", service.key(&mut experiment).await?);
    Ok(())
}

async fn delete(service: &Service, name: &str) -> anyhow::Result<()> {
    let mut experiment = require(service, name).await?;
    service.delete(&mut experiment).await?;
    Ok(())
}

async fn require(service: &Service, name: &str) -> Result<Experiment, DomainError> {
    service
        .find(name)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Experiment '{}' not found", name)))
}

async fn summarize(
    service: &Service,
    mut experiment: Experiment,
) -> Result<ExperimentSummary, DomainError> {
    let version = service.version(&mut experiment).await?;
    let key = service.key(&mut experiment).await?;
    let winner = service
        .winner(&experiment)
        .await?
        .map(|alternative| alternative.name().to_string());
    let start_time = service.start_time(&experiment).await?;

    let mut counters = Vec::with_capacity(experiment.alternatives().len());
    for alternative in experiment.alternatives() {
        let alternatives = service.alternatives();
        counters.push(AlternativeCounters {
            alternative: alternative.name().to_string(),
            participant_count: alternatives.participant_count(alternative).await?,
            completed_count: alternatives.completed_count(alternative).await?,
            conversion_rate: alternatives.conversion_rate(alternative).await?,
        });
    }

    Ok(ExperimentSummary {
        experiment,
        version,
        key,
        winner,
        start_time,
        counters,
    })
}
