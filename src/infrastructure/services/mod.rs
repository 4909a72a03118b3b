//! Infrastructure services

mod alternative_service;
mod experiment_service;

pub use alternative_service::{AlternativeService, COMPLETED_COUNT_FIELD, PARTICIPANT_COUNT_FIELD};
pub use experiment_service::ExperimentService;
