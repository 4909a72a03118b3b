//! Selection algorithm implementations

mod block_randomization;
mod registry;
mod weighted_sample;

pub use block_randomization::BlockRandomization;
pub use registry::{AlgorithmRegistry, ResolvedAlgorithm};
pub use weighted_sample::WeightedSample;
