//! Infrastructure layer - Store, algorithm and service implementations

pub mod algorithm;
pub mod catalog;
pub mod logging;
pub mod services;
pub mod store;
