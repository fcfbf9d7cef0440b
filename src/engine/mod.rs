//! Stateful driver that turns data and viewport changes into published entities
pub mod config;
pub mod controller;
pub mod debounce;
pub mod listener;
pub mod tracker;

#[cfg(test)]
mod config_test;

pub use config::{EngineConfig, StrategyChoice};
pub use controller::{ClusteringEngine, SharedStrategy, build_strategy};
pub use debounce::Debouncer;
pub use listener::{MapListener, NoopListener};
pub use tracker::{Completion, PassState, PassTracker};
