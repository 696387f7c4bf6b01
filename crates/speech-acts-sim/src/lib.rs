//! Simulation harness: scores utterances for configured speakers across action contexts.

pub mod analytics;
pub mod config;
pub mod logging;
pub mod plot;
pub mod simulation;
