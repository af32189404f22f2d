//! Crate-wide error taxonomy.
//!
//! Anything that could corrupt capital accounting is fatal and surfaced to the
//! caller; a bad single decision point (one strategy signal) is recovered
//! locally by the engine and never reaches this type.

use crate::strategy::StrategyError;
use thiserror::Error;

/// Fatal errors surfaced by the simulation and optimization entry points
#[derive(Debug, Error)]
pub enum EngineError {
    /// Empty or too-short bar series for the requested operation
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Bar series is not in strictly increasing timestamp order
    #[error("bars out of order at index {index}")]
    UnorderedBars { index: usize },

    /// Operation attempted on a terminal position
    #[error("invalid position state: {0}")]
    InvalidState(String),

    /// Invalid configuration, rejected before any simulation starts
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Fatal strategy failure (construction; per-tick failures degrade to HOLD)
    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),

    /// Optimization stopped by a cancellation token
    #[error("optimization cancelled")]
    Cancelled,
}
