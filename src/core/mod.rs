//! Core types and errors shared by the backtest and optimization layers.

pub mod error;
pub mod types;

pub use error::EngineError;
pub use types::{Action, ActionKind, Bar, ExitReason, Side, Signal, TimePeriod, Timestamp};
