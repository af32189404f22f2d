//! Bar-level strategy backtesting with walk-forward parameter search.
//!
//! The [`backtest`] module drives a [`strategy::Strategy`] over an ordered
//! bar series and produces a [`backtest::BacktestResult`]; the [`optimize`]
//! module repeats those runs across rolling train/validation windows and a
//! parameter grid to measure how stable the winning parameters are over time.

pub mod backtest;
pub mod core;
pub mod optimize;
pub mod strategies;
pub mod strategy;

pub use crate::backtest::{BacktestResult, SimConfig, SimulationEngine};
pub use crate::core::{Action, Bar, EngineError, ExitReason, Side, Signal, TimePeriod};
pub use crate::optimize::{CancelToken, WalkForwardConfig, WalkForwardOptimizer};
pub use crate::strategy::{ParameterGrid, ParameterSet, Strategy, StrategyKind};
