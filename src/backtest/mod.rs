//! Simulation core: position lifecycle, bar loop, and performance metrics.

pub mod engine;
pub mod metrics;
pub mod position;

pub use engine::{SimConfig, SimulationEngine};
pub use metrics::{BacktestResult, EquityPoint, Metrics, MetricsCalculator};
pub use position::Position;
