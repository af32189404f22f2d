//! Trading strategy framework
//!
//! Defines the [`Strategy`] trait the engine drives, the closed set of
//! strategy kinds, and the parameter containers used by grid search.

pub mod params;
pub mod traits;

pub use params::{ParamValue, ParameterGrid, ParameterSet};
pub use traits::Strategy;

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error raised by strategy code during indicator or signal computation
///
/// The engine recovers these locally as a HOLD tick; only construction-time
/// failures propagate as fatal.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// Not enough bars/history for the computation
    #[error("missing data: {0}")]
    MissingData(String),

    /// Indicator computation failed
    #[error("indicator error: {0}")]
    Indicator(String),

    /// Any other strategy-level failure
    #[error("{0}")]
    Other(String),
}

/// Closed set of strategy variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Scalping,
    MeanReversion,
    TrendFollowing,
    GridTrading,
    Arbitrage,
    Dca,
    Ensemble,
}

impl StrategyKind {
    /// All variants, in display order
    pub const ALL: [StrategyKind; 7] = [
        StrategyKind::Scalping,
        StrategyKind::MeanReversion,
        StrategyKind::TrendFollowing,
        StrategyKind::GridTrading,
        StrategyKind::Arbitrage,
        StrategyKind::Dca,
        StrategyKind::Ensemble,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Scalping => "scalping",
            StrategyKind::MeanReversion => "mean_reversion",
            StrategyKind::TrendFollowing => "trend_following",
            StrategyKind::GridTrading => "grid_trading",
            StrategyKind::Arbitrage => "arbitrage",
            StrategyKind::Dca => "dca",
            StrategyKind::Ensemble => "ensemble",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| StrategyError::Other(format!("unknown strategy kind: {}", s)))
    }
}
