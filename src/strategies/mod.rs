//! Built-in reference strategies
//!
//! Only the kinds with decision logic native to this crate are constructible
//! here; the remaining [`StrategyKind`] variants belong to external strategy
//! implementations and are rejected with a configuration error.

pub mod mean_reversion;
pub mod trend_following;

pub use mean_reversion::{MeanReversionConfig, MeanReversionStrategy};
pub use trend_following::{TrendFollowingConfig, TrendFollowingStrategy};

use crate::core::EngineError;
use crate::strategy::{ParameterSet, Strategy, StrategyKind};

/// Construct a built-in strategy from a parameter set
pub fn build(kind: StrategyKind, params: &ParameterSet) -> Result<Box<dyn Strategy>, EngineError> {
    match kind {
        StrategyKind::MeanReversion => {
            let config = MeanReversionConfig::from_params(params)?;
            Ok(Box::new(MeanReversionStrategy::new(config)?))
        }
        StrategyKind::TrendFollowing => {
            let config = TrendFollowingConfig::from_params(params)?;
            Ok(Box::new(TrendFollowingStrategy::new(config)?))
        }
        other => Err(EngineError::Config(format!(
            "no built-in implementation for strategy kind '{}'; supply a custom factory",
            other
        ))),
    }
}
