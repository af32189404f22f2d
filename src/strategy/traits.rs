//! Core strategy trait definition

use crate::core::types::{Action, Bar, Signal};
use crate::strategy::StrategyError;

/// Decision logic plugged into the simulation engine
///
/// Implementations own their indicator state; the engine owns all position
/// and capital state. A strategy instance is used by exactly one simulation
/// run and is never shared across concurrent runs.
pub trait Strategy: Send {
    /// Human-readable strategy name
    fn name(&self) -> &str;

    /// Return a copy of `bars` augmented with indicator fields
    ///
    /// Pure with respect to the input; the default is a pass-through for
    /// strategies that compute indicators incrementally in [`on_candle`].
    ///
    /// [`on_candle`]: Strategy::on_candle
    fn calculate_indicators(&self, bars: &[Bar]) -> Result<Vec<Bar>, StrategyError> {
        Ok(bars.to_vec())
    }

    /// Decide on one bar, given the capital currently available
    ///
    /// `None` means hold. Errors are recovered by the engine as a HOLD tick.
    fn on_candle(&mut self, bar: &Bar, available_capital: f64)
        -> Result<Option<Action>, StrategyError>;

    /// Lower-level directional read over a bar window
    ///
    /// Some strategies use this internally from [`on_candle`]; the default
    /// never signals.
    ///
    /// [`on_candle`]: Strategy::on_candle
    fn generate_signal(&self, _bars: &[Bar]) -> Signal {
        Signal::Hold
    }
}
