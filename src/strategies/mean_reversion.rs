//! Mean Reversion Trading Strategy
//!
//! Buys when the close deviates far enough below its rolling mean and exits
//! once price reverts toward the mean.

use crate::core::types::{Action, Bar, Signal};
use crate::core::EngineError;
use crate::strategy::{ParameterSet, Strategy, StrategyError};
use std::collections::VecDeque;

/// Configuration for the mean reversion strategy
#[derive(Debug, Clone)]
pub struct MeanReversionConfig {
    /// Lookback period for the rolling mean
    pub lookback: usize,
    /// Z-score below the mean that triggers an entry
    pub entry_z: f64,
    /// Z-score at which a held position exits (reversion reached)
    pub exit_z: f64,
    /// Fraction of available capital committed per entry
    pub order_pct: f64,
    /// Stop-loss distance from entry, as a fraction of entry price
    pub stop_loss_pct: Option<f64>,
    /// Take-profit distance from entry, as a fraction of entry price
    pub take_profit_pct: Option<f64>,
}

impl Default for MeanReversionConfig {
    fn default() -> Self {
        Self {
            lookback: 20,
            entry_z: 2.0,
            exit_z: 0.5,
            order_pct: 0.95,
            stop_loss_pct: Some(0.05),
            take_profit_pct: None,
        }
    }
}

impl MeanReversionConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.lookback < 2 {
            return Err(EngineError::Config(format!(
                "mean reversion lookback must be >= 2, got {}",
                self.lookback
            )));
        }
        if self.entry_z <= 0.0 {
            return Err(EngineError::Config(format!(
                "entry z-score must be positive, got {}",
                self.entry_z
            )));
        }
        if self.exit_z < 0.0 || self.exit_z >= self.entry_z {
            return Err(EngineError::Config(format!(
                "exit z-score must be in [0, entry_z), got {}",
                self.exit_z
            )));
        }
        if self.order_pct <= 0.0 || self.order_pct > 1.0 {
            return Err(EngineError::Config(format!(
                "order pct must be in (0, 1], got {}",
                self.order_pct
            )));
        }
        Ok(())
    }

    /// Build a config from a parameter set, falling back to defaults
    pub fn from_params(params: &ParameterSet) -> Result<Self, EngineError> {
        let defaults = Self::default();
        let config = Self {
            lookback: params.get_usize("lookback").unwrap_or(defaults.lookback),
            entry_z: params.get_f64("entry_z").unwrap_or(defaults.entry_z),
            exit_z: params.get_f64("exit_z").unwrap_or(defaults.exit_z),
            order_pct: params.get_f64("order_pct").unwrap_or(defaults.order_pct),
            stop_loss_pct: params.get_f64("stop_loss_pct").or(defaults.stop_loss_pct),
            take_profit_pct: params.get_f64("take_profit_pct").or(defaults.take_profit_pct),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Mean reversion strategy over closing prices
pub struct MeanReversionStrategy {
    config: MeanReversionConfig,
    /// Rolling window of recent closes
    closes: VecDeque<f64>,
    /// Whether this strategy believes it holds a position
    long: bool,
}

impl MeanReversionStrategy {
    pub fn new(config: MeanReversionConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let capacity = config.lookback;
        Ok(Self {
            config,
            closes: VecDeque::with_capacity(capacity),
            long: false,
        })
    }

    /// Rolling mean and standard deviation, once the window is full
    fn statistics(&self) -> Option<(f64, f64)> {
        if self.closes.len() < self.config.lookback {
            return None;
        }
        let n = self.closes.len() as f64;
        let mean = self.closes.iter().sum::<f64>() / n;
        let variance = self.closes.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n;
        Some((mean, variance.sqrt()))
    }

    fn push_close(&mut self, close: f64) {
        self.closes.push_back(close);
        while self.closes.len() > self.config.lookback {
            self.closes.pop_front();
        }
    }
}

impl Strategy for MeanReversionStrategy {
    fn name(&self) -> &str {
        "mean_reversion"
    }

    fn on_candle(
        &mut self,
        bar: &Bar,
        available_capital: f64,
    ) -> Result<Option<Action>, StrategyError> {
        self.push_close(bar.close);

        let Some((mean, std)) = self.statistics() else {
            return Ok(None);
        };
        if std == 0.0 {
            return Ok(None);
        }
        let z = (bar.close - mean) / std;

        if !self.long && z <= -self.config.entry_z {
            let budget = available_capital * self.config.order_pct;
            let size = budget / bar.close;
            if size <= 0.0 {
                return Ok(None);
            }
            let mut action = Action::buy(bar.close, size);
            if let Some(pct) = self.config.stop_loss_pct {
                action = action.with_stop_loss(bar.close * (1.0 - pct));
            }
            if let Some(pct) = self.config.take_profit_pct {
                action = action.with_take_profit(bar.close * (1.0 + pct));
            }
            self.long = true;
            return Ok(Some(action));
        }

        if self.long && z >= -self.config.exit_z {
            self.long = false;
            return Ok(Some(Action::sell(bar.close)));
        }

        Ok(None)
    }

    fn generate_signal(&self, bars: &[Bar]) -> Signal {
        if bars.len() < self.config.lookback {
            return Signal::Hold;
        }
        let window = &bars[bars.len() - self.config.lookback..];
        let n = window.len() as f64;
        let mean = window.iter().map(|b| b.close).sum::<f64>() / n;
        let variance = window.iter().map(|b| (b.close - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();
        if std == 0.0 {
            return Signal::Hold;
        }
        let z = (window[window.len() - 1].close - mean) / std;
        if z <= -self.config.entry_z {
            Signal::Buy
        } else if z >= self.config.entry_z {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(MeanReversionConfig::default().validate().is_ok());
        assert!(MeanReversionConfig {
            lookback: 1,
            ..Default::default()
        }
        .validate()
        .is_err());
        assert!(MeanReversionConfig {
            entry_z: 0.0,
            ..Default::default()
        }
        .validate()
        .is_err());
        assert!(MeanReversionConfig {
            exit_z: 3.0,
            ..Default::default()
        }
        .validate()
        .is_err());
        assert!(MeanReversionConfig {
            order_pct: 1.5,
            ..Default::default()
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_from_params_overrides_defaults() {
        let params = ParameterSet::new().with("lookback", 10.0).with("entry_z", 1.5);
        let config = MeanReversionConfig::from_params(&params).unwrap();
        assert_eq!(config.lookback, 10);
        assert_eq!(config.entry_z, 1.5);
        assert_eq!(config.exit_z, MeanReversionConfig::default().exit_z);
    }

    #[test]
    fn test_buys_on_deep_dip() {
        let config = MeanReversionConfig {
            lookback: 5,
            entry_z: 1.0,
            exit_z: 0.0,
            order_pct: 0.5,
            stop_loss_pct: None,
            take_profit_pct: None,
        };
        let mut strategy = MeanReversionStrategy::new(config).unwrap();

        // Stable prices, then a sharp drop.
        let mut action = None;
        for (i, price) in [100.0, 100.5, 99.5, 100.0, 100.2, 80.0].iter().enumerate() {
            let bar = Bar::new(i as u64 * 1_000, *price, *price, *price, *price, 1.0);
            action = strategy.on_candle(&bar, 10_000.0).unwrap();
        }

        let action = action.expect("expected a buy on the dip");
        assert_eq!(action.kind, crate::core::types::ActionKind::Buy);
        assert!((action.price - 80.0).abs() < 1e-12);
        assert!((action.size - 5_000.0 / 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_holds_on_flat_series() {
        let mut strategy = MeanReversionStrategy::new(MeanReversionConfig::default()).unwrap();
        for i in 0..50u64 {
            let bar = Bar::new(i * 1_000, 100.0, 100.0, 100.0, 100.0, 1.0);
            assert_eq!(strategy.on_candle(&bar, 10_000.0).unwrap(), None);
        }
    }
}
