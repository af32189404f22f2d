//! Trend Following Trading Strategy
//!
//! Follows moving-average crossovers: enters long when the fast average
//! crosses above the slow one, exits when it crosses back below.

use crate::core::types::{Action, Bar, Signal};
use crate::core::EngineError;
use crate::strategy::{ParameterSet, Strategy, StrategyError};
use std::collections::VecDeque;

/// Configuration for the trend following strategy
#[derive(Debug, Clone)]
pub struct TrendFollowingConfig {
    /// Fast moving average period
    pub fast_period: usize,
    /// Slow moving average period, must exceed `fast_period`
    pub slow_period: usize,
    /// Fraction of available capital committed per entry
    pub order_pct: f64,
    /// Stop-loss distance from entry, as a fraction of entry price
    pub stop_loss_pct: Option<f64>,
}

impl Default for TrendFollowingConfig {
    fn default() -> Self {
        Self {
            fast_period: 10,
            slow_period: 30,
            order_pct: 0.95,
            stop_loss_pct: Some(0.05),
        }
    }
}

impl TrendFollowingConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.fast_period == 0 {
            return Err(EngineError::Config(
                "fast period must be positive".to_string(),
            ));
        }
        if self.slow_period <= self.fast_period {
            return Err(EngineError::Config(format!(
                "slow period ({}) must exceed fast period ({})",
                self.slow_period, self.fast_period
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
            fast_period: params.get_usize("fast_period").unwrap_or(defaults.fast_period),
            slow_period: params.get_usize("slow_period").unwrap_or(defaults.slow_period),
            order_pct: params.get_f64("order_pct").unwrap_or(defaults.order_pct),
            stop_loss_pct: params.get_f64("stop_loss_pct").or(defaults.stop_loss_pct),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Moving-average crossover strategy over closing prices
pub struct TrendFollowingStrategy {
    config: TrendFollowingConfig,
    /// Rolling window of recent closes, slow-period long
    closes: VecDeque<f64>,
    /// Fast-above-slow state from the previous bar
    fast_above: Option<bool>,
    long: bool,
}

impl TrendFollowingStrategy {
    pub fn new(config: TrendFollowingConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let capacity = config.slow_period;
        Ok(Self {
            config,
            closes: VecDeque::with_capacity(capacity),
            fast_above: None,
            long: false,
        })
    }

    fn sma(&self, period: usize) -> Option<f64> {
        if self.closes.len() < period {
            return None;
        }
        let sum: f64 = self.closes.iter().rev().take(period).sum();
        Some(sum / period as f64)
    }

    fn push_close(&mut self, close: f64) {
        self.closes.push_back(close);
        while self.closes.len() > self.config.slow_period {
            self.closes.pop_front();
        }
    }
}

impl Strategy for TrendFollowingStrategy {
    fn name(&self) -> &str {
        "trend_following"
    }

    fn on_candle(
        &mut self,
        bar: &Bar,
        available_capital: f64,
    ) -> Result<Option<Action>, StrategyError> {
        self.push_close(bar.close);

        let (Some(fast), Some(slow)) = (
            self.sma(self.config.fast_period),
            self.sma(self.config.slow_period),
        ) else {
            return Ok(None);
        };

        let now_above = fast > slow;
        let was_above = self.fast_above.replace(now_above);

        match was_above {
            // Cross up: enter
            Some(false) if now_above && !self.long => {
                let budget = available_capital * self.config.order_pct;
                let size = budget / bar.close;
                if size <= 0.0 {
                    return Ok(None);
                }
                let mut action = Action::buy(bar.close, size);
                if let Some(pct) = self.config.stop_loss_pct {
                    action = action.with_stop_loss(bar.close * (1.0 - pct));
                }
                self.long = true;
                Ok(Some(action))
            }
            // Cross down: exit
            Some(true) if !now_above && self.long => {
                self.long = false;
                Ok(Some(Action::sell(bar.close)))
            }
            _ => Ok(None),
        }
    }

    fn generate_signal(&self, bars: &[Bar]) -> Signal {
        if bars.len() < self.config.slow_period {
            return Signal::Hold;
        }
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let fast = closes[closes.len() - self.config.fast_period..]
            .iter()
            .sum::<f64>()
            / self.config.fast_period as f64;
        let slow = closes[closes.len() - self.config.slow_period..]
            .iter()
            .sum::<f64>()
            / self.config.slow_period as f64;
        if fast > slow {
            Signal::Buy
        } else if fast < slow {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}
