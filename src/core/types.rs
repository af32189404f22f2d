//! Core market data and trading types shared across the crate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Epoch timestamp in milliseconds
pub type Timestamp = u64;

/// A single OHLCV bar
///
/// Bars are immutable once produced by the data source. `indicators` holds
/// optional augmented fields written by `Strategy::calculate_indicators`
/// (keyed by indicator name, e.g. `"sma_20"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Bar open timestamp (strictly increasing within a series)
    pub timestamp: Timestamp,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Optional indicator values attached by a strategy
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub indicators: BTreeMap<String, f64>,
}

impl Bar {
    /// Create a bar with no indicator fields
    pub fn new(timestamp: Timestamp, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            indicators: BTreeMap::new(),
        }
    }

    /// Look up an indicator value attached to this bar
    pub fn indicator(&self, name: &str) -> Option<f64> {
        self.indicators.get(name).copied()
    }
}

/// Direction of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

/// Low-level directional signal from a strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

/// What an action asks the engine to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    Buy,
    Sell,
}

/// An order request emitted by a strategy on a candle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    /// Execution price for the action
    pub price: f64,
    /// Number of units to trade (must be > 0 for a buy)
    pub size: f64,
    /// Stop-loss level for the opened position
    pub stop_loss: Option<f64>,
    /// Take-profit level for the opened position
    pub take_profit: Option<f64>,
}

impl Action {
    /// Buy `size` units at `price` with no exit levels
    pub fn buy(price: f64, size: f64) -> Self {
        Self {
            kind: ActionKind::Buy,
            price,
            size,
            stop_loss: None,
            take_profit: None,
        }
    }

    /// Sell the open position at `price`
    pub fn sell(price: f64) -> Self {
        Self {
            kind: ActionKind::Sell,
            price,
            size: 0.0,
            stop_loss: None,
            take_profit: None,
        }
    }

    /// Attach a stop-loss level
    pub fn with_stop_loss(mut self, level: f64) -> Self {
        self.stop_loss = Some(level);
        self
    }

    /// Attach a take-profit level
    pub fn with_take_profit(mut self, level: f64) -> Self {
        self.take_profit = Some(level);
        self
    }
}

/// Why a position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    StrategySignal,
    StopLoss,
    TakeProfit,
    Timeout,
    EndOfData,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::StrategySignal => "STRATEGY_SIGNAL",
            ExitReason::StopLoss => "STOP_LOSS",
            ExitReason::TakeProfit => "TAKE_PROFIT",
            ExitReason::Timeout => "TIMEOUT",
            ExitReason::EndOfData => "END_OF_DATA",
        };
        write!(f, "{}", s)
    }
}

/// Bar interval used to annualize risk-adjusted ratios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimePeriod {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Annually,
}

impl TimePeriod {
    /// Number of periods per year for annualization
    pub fn annualization_factor(&self) -> f64 {
        match self {
            TimePeriod::Hourly => 24.0 * 365.0,
            TimePeriod::Daily => 252.0, // Trading days per year
            TimePeriod::Weekly => 52.0,
            TimePeriod::Monthly => 12.0,
            TimePeriod::Annually => 1.0,
        }
    }
}

impl Default for TimePeriod {
    fn default() -> Self {
        TimePeriod::Daily
    }
}
