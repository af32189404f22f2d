//! Shared helpers for integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Once;
use stratsim::core::types::{Action, Bar, Timestamp};
use stratsim::strategy::{Strategy, StrategyError};

static INIT: Once = Once::new();

/// Route engine warnings to stderr when `RUST_LOG` is set
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// One bar per minute, all OHLC fields equal to `price`
pub fn flat_bars(n: usize, price: f64) -> Vec<Bar> {
    (0..n)
        .map(|i| Bar::new(i as Timestamp * 60_000, price, price, price, price, 1.0))
        .collect()
}

/// One bar per close, OHLC collapsed to the close
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, c)| Bar::new(i as Timestamp * 60_000, *c, *c, *c, *c, 1.0))
        .collect()
}

/// Emits pre-scheduled actions keyed by bar timestamp, holds otherwise
pub struct ScriptedStrategy {
    actions: BTreeMap<Timestamp, Action>,
}

impl ScriptedStrategy {
    pub fn new(actions: impl IntoIterator<Item = (Timestamp, Action)>) -> Self {
        Self {
            actions: actions.into_iter().collect(),
        }
    }
}

impl Strategy for ScriptedStrategy {
    fn name(&self) -> &str {
        "scripted"
    }

    fn on_candle(&mut self, bar: &Bar, _: f64) -> Result<Option<Action>, StrategyError> {
        Ok(self.actions.remove(&bar.timestamp))
    }
}

/// Never acts; every tick is a hold
pub struct HoldStrategy;

impl Strategy for HoldStrategy {
    fn name(&self) -> &str {
        "hold"
    }

    fn on_candle(&mut self, _: &Bar, _: f64) -> Result<Option<Action>, StrategyError> {
        Ok(None)
    }
}
