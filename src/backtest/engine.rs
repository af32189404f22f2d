//! Bar-by-bar simulation engine
//!
//! [`SimulationEngine`] drives one full run: it consumes a [`Strategy`] and an
//! ordered bar series, owns all capital/position/equity state, and emits a
//! [`BacktestResult`]. The loop is strictly single-threaded and sequential;
//! state at bar `i` depends on bar `i - 1`.

use crate::backtest::metrics::{BacktestResult, EquityPoint, MetricsCalculator};
use crate::backtest::position::Position;
use crate::core::types::{Action, ActionKind, Bar, ExitReason, TimePeriod};
use crate::core::EngineError;
use crate::strategy::Strategy;
use tracing::warn;

/// Simulation configuration
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Starting capital, must be positive
    pub initial_capital: f64,
    /// Symbol attached to opened positions
    pub symbol: String,
    /// Bar interval, used to annualize risk-adjusted ratios
    pub period: TimePeriod,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            symbol: "SIM".to_string(),
            period: TimePeriod::Daily,
        }
    }
}

impl SimConfig {
    /// Validate the configuration before any simulation starts
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(EngineError::Config(format!(
                "initial capital must be positive, got {}",
                self.initial_capital
            )));
        }
        Ok(())
    }
}

/// Drives one backtest run over an ordered bar series
///
/// At most one position is open at any time. Capital is debited once on open
/// and credited once on close; the equity curve marks the open position to
/// market at every bar's close.
pub struct SimulationEngine {
    config: SimConfig,
    current_capital: f64,
    position: Option<Position>,
    trades: Vec<Position>,
    equity_curve: Vec<EquityPoint>,
    peak_capital: f64,
    max_drawdown_pct: f64,
}

impl SimulationEngine {
    /// Create an engine; fails fast on an invalid configuration
    pub fn new(config: SimConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let capital = config.initial_capital;
        Ok(Self {
            config,
            current_capital: capital,
            position: None,
            trades: Vec::new(),
            equity_curve: Vec::new(),
            peak_capital: capital,
            max_drawdown_pct: 0.0,
        })
    }

    /// Run the strategy over `bars` and produce a result
    ///
    /// Deterministic given a deterministic strategy and bar series. The
    /// engine is reset at the start, so an instance can be reused across
    /// runs.
    pub fn run(
        &mut self,
        strategy: &mut dyn Strategy,
        bars: &[Bar],
    ) -> Result<BacktestResult, EngineError> {
        if bars.is_empty() {
            return Err(EngineError::InsufficientData(
                "empty bar series".to_string(),
            ));
        }
        if let Some(index) = first_unordered(bars) {
            return Err(EngineError::UnorderedBars { index });
        }
        self.reset();

        // Indicator augmentation is best-effort; a failing strategy
        // degrades to the raw series.
        let bars = match strategy.calculate_indicators(bars) {
            Ok(augmented) => augmented,
            Err(e) => {
                warn!(strategy = strategy.name(), error = %e, "calculate_indicators failed, using raw bars");
                bars.to_vec()
            }
        };

        // First bar seeds the equity curve at initial capital.
        self.equity_curve.push(EquityPoint {
            timestamp: bars[0].timestamp,
            equity: self.config.initial_capital,
        });

        for bar in &bars[1..] {
            self.check_open_position(bar)?;
            self.dispatch_strategy(strategy, bar)?;
            self.record_equity(bar);
        }

        // Whatever is still open closes at the last bar's close.
        if let Some(mut position) = self.position.take() {
            let last = &bars[bars.len() - 1];
            let pnl = position.close(last.close, last.timestamp, ExitReason::EndOfData)?;
            self.current_capital += position.entry_cost() + pnl;
            self.trades.push(position);
        }

        let calculator = MetricsCalculator::new(self.config.period);
        let metrics = calculator.compute(&self.trades, &self.equity_curve);
        Ok(BacktestResult {
            metrics,
            equity_curve: std::mem::take(&mut self.equity_curve),
            trades: std::mem::take(&mut self.trades),
        })
    }

    /// Highest equity observed so far; non-decreasing across a run
    pub fn peak_capital(&self) -> f64 {
        self.peak_capital
    }

    /// Largest drawdown observed so far, in percent
    pub fn max_drawdown_pct(&self) -> f64 {
        self.max_drawdown_pct
    }

    fn reset(&mut self) {
        self.current_capital = self.config.initial_capital;
        self.position = None;
        self.trades.clear();
        self.equity_curve.clear();
        self.peak_capital = self.config.initial_capital;
        self.max_drawdown_pct = 0.0;
    }

    /// Step 1: let the open position react to the bar's intrabar range
    fn check_open_position(&mut self, bar: &Bar) -> Result<(), EngineError> {
        let closed = match &mut self.position {
            Some(position) => position.update_on_bar(bar)?.is_some(),
            None => false,
        };
        if closed {
            if let Some(position) = self.position.take() {
                self.current_capital += position.entry_cost() + position.profit_loss;
                self.trades.push(position);
            }
        }
        Ok(())
    }

    /// Step 2: query the strategy and apply its action, if any
    fn dispatch_strategy(
        &mut self,
        strategy: &mut dyn Strategy,
        bar: &Bar,
    ) -> Result<(), EngineError> {
        let action = match strategy.on_candle(bar, self.current_capital) {
            Ok(action) => action,
            Err(e) => {
                // One bad decision point is recoverable; treat as HOLD.
                warn!(strategy = strategy.name(), timestamp = bar.timestamp, error = %e, "strategy error, holding");
                None
            }
        };

        match action {
            Some(action) if action.kind == ActionKind::Buy => self.apply_buy(&action, bar)?,
            Some(action) if action.kind == ActionKind::Sell => self.apply_sell(&action, bar)?,
            _ => {}
        }
        Ok(())
    }

    fn apply_buy(&mut self, action: &Action, bar: &Bar) -> Result<(), EngineError> {
        if self.position.is_some() {
            warn!(
                timestamp = bar.timestamp,
                "buy rejected: a position is already open"
            );
            return Ok(());
        }
        let cost = action.price * action.size;
        if cost > self.current_capital {
            warn!(
                timestamp = bar.timestamp,
                cost,
                available = self.current_capital,
                "buy rejected: cost exceeds available capital"
            );
            return Ok(());
        }
        match Position::open(
            self.config.symbol.clone(),
            crate::core::Side::Long,
            action.price,
            action.size,
            bar.timestamp,
            action.stop_loss,
            action.take_profit,
        ) {
            Ok(position) => {
                self.current_capital -= cost;
                self.position = Some(position);
            }
            Err(e) => {
                warn!(timestamp = bar.timestamp, error = %e, "buy rejected: invalid action");
            }
        }
        Ok(())
    }

    fn apply_sell(&mut self, action: &Action, bar: &Bar) -> Result<(), EngineError> {
        match self.position.take() {
            Some(mut position) => {
                let pnl = position.close(action.price, bar.timestamp, ExitReason::StrategySignal)?;
                self.current_capital += position.entry_cost() + pnl;
                self.trades.push(position);
            }
            None => {
                warn!(
                    timestamp = bar.timestamp,
                    "sell rejected: no open position"
                );
            }
        }
        Ok(())
    }

    /// Step 3: append one equity point and roll peak/drawdown state
    fn record_equity(&mut self, bar: &Bar) {
        let equity = self.current_capital
            + self
                .position
                .as_ref()
                .map(|p| p.market_value(bar.close))
                .unwrap_or(0.0);

        self.equity_curve.push(EquityPoint {
            timestamp: bar.timestamp,
            equity,
        });

        if equity > self.peak_capital {
            self.peak_capital = equity;
        }
        if self.peak_capital > 0.0 {
            let drawdown = (self.peak_capital - equity) / self.peak_capital * 100.0;
            if drawdown > self.max_drawdown_pct {
                self.max_drawdown_pct = drawdown;
            }
        }
    }
}

/// Index of the first bar whose timestamp does not increase, if any
fn first_unordered(bars: &[Bar]) -> Option<usize> {
    bars.windows(2)
        .position(|w| w[1].timestamp <= w[0].timestamp)
        .map(|i| i + 1)
}
