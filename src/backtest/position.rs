//! Position lifecycle for backtesting
//!
//! A [`Position`] models exactly one trade from entry to exit. It is OPEN when
//! created and becomes CLOSED once [`Position::close`] runs; closed positions
//! are immutable and every mutating call on one fails with
//! [`EngineError::InvalidState`].

use crate::core::types::{Bar, ExitReason, Side, Timestamp};
use crate::core::EngineError;
use serde::Serialize;

/// A single open or closed trade
#[derive(Debug, Clone, Serialize)]
pub struct Position {
    /// Instrument symbol
    pub symbol: String,
    /// Direction of the trade
    pub side: Side,
    /// Entry fill price
    pub entry_price: f64,
    /// Number of units, always positive
    pub size: f64,
    /// Entry timestamp
    pub entry_time: Timestamp,
    /// Stop-loss level, if any
    pub stop_loss: Option<f64>,
    /// Take-profit level, if any
    pub take_profit: Option<f64>,
    /// Exit fill price (set on close)
    pub exit_price: Option<f64>,
    /// Exit timestamp (set on close)
    pub exit_time: Option<Timestamp>,
    /// Why the position was closed
    pub exit_reason: Option<ExitReason>,
    /// Realized P&L, fixed forever once closed
    pub profit_loss: f64,
    /// Realized return relative to entry, in percent
    pub profit_loss_pct: f64,
}

impl Position {
    /// Open a new position
    ///
    /// Fails with [`EngineError::InvalidState`] on a non-positive or
    /// non-finite size or entry price.
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        symbol: impl Into<String>,
        side: Side,
        entry_price: f64,
        size: f64,
        entry_time: Timestamp,
        stop_loss: Option<f64>,
        take_profit: Option<f64>,
    ) -> Result<Self, EngineError> {
        if !entry_price.is_finite() || entry_price <= 0.0 {
            return Err(EngineError::InvalidState(format!(
                "entry price must be positive, got {}",
                entry_price
            )));
        }
        if !size.is_finite() || size <= 0.0 {
            return Err(EngineError::InvalidState(format!(
                "position size must be positive, got {}",
                size
            )));
        }

        Ok(Self {
            symbol: symbol.into(),
            side,
            entry_price,
            size,
            entry_time,
            stop_loss,
            take_profit,
            exit_price: None,
            exit_time: None,
            exit_reason: None,
            profit_loss: 0.0,
            profit_loss_pct: 0.0,
        })
    }

    /// Whether the position is still open
    pub fn is_open(&self) -> bool {
        self.exit_reason.is_none()
    }

    /// Whether the position reached its terminal state
    pub fn is_closed(&self) -> bool {
        !self.is_open()
    }

    /// Capital debited when the position was opened
    pub fn entry_cost(&self) -> f64 {
        self.entry_price * self.size
    }

    /// Unrealized P&L at `price` (realized P&L once closed)
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        if self.is_closed() {
            return self.profit_loss;
        }
        match self.side {
            Side::Long => (price - self.entry_price) * self.size,
            Side::Short => (self.entry_price - price) * self.size,
        }
    }

    /// Mark-to-market value at `price`: entry cost plus unrealized P&L
    pub fn market_value(&self, price: f64) -> f64 {
        self.entry_cost() + self.unrealized_pnl(price)
    }

    /// Check exit levels against a point price, closing if one is crossed
    ///
    /// The fill price is exactly the crossed level, not `price`. Returns the
    /// exit reason when the position closed, `None` when it stays open.
    pub fn update(&mut self, price: f64, time: Timestamp) -> Result<Option<ExitReason>, EngineError> {
        self.ensure_open("update")?;
        // Treat the point price as both extremes of a degenerate bar.
        self.check_levels(price, price, time)
    }

    /// Check exit levels against a bar's intrabar range, closing if crossed
    ///
    /// For a LONG the stop-loss triggers on `bar.low`, the take-profit on
    /// `bar.high` (mirrored for SHORT). When both levels fall inside the bar's
    /// range the stop-loss wins (conservative fill).
    pub fn update_on_bar(&mut self, bar: &Bar) -> Result<Option<ExitReason>, EngineError> {
        self.ensure_open("update")?;
        self.check_levels(bar.low, bar.high, bar.timestamp)
    }

    fn check_levels(
        &mut self,
        low: f64,
        high: f64,
        time: Timestamp,
    ) -> Result<Option<ExitReason>, EngineError> {
        let (stop_hit, take_hit) = match self.side {
            Side::Long => (
                self.stop_loss.map(|sl| low <= sl).unwrap_or(false),
                self.take_profit.map(|tp| high >= tp).unwrap_or(false),
            ),
            Side::Short => (
                self.stop_loss.map(|sl| high >= sl).unwrap_or(false),
                self.take_profit.map(|tp| low <= tp).unwrap_or(false),
            ),
        };

        if stop_hit {
            let level = self.stop_loss.unwrap_or(self.entry_price);
            self.close(level, time, ExitReason::StopLoss)?;
            return Ok(Some(ExitReason::StopLoss));
        }
        if take_hit {
            let level = self.take_profit.unwrap_or(self.entry_price);
            self.close(level, time, ExitReason::TakeProfit)?;
            return Ok(Some(ExitReason::TakeProfit));
        }
        Ok(None)
    }

    /// Close the position at `exit_price`, fixing its P&L fields forever
    ///
    /// Returns the realized P&L. Fails if the position is already closed.
    pub fn close(
        &mut self,
        exit_price: f64,
        time: Timestamp,
        reason: ExitReason,
    ) -> Result<f64, EngineError> {
        self.ensure_open("close")?;

        let pnl = match self.side {
            Side::Long => (exit_price - self.entry_price) * self.size,
            Side::Short => (self.entry_price - exit_price) * self.size,
        };

        self.exit_price = Some(exit_price);
        self.exit_time = Some(time);
        self.exit_reason = Some(reason);
        self.profit_loss = pnl;
        self.profit_loss_pct = pnl / self.entry_cost() * 100.0;

        Ok(pnl)
    }

    fn ensure_open(&self, op: &str) -> Result<(), EngineError> {
        if self.is_closed() {
            return Err(EngineError::InvalidState(format!(
                "{} on closed {} position in {}",
                op, self.side, self.symbol
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long(entry: f64, size: f64) -> Position {
        Position::open("TEST", Side::Long, entry, size, 1_000, None, None).unwrap()
    }

    #[test]
    fn test_open_rejects_bad_inputs() {
        assert!(Position::open("TEST", Side::Long, 0.0, 1.0, 0, None, None).is_err());
        assert!(Position::open("TEST", Side::Long, 100.0, 0.0, 0, None, None).is_err());
        assert!(Position::open("TEST", Side::Long, 100.0, -5.0, 0, None, None).is_err());
        assert!(Position::open("TEST", Side::Long, f64::NAN, 1.0, 0, None, None).is_err());
    }

    #[test]
    fn test_long_close_with_profit() {
        let mut pos = long(100.0, 5.0);
        let pnl = pos.close(110.0, 2_000, ExitReason::StrategySignal).unwrap();

        assert_eq!(pnl, 50.0);
        assert!(pos.is_closed());
        assert_eq!(pos.profit_loss, 50.0);
        assert!((pos.profit_loss_pct - 10.0).abs() < 1e-12);
        assert_eq!(pos.exit_reason, Some(ExitReason::StrategySignal));
    }

    #[test]
    fn test_short_pnl_is_mirrored() {
        let mut pos = Position::open("TEST", Side::Short, 100.0, 10.0, 0, None, None).unwrap();
        let pnl = pos.close(90.0, 1, ExitReason::StrategySignal).unwrap();
        assert_eq!(pnl, 100.0);

        let mut loser = Position::open("TEST", Side::Short, 100.0, 10.0, 0, None, None).unwrap();
        let pnl = loser.close(105.0, 1, ExitReason::StrategySignal).unwrap();
        assert_eq!(pnl, -50.0);
    }

    #[test]
    fn test_closed_position_is_terminal() {
        let mut pos = long(100.0, 1.0);
        pos.close(101.0, 2_000, ExitReason::StrategySignal).unwrap();

        assert!(matches!(
            pos.close(102.0, 3_000, ExitReason::StrategySignal),
            Err(EngineError::InvalidState(_))
        ));
        assert!(matches!(
            pos.update(50.0, 3_000),
            Err(EngineError::InvalidState(_))
        ));
        // P&L fields unchanged after the rejected calls
        assert_eq!(pos.profit_loss, 1.0);
        assert_eq!(pos.exit_price, Some(101.0));
    }

    #[test]
    fn test_stop_loss_fills_at_level() {
        let mut pos =
            Position::open("TEST", Side::Long, 100.0, 10.0, 0, Some(95.0), None).unwrap();
        let bar = Bar::new(1_000, 98.0, 99.0, 90.0, 91.0, 1.0);

        let reason = pos.update_on_bar(&bar).unwrap();
        assert_eq!(reason, Some(ExitReason::StopLoss));
        assert_eq!(pos.exit_price, Some(95.0));
        assert_eq!(pos.profit_loss, -50.0);
    }

    #[test]
    fn test_take_profit_long() {
        let mut pos =
            Position::open("TEST", Side::Long, 100.0, 2.0, 0, None, Some(110.0)).unwrap();
        let reason = pos.update(112.0, 1_000).unwrap();
        assert_eq!(reason, Some(ExitReason::TakeProfit));
        assert_eq!(pos.exit_price, Some(110.0));
        assert_eq!(pos.profit_loss, 20.0);
    }

    #[test]
    fn test_short_stop_triggers_on_high() {
        let mut pos =
            Position::open("TEST", Side::Short, 100.0, 1.0, 0, Some(105.0), None).unwrap();
        let bar = Bar::new(1_000, 101.0, 106.0, 100.0, 104.0, 1.0);

        let reason = pos.update_on_bar(&bar).unwrap();
        assert_eq!(reason, Some(ExitReason::StopLoss));
        assert_eq!(pos.exit_price, Some(105.0));
        assert_eq!(pos.profit_loss, -5.0);
    }

    #[test]
    fn test_stop_wins_over_take_profit_in_same_bar() {
        let mut pos =
            Position::open("TEST", Side::Long, 100.0, 1.0, 0, Some(95.0), Some(105.0)).unwrap();
        let bar = Bar::new(1_000, 100.0, 106.0, 94.0, 100.0, 1.0);

        let reason = pos.update_on_bar(&bar).unwrap();
        assert_eq!(reason, Some(ExitReason::StopLoss));
        assert_eq!(pos.exit_price, Some(95.0));
    }

    #[test]
    fn test_no_trigger_keeps_position_open() {
        let mut pos =
            Position::open("TEST", Side::Long, 100.0, 1.0, 0, Some(95.0), Some(110.0)).unwrap();
        let reason = pos.update(102.0, 1_000).unwrap();
        assert_eq!(reason, None);
        assert!(pos.is_open());
    }

    #[test]
    fn test_mark_to_market() {
        let pos = long(100.0, 5.0);
        assert_eq!(pos.entry_cost(), 500.0);
        assert_eq!(pos.unrealized_pnl(104.0), 20.0);
        assert_eq!(pos.market_value(104.0), 520.0);

        let short = Position::open("TEST", Side::Short, 100.0, 5.0, 0, None, None).unwrap();
        assert_eq!(short.unrealized_pnl(104.0), -20.0);
        assert_eq!(short.market_value(96.0), 520.0);
    }
}
