//! Performance metrics for backtest results
//!
//! [`MetricsCalculator::compute`] is a pure function from a closed-trade list
//! and an equity curve to a [`Metrics`] record: identical inputs always yield
//! bit-identical output, and every divide-by-zero path is an explicit branch
//! producing 0 or +infinity rather than a NaN leaking into a report.

use crate::backtest::position::Position;
use crate::core::types::{TimePeriod, Timestamp};
use serde::{Serialize, Serializer};

/// One sample of total account value (cash + mark-to-market open position)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EquityPoint {
    pub timestamp: Timestamp,
    pub equity: f64,
}

/// Risk/return statistics for one simulation run
#[derive(Debug, Clone, Default, Serialize)]
pub struct Metrics {
    pub initial_capital: f64,
    pub final_capital: f64,
    /// Total return over the run, in percent
    pub total_return_pct: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Fraction of trades that were winners (0 when no trades)
    pub win_rate: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    /// Gross profit / gross loss; +infinity when there are no losing trades
    #[serde(serialize_with = "serialize_ratio")]
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub avg_trade: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    /// Largest peak-to-trough equity decline, in percent
    pub max_drawdown_pct: f64,
}

/// Serialize a ratio that may be infinite
///
/// Infinities become the sentinel strings `"inf"`/`"-inf"` so downstream JSON
/// consumers never see a raw `Infinity` token.
fn serialize_ratio<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else if value.is_sign_positive() {
        serializer.serialize_str("inf")
    } else {
        serializer.serialize_str("-inf")
    }
}

/// Immutable record produced once per simulation run
#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    #[serde(flatten)]
    pub metrics: Metrics,
    pub equity_curve: Vec<EquityPoint>,
    /// Per-trade history, all positions closed
    pub trades: Vec<Position>,
}

impl BacktestResult {
    /// Generate a text summary of the run
    pub fn summary(&self) -> String {
        format!(
            r#"
Backtest Performance Summary
============================

Overview:
---------
Total Trades: {}
Win Rate: {:.2}%
Profit Factor: {:.2}
Total Return: {:.2}%
Max Drawdown: {:.2}%

Trade Statistics:
-----------------
Winning Trades: {} (${:.2} avg)
Losing Trades: {} (${:.2} avg)
Average Trade: ${:.2}

Risk-Adjusted Returns:
----------------------
Sharpe Ratio: {:.3}
Sortino Ratio: {:.3}
Calmar Ratio: {:.3}
"#,
            self.metrics.total_trades,
            self.metrics.win_rate * 100.0,
            self.metrics.profit_factor,
            self.metrics.total_return_pct,
            self.metrics.max_drawdown_pct,
            self.metrics.winning_trades,
            self.metrics.avg_win,
            self.metrics.losing_trades,
            self.metrics.avg_loss,
            self.metrics.avg_trade,
            self.metrics.sharpe_ratio,
            self.metrics.sortino_ratio,
            self.metrics.calmar_ratio,
        )
    }
}

/// Computes [`Metrics`] from closed trades and an equity curve
#[derive(Debug, Clone, Copy)]
pub struct MetricsCalculator {
    period: TimePeriod,
}

impl MetricsCalculator {
    pub fn new(period: TimePeriod) -> Self {
        Self { period }
    }

    /// Compute the full metrics record
    ///
    /// A run with no trades is a normal outcome and produces a zeroed record
    /// (capital and drawdown fields still reflect the equity curve).
    pub fn compute(&self, trades: &[Position], equity_curve: &[EquityPoint]) -> Metrics {
        let initial_capital = equity_curve.first().map(|p| p.equity).unwrap_or(0.0);
        let final_capital = equity_curve.last().map(|p| p.equity).unwrap_or(0.0);

        let total_return_pct = if initial_capital > 0.0 {
            (final_capital - initial_capital) / initial_capital * 100.0
        } else {
            0.0
        };
        let max_drawdown_pct = max_drawdown(equity_curve);

        let total_trades = trades.len();
        if total_trades == 0 {
            return Metrics {
                initial_capital,
                final_capital,
                total_return_pct,
                max_drawdown_pct,
                ..Metrics::default()
            };
        }

        let winning_trades = trades.iter().filter(|t| t.profit_loss > 0.0).count();
        let losing_trades = total_trades - winning_trades;
        let win_rate = winning_trades as f64 / total_trades as f64;

        let gross_profit: f64 = trades
            .iter()
            .filter(|t| t.profit_loss > 0.0)
            .map(|t| t.profit_loss)
            .sum();
        let gross_loss: f64 = trades
            .iter()
            .filter(|t| t.profit_loss < 0.0)
            .map(|t| t.profit_loss.abs())
            .sum();

        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else if gross_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_win = if winning_trades > 0 {
            gross_profit / winning_trades as f64
        } else {
            0.0
        };
        let avg_loss = if losing_trades > 0 {
            gross_loss / losing_trades as f64
        } else {
            0.0
        };
        let total_pnl: f64 = trades.iter().map(|t| t.profit_loss).sum();
        let avg_trade = total_pnl / total_trades as f64;

        let returns = step_returns(equity_curve);
        let annualize = self.period.annualization_factor().sqrt();

        let sharpe_ratio = sharpe(&returns, annualize);
        let sortino_ratio = sortino(&returns, annualize);
        let calmar_ratio = calmar(
            total_return_pct,
            max_drawdown_pct,
            self.period.annualization_factor(),
        );

        Metrics {
            initial_capital,
            final_capital,
            total_return_pct,
            total_trades,
            winning_trades,
            losing_trades,
            win_rate,
            gross_profit,
            gross_loss,
            profit_factor,
            avg_win,
            avg_loss,
            avg_trade,
            sharpe_ratio,
            sortino_ratio,
            calmar_ratio,
            max_drawdown_pct,
        }
    }
}

/// Per-step fractional returns along the equity curve
fn step_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .filter(|w| w[0].equity > 0.0)
        .map(|w| (w[1].equity - w[0].equity) / w[0].equity)
        .collect()
}

/// Largest peak-to-trough decline in percent, in [0, 100] for finite curves
fn max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_dd = 0.0;
    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        }
        if peak > 0.0 {
            let dd = (peak - point.equity) / peak * 100.0;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation
fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn sharpe(returns: &[f64], annualize: f64) -> f64 {
    let sd = std_dev(returns);
    if sd == 0.0 {
        return 0.0;
    }
    mean(returns) / sd * annualize
}

fn sortino(returns: &[f64], annualize: f64) -> f64 {
    let negative: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    if negative.is_empty() {
        return 0.0;
    }
    let downside = std_dev(&negative);
    if downside == 0.0 {
        return 0.0;
    }
    mean(returns) / downside * annualize
}

fn calmar(total_return_pct: f64, max_drawdown_pct: f64, annualization: f64) -> f64 {
    if max_drawdown_pct == 0.0 {
        return 0.0;
    }
    (total_return_pct / 100.0) / (max_drawdown_pct / 100.0) * annualization
}
