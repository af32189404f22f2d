mod common;

use common::{bars_from_closes, ScriptedStrategy};
use stratsim::core::types::Action;
use stratsim::{SimConfig, SimulationEngine};

fn run_scripted(
    initial_capital: f64,
    closes: &[f64],
    actions: Vec<(u64, Action)>,
) -> stratsim::BacktestResult {
    let bars = bars_from_closes(closes);
    let mut strategy = ScriptedStrategy::new(actions);
    let mut engine = SimulationEngine::new(SimConfig {
        initial_capital,
        ..SimConfig::default()
    })
    .unwrap();
    engine.run(&mut strategy, &bars).unwrap()
}

#[test]
fn zero_losing_trades_give_infinite_profit_factor() {
    let result = run_scripted(
        1_000.0,
        &[100.0, 100.0, 105.0, 105.0, 100.0, 108.0, 108.0],
        vec![
            (60_000, Action::buy(100.0, 1.0)),
            (180_000, Action::sell(105.0)),
            (240_000, Action::buy(100.0, 1.0)),
            (360_000, Action::sell(108.0)),
        ],
    );

    assert_eq!(result.metrics.total_trades, 2);
    assert_eq!(result.metrics.losing_trades, 0);
    assert!(result.metrics.profit_factor.is_infinite());
    assert!(!result.metrics.profit_factor.is_nan());
    assert_eq!(result.metrics.win_rate, 1.0);
}

#[test]
fn mixed_trades_produce_finite_statistics() {
    let result = run_scripted(
        1_000.0,
        &[100.0, 100.0, 110.0, 110.0, 100.0, 95.0, 95.0],
        vec![
            (60_000, Action::buy(100.0, 2.0)),
            (180_000, Action::sell(110.0)), // +20
            (240_000, Action::buy(100.0, 2.0)),
            (360_000, Action::sell(95.0)), // -10
        ],
    );

    let m = &result.metrics;
    assert_eq!(m.total_trades, 2);
    assert_eq!(m.winning_trades, 1);
    assert_eq!(m.losing_trades, 1);
    assert_eq!(m.win_rate, 0.5);
    assert_eq!(m.gross_profit, 20.0);
    assert_eq!(m.gross_loss, 10.0);
    assert!((m.profit_factor - 2.0).abs() < 1e-12);
    assert!((m.avg_trade - 5.0).abs() < 1e-12);
    assert!((m.total_return_pct - 1.0).abs() < 1e-12);
    assert!(m.max_drawdown_pct > 0.0);
    assert!(m.max_drawdown_pct <= 100.0);
    assert!(m.profit_factor.is_finite());
    assert!(m.sharpe_ratio.is_finite());
    assert!(m.sortino_ratio.is_finite());
    assert!(m.calmar_ratio.is_finite());
}

#[test]
fn constant_equity_yields_zero_ratios() {
    let result = run_scripted(1_000.0, &[100.0, 100.0, 100.0, 100.0], vec![]);

    assert_eq!(result.metrics.sharpe_ratio, 0.0);
    assert_eq!(result.metrics.sortino_ratio, 0.0);
    assert_eq!(result.metrics.calmar_ratio, 0.0);
    assert_eq!(result.metrics.max_drawdown_pct, 0.0);
}

#[test]
fn metrics_are_bit_identical_across_runs() {
    let run = || {
        run_scripted(
            1_000.0,
            &[100.0, 100.0, 104.0, 104.0, 99.0, 103.0, 103.0],
            vec![
                (60_000, Action::buy(100.0, 3.0)),
                (180_000, Action::sell(104.0)),
                (240_000, Action::buy(99.0, 2.0)),
                (360_000, Action::sell(103.0)),
            ],
        )
    };

    let a = serde_json::to_string(&run()).unwrap();
    let b = serde_json::to_string(&run()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn summary_renders_key_figures() {
    let result = run_scripted(
        1_000.0,
        &[100.0, 100.0, 110.0, 110.0],
        vec![(60_000, Action::buy(100.0, 5.0)), (120_000, Action::sell(110.0))],
    );

    let summary = result.summary();
    assert!(summary.contains("Total Trades: 1"));
    assert!(summary.contains("Win Rate: 100.00%"));
    assert!(summary.contains("Total Return: 5.00%"));
}
