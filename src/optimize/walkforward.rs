//! Walk-forward parameter search
//!
//! Slides a train/validation window pair through the bar series, grid-searches
//! strategy parameters on each training slice, re-runs the winner out-of-sample
//! on the validation slice, and aggregates how stable the winning parameters
//! are across windows.
//!
//! Every (window, parameter-set) run is independent: it gets its own bar
//! slice, a fresh strategy from the factory, and a fresh engine. Runs execute
//! on the rayon pool; the best-of-grid selection only happens after the whole
//! grid for a window has completed, so it is a deterministic reduction rather
//! than a race.

use crate::backtest::{SimConfig, SimulationEngine};
use crate::core::types::Bar;
use crate::core::EngineError;
use crate::strategy::{ParameterGrid, ParameterSet, Strategy};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Walk-forward window and step sizes, in bars
#[derive(Debug, Clone)]
pub struct WalkForwardConfig {
    /// Training window length
    pub window_size: usize,
    /// Validation window length, immediately after the training window
    pub validation_size: usize,
    /// How far the window pair advances between iterations
    pub step_size: usize,
}

impl WalkForwardConfig {
    /// Validate sizes before any simulation starts
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.window_size == 0 {
            return Err(EngineError::Config("window size must be positive".to_string()));
        }
        if self.validation_size == 0 {
            return Err(EngineError::Config(
                "validation size must be positive".to_string(),
            ));
        }
        if self.step_size == 0 {
            return Err(EngineError::Config("step size must be positive".to_string()));
        }
        Ok(())
    }
}

/// Half-open index ranges over the bar series for one walk-forward iteration
///
/// `train_end == valid_start`: validation follows training with no gap and
/// no overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub train_start: usize,
    pub train_end: usize,
    pub valid_start: usize,
    pub valid_end: usize,
}

/// Cooperative cancellation flag checked between simulation runs
///
/// Never interrupts a run mid-bar; a cancelled optimization returns
/// [`EngineError::Cancelled`] with no partial result.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Outcome of one walk-forward window
#[derive(Debug, Clone, Serialize)]
pub struct WindowRecord {
    pub window: Window,
    /// Grid-search winner on the training slice
    pub best_params: ParameterSet,
    /// Training return of the winner, in percent
    pub train_return_pct: f64,
    /// Out-of-sample return of the winner, in percent
    pub validation_return_pct: f64,
    pub train_trades: usize,
    pub validation_trades: usize,
}

/// Dispersion of one numeric parameter's winning values across windows
#[derive(Debug, Clone, Serialize)]
pub struct ParamStability {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// `1 - std/mean` (coefficient-of-variation complement); 0 when mean is 0
    pub stability: f64,
}

/// Ordered per-window records plus the parameter-stability table
#[derive(Debug, Clone, Serialize)]
pub struct WalkForwardResult {
    pub windows: Vec<WindowRecord>,
    pub stability: BTreeMap<String, ParamStability>,
}

/// Orchestrates grid-searched simulation runs across rolling windows
pub struct WalkForwardOptimizer {
    sim_config: SimConfig,
    config: WalkForwardConfig,
    cancel: CancelToken,
}

impl WalkForwardOptimizer {
    /// Create an optimizer; fails fast on invalid configuration
    pub fn new(sim_config: SimConfig, config: WalkForwardConfig) -> Result<Self, EngineError> {
        sim_config.validate()?;
        config.validate()?;
        Ok(Self {
            sim_config,
            config,
            cancel: CancelToken::new(),
        })
    }

    /// Attach a cancellation token shared with the caller
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the full walk-forward protocol
    ///
    /// `factory` builds a fresh strategy per (window, parameter-set) run and
    /// must be callable from worker threads. A failure of any single training
    /// or validation run is fatal to the whole optimization: a missing window
    /// would invalidate the stability table.
    pub fn run<F>(
        &self,
        factory: F,
        bars: &[Bar],
        grid: &ParameterGrid,
    ) -> Result<WalkForwardResult, EngineError>
    where
        F: Fn(&ParameterSet) -> Result<Box<dyn Strategy>, EngineError> + Sync,
    {
        let combos = grid.combinations();
        if combos.is_empty() {
            return Err(EngineError::Config("empty parameter grid".to_string()));
        }
        let required = self.config.window_size + self.config.validation_size;
        if bars.len() < required {
            return Err(EngineError::InsufficientData(format!(
                "{} bars needed for one walk-forward window, got {}",
                required,
                bars.len()
            )));
        }

        let windows = self.generate_windows(bars.len());
        let records: Vec<WindowRecord> = windows
            .par_iter()
            .map(|window| self.run_window(&factory, bars, &combos, *window))
            .collect::<Result<Vec<_>, _>>()?;

        let stability = aggregate_stability(&records);
        Ok(WalkForwardResult {
            windows: records,
            stability,
        })
    }

    /// Sliding half-open windows; only full windows are generated
    pub fn generate_windows(&self, total_bars: usize) -> Vec<Window> {
        let mut windows = Vec::new();
        let mut start = 0;
        while start + self.config.window_size + self.config.validation_size <= total_bars {
            let train_end = start + self.config.window_size;
            windows.push(Window {
                train_start: start,
                train_end,
                valid_start: train_end,
                valid_end: train_end + self.config.validation_size,
            });
            start += self.config.step_size;
        }
        windows
    }

    fn run_window<F>(
        &self,
        factory: &F,
        bars: &[Bar],
        combos: &[ParameterSet],
        window: Window,
    ) -> Result<WindowRecord, EngineError>
    where
        F: Fn(&ParameterSet) -> Result<Box<dyn Strategy>, EngineError> + Sync,
    {
        let train = &bars[window.train_start..window.train_end];

        // Full grid on the training slice. Combination index keeps the
        // reduction deterministic: on equal returns the lowest index (the
        // lexicographically smallest parameter tuple) wins.
        let runs: Vec<(usize, f64, usize)> = combos
            .par_iter()
            .enumerate()
            .map(|(index, params)| -> Result<(usize, f64, usize), EngineError> {
                if self.cancel.is_cancelled() {
                    return Err(EngineError::Cancelled);
                }
                let (ret, trades) = self.simulate(factory, params, train)?;
                Ok((index, ret, trades))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let (best_index, train_return_pct, train_trades) = runs
            .iter()
            .fold(None, |best: Option<(usize, f64, usize)>, &(i, ret, trades)| {
                match best {
                    Some((_, best_ret, _)) if ret <= best_ret => best,
                    _ => Some((i, ret, trades)),
                }
            })
            .ok_or_else(|| EngineError::Config("empty parameter grid".to_string()))?;
        let best_params = combos[best_index].clone();

        if self.cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        // Out-of-sample re-run of the winner on the validation slice.
        let valid = &bars[window.valid_start..window.valid_end];
        let (validation_return_pct, validation_trades) =
            self.simulate(factory, &best_params, valid)?;

        debug!(
            train_start = window.train_start,
            train_return_pct, validation_return_pct, "walk-forward window complete"
        );

        Ok(WindowRecord {
            window,
            best_params,
            train_return_pct,
            validation_return_pct,
            train_trades,
            validation_trades,
        })
    }

    /// One simulation run: fresh strategy, fresh engine, own slice
    fn simulate<F>(
        &self,
        factory: &F,
        params: &ParameterSet,
        bars: &[Bar],
    ) -> Result<(f64, usize), EngineError>
    where
        F: Fn(&ParameterSet) -> Result<Box<dyn Strategy>, EngineError> + Sync,
    {
        let mut strategy = factory(params)?;
        let mut engine = SimulationEngine::new(self.sim_config.clone())?;
        let result = engine.run(strategy.as_mut(), bars)?;
        Ok((result.metrics.total_return_pct, result.metrics.total_trades))
    }
}

/// Per-parameter dispersion of the winning values across all windows
///
/// Only numeric parameters are aggregated; text-valued parameters are skipped.
fn aggregate_stability(records: &[WindowRecord]) -> BTreeMap<String, ParamStability> {
    let mut by_param: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for record in records {
        for (name, value) in record.best_params.numeric_entries() {
            by_param.entry(name.to_string()).or_default().push(value);
        }
    }

    by_param
        .into_iter()
        .map(|(name, values)| {
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std_dev = variance.sqrt();

            let mut sorted = values.clone();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let median = if sorted.len() % 2 == 1 {
                sorted[sorted.len() / 2]
            } else {
                let hi = sorted.len() / 2;
                (sorted[hi - 1] + sorted[hi]) / 2.0
            };

            let min = sorted[0];
            let max = sorted[sorted.len() - 1];
            let stability = if mean == 0.0 { 0.0 } else { 1.0 - std_dev / mean };

            (
                name,
                ParamStability {
                    mean,
                    median,
                    std_dev,
                    min,
                    max,
                    stability,
                },
            )
        })
        .collect()
}
