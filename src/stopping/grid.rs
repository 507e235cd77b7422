//! Stop on a fixed grid of checkpoints.

use super::{StoppingCriterion, StoppingStrategy};
use crate::error::{BenchError, Result};
use crate::linalg::linspace;

/// Walks an ordered grid of scalar checkpoints, one per run.
///
/// Solvers use the checkpoint as a target (typically a sparsity fraction) and
/// the run sequence ends at the last checkpoint.
#[derive(Debug, Clone)]
pub struct RunOnGridCriterion {
    grid: Vec<f64>,
    cursor: usize,
}

impl RunOnGridCriterion {
    /// Create a criterion over `grid`. The grid must not be empty.
    pub fn new(grid: Vec<f64>) -> Result<Self> {
        if grid.is_empty() {
            return Err(BenchError::InvalidParameter(
                "stopping grid must not be empty".into(),
            ));
        }
        Ok(RunOnGridCriterion { grid, cursor: 0 })
    }

    /// `n` evenly spaced checkpoints in `[start, stop]`.
    pub fn linspace(start: f64, stop: f64, n: usize) -> Result<Self> {
        Self::new(linspace(start, stop, n))
    }

    /// Replace the grid and rewind the cursor.
    pub fn reset_grid(&mut self, grid: Vec<f64>) -> Result<()> {
        if grid.is_empty() {
            return Err(BenchError::InvalidParameter(
                "stopping grid must not be empty".into(),
            ));
        }
        self.grid = grid;
        self.cursor = 0;
        Ok(())
    }

    pub fn grid(&self) -> &[f64] {
        &self.grid
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn last(&self) -> usize {
        self.grid.len() - 1
    }
}

impl Default for RunOnGridCriterion {
    fn default() -> Self {
        RunOnGridCriterion {
            grid: linspace(0.0, 0.1, 10),
            cursor: 0,
        }
    }
}

impl StoppingCriterion for RunOnGridCriterion {
    fn strategy(&self) -> StoppingStrategy {
        StoppingStrategy::Grid
    }

    fn init_stop_val(&mut self) -> f64 {
        self.grid[self.cursor]
    }

    fn check_convergence(&mut self, _curve: &[f64]) -> (bool, f64) {
        let stop = self.cursor >= self.last();
        let progress = (self.cursor + 1) as f64 / self.grid.len() as f64;
        (stop, progress)
    }

    fn next_stop_val(&mut self, _current: f64) -> f64 {
        self.cursor = (self.cursor + 1).min(self.last());
        self.grid[self.cursor]
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }
}
