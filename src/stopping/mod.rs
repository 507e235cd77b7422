//! Stopping criteria.
//!
//! A criterion produces the sequence of stop values a solver is run with
//! (iteration counts, tolerances or raw grid checkpoints) and decides from the
//! monitored objective curve when the sequence is exhausted.

pub mod grid;
pub mod progress;

pub use grid::RunOnGridCriterion;
pub use progress::SufficientProgressCriterion;

use serde::Deserialize;

/// How a stop value is handed to the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoppingStrategy {
    /// Stop value is an iteration count.
    Iteration,
    /// Stop value is a tolerance.
    Tolerance,
    /// The solver is given a callback called once per iteration; stop values
    /// are iteration counts at which the objective is recorded.
    Callback,
    /// Stop value is a raw checkpoint of a grid.
    Grid,
}

/// A stateful stopping criterion.
pub trait StoppingCriterion {
    fn strategy(&self) -> StoppingStrategy;

    /// First stop value.
    fn init_stop_val(&mut self) -> f64;

    /// Report `(stop, progress)` from the objective values recorded so far.
    ///
    /// `progress` lies in `[0, 1]`.
    fn check_convergence(&mut self, curve: &[f64]) -> (bool, f64);

    /// Advance and return the next stop value.
    fn next_stop_val(&mut self, current: f64) -> f64;

    /// Rewind to the initial state.
    fn reset(&mut self);
}
