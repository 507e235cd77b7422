//! Iterative hard thresholding driven by a per-iteration callback.

use std::sync::Arc;

use nalgebra::DVector;
use serde::Deserialize;

use super::{iht_step, last_iterate, problem, step_lipschitz, RunBudget, Solver, SolverResult};
use crate::error::{BenchError, Result};
use crate::objective::Problem;
use crate::stopping::{StoppingCriterion, StoppingStrategy, SufficientProgressCriterion};

const NAME: &str = "iht";

/// Projected gradient on `min ½‖y - Xw‖² + λ‖w‖₀  s.t. ‖w‖∞ <= M`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Iht {
    #[serde(skip)]
    problem: Option<Arc<Problem>>,
    #[serde(skip)]
    w: Option<DVector<f64>>,
}

impl Iht {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Solver for Iht {
    fn name(&self) -> &str {
        NAME
    }

    fn stopping_criterion(&self) -> Box<dyn StoppingCriterion> {
        Box::new(SufficientProgressCriterion::with_patience(
            5,
            StoppingStrategy::Callback,
        ))
    }

    fn set_objective(&mut self, problem: Arc<Problem>) -> Result<()> {
        self.problem = Some(problem);
        self.w = None;
        Ok(())
    }

    fn run(&mut self, budget: RunBudget<'_>) -> Result<()> {
        let callback = match budget {
            RunBudget::Callback(cb) => cb,
            other => {
                return Err(BenchError::InvalidParameter(format!(
                    "{} expects a callback, got {:?}",
                    NAME, other
                )))
            }
        };
        let p = problem(&self.problem, NAME)?;
        let l = step_lipschitz(p);

        let mut w = DVector::zeros(p.n_features());
        let mut it = 0usize;
        while callback(&w) {
            w = iht_step(&p.x, &p.y, &w, p.lmbd, l, p.m);
            it += 1;
        }
        log::debug!("{}: stopped by callback after {} iterations", NAME, it);
        self.w = Some(w);
        Ok(())
    }

    fn result(&self) -> Result<SolverResult> {
        let w = last_iterate(&self.w, NAME)?;
        Ok(SolverResult::new(w.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solvers::test_support::orthonormal_problem;

    #[test]
    fn test_callback_controls_iterations() {
        // λ = 0.5 · 3 = 1.5, threshold √3: keeps 3 and -2.
        let problem = orthonormal_problem(&[3.0, 0.1, -2.0], 0.5);
        let mut s = Iht::new();
        s.set_objective(problem).unwrap();

        let mut calls = 0;
        let mut cb = |_: &DVector<f64>| {
            calls += 1;
            calls <= 3
        };
        s.run(RunBudget::Callback(&mut cb)).unwrap();
        assert_eq!(calls, 4);
        assert_eq!(s.result().unwrap().w.as_slice(), &[3.0, 0.0, -2.0]);
    }

    #[test]
    fn test_requires_callback() {
        let mut s = Iht::new();
        s.set_objective(orthonormal_problem(&[1.0], 0.1)).unwrap();
        assert!(s.run(RunBudget::Tolerance(1e-3)).is_err());
    }
}
