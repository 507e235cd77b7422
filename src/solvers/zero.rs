//! A solver that always returns zeros, used to exercise the harness.

use std::sync::Arc;

use nalgebra::DVector;
use serde::Deserialize;

use super::{problem, RunBudget, Solver, SolverResult};
use crate::error::Result;
use crate::objective::{Objective, Problem};
use crate::stopping::{StoppingCriterion, StoppingStrategy, SufficientProgressCriterion};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ZeroSolver {
    #[serde(skip)]
    problem: Option<Arc<Problem>>,
    #[serde(skip)]
    w: Option<DVector<f64>>,
}

impl ZeroSolver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Solver for ZeroSolver {
    fn name(&self) -> &str {
        "zero"
    }

    fn stopping_criterion(&self) -> Box<dyn StoppingCriterion> {
        Box::new(SufficientProgressCriterion::with_patience(
            5,
            StoppingStrategy::Iteration,
        ))
    }

    fn set_objective(&mut self, problem: Arc<Problem>) -> Result<()> {
        self.problem = Some(problem);
        self.w = None;
        Ok(())
    }

    fn run(&mut self, _budget: RunBudget<'_>) -> Result<()> {
        let p = problem(&self.problem, self.name())?;
        self.w = Some(Objective::get_one_solution(p));
        Ok(())
    }

    fn result(&self) -> Result<SolverResult> {
        let w = super::last_iterate(&self.w, self.name())?;
        Ok(SolverResult::new(w.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solvers::test_support::orthonormal_problem;

    #[test]
    fn test_returns_zeros() {
        let mut s = ZeroSolver::new();
        assert!(s.run(RunBudget::Iterations(1)).is_err());
        s.set_objective(orthonormal_problem(&[1.0, 2.0], 0.1)).unwrap();
        s.run(RunBudget::Iterations(3)).unwrap();
        assert_eq!(s.result().unwrap().w, DVector::zeros(2));
    }
}
