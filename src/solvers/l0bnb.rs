//! Big-M L0 branch-and-bound warm-started by a few IHT steps.

use std::sync::Arc;
use std::time::Instant;

use nalgebra::DVector;
use serde::Deserialize;

use super::bnb::{branch_and_bound, BnbSettings, Formulation};
use super::{iht_step, last_iterate, problem, step_lipschitz, RunBudget, Solver, SolverResult};
use crate::error::Result;
use crate::linalg::hard_threshold_inplace;
use crate::objective::Problem;
use crate::stopping::{StoppingCriterion, StoppingStrategy, SufficientProgressCriterion};

const NAME: &str = "l0bnb";

/// Entries of the returned solution below this are set to zero.
const ZERO_TOL: f64 = 1e-5;

/// `½‖y - Xw‖² + λ‖w‖₀` with `|w| <= M`; the tolerance is the relative gap.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct L0Bnb {
    /// IHT iterations computing the warm start.
    pub ws_iter: usize,
    pub max_nodes: usize,
    #[serde(skip)]
    problem: Option<Arc<Problem>>,
    #[serde(skip)]
    w: Option<DVector<f64>>,
    #[serde(skip)]
    relative_gap: f64,
    #[serde(skip)]
    solve_time: f64,
}

impl Default for L0Bnb {
    fn default() -> Self {
        L0Bnb {
            ws_iter: 5,
            max_nodes: BnbSettings::default().max_nodes,
            problem: None,
            w: None,
            relative_gap: f64::INFINITY,
            solve_time: 0.0,
        }
    }
}

impl L0Bnb {
    pub fn new(ws_iter: usize) -> Self {
        L0Bnb {
            ws_iter,
            ..Default::default()
        }
    }
}

impl Solver for L0Bnb {
    fn name(&self) -> &str {
        NAME
    }

    fn label(&self) -> String {
        format!("l0bnb[ws_iter={}]", self.ws_iter)
    }

    fn stopping_criterion(&self) -> Box<dyn StoppingCriterion> {
        Box::new(SufficientProgressCriterion::with_patience(
            10,
            StoppingStrategy::Tolerance,
        ))
    }

    fn set_objective(&mut self, problem: Arc<Problem>) -> Result<()> {
        self.problem = Some(problem);
        self.w = None;
        Ok(())
    }

    fn run(&mut self, budget: RunBudget<'_>) -> Result<()> {
        let tolerance = budget.tolerance(NAME)?;
        let p = problem(&self.problem, NAME)?;
        let start = Instant::now();

        let l = step_lipschitz(p);
        let mut ws = DVector::zeros(p.n_features());
        for _ in 0..self.ws_iter {
            ws = iht_step(&p.x, &p.y, &ws, p.lmbd, l, p.m);
        }

        let settings = BnbSettings {
            max_nodes: self.max_nodes,
            ..BnbSettings::with_gap(tolerance)
        };
        let formulation = Formulation::BigM {
            lmbd: p.lmbd,
            m: p.m,
        };
        let outcome = branch_and_bound(&p.x, &p.y, formulation, &settings, Some(&ws))?;
        let mut w = outcome.w;
        hard_threshold_inplace(&mut w, ZERO_TOL);

        self.relative_gap = outcome.relative_gap;
        self.solve_time = start.elapsed().as_secs_f64();
        self.w = Some(w);
        Ok(())
    }

    fn result(&self) -> Result<SolverResult> {
        let w = last_iterate(&self.w, NAME)?;
        Ok(SolverResult::new(w.clone())
            .with_relative_gap(self.relative_gap)
            .with_solve_time(self.solve_time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::support;
    use crate::solvers::test_support::orthonormal_problem;

    #[test]
    fn test_solves_orthonormal_problem() {
        // λ = 0.1 · 3: keep atoms with y²/2 > 0.3.
        let mut s = L0Bnb::default();
        s.set_objective(orthonormal_problem(&[3.0, 0.1, -2.0, 1.0], 0.1)).unwrap();
        s.run(RunBudget::Tolerance(1e-6)).unwrap();
        let r = s.result().unwrap();
        assert_eq!(support(&r.w), vec![0, 2, 3]);
        assert!(r.relative_gap.unwrap() <= 1e-6);
        assert!(s.run(RunBudget::Iterations(3)).is_err());
    }
}
