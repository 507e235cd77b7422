//! Coordinate-descent Lasso path stopped at a target support size.

use std::sync::Arc;
use std::time::Instant;

use nalgebra::DVector;
use serde::Deserialize;

use super::cd::{path_until_support, L1};
use super::{last_iterate, problem, target_support, RunBudget, Solver, SolverResult};
use crate::error::Result;
use crate::linalg::geomspace;
use crate::objective::Problem;
use crate::stopping::{RunOnGridCriterion, StoppingCriterion};

const NAME: &str = "lasso";

const PATH_LEN: usize = 1000;
const PATH_RATIO: f64 = 1e-15;
const MAX_EPOCHS: usize = 10_000;

/// Lasso `(1/2n)‖y - Xw‖² + α‖w‖₁` along a geometric path from
/// `α_max = ‖Xᵀy‖∞ / n`, keeping the last solution with at most
/// `k = floor(g · n_samples)` non-zeros.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LassoPath {
    #[serde(skip)]
    problem: Option<Arc<Problem>>,
    #[serde(skip)]
    w: Option<DVector<f64>>,
    #[serde(skip)]
    k: usize,
    #[serde(skip)]
    solve_time: f64,
}

impl LassoPath {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Solver for LassoPath {
    fn name(&self) -> &str {
        NAME
    }

    fn stopping_criterion(&self) -> Box<dyn StoppingCriterion> {
        Box::new(RunOnGridCriterion::default())
    }

    fn set_objective(&mut self, problem: Arc<Problem>) -> Result<()> {
        self.problem = Some(problem);
        self.w = None;
        Ok(())
    }

    fn run(&mut self, budget: RunBudget<'_>) -> Result<()> {
        let g = budget.grid_value(NAME)?;
        let p = problem(&self.problem, NAME)?;
        let start = Instant::now();

        let k = target_support(g, p.n_samples());
        let w = if k == 0 {
            DVector::zeros(p.n_features())
        } else {
            let alpha_max = p.xty_inf() / p.n_samples() as f64;
            let alphas = geomspace(alpha_max, alpha_max * PATH_RATIO, PATH_LEN);
            path_until_support(&p.x, &p.y, &alphas, |alpha| L1 { alpha }, k, MAX_EPOCHS)
        };

        self.k = k;
        self.solve_time = start.elapsed().as_secs_f64();
        self.w = Some(w);
        Ok(())
    }

    fn result(&self) -> Result<SolverResult> {
        let w = last_iterate(&self.w, NAME)?;
        Ok(SolverResult::new(w.clone())
            .with_k(self.k)
            .with_solve_time(self.solve_time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{l0_norm, support};
    use crate::solvers::test_support::orthonormal_problem;

    #[test]
    fn test_path_respects_sample_budget() {
        // 6 samples: g = 0.4 allows two atoms.
        let mut s = LassoPath::new();
        s.set_objective(orthonormal_problem(&[3.0, 0.1, -2.0, 1.0], 0.1)).unwrap();
        s.run(RunBudget::GridValue(0.4)).unwrap();
        let r = s.result().unwrap();
        assert_eq!(r.k, Some(2));
        assert_eq!(support(&r.w), vec![0, 2]);

        s.run(RunBudget::GridValue(0.1)).unwrap();
        assert_eq!(l0_norm(&s.result().unwrap().w), 0);
    }
}
