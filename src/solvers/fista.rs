//! FISTA along a decreasing Lasso path, stopped at a target support size.

use std::sync::Arc;
use std::time::Instant;

use nalgebra::DVector;
use serde::Deserialize;

use super::{last_iterate, problem, step_lipschitz, target_support, RunBudget, Solver, SolverResult};
use crate::error::Result;
use crate::linalg::{geomspace, l0_norm, soft_threshold};
use crate::objective::Problem;
use crate::stopping::{RunOnGridCriterion, StoppingCriterion};

const NAME: &str = "fista";

/// Number of points of the λ path and ratio of its ends.
const PATH_LEN: usize = 1000;
const PATH_RATIO: f64 = 1e-20;

/// Inner iteration cap and relative stopping threshold.
const MAX_INNER: usize = 500;
const INNER_TOL: f64 = 1e-4;

/// Walks `λ` from `‖Xᵀy‖∞` down a geometric path, warm-starting FISTA at
/// each point, and returns the last solution with at most
/// `k = floor(g · n_samples)` non-zeros.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Fista {
    #[serde(skip)]
    problem: Option<Arc<Problem>>,
    #[serde(skip)]
    w: Option<DVector<f64>>,
    #[serde(skip)]
    k: usize,
    #[serde(skip)]
    solve_time: f64,
}

impl Fista {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Solver for Fista {
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
        let l = step_lipschitz(p);
        let lmbd_max = p.xty_inf();
        let mut w = DVector::zeros(p.n_features());

        if k > 0 {
            for (i, lmbd) in geomspace(lmbd_max, lmbd_max * PATH_RATIO, PATH_LEN)
                .into_iter()
                .enumerate()
            {
                let w_prev_path = w.clone();
                let mut z = w.clone();
                for it in 0..MAX_INNER {
                    let w_prev = w.clone();
                    z = &z + p.x.tr_mul(&(&p.y - &p.x * &z)) / l;
                    w = z.map(|v| soft_threshold(v, lmbd / l));
                    z = &w + (&w - &w_prev) * (it as f64 / (it as f64 + 5.0));
                    if i == 0 || (&w - &w_prev).norm() <= INNER_TOL * w.norm() {
                        break;
                    }
                }
                if l0_norm(&w) > k {
                    w = w_prev_path;
                    break;
                }
            }
        }

        log::debug!("{}: k = {}, {} non-zeros", NAME, k, l0_norm(&w));
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
    use crate::solvers::test_support::orthonormal_problem;

    #[test]
    fn test_support_grows_with_grid_value() {
        // 6 samples: g = 0.2 allows one atom, g = 0.4 two.
        let problem = orthonormal_problem(&[3.0, 0.1, -2.0, 1.0], 0.1);
        let mut s = Fista::new();
        s.set_objective(problem).unwrap();

        s.run(RunBudget::GridValue(0.0)).unwrap();
        assert_eq!(l0_norm(&s.result().unwrap().w), 0);

        s.run(RunBudget::GridValue(0.2)).unwrap();
        let r = s.result().unwrap();
        assert_eq!(r.k, Some(1));
        assert!(l0_norm(&r.w) <= 1);
        assert!(r.w[0] > 0.0);

        s.run(RunBudget::GridValue(0.4)).unwrap();
        let w = s.result().unwrap().w;
        assert_eq!(l0_norm(&w), 2);
        assert!(w[0] > 0.0 && w[2] < 0.0);
    }
}
