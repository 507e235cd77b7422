//! Iterative hard thresholding with a continuation on `λ`.

use std::sync::Arc;

use nalgebra::DVector;
use serde::Deserialize;

use super::{iht_step, last_iterate, problem, step_lipschitz, RunBudget, Solver, SolverResult};
use crate::error::Result;
use crate::linalg::l0_norm;
use crate::objective::Problem;
use crate::stopping::{StoppingCriterion, StoppingStrategy, SufficientProgressCriterion};

const NAME: &str = "iht_warm";

/// Shrink factor of the continuation and tolerance of its intermediate stages.
const SHRINK: f64 = 0.7;
const STAGE_TOL: f64 = 1e-3;

/// Iteration cap of a single run.
const MAX_ITER: usize = 1_000_000;

/// IHT started at `λ = M‖Xᵀy‖∞`. Every time the objective stalls (change
/// below 1e-3) `λ` is multiplied by 0.7; once it reaches the target weight
/// the run continues at the requested tolerance.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IhtWarm {
    #[serde(skip)]
    problem: Option<Arc<Problem>>,
    #[serde(skip)]
    w: Option<DVector<f64>>,
}

impl IhtWarm {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Solver for IhtWarm {
    fn name(&self) -> &str {
        NAME
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
        let l = step_lipschitz(p);

        let mut w = DVector::zeros(p.n_features());
        let mut lmbd = p.m * p.xty_inf();
        let mut tol = STAGE_TOL;
        let mut final_stage = false;
        let mut old_obj = f64::INFINITY;

        let mut it = 0;
        loop {
            if lmbd <= p.lmbd {
                lmbd = p.lmbd;
                tol = tolerance;
                final_stage = true;
            }

            let r = &p.y - &p.x * &w;
            w = iht_step(&p.x, &p.y, &w, lmbd, l, p.m);
            let obj = 0.5 * r.norm_squared() + lmbd * l0_norm(&w) as f64;

            it += 1;
            if (old_obj - obj).abs() < tol {
                if final_stage {
                    break;
                }
                lmbd *= SHRINK;
                old_obj = f64::INFINITY;
                continue;
            }
            if it >= MAX_ITER {
                log::warn!("{}: no convergence after {} iterations", NAME, MAX_ITER);
                break;
            }
            old_obj = obj;
        }

        log::debug!("{}: {} iterations, {} non-zeros", NAME, it, l0_norm(&w));
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
    fn test_reaches_target_weight() {
        // Target λ = 1.5: threshold √3 keeps 3 and -2 only.
        let problem = orthonormal_problem(&[3.0, 0.1, -2.0, 1.0], 0.5);
        let mut s = IhtWarm::new();
        s.set_objective(problem).unwrap();
        s.run(RunBudget::Tolerance(1e-10)).unwrap();
        assert_eq!(s.result().unwrap().w.as_slice(), &[3.0, 0.0, -2.0, 0.0]);
    }
}
