//! Proximal gradient descent on the Lasso, with optional acceleration and a
//! box-constrained debiasing step.

use std::sync::Arc;
use std::time::Instant;

use nalgebra::DVector;
use serde::Deserialize;

use super::{last_iterate, problem, step_lipschitz, RunBudget, Solver, SolverResult};
use crate::error::Result;
use crate::linalg::{clip_inplace, l1_norm, soft_threshold, support};
use crate::objective::Problem;
use crate::qp::bounded_lstsq;
use crate::stopping::{StoppingCriterion, StoppingStrategy, SufficientProgressCriterion};

const NAME: &str = "ista";

/// Iteration cap of a single run.
const MAX_ITER: usize = 100_000;

/// Solves `min ½‖y - Xw‖² + μ‖w‖₁  s.t. ‖w‖∞ <= M` until the objective moves
/// by less than the tolerance, with `μ = λ`, or `μ = √(2λ)` when `adapt_lmbd`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Ista {
    pub adapt_lmbd: bool,
    /// FISTA-style momentum `(it - 1) / (it + 5)`.
    pub acceleration: bool,
    /// Refit the support by box-constrained least squares.
    pub debiasing: bool,
    #[serde(skip)]
    problem: Option<Arc<Problem>>,
    #[serde(skip)]
    w: Option<DVector<f64>>,
    #[serde(skip)]
    solve_time: f64,
}

impl Ista {
    pub fn new(adapt_lmbd: bool, acceleration: bool, debiasing: bool) -> Self {
        Ista {
            adapt_lmbd,
            acceleration,
            debiasing,
            ..Default::default()
        }
    }

    /// Weight of the L1 term.
    fn l1_weight(&self, lmbd: f64) -> f64 {
        if self.adapt_lmbd {
            (2.0 * lmbd).sqrt()
        } else {
            lmbd
        }
    }
}

impl Solver for Ista {
    fn name(&self) -> &str {
        NAME
    }

    fn label(&self) -> String {
        format!(
            "ista[adapt_lmbd={},acceleration={},debiasing={}]",
            self.adapt_lmbd, self.acceleration, self.debiasing
        )
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
        let mu = self.l1_weight(p.lmbd);
        let mut w = DVector::zeros(p.n_features());
        let mut z = w.clone();
        let mut old_obj = f64::INFINITY;

        let mut it = 0;
        loop {
            it += 1;
            let w_old = w.clone();
            let r = &p.y - &p.x * &z;
            w = (&z + p.x.tr_mul(&r) / l).map(|v| soft_threshold(v, mu / l));
            clip_inplace(&mut w, p.m);

            z = if self.acceleration {
                let t = (it as f64 - 1.0) / (it as f64 + 5.0);
                &w + (&w - &w_old) * t
            } else {
                w.clone()
            };

            let obj = 0.5 * r.norm_squared() + mu * l1_norm(&w);
            if (old_obj - obj).abs() < tolerance {
                break;
            }
            if it >= MAX_ITER {
                log::warn!("{}: no convergence after {} iterations", NAME, MAX_ITER);
                break;
            }
            old_obj = obj;
        }

        if self.debiasing {
            let s = support(&w);
            if !s.is_empty() {
                let refit = bounded_lstsq(&p.x.select_columns(&s), &p.y, -p.m, p.m)?;
                for (i, &j) in s.iter().enumerate() {
                    w[j] = refit[i];
                }
            }
        }

        log::debug!(
            "{}: {} iterations at tolerance {:.1e}, {} non-zeros",
            NAME,
            it,
            tolerance,
            support(&w).len()
        );
        self.solve_time = start.elapsed().as_secs_f64();
        self.w = Some(w);
        Ok(())
    }

    fn result(&self) -> Result<SolverResult> {
        let w = last_iterate(&self.w, NAME)?;
        Ok(SolverResult::new(w.clone()).with_solve_time(self.solve_time))
    }
}
