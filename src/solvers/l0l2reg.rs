//! L0L2-regularised least squares along the objective's `λ / λmax` grid.

use std::sync::Arc;
use std::time::Instant;

use nalgebra::DVector;
use serde::Deserialize;

use super::bnb::{branch_and_bound, BnbSettings, Formulation};
use super::{last_iterate, problem, RunBudget, Solver, SolverResult};
use crate::error::{BenchError, Result};
use crate::linalg::{inf_norm, lstsq};
use crate::objective::Problem;
use crate::stopping::{StoppingCriterion, StoppingStrategy, SufficientProgressCriterion};

const NAME: &str = "l0l2reg";

const GAP_TOL: f64 = 1e-4;

/// `½‖y - Xw‖² + λ(ρ₀‖w‖₀ + (1 - ρ₀)/2 ‖w‖²)` with `λ = rho · λmax` and
/// `λmax = ‖lstsq(X, y)‖∞ · ‖Xᵀy‖∞`, where the run index selects `rho`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct L0L2Reg {
    pub l0_ratio: f64,
    #[serde(skip)]
    problem: Option<Arc<Problem>>,
    #[serde(skip)]
    lmbd_max: f64,
    #[serde(skip)]
    rho: f64,
    #[serde(skip)]
    w: Option<DVector<f64>>,
    #[serde(skip)]
    relative_gap: f64,
    #[serde(skip)]
    solve_time: f64,
}

impl Default for L0L2Reg {
    fn default() -> Self {
        L0L2Reg {
            l0_ratio: 0.5,
            problem: None,
            lmbd_max: 0.0,
            rho: 0.0,
            w: None,
            relative_gap: f64::INFINITY,
            solve_time: 0.0,
        }
    }
}

impl L0L2Reg {
    pub fn new(l0_ratio: f64) -> Self {
        L0L2Reg {
            l0_ratio,
            ..Default::default()
        }
    }
}

impl Solver for L0L2Reg {
    fn name(&self) -> &str {
        NAME
    }

    fn label(&self) -> String {
        format!("l0l2reg[l0_ratio={}]", self.l0_ratio)
    }

    fn stopping_criterion(&self) -> Box<dyn StoppingCriterion> {
        Box::new(SufficientProgressCriterion::with_patience(
            20,
            StoppingStrategy::Iteration,
        ))
    }

    fn skip(&self, problem: &Problem) -> Option<String> {
        problem
            .fit_intercept
            .then(|| format!("{} does not fit an intercept", NAME))
    }

    fn set_objective(&mut self, problem: Arc<Problem>) -> Result<()> {
        if !(self.l0_ratio > 0.0 && self.l0_ratio < 1.0) {
            return Err(BenchError::InvalidParameter(format!(
                "{}: l0_ratio must lie in (0, 1), got {}",
                NAME, self.l0_ratio
            )));
        }
        if problem.rho_grid.is_empty() {
            return Err(BenchError::MissingInput(format!("{}: empty rho grid", NAME)));
        }
        self.lmbd_max = inf_norm(&lstsq(&problem.x, &problem.y)?) * problem.xty_inf();
        self.rho = problem.rho_grid[0];
        self.w = Some(DVector::zeros(problem.n_features()));
        self.problem = Some(problem);
        Ok(())
    }

    fn run(&mut self, budget: RunBudget<'_>) -> Result<()> {
        let i = budget.iterations(NAME)?;
        let p = problem(&self.problem, NAME)?;
        let rho = p.rho_grid[i.min(p.rho_grid.len() - 1)];
        let lmbd = rho * self.lmbd_max;
        let start = Instant::now();

        let (w, gap) = if lmbd > 0.0 {
            let formulation = Formulation::Perspective {
                l0: self.l0_ratio * lmbd,
                l2: 0.5 * (1.0 - self.l0_ratio) * lmbd,
            };
            let outcome =
                branch_and_bound(&p.x, &p.y, formulation, &BnbSettings::with_gap(GAP_TOL), None)?;
            (outcome.w, outcome.relative_gap)
        } else {
            (DVector::zeros(p.n_features()), 0.0)
        };

        self.rho = rho;
        self.relative_gap = gap;
        self.solve_time = start.elapsed().as_secs_f64();
        self.w = Some(w);
        Ok(())
    }

    fn result(&self) -> Result<SolverResult> {
        let w = last_iterate(&self.w, NAME)?;
        Ok(SolverResult::new(w.clone())
            .with_rho(self.rho)
            .with_relative_gap(self.relative_gap)
            .with_solve_time(self.solve_time))
    }

    fn next_stop_val(&self, current: f64) -> Option<f64> {
        let len = self.problem.as_ref().map_or(1, |p| p.rho_grid.len());
        Some((current + 1.0).min((len - 1) as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DataBundle;
    use crate::linalg::l0_norm;
    use crate::objective::Objective;
    use crate::solvers::test_support::orthonormal_problem;

    #[test]
    fn test_largest_weight_gives_zero() {
        // λmax = 3 · 3 = 9 at rho = 1: keeping y = 3 costs more than y²/2.
        let mut s = L0L2Reg::default();
        s.set_objective(orthonormal_problem(&[3.0, 0.1, -2.0, 1.0], 0.1)).unwrap();
        s.run(RunBudget::Iterations(0)).unwrap();
        let r = s.result().unwrap();
        assert_eq!(r.rho, Some(1.0));
        assert_eq!(l0_norm(&r.w), 0);
    }

    #[test]
    fn test_last_grid_point_keeps_every_atom() {
        let mut s = L0L2Reg::default();
        s.set_objective(orthonormal_problem(&[3.0, 0.1, -2.0, 1.0], 0.1)).unwrap();
        s.run(RunBudget::Iterations(100)).unwrap();
        let r = s.result().unwrap();
        assert!((r.rho.unwrap() - 1e-3).abs() < 1e-15);
        assert_eq!(l0_norm(&r.w), 4);
        assert_eq!(s.next_stop_val(19.0), Some(19.0));
    }

    #[test]
    fn test_skips_intercept() {
        let data = DataBundle::new(
            nalgebra::DMatrix::identity(2, 2),
            DVector::from_vec(vec![1.0, 2.0]),
            None,
        )
        .unwrap();
        let p = Objective {
            fit_intercept: true,
            ..Default::default()
        }
        .set_data(data)
        .unwrap();
        assert!(L0L2Reg::default().skip(&p).is_some());
    }
}
