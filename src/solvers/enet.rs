//! Warm-started ElasticNet along the objective's `λ / λmax` grid.

use std::sync::Arc;
use std::time::Instant;

use nalgebra::{DMatrix, DVector};
use serde::Deserialize;

use super::cd::{coordinate_descent, ElasticNet};
use super::{debias, last_iterate, problem, RunBudget, Solver, SolverResult};
use crate::error::{BenchError, Result};
use crate::objective::Problem;
use crate::stopping::{StoppingCriterion, StoppingStrategy, SufficientProgressCriterion};

const NAME: &str = "enet";

const MAX_EPOCHS: usize = 10_000;
const TOL: f64 = 1e-12;

/// `(1/2n)‖y - Xw‖² + α(ρ‖w‖₁ + (1 - ρ)/2 ‖w‖²)` with `α = λ / n` and
/// `λ = rho · ‖Xᵀy‖∞`, where the run index selects `rho` in the grid.
///
/// Each run starts from the previous solution.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ElasticNetPath {
    pub l1_ratio: f64,
    pub debiasing: bool,
    #[serde(skip)]
    problem: Option<Arc<Problem>>,
    #[serde(skip)]
    centred: Option<(DMatrix<f64>, DVector<f64>)>,
    #[serde(skip)]
    lmbd_max: f64,
    #[serde(skip)]
    rho: f64,
    #[serde(skip)]
    w: Option<DVector<f64>>,
    #[serde(skip)]
    solve_time: f64,
}

impl Default for ElasticNetPath {
    fn default() -> Self {
        ElasticNetPath {
            l1_ratio: 0.5,
            debiasing: false,
            problem: None,
            centred: None,
            lmbd_max: 0.0,
            rho: 0.0,
            w: None,
            solve_time: 0.0,
        }
    }
}

impl ElasticNetPath {
    pub fn new(l1_ratio: f64, debiasing: bool) -> Self {
        ElasticNetPath {
            l1_ratio,
            debiasing,
            ..Default::default()
        }
    }
}

impl Solver for ElasticNetPath {
    fn name(&self) -> &str {
        NAME
    }

    fn label(&self) -> String {
        format!(
            "enet[l1_ratio={},debiasing={}]",
            self.l1_ratio, self.debiasing
        )
    }

    fn stopping_criterion(&self) -> Box<dyn StoppingCriterion> {
        Box::new(SufficientProgressCriterion::with_patience(
            10,
            StoppingStrategy::Iteration,
        ))
    }

    fn set_objective(&mut self, problem: Arc<Problem>) -> Result<()> {
        if !(self.l1_ratio > 0.0 && self.l1_ratio <= 1.0) {
            return Err(BenchError::InvalidParameter(format!(
                "{}: l1_ratio must lie in (0, 1], got {}",
                NAME, self.l1_ratio
            )));
        }
        if problem.rho_grid.is_empty() {
            return Err(BenchError::MissingInput(format!("{}: empty rho grid", NAME)));
        }
        self.centred = if problem.fit_intercept {
            let mut xc = problem.x.clone();
            for mut col in xc.column_iter_mut() {
                let mean = col.mean();
                col.add_scalar_mut(-mean);
            }
            let yc = problem.y.add_scalar(-problem.y.mean());
            Some((xc, yc))
        } else {
            None
        };
        self.lmbd_max = problem.xty_inf();
        self.rho = problem.rho_grid[0];
        self.w = Some(DVector::zeros(problem.n_features()));
        self.problem = Some(problem);
        Ok(())
    }

    fn run(&mut self, budget: RunBudget<'_>) -> Result<()> {
        let i = budget.iterations(NAME)?;
        let p = problem(&self.problem, NAME)?;
        let (x, y) = match &self.centred {
            Some((xc, yc)) => (xc, yc),
            None => (&p.x, &p.y),
        };
        let rho = p.rho_grid[i.min(p.rho_grid.len() - 1)];
        let penalty = ElasticNet {
            alpha: rho * self.lmbd_max / p.n_samples().max(1) as f64,
            l1_ratio: self.l1_ratio,
        };

        let start = Instant::now();
        let mut w = match &self.w {
            Some(w) if w.len() == p.n_features() => w.clone(),
            _ => DVector::zeros(p.n_features()),
        };
        let outcome = coordinate_descent(x, y, &penalty, &mut w, MAX_EPOCHS, TOL);
        if !outcome.converged {
            log::warn!("{}: no convergence in {} epochs at rho = {:.3e}", NAME, MAX_EPOCHS, rho);
        }
        if self.debiasing {
            w = debias(x, y, &w)?;
        }
        self.solve_time = start.elapsed().as_secs_f64();
        log::debug!("{}: rho = {:.3e}, {} epochs", NAME, rho, outcome.epochs);

        self.rho = rho;
        self.w = Some(w);
        Ok(())
    }

    fn result(&self) -> Result<SolverResult> {
        let w = last_iterate(&self.w, NAME)?;
        Ok(SolverResult::new(w.clone())
            .with_rho(self.rho)
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
    use crate::linalg::l0_norm;
    use crate::solvers::test_support::orthonormal_problem;

    #[test]
    fn test_first_grid_point_is_zero() {
        // Only the pure L1 path is exactly zero at rho = 1.
        let mut s = ElasticNetPath::new(1.0, false);
        s.set_objective(orthonormal_problem(&[3.0, 0.1, -2.0, 1.0], 0.1)).unwrap();
        s.run(RunBudget::Iterations(0)).unwrap();
        let r = s.result().unwrap();
        assert_eq!(r.rho, Some(1.0));
        assert_eq!(l0_norm(&r.w), 0);
    }

    #[test]
    fn test_support_grows_along_grid() {
        let mut s = ElasticNetPath::new(1.0, true);
        s.set_objective(orthonormal_problem(&[3.0, 0.1, -2.0, 1.0], 0.1)).unwrap();
        let mut previous = 0;
        let mut stop_val = 0.0;
        for _ in 0..25 {
            s.run(RunBudget::Iterations(stop_val as usize)).unwrap();
            let nnz = l0_norm(&s.result().unwrap().w);
            assert!(nnz >= previous);
            previous = nnz;
            stop_val = s.next_stop_val(stop_val).unwrap();
        }
        // Last rho is 1e-3: every atom above 3e-3 is active and refitted.
        let w = s.result().unwrap().w;
        assert_eq!(l0_norm(&w), 4);
        assert!((w[0] - 3.0).abs() < 1e-10);
        assert_eq!(stop_val, 19.0);
    }

    #[test]
    fn test_rejects_bad_l1_ratio() {
        let mut s = ElasticNetPath::new(0.0, false);
        assert!(s.set_objective(orthonormal_problem(&[1.0], 0.1)).is_err());
    }
}
