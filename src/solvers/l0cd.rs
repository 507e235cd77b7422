//! L0L2 coordinate descent along a `λ₀` path, selected by cross-validation.

use std::sync::Arc;
use std::time::Instant;

use nalgebra::{DMatrix, DVector};
use serde::Deserialize;

use super::cd::{coordinate_descent, L0L2};
use super::{last_iterate, problem, target_support, RunBudget, Solver, SolverResult};
use crate::error::{BenchError, Result};
use crate::linalg::{column_sq_norms, geomspace, l0_norm};
use crate::objective::Problem;
use crate::stopping::{RunOnGridCriterion, StoppingCriterion};

const NAME: &str = "l0cd";

const TOL: f64 = 1e-8;

/// One point of a regularisation path.
#[derive(Debug, Clone)]
pub struct PathPoint {
    pub gamma: f64,
    pub lmbd0: f64,
    pub w: DVector<f64>,
}

/// Smallest `λ₀` for which zero is a fixed point of
/// `½‖y - Xw‖² + λ₀‖w‖₀ + γ‖w‖²`.
pub fn lmbd0_max(x: &DMatrix<f64>, y: &DVector<f64>, gamma: f64) -> f64 {
    let xty = x.tr_mul(y);
    let norms = column_sq_norms(x);
    xty.iter()
        .zip(norms.iter())
        .filter(|(_, n)| **n > 0.0)
        .map(|(c, n)| c * c / (2.0 * (n + 2.0 * gamma)))
        .fold(0.0, f64::max)
}

/// Warm-started path of `½‖y - Xw‖² + λ₀‖w‖₀ + γ‖w‖²` over decreasing
/// `lmbd0s`, stopping once the support exceeds `max_support`.
pub fn l0l2_path(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    gamma: f64,
    lmbd0s: &[f64],
    max_support: usize,
    max_epochs: usize,
) -> Vec<PathPoint> {
    let n = x.nrows().max(1) as f64;
    let mut w = DVector::zeros(x.ncols());
    let mut path = Vec::with_capacity(lmbd0s.len());
    for &lmbd0 in lmbd0s {
        let penalty = L0L2 {
            l0: lmbd0 / n,
            l2: gamma / n,
        };
        let outcome = coordinate_descent(x, y, &penalty, &mut w, max_epochs, TOL);
        if !outcome.converged {
            log::warn!(
                "{}: no convergence in {} epochs at lmbd0 = {:.3e}",
                NAME,
                max_epochs,
                lmbd0
            );
        }
        if l0_norm(&w) > max_support {
            break;
        }
        path.push(PathPoint {
            gamma,
            lmbd0,
            w: w.clone(),
        });
    }
    path
}

/// Contiguous fold boundaries of `n` rows.
fn fold_rows(n: usize, n_folds: usize, fold: usize) -> (Vec<usize>, Vec<usize>) {
    let (lo, hi) = (fold * n / n_folds, (fold + 1) * n / n_folds);
    let train = (0..n).filter(|i| *i < lo || *i >= hi).collect();
    let test = (lo..hi).collect();
    (train, test)
}

/// L0 (optionally L0L2) path solver keeping, among path points with at most
/// `k = floor(g · n_features)` non-zeros, the one with the smallest
/// cross-validated mean squared error.
///
/// The path is allowed one extra non-zero before it stops, so that the last
/// admissible point is always reached.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct L0Cd {
    /// `γ` values of the L2 part; `[0]` is a pure L0 penalty.
    pub gammas: Vec<f64>,
    pub n_lambda: usize,
    pub lambda_ratio: f64,
    pub n_folds: usize,
    pub max_epochs: usize,
    #[serde(skip)]
    problem: Option<Arc<Problem>>,
    #[serde(skip)]
    w: Option<DVector<f64>>,
    #[serde(skip)]
    k: usize,
    #[serde(skip)]
    solve_time: f64,
}

impl Default for L0Cd {
    fn default() -> Self {
        L0Cd {
            gammas: vec![0.0],
            n_lambda: 100,
            lambda_ratio: 1e-4,
            n_folds: 10,
            max_epochs: 1_000,
            problem: None,
            w: None,
            k: 0,
            solve_time: 0.0,
        }
    }
}

impl L0Cd {
    pub fn new() -> Self {
        Self::default()
    }

    fn lmbd0_grid(&self, x: &DMatrix<f64>, y: &DVector<f64>, gamma: f64) -> Vec<f64> {
        let top = lmbd0_max(x, y, gamma);
        if top > 0.0 {
            geomspace(top, top * self.lambda_ratio, self.n_lambda)
        } else {
            Vec::new()
        }
    }

    /// Mean held-out squared error of every point of `lmbd0s`, or `None` for
    /// points that some fold could not reach.
    fn cv_errors(
        &self,
        x: &DMatrix<f64>,
        y: &DVector<f64>,
        gamma: f64,
        lmbd0s: &[f64],
        max_support: usize,
    ) -> Vec<Option<f64>> {
        let n = x.nrows();
        let n_folds = self.n_folds.min(n);
        let mut totals = vec![Some(0.0); lmbd0s.len()];
        for fold in 0..n_folds {
            let (train, test) = fold_rows(n, n_folds, fold);
            let (x_train, y_train) = (x.select_rows(&train), y.select_rows(&train));
            let (x_test, y_test) = (x.select_rows(&test), y.select_rows(&test));
            let path = l0l2_path(
                &x_train,
                &y_train,
                gamma,
                lmbd0s,
                max_support,
                self.max_epochs,
            );
            for (i, total) in totals.iter_mut().enumerate() {
                *total = match (path.get(i), *total) {
                    (Some(point), Some(t)) => {
                        Some(t + (&y_test - &x_test * &point.w).norm_squared() / n as f64)
                    }
                    _ => None,
                };
            }
        }
        totals
    }
}

impl Solver for L0Cd {
    fn name(&self) -> &str {
        NAME
    }

    fn stopping_criterion(&self) -> Box<dyn StoppingCriterion> {
        Box::new(RunOnGridCriterion::default())
    }

    fn set_objective(&mut self, problem: Arc<Problem>) -> Result<()> {
        if self.gammas.is_empty() || self.gammas.iter().any(|g| !(*g >= 0.0)) {
            return Err(BenchError::InvalidParameter(format!(
                "{}: gammas must be a non-empty list of non-negative values",
                NAME
            )));
        }
        if !(self.lambda_ratio > 0.0 && self.lambda_ratio < 1.0) || self.n_lambda == 0 {
            return Err(BenchError::InvalidParameter(format!(
                "{}: lambda_ratio must lie in (0, 1) and n_lambda be positive",
                NAME
            )));
        }
        if self.n_folds < 2 {
            return Err(BenchError::InvalidParameter(format!(
                "{}: n_folds must be at least 2, got {}",
                NAME, self.n_folds
            )));
        }
        self.problem = Some(problem);
        self.w = None;
        Ok(())
    }

    fn run(&mut self, budget: RunBudget<'_>) -> Result<()> {
        let g = budget.grid_value(NAME)?;
        let p = problem(&self.problem, NAME)?;
        let start = Instant::now();

        let k = target_support(g, p.n_features());
        let mut best: Option<(f64, DVector<f64>)> = None;
        if k > 0 {
            for &gamma in &self.gammas {
                let lmbd0s = self.lmbd0_grid(&p.x, &p.y, gamma);
                let path = l0l2_path(&p.x, &p.y, gamma, &lmbd0s, k + 1, self.max_epochs);
                let cv = self.cv_errors(&p.x, &p.y, gamma, &lmbd0s[..path.len()], k + 1);
                for (point, err) in path.into_iter().zip(cv) {
                    let err = match err {
                        Some(e) if l0_norm(&point.w) <= k => e,
                        _ => continue,
                    };
                    if best.as_ref().map_or(true, |(b, _)| err < *b) {
                        log::debug!(
                            "{}: gamma = {:.1e}, lmbd0 = {:.3e}, cv = {:.3e}",
                            NAME,
                            point.gamma,
                            point.lmbd0,
                            err
                        );
                        best = Some((err, point.w));
                    }
                }
            }
        }

        self.k = k;
        self.solve_time = start.elapsed().as_secs_f64();
        self.w = Some(best.map_or_else(|| DVector::zeros(p.n_features()), |(_, w)| w));
        Ok(())
    }

    fn result(&self) -> Result<SolverResult> {
        let w = last_iterate(&self.w, NAME)?;
        Ok(SolverResult::new(w.clone())
            .with_k(self.k)
            .with_solve_time(self.solve_time))
    }
}
