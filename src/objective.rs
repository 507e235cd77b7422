//! The benchmark objective: least squares data fit, scored against the data
//! and, when available, against the true signal.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use serde::Deserialize;

use crate::dataset::DataBundle;
use crate::error::{shape_mismatch, BenchError, Result};
use crate::linalg::{geomspace, inf_norm, l0_norm, lstsq, squared_spectral_norm};
use crate::metrics::{auc, snr_db, Confusion, SupportStats};
use crate::solvers::SolverResult;

/// Amplitude bound relative to `‖w_true‖∞` when the dataset gives none.
const M_FROM_TRUTH: f64 = 1.5;

/// Amplitude bound relative to the least squares solution otherwise.
const M_FROM_LSTSQ: f64 = 10.0;

/// Objective parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Objective {
    pub fit_intercept: bool,
    /// Regularisation weight relative to `‖Xᵀy‖∞`.
    pub lmbd_ratio: f64,
    /// Largest and smallest values of the `λ / λmax` path.
    pub rho_max: f64,
    pub rho_min: f64,
    pub n_rho: usize,
}

impl Default for Objective {
    fn default() -> Self {
        Objective {
            fit_intercept: false,
            lmbd_ratio: 0.1,
            rho_max: 1.0,
            rho_min: 1e-3,
            n_rho: 20,
        }
    }
}

/// Everything a solver receives, shared between the objective and the solvers.
#[derive(Debug, Clone)]
pub struct Problem {
    pub x: DMatrix<f64>,
    pub y: DVector<f64>,
    pub w_true: Option<DVector<f64>>,
    pub fit_intercept: bool,
    /// Bound on the amplitude of the entries of the solution.
    pub m: f64,
    /// L1 / L0 regularisation weight.
    pub lmbd: f64,
    /// `‖X‖₂²`.
    pub lipschitz: f64,
    /// Decreasing `λ / λmax` path for the regularisation-path solvers.
    pub rho_grid: Vec<f64>,
}

impl Problem {
    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    /// `‖Xᵀy‖∞`, the smallest L1 weight for which zero is a Lasso solution.
    pub fn xty_inf(&self) -> f64 {
        inf_norm(&self.x.tr_mul(&self.y))
    }
}

/// One evaluation of a solver result.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// `½‖y - Xw - b‖²`.
    pub value: f64,
    pub n_nnz: usize,
    pub solve_time: Option<f64>,
    pub k: Option<usize>,
    pub rho: Option<f64>,
    pub relative_gap: Option<f64>,
    /// Reconstruction statistics, when the true signal is known.
    pub stats: Option<SupportStats>,
}

impl Objective {
    fn validate(&self) -> Result<()> {
        if !(self.lmbd_ratio > 0.0) {
            return Err(BenchError::InvalidParameter(format!(
                "lmbd_ratio must be positive, got {}",
                self.lmbd_ratio
            )));
        }
        if !(self.rho_min > 0.0 && self.rho_min <= self.rho_max) || self.n_rho == 0 {
            return Err(BenchError::InvalidParameter(format!(
                "rho grid needs 0 < rho_min <= rho_max and n_rho > 0, got [{}, {}] x {}",
                self.rho_min, self.rho_max, self.n_rho
            )));
        }
        Ok(())
    }

    /// Derive the solver inputs from a dataset.
    pub fn set_data(&self, data: DataBundle) -> Result<Arc<Problem>> {
        self.validate()?;
        let DataBundle { x, y, w_true, m } = data;

        let lmbd = self.lmbd_ratio * inf_norm(&x.tr_mul(&y));
        let m = match (m, &w_true) {
            (Some(m), _) => m,
            (None, Some(w)) if inf_norm(w) > 0.0 => M_FROM_TRUTH * inf_norm(w),
            _ => M_FROM_LSTSQ * inf_norm(&lstsq(&x, &y)?),
        };
        let lipschitz = squared_spectral_norm(&x);
        let rho_grid = geomspace(self.rho_max, self.rho_min, self.n_rho);

        log::debug!(
            "problem {}x{}: lmbd = {:.3e}, M = {:.3e}, L = {:.3e}",
            x.nrows(),
            x.ncols(),
            lmbd,
            m,
            lipschitz
        );

        Ok(Arc::new(Problem {
            x,
            y,
            w_true,
            fit_intercept: self.fit_intercept,
            m,
            lmbd,
            lipschitz,
            rho_grid,
        }))
    }

    /// A feasible point of every solver: the zero vector.
    pub fn get_one_solution(problem: &Problem) -> DVector<f64> {
        DVector::zeros(problem.n_features())
    }

    /// Score a solver result.
    pub fn compute(problem: &Problem, result: &SolverResult) -> Result<Evaluation> {
        let w = &result.w;
        if w.len() != problem.n_features() {
            return Err(shape_mismatch(
                format!("solution of length {}", problem.n_features()),
                w.len(),
            ));
        }
        let mut r = &problem.y - &problem.x * w;
        if problem.fit_intercept && !r.is_empty() {
            let b = r.mean();
            r.add_scalar_mut(-b);
        }
        let value = 0.5 * r.norm_squared();

        let stats = problem
            .w_true
            .as_ref()
            .map(|w_true| support_stats(&problem.x, w_true, w));

        Ok(Evaluation {
            value,
            n_nnz: l0_norm(w),
            solve_time: result.solve_time,
            k: result.k,
            rho: result.rho,
            relative_gap: result.relative_gap,
            stats,
        })
    }
}

fn support_stats(x: &DMatrix<f64>, w_true: &DVector<f64>, w: &DVector<f64>) -> SupportStats {
    let c = Confusion::new(w_true, w);
    SupportStats {
        w_snr: snr_db(w_true, w),
        xw_snr: snr_db(&(x * w_true), &(x * w)),
        tpr: c.tpr(),
        fpr: c.fpr(),
        tnr: c.tnr(),
        fnr: c.fnr(),
        f1s: c.f1(),
        auc: auc(w_true, w),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle() -> DataBundle {
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
        let y = DVector::from_vec(vec![1.0, 4.0, 1.0]);
        DataBundle::new(x, y, Some(DVector::from_vec(vec![1.0, 0.0]))).unwrap()
    }

    fn result(w: &[f64]) -> SolverResult {
        SolverResult::new(DVector::from_vec(w.to_vec()))
    }

    #[test]
    fn test_problem_inputs() {
        let p = Objective::default().set_data(bundle()).unwrap();
        // Xᵀy = (1, 8).
        assert!((p.lmbd - 0.8).abs() < 1e-12);
        assert_eq!(p.m, 1.5);
        assert!((p.lipschitz - 4.0).abs() < 1e-9);
        assert_eq!(p.rho_grid.len(), 20);
        assert!((p.rho_grid[0] - 1.0).abs() < 1e-12);
        assert!((p.rho_grid[19] - 1e-3).abs() < 1e-15);
    }

    #[test]
    fn test_bound_falls_back_to_lstsq() {
        let mut data = bundle();
        data.w_true = None;
        let p = Objective::default().set_data(data).unwrap();
        // lstsq = (1, 2).
        assert!((p.m - 20.0).abs() < 1e-9);

        let p = Objective::default()
            .set_data(bundle().with_m(3.0).unwrap())
            .unwrap();
        assert_eq!(p.m, 3.0);
    }

    #[test]
    fn test_compute_value_and_stats() {
        let p = Objective::default().set_data(bundle()).unwrap();
        let zero = Objective::get_one_solution(&p);
        let eval = Objective::compute(&p, &SolverResult::new(zero)).unwrap();
        assert!((eval.value - 9.0).abs() < 1e-12);
        assert_eq!(eval.n_nnz, 0);
        let stats = eval.stats.unwrap();
        assert_eq!(stats.tpr, 0.0);
        assert_eq!(stats.fpr, 0.0);

        let eval = Objective::compute(&p, &result(&[1.0, 2.0])).unwrap();
        assert!((eval.value - 0.5).abs() < 1e-12);
        let stats = eval.stats.unwrap();
        assert_eq!(stats.tpr, 1.0);
        assert_eq!(stats.fpr, 1.0);
        assert_eq!(stats.f1s, 2.0 / 3.0);
    }

    #[test]
    fn test_intercept_removes_mean_residual() {
        let obj = Objective {
            fit_intercept: true,
            ..Default::default()
        };
        let p = obj.set_data(bundle()).unwrap();
        // Residual of zero is y = (1, 4, 1), centred (-1, 2, -1).
        let eval = Objective::compute(&p, &result(&[0.0, 0.0])).unwrap();
        assert!((eval.value - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_wrong_length_is_shape_mismatch() {
        let p = Objective::default().set_data(bundle()).unwrap();
        assert!(matches!(
            Objective::compute(&p, &result(&[1.0])),
            Err(BenchError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_grid() {
        let obj = Objective {
            rho_min: 0.0,
            ..Default::default()
        };
        assert!(obj.set_data(bundle()).is_err());
    }
}
