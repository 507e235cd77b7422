//! Running a stuffed [`QpProblem`] through Clarabel's interior point method.

use clarabel::algebra::CscMatrix as ClarabelCsc;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};
use nalgebra_sparse::CscMatrix;

use super::{ConeDims, QpProblem};
use crate::error::{BenchError, Result};
use crate::sparse::upper_quadratic_form;

/// How a relaxation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Solved, possibly to reduced accuracy.
    Optimal,
    /// The constraints admit no point; a branch-and-bound node is pruned.
    Infeasible,
    /// The objective is unbounded below.
    Unbounded,
    /// Iteration or time limit reached.
    MaxIterations,
    /// Clarabel gave up on numerical grounds.
    NumericalError,
}

impl From<SolverStatus> for SolveStatus {
    fn from(status: SolverStatus) -> Self {
        use SolverStatus::*;
        match status {
            Solved | AlmostSolved => SolveStatus::Optimal,
            PrimalInfeasible | AlmostPrimalInfeasible => SolveStatus::Infeasible,
            DualInfeasible | AlmostDualInfeasible => SolveStatus::Unbounded,
            MaxIterations | MaxTime => SolveStatus::MaxIterations,
            _ => SolveStatus::NumericalError,
        }
    }
}

/// Interior point settings for the relaxations.
#[derive(Debug, Clone)]
pub struct Settings {
    pub max_iter: u32,
    /// Seconds, unbounded when `None`.
    pub time_limit: Option<f64>,
    /// Absolute and relative duality gap at which Clarabel stops.
    pub tol_gap: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            max_iter: 200,
            time_limit: None,
            tol_gap: 1e-8,
        }
    }
}

/// Primal point of a solved problem.
#[derive(Debug, Clone)]
pub struct Primal {
    pub x: Vec<f64>,
    /// `½xᵀPx + qᵀx + c`, offset included.
    pub value: f64,
}

#[derive(Debug, Clone)]
pub struct QpSolution {
    pub status: SolveStatus,
    /// Set when `status` is `Optimal`.
    pub primal: Option<Primal>,
    pub iterations: u32,
}

impl QpSolution {
    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    /// The primal point, or an error naming the status.
    pub fn into_primal(self) -> Result<Primal> {
        match (self.status, self.primal) {
            (SolveStatus::Optimal, Some(primal)) => Ok(primal),
            (SolveStatus::NumericalError, _) => Err(BenchError::NumericalError(format!(
                "Clarabel stopped on numerical difficulties after {} iterations",
                self.iterations
            ))),
            (status, _) => Err(BenchError::SolverError(format!(
                "Clarabel ended with status {:?} after {} iterations",
                status, self.iterations
            ))),
        }
    }
}

/// Solve `min ½xᵀPx + qᵀx + c  s.t.  Ax + s = b, s ∈ K`.
pub fn solve(problem: &QpProblem, settings: &Settings) -> Result<QpSolution> {
    let clarabel_settings = DefaultSettingsBuilder::default()
        .verbose(false)
        .max_iter(settings.max_iter)
        .time_limit(settings.time_limit.unwrap_or(f64::INFINITY))
        .tol_gap_abs(settings.tol_gap)
        .tol_gap_rel(settings.tol_gap)
        .build()
        .map_err(|e| BenchError::SolverError(format!("invalid Clarabel settings: {}", e)))?;

    let mut solver = DefaultSolver::new(
        &clarabel_csc(&problem.p),
        &problem.q,
        &clarabel_csc(&problem.a),
        &problem.b,
        &clarabel_cones(&problem.cone_dims),
        clarabel_settings,
    );
    solver.solve();

    let status = SolveStatus::from(solver.solution.status);
    let iterations = solver.info.iterations;
    if status != SolveStatus::Optimal {
        log::debug!(
            "clarabel: {:?} after {} iterations on {} variables",
            solver.solution.status,
            iterations,
            problem.num_vars()
        );
    }
    let primal = (status == SolveStatus::Optimal).then(|| {
        let x = solver.solution.x.clone();
        let linear: f64 = problem.q.iter().zip(&x).map(|(q, v)| q * v).sum();
        let value = upper_quadratic_form(&problem.p, &x) + linear + problem.objective_offset;
        Primal { x, value }
    });
    Ok(QpSolution {
        status,
        primal,
        iterations,
    })
}

fn clarabel_csc(m: &CscMatrix<f64>) -> ClarabelCsc<f64> {
    let (offsets, rows, values) = m.csc_data();
    ClarabelCsc::new(
        m.nrows(),
        m.ncols(),
        offsets.to_vec(),
        rows.to_vec(),
        values.to_vec(),
    )
}

/// Cones in the row order of `A`: zero, nonnegative, then each second-order
/// block. Empty cones are left out.
fn clarabel_cones(dims: &ConeDims) -> Vec<SupportedConeT<f64>> {
    let leading = [
        (dims.zero, SupportedConeT::ZeroConeT(dims.zero)),
        (dims.nonneg, SupportedConeT::NonnegativeConeT(dims.nonneg)),
    ];
    leading
        .into_iter()
        .filter(|(rows, _)| *rows > 0)
        .map(|(_, cone)| cone)
        .chain(dims.soc.iter().map(|&d| SupportedConeT::SecondOrderConeT(d)))
        .collect()
}
