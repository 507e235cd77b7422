//! Sparse regression solvers.
//!
//! Every solver implements [`Solver`]: it receives the shared [`Problem`]
//! once, is then run repeatedly with the stop values its stopping criterion
//! produces, and hands back a [`SolverResult`] after each run.
//!
//! The stop value reaches the solver as a [`RunBudget`] whose variant follows
//! the criterion's [`StoppingStrategy`]:
//! - `Iterations` for the iteration strategy
//! - `Tolerance` for the tolerance strategy
//! - `GridValue` for grid criteria
//! - `Callback` for the callback strategy, called once per iteration with the
//!   current iterate; the solver stops when it returns `false`

pub mod bnb;
pub mod cd;
pub mod enet;
pub mod fista;
pub mod glm;
pub mod iht;
pub mod iht_warm;
pub mod ista;
pub mod l0bnb;
pub mod l0cd;
pub mod l0constraint;
pub mod l0l2reg;
pub mod lars;
pub mod lasso;
pub mod mip;
pub mod omp;
pub mod zero;

pub use enet::ElasticNetPath;
pub use fista::Fista;
pub use glm::{Glm, GlmEstimator};
pub use iht::Iht;
pub use iht_warm::IhtWarm;
pub use ista::Ista;
pub use l0bnb::L0Bnb;
pub use l0cd::L0Cd;
pub use l0constraint::L0Constraint;
pub use l0l2reg::L0L2Reg;
pub use lars::Lars;
pub use lasso::LassoPath;
pub use mip::Mip;
pub use omp::Omp;
pub use zero::ZeroSolver;

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

use crate::error::{BenchError, Result};
use crate::linalg::{clip_inplace, hard_threshold_inplace, lstsq_on_support, support};
use crate::objective::Problem;
use crate::stopping::{StoppingCriterion, StoppingStrategy};

/// Stop value handed to [`Solver::run`].
pub enum RunBudget<'a> {
    Iterations(usize),
    Tolerance(f64),
    GridValue(f64),
    Callback(&'a mut dyn FnMut(&DVector<f64>) -> bool),
}

impl std::fmt::Debug for RunBudget<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunBudget::Iterations(n) => write!(f, "Iterations({})", n),
            RunBudget::Tolerance(t) => write!(f, "Tolerance({})", t),
            RunBudget::GridValue(g) => write!(f, "GridValue({})", g),
            RunBudget::Callback(_) => write!(f, "Callback"),
        }
    }
}

impl RunBudget<'static> {
    /// Budget for a stop value produced by a non-callback strategy.
    pub fn from_stop_val(strategy: StoppingStrategy, stop_val: f64) -> Result<Self> {
        match strategy {
            StoppingStrategy::Iteration => Ok(RunBudget::Iterations(stop_val.max(0.0) as usize)),
            StoppingStrategy::Tolerance => Ok(RunBudget::Tolerance(stop_val)),
            StoppingStrategy::Grid => Ok(RunBudget::GridValue(stop_val)),
            StoppingStrategy::Callback => Err(BenchError::InvalidParameter(
                "the callback strategy needs a callback, not a stop value".into(),
            )),
        }
    }
}

impl RunBudget<'_> {
    pub fn iterations(&self, solver: &str) -> Result<usize> {
        match self {
            RunBudget::Iterations(n) => Ok(*n),
            other => Err(unexpected_budget(solver, "an iteration count", other)),
        }
    }

    pub fn tolerance(&self, solver: &str) -> Result<f64> {
        match self {
            RunBudget::Tolerance(t) => Ok(*t),
            other => Err(unexpected_budget(solver, "a tolerance", other)),
        }
    }

    pub fn grid_value(&self, solver: &str) -> Result<f64> {
        match self {
            RunBudget::GridValue(g) => Ok(*g),
            other => Err(unexpected_budget(solver, "a grid value", other)),
        }
    }
}

fn unexpected_budget(solver: &str, expected: &str, got: &RunBudget<'_>) -> BenchError {
    BenchError::InvalidParameter(format!("{} expects {}, got {:?}", solver, expected, got))
}

/// What a solver hands back after a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverResult {
    pub w: DVector<f64>,
    /// Target support size of sparsity-grid solvers.
    pub k: Option<usize>,
    /// Wall-clock time of the run in seconds, when measured by the solver.
    pub solve_time: Option<f64>,
    /// `λ / λmax` of regularisation-path solvers.
    pub rho: Option<f64>,
    /// Certified relative optimality gap of branch-and-bound solvers.
    pub relative_gap: Option<f64>,
}

impl SolverResult {
    pub fn new(w: DVector<f64>) -> Self {
        SolverResult {
            w,
            k: None,
            solve_time: None,
            rho: None,
            relative_gap: None,
        }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }

    pub fn with_solve_time(mut self, seconds: f64) -> Self {
        self.solve_time = Some(seconds);
        self
    }

    pub fn with_rho(mut self, rho: f64) -> Self {
        self.rho = Some(rho);
        self
    }

    pub fn with_relative_gap(mut self, gap: f64) -> Self {
        self.relative_gap = Some(gap);
        self
    }
}

/// A benchmarked solver.
///
/// The driver calls, in order: [`skip`](Solver::skip),
/// [`set_objective`](Solver::set_objective),
/// [`stopping_criterion`](Solver::stopping_criterion), then alternates
/// [`run`](Solver::run) and [`result`](Solver::result).
pub trait Solver {
    fn name(&self) -> &str;

    /// Name plus parameters, used to label results.
    fn label(&self) -> String {
        self.name().to_string()
    }

    /// A fresh criterion for the current problem.
    fn stopping_criterion(&self) -> Box<dyn StoppingCriterion>;

    /// Reason not to run on this problem, if any.
    fn skip(&self, _problem: &Problem) -> Option<String> {
        None
    }

    fn set_objective(&mut self, problem: Arc<Problem>) -> Result<()>;

    fn run(&mut self, budget: RunBudget<'_>) -> Result<()>;

    fn result(&self) -> Result<SolverResult>;

    /// Solver-specific successor of a stop value; the criterion's schedule is
    /// used when `None`.
    fn next_stop_val(&self, _current: f64) -> Option<f64> {
        None
    }
}

/// The problem set by `set_objective`, or an error naming the solver.
pub(crate) fn problem<'a>(problem: &'a Option<Arc<Problem>>, solver: &str) -> Result<&'a Problem> {
    problem.as_deref().ok_or_else(|| {
        BenchError::MissingInput(format!("{}: set_objective was not called", solver))
    })
}

/// The last computed iterate, or an error naming the solver.
pub(crate) fn last_iterate<'a>(w: &'a Option<DVector<f64>>, solver: &str) -> Result<&'a DVector<f64>> {
    w.as_ref()
        .ok_or_else(|| BenchError::MissingInput(format!("{}: run was not called", solver)))
}

/// Support size targeted by a sparsity-grid value: `floor(g · dim)`.
pub(crate) fn target_support(grid_value: f64, dim: usize) -> usize {
    (grid_value.max(0.0) * dim as f64).floor() as usize
}

/// One iterative hard thresholding step: gradient step of size `1 / L`,
/// hard threshold at `√(2λ / L)`, clip to `[-M, M]`.
pub(crate) fn iht_step(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    w: &DVector<f64>,
    lmbd: f64,
    lipschitz: f64,
    m: f64,
) -> DVector<f64> {
    let r = y - x * w;
    let mut next = w + x.tr_mul(&r) / lipschitz;
    hard_threshold_inplace(&mut next, (2.0 * lmbd / lipschitz).sqrt());
    clip_inplace(&mut next, m);
    next
}

/// Replace the non-zeros of `w` by the least squares fit on its support.
pub(crate) fn debias(x: &DMatrix<f64>, y: &DVector<f64>, w: &DVector<f64>) -> Result<DVector<f64>> {
    let s = support(w);
    if s.is_empty() {
        return Ok(w.clone());
    }
    lstsq_on_support(x, y, &s)
}

/// Guard against a zero Lipschitz constant (all-zero design).
pub(crate) fn step_lipschitz(problem: &Problem) -> f64 {
    if problem.lipschitz > 0.0 {
        problem.lipschitz
    } else {
        1.0
    }
}
