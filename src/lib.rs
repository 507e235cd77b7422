//! # sparsebench
//!
//! Benchmark plug-ins for sparse regression: datasets, an objective that
//! scores candidate solutions, and L0/L1 solvers driven by stopping criteria.
//!
//! ## Quick Start
//!
//! ```ignore
//! use sparsebench::prelude::*;
//!
//! let data = Simulated::default().get_data()?;
//! let problem = Objective::default().set_data(data)?;
//!
//! let mut solver = Ista::new(false, true, false);
//! let records = run_one("simulated", &problem, &mut solver, &RunOptions::default())?;
//! println!("final objective: {}", records.last().unwrap().evaluation.value);
//! ```
//!
//! ## Stop values
//!
//! A solver never decides on its own how long to run. Its stopping criterion
//! produces a sequence of stop values and the driver runs the solver once per
//! value:
//!
//! - **Iteration** and **Tolerance** criteria stop once the objective stops
//!   decreasing
//! - **Grid** criteria walk a fixed list of checkpoints, such as target
//!   sparsity levels
//! - **Callback** solvers run once and report their iterate every iteration
//!
//! ## Solvers
//!
//! ### Convex
//! - Proximal gradient: `ista`, `fista`
//! - Coordinate descent paths: `lasso`, `glm` (Lasso, ElasticNet, MCP), `enet`
//! - Greedy: `omp`, `lars`
//!
//! ### Non-convex
//! - Hard thresholding: `iht`, `iht_warm`
//! - L0L2 coordinate descent with cross-validation: `l0cd`
//! - Branch-and-bound on Clarabel relaxations: `l0bnb`, `mip`,
//!   `l0constraint`, `l0l2reg`

pub mod config;
pub mod dataset;
pub mod error;
pub mod linalg;
pub mod metrics;
pub mod objective;
pub mod qp;
pub mod runner;
pub mod solvers;
pub mod sparse;
pub mod stopping;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use sparsebench::prelude::*;
/// ```
pub mod prelude {
    // Datasets
    pub use crate::dataset::{
        Bourguignon, DataBundle, Dataset, Deconvolution, Libsvm, Ode, OdeSystem, Portfolio,
        Simulated, Tabular,
    };

    // Objective
    pub use crate::objective::{Evaluation, Objective, Problem};

    // Solvers
    pub use crate::solvers::{
        ElasticNetPath, Fista, Glm, GlmEstimator, Iht, IhtWarm, Ista, L0Bnb, L0Cd, L0Constraint,
        L0L2Reg, Lars, LassoPath, Mip, Omp, RunBudget, Solver, SolverResult, ZeroSolver,
    };

    // Stopping criteria
    pub use crate::stopping::{
        RunOnGridCriterion, StoppingCriterion, StoppingStrategy, SufficientProgressCriterion,
    };

    // Driver
    pub use crate::config::BenchConfig;
    pub use crate::runner::{run_benchmark, run_one, RunOptions, RunRecord};

    // Errors
    pub use crate::error::{BenchError, Result};
}

// Re-export main types at crate root
pub use error::{BenchError, Result};
pub use objective::{Objective, Problem};
pub use solvers::{Solver, SolverResult};
