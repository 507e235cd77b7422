//! Best subset selection: least squares under a cardinality constraint.

use std::sync::Arc;
use std::time::Instant;

use nalgebra::DVector;
use serde::Deserialize;

use super::bnb::{branch_and_bound, BnbSettings, Formulation};
use super::{last_iterate, problem, RunBudget, Solver, SolverResult};
use crate::error::Result;
use crate::linalg::{inf_norm, lstsq};
use crate::objective::Problem;
use crate::stopping::{RunOnGridCriterion, StoppingCriterion};

const NAME: &str = "l0constraint";

/// Gap at which a subset is declared optimal.
const GAP_TOL: f64 = 1e-8;

/// `min ½‖y - Xw‖²  s.t.  ‖w‖₀ <= k`, `|w| <= 10‖lstsq(X, y)‖∞`, run for
/// every `k` in `0..=n_samples`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct L0Constraint {
    #[serde(skip)]
    problem: Option<Arc<Problem>>,
    #[serde(skip)]
    m: f64,
    #[serde(skip)]
    w: Option<DVector<f64>>,
    #[serde(skip)]
    k: usize,
    #[serde(skip)]
    solve_time: f64,
}

impl L0Constraint {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Solver for L0Constraint {
    fn name(&self) -> &str {
        NAME
    }

    fn stopping_criterion(&self) -> Box<dyn StoppingCriterion> {
        let n = self.problem.as_ref().map_or(0, |p| p.n_samples());
        let grid = (0..=n).map(|k| k as f64).collect();
        Box::new(RunOnGridCriterion::new(grid).unwrap_or_default())
    }

    fn set_objective(&mut self, problem: Arc<Problem>) -> Result<()> {
        let m = 10.0 * inf_norm(&lstsq(&problem.x, &problem.y)?);
        // A zero least squares fit leaves nothing to select.
        self.m = if m > 0.0 { m } else { 1.0 };
        self.problem = Some(problem);
        self.w = None;
        Ok(())
    }

    fn run(&mut self, budget: RunBudget<'_>) -> Result<()> {
        let k = budget.grid_value(NAME)?.max(0.0).round() as usize;
        let p = problem(&self.problem, NAME)?;
        let start = Instant::now();

        let w = if k == 0 {
            DVector::zeros(p.n_features())
        } else {
            let formulation = Formulation::Cardinality { k, m: self.m };
            branch_and_bound(&p.x, &p.y, formulation, &BnbSettings::with_gap(GAP_TOL), None)?.w
        };

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
