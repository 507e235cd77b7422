//! Big-M L0 problem solved to a requested relative gap.

use std::sync::Arc;
use std::time::Instant;

use nalgebra::DVector;
use serde::Deserialize;

use super::bnb::{branch_and_bound, BnbSettings, BnbStatus, Formulation};
use super::{last_iterate, problem, RunBudget, Solver, SolverResult};
use crate::error::Result;
use crate::objective::Problem;
use crate::stopping::{StoppingCriterion, StoppingStrategy, SufficientProgressCriterion};

const NAME: &str = "mip";

/// `½‖y - Xw‖² + λ Σ z_j` with `|w_j| <= M z_j`, `z ∈ {0, 1}ᵖ`, from a cold
/// start. The tolerance is the relative gap and `time_limit` bounds a run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Mip {
    pub time_limit: Option<f64>,
    #[serde(skip)]
    problem: Option<Arc<Problem>>,
    #[serde(skip)]
    w: Option<DVector<f64>>,
    #[serde(skip)]
    relative_gap: f64,
    #[serde(skip)]
    solve_time: f64,
}

impl Mip {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Solver for Mip {
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
        let gap = budget.tolerance(NAME)?;
        let p = problem(&self.problem, NAME)?;
        let start = Instant::now();

        let settings = BnbSettings {
            time_limit: self.time_limit,
            ..BnbSettings::with_gap(gap)
        };
        let formulation = Formulation::BigM {
            lmbd: p.lmbd,
            m: p.m,
        };
        let outcome = branch_and_bound(&p.x, &p.y, formulation, &settings, None)?;
        if outcome.status != BnbStatus::Optimal {
            log::warn!(
                "{}: stopped on {:?} at gap {:.2e}",
                NAME,
                outcome.status,
                outcome.relative_gap
            );
        }

        self.relative_gap = outcome.relative_gap;
        self.solve_time = start.elapsed().as_secs_f64();
        self.w = Some(outcome.w);
        Ok(())
    }

    fn result(&self) -> Result<SolverResult> {
        let w = last_iterate(&self.w, NAME)?;
        Ok(SolverResult::new(w.clone())
            .with_relative_gap(self.relative_gap)
            .with_solve_time(self.solve_time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::support;
    use crate::solvers::test_support::orthonormal_problem;

    #[test]
    fn test_loose_gap_still_feasible() {
        let mut s = Mip::new();
        s.set_objective(orthonormal_problem(&[3.0, 0.1, -2.0, 1.0], 0.1)).unwrap();

        s.run(RunBudget::Tolerance(1e-8)).unwrap();
        let exact = s.result().unwrap();
        assert_eq!(support(&exact.w), vec![0, 2, 3]);

        s.run(RunBudget::Tolerance(0.5)).unwrap();
        let loose = s.result().unwrap();
        assert!(loose.relative_gap.unwrap() <= 0.5);
        assert!(loose.w.amax() <= 10.0);
    }
}
