//! Lasso, ElasticNet and MCP regularisation paths stopped at a target
//! support size.

use std::sync::Arc;
use std::time::Instant;

use nalgebra::DVector;
use serde::Deserialize;

use super::cd::{path_until_support, ElasticNet, Mcp, L1};
use super::{debias, last_iterate, problem, target_support, RunBudget, Solver, SolverResult};
use crate::error::{BenchError, Result};
use crate::linalg::geomspace;
use crate::objective::Problem;
use crate::stopping::{RunOnGridCriterion, StoppingCriterion};

const NAME: &str = "glm";

/// L1 ratio of the ElasticNet estimator and concavity of MCP.
const ENET_L1_RATIO: f64 = 0.5;
const MCP_GAMMA: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlmEstimator {
    #[default]
    Lasso,
    Enet,
    Mcp,
}

/// Path over `α` from `‖Xᵀy‖∞ / n` down to `alpha_ratio` times that, with
/// `k = floor(g · n_features)`. The ElasticNet path is scaled by 2 so that
/// its L1 part starts at the same weight as the Lasso's.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Glm {
    pub estimator: GlmEstimator,
    pub max_iter: usize,
    pub alpha_num: usize,
    pub alpha_ratio: f64,
    pub debiasing_step: bool,
    #[serde(skip)]
    problem: Option<Arc<Problem>>,
    #[serde(skip)]
    alphas: Vec<f64>,
    #[serde(skip)]
    w: Option<DVector<f64>>,
    #[serde(skip)]
    k: usize,
    #[serde(skip)]
    solve_time: f64,
}

impl Default for Glm {
    fn default() -> Self {
        Glm {
            estimator: GlmEstimator::Lasso,
            max_iter: 1_000,
            alpha_num: 1_000,
            alpha_ratio: 1e-10,
            debiasing_step: false,
            problem: None,
            alphas: Vec::new(),
            w: None,
            k: 0,
            solve_time: 0.0,
        }
    }
}

impl Glm {
    pub fn new(estimator: GlmEstimator, debiasing_step: bool) -> Self {
        Glm {
            estimator,
            debiasing_step,
            ..Default::default()
        }
    }
}

impl Solver for Glm {
    fn name(&self) -> &str {
        NAME
    }

    fn label(&self) -> String {
        format!(
            "glm[estimator={:?},debiasing_step={}]",
            self.estimator, self.debiasing_step
        )
    }

    fn stopping_criterion(&self) -> Box<dyn StoppingCriterion> {
        Box::new(RunOnGridCriterion::linspace(0.0, 0.3, 10).unwrap_or_default())
    }

    fn set_objective(&mut self, problem: Arc<Problem>) -> Result<()> {
        if !(self.alpha_ratio > 0.0 && self.alpha_ratio < 1.0) || self.alpha_num == 0 {
            return Err(BenchError::InvalidParameter(format!(
                "{}: alpha_ratio must lie in (0, 1) and alpha_num be positive",
                NAME
            )));
        }
        let alpha_max = problem.xty_inf() / problem.n_samples().max(1) as f64;
        let mut alphas = geomspace(alpha_max, alpha_max * self.alpha_ratio, self.alpha_num);
        if self.estimator == GlmEstimator::Enet {
            for a in alphas.iter_mut() {
                *a *= 2.0;
            }
        }
        self.alphas = alphas;
        self.problem = Some(problem);
        self.w = None;
        Ok(())
    }

    fn run(&mut self, budget: RunBudget<'_>) -> Result<()> {
        let g = budget.grid_value(NAME)?;
        let p = problem(&self.problem, NAME)?;
        let start = Instant::now();

        let k = target_support(g, p.n_features());
        let (x, y, alphas) = (&p.x, &p.y, &self.alphas);
        let mut w = match self.estimator {
            GlmEstimator::Lasso => {
                path_until_support(x, y, alphas, |alpha| L1 { alpha }, k, self.max_iter)
            }
            GlmEstimator::Enet => path_until_support(
                x,
                y,
                alphas,
                |alpha| ElasticNet {
                    alpha,
                    l1_ratio: ENET_L1_RATIO,
                },
                k,
                self.max_iter,
            ),
            GlmEstimator::Mcp => path_until_support(
                x,
                y,
                alphas,
                |alpha| Mcp {
                    alpha,
                    gamma: MCP_GAMMA,
                },
                k,
                self.max_iter,
            ),
        };
        if self.debiasing_step {
            w = debias(x, y, &w)?;
        }

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::support;
    use crate::solvers::test_support::orthonormal_problem;

    #[test]
    fn test_every_estimator_selects_largest_atoms() {
        for estimator in [GlmEstimator::Lasso, GlmEstimator::Enet, GlmEstimator::Mcp] {
            let mut s = Glm {
                alpha_num: 200,
                ..Glm::new(estimator, true)
            };
            s.set_objective(orthonormal_problem(&[3.0, 0.1, -2.0, 1.0], 0.1)).unwrap();
            s.run(RunBudget::GridValue(0.5)).unwrap();
            let r = s.result().unwrap();
            assert_eq!(r.k, Some(2), "{:?}", estimator);
            assert_eq!(support(&r.w), vec![0, 2], "{:?}", estimator);
            assert!((r.w[0] - 3.0).abs() < 1e-10, "{:?}", estimator);
        }
    }

    #[test]
    fn test_rejects_bad_ratio() {
        let mut s = Glm {
            alpha_ratio: 2.0,
            ..Default::default()
        };
        assert!(s.set_objective(orthonormal_problem(&[1.0], 0.1)).is_err());
    }
}
