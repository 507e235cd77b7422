//! Least-angle regression.

use std::sync::Arc;
use std::time::Instant;

use nalgebra::{DMatrix, DVector};
use serde::Deserialize;

use super::{debias, last_iterate, problem, target_support, RunBudget, Solver, SolverResult};
use crate::error::Result;
use crate::objective::Problem;
use crate::stopping::{RunOnGridCriterion, StoppingCriterion};

const NAME: &str = "lars";

/// `k` steps of least-angle regression without intercept.
///
/// Each step adds the inactive column most correlated with the residual and
/// moves along the equiangular direction of the active set until another
/// column becomes as correlated; the last step stops at that point too,
/// or at the least squares fit when no inactive column is left.
pub fn least_angle_regression(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    k: usize,
) -> Result<DVector<f64>> {
    let p = x.ncols();
    let k = k.min(p).min(x.nrows());
    let mut beta = DVector::zeros(p);
    let mut active: Vec<usize> = Vec::with_capacity(k);
    let tiny = 1e-12 * y.norm().max(1.0);

    for _ in 0..k {
        let c = x.tr_mul(&(y - x * &beta));
        let next = (0..p)
            .filter(|j| !active.contains(j))
            .max_by(|&a, &b| c[a].abs().total_cmp(&c[b].abs()));
        let j = match next {
            Some(j) if c[j].abs() > tiny => j,
            _ => break,
        };
        active.push(j);
        let cmax = c[j].abs();

        // Equiangular direction of the sign-adjusted active columns.
        let signs: Vec<f64> = active.iter().map(|&i| c[i].signum()).collect();
        let xa = DMatrix::from_fn(x.nrows(), active.len(), |r, a| x[(r, active[a])] * signs[a]);
        let gram = xa.tr_mul(&xa);
        let g = match gram.cholesky() {
            Some(chol) => chol.solve(&DVector::from_element(active.len(), 1.0)),
            None => {
                log::debug!("{}: collinear active set at {} atoms", NAME, active.len());
                active.pop();
                break;
            }
        };
        let aa = 1.0 / g.sum().sqrt();
        let u = &xa * (&g * aa);
        let a = x.tr_mul(&u);

        let mut gamma = cmax / aa;
        for i in (0..p).filter(|i| !active.contains(i)) {
            for cand in [(cmax - c[i]) / (aa - a[i]), (cmax + c[i]) / (aa + a[i])] {
                if cand > tiny && cand < gamma {
                    gamma = cand;
                }
            }
        }

        for (idx, &i) in active.iter().enumerate() {
            beta[i] += gamma * aa * g[idx] * signs[idx];
        }
    }
    Ok(beta)
}

/// LARS with `k = floor(g · n_features)` steps.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Lars {
    /// Refit the support by least squares.
    pub debiasing_step: bool,
    #[serde(skip)]
    problem: Option<Arc<Problem>>,
    #[serde(skip)]
    w: Option<DVector<f64>>,
    #[serde(skip)]
    k: usize,
    #[serde(skip)]
    solve_time: f64,
}

impl Lars {
    pub fn new(debiasing_step: bool) -> Self {
        Lars {
            debiasing_step,
            ..Default::default()
        }
    }
}

impl Solver for Lars {
    fn name(&self) -> &str {
        NAME
    }

    fn label(&self) -> String {
        format!("lars[debiasing_step={}]", self.debiasing_step)
    }

    fn stopping_criterion(&self) -> Box<dyn StoppingCriterion> {
        Box::new(RunOnGridCriterion::linspace(0.0, 0.3, 10).unwrap_or_default())
    }

    fn set_objective(&mut self, problem: Arc<Problem>) -> Result<()> {
        self.problem = Some(problem);
        self.w = None;
        Ok(())
    }

    fn run(&mut self, budget: RunBudget<'_>) -> Result<()> {
        let g = budget.grid_value(NAME)?;
        let p = problem(&self.problem, NAME)?;
        let start = Instant::now();
        let k = target_support(g, p.n_features());
        let mut w = if k == 0 {
            DVector::zeros(p.n_features())
        } else {
            least_angle_regression(&p.x, &p.y, k)?
        };
        if self.debiasing_step {
            w = debias(&p.x, &p.y, &w)?;
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
