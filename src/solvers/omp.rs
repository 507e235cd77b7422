//! Orthogonal matching pursuit.

use std::sync::Arc;
use std::time::Instant;

use nalgebra::{DMatrix, DVector};
use serde::Deserialize;

use super::{last_iterate, problem, target_support, RunBudget, Solver, SolverResult};
use crate::error::Result;
use crate::linalg::lstsq_on_support;
use crate::objective::Problem;
use crate::stopping::{RunOnGridCriterion, StoppingCriterion};

const NAME: &str = "omp";

/// Greedy selection of `k` atoms, refitting by least squares after each.
///
/// Stops early once the residual is orthogonal to every remaining column.
pub fn orthogonal_matching_pursuit(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    k: usize,
) -> Result<DVector<f64>> {
    let k = k.min(x.ncols()).min(x.nrows());
    let mut selected: Vec<usize> = Vec::with_capacity(k);
    let mut w = DVector::zeros(x.ncols());
    let mut r = y.clone();
    let tiny = 1e-12 * y.norm().max(1.0);

    while selected.len() < k {
        let corr = x.tr_mul(&r);
        let best = corr
            .iter()
            .enumerate()
            .filter(|(j, _)| !selected.contains(j))
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()));
        match best {
            Some((j, c)) if c.abs() > tiny => selected.push(j),
            _ => break,
        }
        selected.sort_unstable();
        w = lstsq_on_support(x, y, &selected)?;
        r = y - x * &w;
    }
    Ok(w)
}

/// OMP with `k = floor(g · n_features)` atoms.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Omp {
    #[serde(skip)]
    problem: Option<Arc<Problem>>,
    #[serde(skip)]
    w: Option<DVector<f64>>,
    #[serde(skip)]
    k: usize,
    #[serde(skip)]
    solve_time: f64,
}

impl Omp {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Solver for Omp {
    fn name(&self) -> &str {
        NAME
    }

    fn stopping_criterion(&self) -> Box<dyn StoppingCriterion> {
        Box::new(RunOnGridCriterion::default())
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
        let w = if k == 0 {
            DVector::zeros(p.n_features())
        } else {
            orthogonal_matching_pursuit(&p.x, &p.y, k)?
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::l0_norm;

    #[test]
    fn test_recovers_exact_sparse_signal() {
        let x = DMatrix::from_row_slice(
            4,
            3,
            &[1.0, 0.2, 0.0, 0.0, 1.0, 0.3, 0.1, 0.0, 1.0, 0.5, 0.5, 0.5],
        );
        let w_true = DVector::from_vec(vec![2.0, 0.0, -1.0]);
        let y = &x * &w_true;
        let w = orthogonal_matching_pursuit(&x, &y, 2).unwrap();
        assert!((w - w_true).norm() < 1e-10);
    }

    #[test]
    fn test_stops_when_residual_vanishes() {
        let x = DMatrix::identity(3, 3);
        let y = DVector::from_vec(vec![0.0, 5.0, 0.0]);
        let w = orthogonal_matching_pursuit(&x, &y, 3).unwrap();
        assert_eq!(l0_norm(&w), 1);
    }
}
