//! Benchmark driver: runs every solver on every dataset along the stop values
//! of its stopping criterion and records one evaluation per run.

use std::sync::Arc;
use std::time::Instant;

use nalgebra::DVector;
use serde::Deserialize;

use crate::dataset::Dataset;
use crate::error::{BenchError, Result};
use crate::objective::{Evaluation, Objective, Problem};
use crate::solvers::{RunBudget, Solver, SolverResult};
use crate::stopping::{StoppingCriterion, StoppingStrategy};

/// Limits applied to each solver × dataset pair.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunOptions {
    pub max_runs: usize,
    /// Wall-clock budget in seconds.
    pub timeout_secs: Option<f64>,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            max_runs: 100,
            timeout_secs: None,
        }
    }
}

impl RunOptions {
    fn timed_out(&self, start: &Instant) -> bool {
        self.timeout_secs
            .is_some_and(|limit| start.elapsed().as_secs_f64() >= limit)
    }
}

/// One recorded run.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub dataset: String,
    pub solver: String,
    pub run: usize,
    pub stop_val: f64,
    pub progress: f64,
    /// Seconds spent in this run, or since the start for callback solvers.
    pub elapsed: f64,
    pub evaluation: Evaluation,
}

/// Run one solver on one problem.
///
/// Returns no records when the solver asks to be skipped.
pub fn run_one(
    dataset: &str,
    problem: &Arc<Problem>,
    solver: &mut dyn Solver,
    options: &RunOptions,
) -> Result<Vec<RunRecord>> {
    if options.max_runs == 0 {
        return Err(BenchError::InvalidParameter(
            "max_runs must be at least 1".into(),
        ));
    }
    if let Some(reason) = solver.skip(problem) {
        log::info!("{} on {}: skipped ({})", solver.label(), dataset, reason);
        return Ok(Vec::new());
    }
    solver.set_objective(Arc::clone(problem))?;
    let mut criterion = solver.stopping_criterion();
    criterion.reset();
    let label = solver.label();

    let records = match criterion.strategy() {
        StoppingStrategy::Callback => {
            run_with_callback(dataset, &label, problem, solver, criterion.as_mut(), options)?
        }
        strategy => run_with_stop_values(
            dataset,
            &label,
            problem,
            solver,
            criterion.as_mut(),
            strategy,
            options,
        )?,
    };

    if let Some(last) = records.last() {
        log::info!(
            "{} on {}: {} runs, objective {:.6e}, {} non-zeros",
            label,
            dataset,
            records.len(),
            last.evaluation.value,
            last.evaluation.n_nnz
        );
    }
    Ok(records)
}

fn run_with_stop_values(
    dataset: &str,
    label: &str,
    problem: &Problem,
    solver: &mut dyn Solver,
    criterion: &mut dyn StoppingCriterion,
    strategy: StoppingStrategy,
    options: &RunOptions,
) -> Result<Vec<RunRecord>> {
    let start = Instant::now();
    let mut records = Vec::new();
    let mut curve = Vec::new();
    let mut stop_val = criterion.init_stop_val();

    for run in 0..options.max_runs {
        let run_start = Instant::now();
        solver.run(RunBudget::from_stop_val(strategy, stop_val)?)?;
        let elapsed = run_start.elapsed().as_secs_f64();

        let evaluation = Objective::compute(problem, &solver.result()?)?;
        curve.push(evaluation.value);
        let (stop, progress) = criterion.check_convergence(&curve);
        log::debug!(
            "{} on {}: run {} at {} -> {:.6e}",
            label,
            dataset,
            run,
            stop_val,
            evaluation.value
        );
        records.push(RunRecord {
            dataset: dataset.to_string(),
            solver: label.to_string(),
            run,
            stop_val,
            progress,
            elapsed,
            evaluation,
        });

        if stop {
            break;
        }
        if options.timed_out(&start) {
            log::warn!("{} on {}: timed out after {} runs", label, dataset, run + 1);
            break;
        }
        // Grid criteria track their own cursor, so always advance them.
        let scheduled = criterion.next_stop_val(stop_val);
        stop_val = solver.next_stop_val(stop_val).unwrap_or(scheduled);
    }
    Ok(records)
}

fn run_with_callback(
    dataset: &str,
    label: &str,
    problem: &Problem,
    solver: &mut dyn Solver,
    criterion: &mut dyn StoppingCriterion,
    options: &RunOptions,
) -> Result<Vec<RunRecord>> {
    let start = Instant::now();
    let mut records = Vec::new();
    let mut curve = Vec::new();
    let mut failure: Option<BenchError> = None;
    let mut stop_val = criterion.init_stop_val();
    let mut calls = 0usize;

    let mut callback = |w: &DVector<f64>| -> bool {
        calls += 1;
        if (calls as f64) < stop_val {
            return true;
        }
        let evaluation = match Objective::compute(problem, &SolverResult::new(w.clone())) {
            Ok(evaluation) => evaluation,
            Err(e) => {
                failure = Some(e);
                return false;
            }
        };
        curve.push(evaluation.value);
        let (stop, progress) = criterion.check_convergence(&curve);
        records.push(RunRecord {
            dataset: dataset.to_string(),
            solver: label.to_string(),
            run: records.len(),
            stop_val,
            progress,
            elapsed: start.elapsed().as_secs_f64(),
            evaluation,
        });
        if stop || records.len() >= options.max_runs || options.timed_out(&start) {
            return false;
        }
        stop_val = criterion.next_stop_val(stop_val);
        true
    };
    solver.run(RunBudget::Callback(&mut callback))?;

    match failure {
        Some(e) => Err(e),
        None => Ok(records),
    }
}

/// Run every solver on every dataset.
///
/// A dataset that fails to load aborts the benchmark; a failing solver is
/// logged and the benchmark moves on.
pub fn run_benchmark(
    objective: &Objective,
    datasets: &[Box<dyn Dataset>],
    solvers: &mut [Box<dyn Solver>],
    options: &RunOptions,
) -> Result<Vec<RunRecord>> {
    let mut records = Vec::new();
    for dataset in datasets {
        let label = dataset.label();
        let problem = objective.set_data(dataset.get_data()?)?;
        log::info!(
            "dataset {}: {} samples, {} features",
            label,
            problem.n_samples(),
            problem.n_features()
        );
        for solver in solvers.iter_mut() {
            match run_one(&label, &problem, solver.as_mut(), options) {
                Ok(mut runs) => records.append(&mut runs),
                Err(e) => log::warn!("{} on {} failed: {}", solver.label(), label, e),
            }
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solvers::test_support::orthonormal_problem;
    use crate::solvers::{Iht, Omp, ZeroSolver};

    #[test]
    fn test_progress_criterion_stops_on_flat_curve() {
        let problem = orthonormal_problem(&[1.0, -2.0], 0.1);
        let mut solver = ZeroSolver::new();
        let records = run_one("toy", &problem, &mut solver, &RunOptions::default()).unwrap();
        // One reference value, then `patience` flat runs.
        assert_eq!(records.len(), 6);
        assert_eq!(records.last().unwrap().progress, 1.0);
        let stop_vals: Vec<f64> = records.iter().map(|r| r.stop_val).collect();
        assert_eq!(stop_vals, vec![0.0, 1.0, 2.0, 3.0, 4.0, 6.0]);
    }

    #[test]
    fn test_grid_criterion_visits_every_checkpoint() {
        let problem = orthonormal_problem(&[3.0, 0.1, -2.0, 1.0], 0.1);
        let mut solver = Omp::new();
        let records = run_one("toy", &problem, &mut solver, &RunOptions::default()).unwrap();
        assert_eq!(records.len(), 10);
        assert_eq!(records[9].progress, 1.0);
        assert!(records.windows(2).all(|w| w[0].stop_val < w[1].stop_val));
    }

    #[test]
    fn test_max_runs_caps_records() {
        let problem = orthonormal_problem(&[3.0, 0.1, -2.0, 1.0], 0.1);
        let options = RunOptions {
            max_runs: 3,
            ..Default::default()
        };
        let records = run_one("toy", &problem, &mut Omp::new(), &options).unwrap();
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_timeout_stops_before_max_runs() {
        let problem = orthonormal_problem(&[3.0, 0.1, -2.0, 1.0], 0.1);
        let options = RunOptions {
            max_runs: 50,
            timeout_secs: Some(1e-12),
        };
        // Every run outlasts the budget, so each pair stops after one record.
        let grid = run_one("toy", &problem, &mut Omp::new(), &options).unwrap();
        assert_eq!(grid.len(), 1);
        let callback = run_one("toy", &problem, &mut Iht::new(), &options).unwrap();
        assert_eq!(callback.len(), 1);
        assert!(grid[0].progress < 1.0);
    }

    #[test]
    fn test_callback_records_on_schedule() {
        let problem = orthonormal_problem(&[3.0, 0.1, -2.0, 1.0], 0.1);
        let mut solver = Iht::new();
        let records = run_one("toy", &problem, &mut solver, &RunOptions::default()).unwrap();
        assert!(records.len() >= 6);
        assert_eq!(records[0].stop_val, 1.0);
        assert_eq!(records[1].stop_val, 2.0);
        assert_eq!(records.last().unwrap().progress, 1.0);
        // IHT with λ = 0.3 keeps atoms with y²/2 > 0.3.
        assert_eq!(records.last().unwrap().evaluation.n_nnz, 3);
    }
}
