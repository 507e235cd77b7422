//! Stop once the monitored objective stops decreasing.

use super::{StoppingCriterion, StoppingStrategy};
use crate::error::{BenchError, Result};

/// Iteration counts grow by at least this factor between runs.
const ITERATION_GROWTH: f64 = 1.5;

/// Tolerances shrink by this factor between runs.
const TOLERANCE_DECAY: f64 = 0.3;

/// Stops after `patience` consecutive runs without a relative decrease of the
/// objective larger than `eps`.
#[derive(Debug, Clone)]
pub struct SufficientProgressCriterion {
    eps: f64,
    patience: usize,
    strategy: StoppingStrategy,
    best: f64,
    no_progress_steps: usize,
}

impl SufficientProgressCriterion {
    pub fn new(eps: f64, patience: usize, strategy: StoppingStrategy) -> Result<Self> {
        if !(eps > 0.0 && eps < 1.0) {
            return Err(BenchError::InvalidParameter(format!(
                "eps must lie in (0, 1), got {}",
                eps
            )));
        }
        if patience == 0 {
            return Err(BenchError::InvalidParameter(
                "patience must be at least 1".into(),
            ));
        }
        if strategy == StoppingStrategy::Grid {
            return Err(BenchError::InvalidParameter(
                "sufficient progress has no grid strategy".into(),
            ));
        }
        Ok(SufficientProgressCriterion {
            eps,
            patience,
            strategy,
            best: f64::INFINITY,
            no_progress_steps: 0,
        })
    }

    /// Default `eps = 1e-10` with the given patience and strategy.
    pub fn with_patience(patience: usize, strategy: StoppingStrategy) -> Self {
        SufficientProgressCriterion {
            eps: 1e-10,
            patience: patience.max(1),
            strategy: if strategy == StoppingStrategy::Grid {
                StoppingStrategy::Iteration
            } else {
                strategy
            },
            best: f64::INFINITY,
            no_progress_steps: 0,
        }
    }

    pub fn patience(&self) -> usize {
        self.patience
    }
}

impl StoppingCriterion for SufficientProgressCriterion {
    fn strategy(&self) -> StoppingStrategy {
        self.strategy
    }

    fn init_stop_val(&mut self) -> f64 {
        match self.strategy {
            StoppingStrategy::Tolerance => 1.0,
            StoppingStrategy::Callback => 1.0,
            _ => 0.0,
        }
    }

    fn check_convergence(&mut self, curve: &[f64]) -> (bool, f64) {
        let (first, last) = match (curve.first(), curve.last()) {
            (Some(&f), Some(&l)) => (f, l),
            _ => return (false, 0.0),
        };
        let scale = if first == 0.0 { 1.0 } else { first.abs() };

        // The first value only sets the reference.
        let delta = if self.best.is_finite() {
            (self.best - last) / scale
        } else {
            f64::INFINITY
        };

        if delta < self.eps {
            self.no_progress_steps += 1;
        } else {
            self.no_progress_steps = 0;
            self.best = last;
        }

        if self.no_progress_steps >= self.patience {
            return (true, 1.0);
        }
        let progress = if delta.is_finite() {
            (delta.max(self.eps).ln() / self.eps.ln()).clamp(0.0, 1.0)
        } else {
            0.0
        };
        (false, progress)
    }

    fn next_stop_val(&mut self, current: f64) -> f64 {
        match self.strategy {
            StoppingStrategy::Tolerance => current * TOLERANCE_DECAY,
            _ => (current + 1.0).max((current * ITERATION_GROWTH).floor()),
        }
    }

    fn reset(&mut self) {
        self.best = f64::INFINITY;
        self.no_progress_steps = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stops_after_patience_flat_runs() {
        let mut c = SufficientProgressCriterion::with_patience(3, StoppingStrategy::Iteration);
        let mut curve = vec![10.0];
        assert!(!c.check_convergence(&curve).0);
        curve.push(5.0);
        assert!(!c.check_convergence(&curve).0);
        for i in 0..3 {
            curve.push(5.0);
            let (stop, progress) = c.check_convergence(&curve);
            assert_eq!(stop, i == 2, "run {}", i);
            if stop {
                assert_eq!(progress, 1.0);
            }
        }
    }

    #[test]
    fn test_progress_resets_counter() {
        let mut c = SufficientProgressCriterion::with_patience(2, StoppingStrategy::Tolerance);
        let mut curve = vec![1.0];
        c.check_convergence(&curve);
        curve.push(1.0);
        assert!(!c.check_convergence(&curve).0);
        curve.push(0.5);
        assert!(!c.check_convergence(&curve).0);
        curve.push(0.5);
        assert!(!c.check_convergence(&curve).0);
        curve.push(0.5);
        assert!(c.check_convergence(&curve).0);
    }

    #[test]
    fn test_small_decreases_accumulate_against_best() {
        // Each step alone is below eps; together they clear it.
        let eps = 1e-10;
        let mut c = SufficientProgressCriterion::new(eps, 2, StoppingStrategy::Iteration).unwrap();
        let mut curve = vec![1.0];
        c.check_convergence(&curve);
        curve.push(1.0 - 0.6 * eps);
        assert!(!c.check_convergence(&curve).0);
        assert_eq!(c.no_progress_steps, 1);
        curve.push(1.0 - 1.2 * eps);
        assert!(!c.check_convergence(&curve).0);
        assert_eq!(c.no_progress_steps, 0);
        assert_eq!(c.best, 1.0 - 1.2 * eps);
    }

    #[test]
    fn test_reset_forgets_history() {
        let mut c = SufficientProgressCriterion::with_patience(2, StoppingStrategy::Iteration);
        let mut curve = vec![3.0, 3.0];
        c.check_convergence(&curve[..1]);
        c.check_convergence(&curve);
        assert_eq!(c.no_progress_steps, 1);
        c.reset();
        assert_eq!(c.no_progress_steps, 0);
        assert!(c.best.is_infinite());

        // A fresh curve is judged from scratch.
        curve = vec![7.0];
        assert_eq!(c.check_convergence(&curve), (false, 0.0));
        assert_eq!(c.best, 7.0);
    }

    #[test]
    fn test_schedules() {
        let mut it = SufficientProgressCriterion::with_patience(5, StoppingStrategy::Iteration);
        let mut v = it.init_stop_val();
        let mut seq = vec![v];
        for _ in 0..5 {
            v = it.next_stop_val(v);
            seq.push(v);
        }
        assert_eq!(seq, vec![0.0, 1.0, 2.0, 3.0, 4.0, 6.0]);

        let mut tol = SufficientProgressCriterion::with_patience(5, StoppingStrategy::Tolerance);
        let t0 = tol.init_stop_val();
        assert_eq!(t0, 1.0);
        assert!((tol.next_stop_val(t0) - 0.3).abs() < 1e-15);
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(SufficientProgressCriterion::new(0.0, 3, StoppingStrategy::Iteration).is_err());
        assert!(SufficientProgressCriterion::new(1e-6, 0, StoppingStrategy::Iteration).is_err());
        assert!(SufficientProgressCriterion::new(1e-6, 3, StoppingStrategy::Grid).is_err());
    }
}
