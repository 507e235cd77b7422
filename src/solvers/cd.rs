//! Cyclic coordinate descent on `(1/2n)‖y - Xw‖² + penalty(w)` for separable
//! penalties given by their proximal operator.

use nalgebra::{DMatrix, DVector};

use crate::linalg::{column_sq_norms, l0_norm, soft_threshold};

/// A separable penalty.
pub trait Penalty {
    /// Penalty value at `w`.
    fn value(&self, w: &DVector<f64>) -> f64;

    /// Proximal operator of `stepsize · penalty` for one coordinate.
    fn prox_op(&self, value: f64, stepsize: f64) -> f64;
}

/// `α‖w‖₁`.
#[derive(Debug, Clone, Copy)]
pub struct L1 {
    pub alpha: f64,
}

impl Penalty for L1 {
    fn value(&self, w: &DVector<f64>) -> f64 {
        self.alpha * w.iter().map(|v| v.abs()).sum::<f64>()
    }

    fn prox_op(&self, value: f64, stepsize: f64) -> f64 {
        soft_threshold(value, self.alpha * stepsize)
    }
}

/// `α(ρ‖w‖₁ + (1 - ρ)/2 ‖w‖²)` with `ρ` the L1 ratio.
#[derive(Debug, Clone, Copy)]
pub struct ElasticNet {
    pub alpha: f64,
    pub l1_ratio: f64,
}

impl Penalty for ElasticNet {
    fn value(&self, w: &DVector<f64>) -> f64 {
        let l1: f64 = w.iter().map(|v| v.abs()).sum();
        self.alpha * (self.l1_ratio * l1 + 0.5 * (1.0 - self.l1_ratio) * w.norm_squared())
    }

    fn prox_op(&self, value: f64, stepsize: f64) -> f64 {
        soft_threshold(value, self.alpha * self.l1_ratio * stepsize)
            / (1.0 + stepsize * self.alpha * (1.0 - self.l1_ratio))
    }
}

/// Minimax concave penalty with concavity `γ`.
#[derive(Debug, Clone, Copy)]
pub struct Mcp {
    pub alpha: f64,
    pub gamma: f64,
}

impl Penalty for Mcp {
    fn value(&self, w: &DVector<f64>) -> f64 {
        let (a, g) = (self.alpha, self.gamma);
        w.iter()
            .map(|v| {
                let v = v.abs();
                if v <= g * a {
                    a * v - v * v / (2.0 * g)
                } else {
                    0.5 * g * a * a
                }
            })
            .sum()
    }

    fn prox_op(&self, value: f64, stepsize: f64) -> f64 {
        let tau = self.alpha * stepsize;
        let g = self.gamma / stepsize;
        if value.abs() <= tau {
            0.0
        } else if g <= 1.0 || value.abs() > g * tau {
            value
        } else {
            value.signum() * (value.abs() - tau) / (1.0 - 1.0 / g)
        }
    }
}

/// `l0‖w‖₀ + l2‖w‖²`.
#[derive(Debug, Clone, Copy)]
pub struct L0L2 {
    pub l0: f64,
    pub l2: f64,
}

impl Penalty for L0L2 {
    fn value(&self, w: &DVector<f64>) -> f64 {
        self.l0 * l0_norm(w) as f64 + self.l2 * w.norm_squared()
    }

    fn prox_op(&self, value: f64, stepsize: f64) -> f64 {
        let shrink = 1.0 + 2.0 * stepsize * self.l2;
        if value * value > 2.0 * stepsize * self.l0 * shrink {
            value / shrink
        } else {
            0.0
        }
    }
}

/// Outcome of [`coordinate_descent`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CdOutcome {
    pub epochs: usize,
    pub converged: bool,
}

/// Minimise `(1/2n)‖y - Xw‖² + penalty(w)` in place, starting from `w`.
///
/// Stops when an epoch moves no coordinate by more than `tol · max(1, ‖w‖∞)`.
pub fn coordinate_descent<P: Penalty>(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    penalty: &P,
    w: &mut DVector<f64>,
    max_epochs: usize,
    tol: f64,
) -> CdOutcome {
    let n = x.nrows().max(1) as f64;
    let lipschitz = column_sq_norms(x) / n;
    let mut r = y - x * &*w;

    for epoch in 1..=max_epochs {
        let mut max_delta: f64 = 0.0;
        for j in 0..x.ncols() {
            if lipschitz[j] == 0.0 {
                continue;
            }
            let col = x.column(j);
            let grad_j = -col.dot(&r) / n;
            let old = w[j];
            let new = penalty.prox_op(old - grad_j / lipschitz[j], 1.0 / lipschitz[j]);
            if new != old {
                r.axpy(old - new, &col, 1.0);
                w[j] = new;
                max_delta = max_delta.max((new - old).abs());
            }
        }
        if max_delta <= tol * w.amax().max(1.0) {
            return CdOutcome {
                epochs: epoch,
                converged: true,
            };
        }
    }
    CdOutcome {
        epochs: max_epochs,
        converged: false,
    }
}

/// Warm-started path over decreasing `alphas`, returning the last solution
/// with at most `k` non-zeros.
pub fn path_until_support<P, F>(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    alphas: &[f64],
    penalty_at: F,
    k: usize,
    max_epochs: usize,
) -> DVector<f64>
where
    P: Penalty,
    F: Fn(f64) -> P,
{
    let mut w = DVector::zeros(x.ncols());
    for &alpha in alphas {
        let previous = w.clone();
        let outcome = coordinate_descent(x, y, &penalty_at(alpha), &mut w, max_epochs, 1e-8);
        if !outcome.converged {
            log::warn!(
                "coordinate descent: no convergence in {} epochs at alpha = {:.3e}",
                max_epochs,
                alpha
            );
        }
        if l0_norm(&w) > k {
            return previous;
        }
    }
    w
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prox_operators() {
        let l1 = L1 { alpha: 1.0 };
        assert_eq!(l1.prox_op(3.0, 0.5), 2.5);
        assert_eq!(l1.prox_op(-0.2, 0.5), 0.0);

        let enet = ElasticNet {
            alpha: 1.0,
            l1_ratio: 0.5,
        };
        assert!((enet.prox_op(3.0, 1.0) - 2.5 / 1.5).abs() < 1e-15);

        let mcp = Mcp {
            alpha: 1.0,
            gamma: 3.0,
        };
        assert_eq!(mcp.prox_op(0.5, 1.0), 0.0);
        assert_eq!(mcp.prox_op(5.0, 1.0), 5.0);
        assert!((mcp.prox_op(2.0, 1.0) - 1.5).abs() < 1e-15);

        // Keep iff v² > 2t·l0·(1 + 2t·l2), then shrink by 1 + 2t·l2.
        let l0l2 = L0L2 { l0: 1.0, l2: 0.5 };
        assert_eq!(l0l2.prox_op(2.0, 1.0), 0.0);
        assert_eq!(l0l2.prox_op(3.0, 1.0), 1.5);
        assert_eq!(L0L2 { l0: 0.5, l2: 0.0 }.prox_op(-1.5, 1.0), -1.5);
    }

    #[test]
    fn test_mcp_value_is_flat_beyond_gamma_alpha() {
        let mcp = Mcp {
            alpha: 1.0,
            gamma: 3.0,
        };
        let a = mcp.value(&DVector::from_vec(vec![3.0]));
        let b = mcp.value(&DVector::from_vec(vec![10.0]));
        assert_eq!(a, b);
        assert_eq!(a, 1.5);
    }

    #[test]
    fn test_lasso_on_orthogonal_design() {
        // n = 4, columns of squared norm 4: w_j = soft(xⱼᵀy / 4, α).
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 1.0, 1.0, -1.0, 1.0, 1.0, 1.0, -1.0]);
        let y = DVector::from_vec(vec![3.0, 1.0, 3.0, 1.0]);
        let mut w = DVector::zeros(2);
        let out = coordinate_descent(&x, &y, &L1 { alpha: 0.5 }, &mut w, 100, 1e-12);
        assert!(out.converged);
        assert!((w[0] - 1.5).abs() < 1e-12);
        assert!((w[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_path_stops_before_exceeding_k() {
        let x = DMatrix::identity(3, 3);
        let y = DVector::from_vec(vec![3.0, 0.3, -2.0]);
        let alpha_max = 1.0;
        let alphas = crate::linalg::geomspace(alpha_max, alpha_max * 1e-6, 100);
        let w = path_until_support(&x, &y, &alphas, |alpha| L1 { alpha }, 1, 100);
        assert_eq!(l0_norm(&w), 1);
        assert!(w[0] > 0.0);
    }
}
