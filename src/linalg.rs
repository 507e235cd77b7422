//! Dense linear algebra helpers shared by datasets, the objective and solvers.

use nalgebra::{DMatrix, DVector};

use crate::error::{BenchError, Result};

/// Singular values below `SVD_EPS * max_sv` are treated as zero in least squares.
const SVD_EPS: f64 = 1e-12;

/// Number of power iterations used to estimate the spectral norm.
const POWER_ITERS: usize = 500;

/// `‖v‖∞`.
pub fn inf_norm(v: &DVector<f64>) -> f64 {
    v.amax()
}

/// `‖v‖₁`.
pub fn l1_norm(v: &DVector<f64>) -> f64 {
    v.iter().map(|x| x.abs()).sum()
}

/// Number of exact non-zeros.
pub fn l0_norm(v: &DVector<f64>) -> usize {
    v.iter().filter(|&&x| x != 0.0).count()
}

/// Indices of the exact non-zeros, in increasing order.
pub fn support(v: &DVector<f64>) -> Vec<usize> {
    v.iter()
        .enumerate()
        .filter(|(_, &x)| x != 0.0)
        .map(|(i, _)| i)
        .collect()
}

/// Squared spectral norm `‖X‖₂²`, i.e. the Lipschitz constant of the
/// gradient of `½‖y - Xw‖²`.
///
/// Uses power iteration on `XᵀX` started from the all-ones vector.
pub fn squared_spectral_norm(x: &DMatrix<f64>) -> f64 {
    let p = x.ncols();
    if p == 0 || x.nrows() == 0 {
        return 0.0;
    }
    let mut v = DVector::from_element(p, 1.0 / (p as f64).sqrt());
    let mut estimate = 0.0;
    for _ in 0..POWER_ITERS {
        let xv = x * &v;
        let w = x.tr_mul(&xv);
        let norm = w.norm();
        if norm == 0.0 {
            return 0.0;
        }
        v = w / norm;
        if (norm - estimate).abs() <= 1e-12 * norm {
            return norm;
        }
        estimate = norm;
    }
    estimate
}

/// Minimum-norm least squares solution of `min ‖y - Xw‖`.
pub fn lstsq(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<DVector<f64>> {
    if x.nrows() != y.len() {
        return Err(crate::error::shape_mismatch(x.nrows(), y.len()));
    }
    if x.ncols() == 0 {
        return Ok(DVector::zeros(0));
    }
    let svd = x.clone().svd(true, true);
    let max_sv = svd.singular_values.max();
    svd.solve(y, SVD_EPS * max_sv.max(f64::MIN_POSITIVE))
        .map_err(|e| BenchError::NumericalError(format!("least squares failed: {}", e)))
}

/// Least squares restricted to `support`, scattered back into a vector of
/// length `x.ncols()`.
pub fn lstsq_on_support(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    support: &[usize],
) -> Result<DVector<f64>> {
    let mut w = DVector::zeros(x.ncols());
    if support.is_empty() {
        return Ok(w);
    }
    let xs = x.select_columns(support);
    let ws = lstsq(&xs, y)?;
    for (i, &j) in support.iter().enumerate() {
        w[j] = ws[i];
    }
    Ok(w)
}

/// Element-wise soft thresholding `sign(v)·max(|v| - t, 0)`.
pub fn soft_threshold(v: f64, t: f64) -> f64 {
    if v > t {
        v - t
    } else if v < -t {
        v + t
    } else {
        0.0
    }
}

/// Zero out the entries with `|v| <= t`.
pub fn hard_threshold_inplace(v: &mut DVector<f64>, t: f64) {
    for x in v.iter_mut() {
        if x.abs() <= t {
            *x = 0.0;
        }
    }
}

/// Clip every entry to `[-m, m]`.
pub fn clip_inplace(v: &mut DVector<f64>, m: f64) {
    for x in v.iter_mut() {
        *x = x.clamp(-m, m);
    }
}

/// `n` evenly spaced values from `start` to `stop` inclusive.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// `n` values from `start` to `stop` inclusive, evenly spaced on a log scale.
///
/// Both endpoints must be positive.
pub fn geomspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    if start <= 0.0 || stop <= 0.0 {
        return Vec::new();
    }
    linspace(start.ln(), stop.ln(), n)
        .into_iter()
        .map(f64::exp)
        .collect()
}

/// Squared Euclidean norm of every column.
pub fn column_sq_norms(x: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(x.ncols(), x.column_iter().map(|c| c.norm_squared()))
}

/// Residual `y - Xw`.
pub fn residual(x: &DMatrix<f64>, y: &DVector<f64>, w: &DVector<f64>) -> DVector<f64> {
    y - x * w
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spectral_norm_diagonal() {
        let x = DMatrix::from_diagonal(&DVector::from_vec(vec![3.0, 1.0, 2.0]));
        let l = squared_spectral_norm(&x);
        assert!((l - 9.0).abs() < 1e-6, "expected 9, got {}", l);
    }

    #[test]
    fn test_spectral_norm_empty() {
        let x = DMatrix::<f64>::zeros(0, 3);
        assert_eq!(squared_spectral_norm(&x), 0.0);
    }

    #[test]
    fn test_lstsq_exact() {
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let w = DVector::from_vec(vec![2.0, -1.0]);
        let y = &x * &w;
        let sol = lstsq(&x, &y).unwrap();
        assert!((sol - w).norm() < 1e-10);
    }

    #[test]
    fn test_lstsq_on_support_scatters() {
        let x = DMatrix::identity(3, 3);
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let w = lstsq_on_support(&x, &y, &[2]).unwrap();
        assert_eq!(w[0], 0.0);
        assert_eq!(w[1], 0.0);
        assert!((w[2] - 3.0).abs() < 1e-12, "got {}", w[2]);
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(soft_threshold(3.0, 1.0), 2.0);
        assert_eq!(soft_threshold(-3.0, 1.0), -2.0);
        assert_eq!(soft_threshold(0.5, 1.0), 0.0);

        let mut v = DVector::from_vec(vec![0.1, -2.0, 0.5]);
        hard_threshold_inplace(&mut v, 0.5);
        assert_eq!(v.as_slice(), &[0.0, -2.0, 0.0]);
        clip_inplace(&mut v, 1.5);
        assert_eq!(v.as_slice(), &[0.0, -1.5, 0.0]);
    }

    #[test]
    fn test_spaces() {
        let l = linspace(0.0, 0.1, 11);
        assert_eq!(l.len(), 11);
        assert!((l[10] - 0.1).abs() < 1e-15);
        let g = geomspace(1.0, 1e-3, 4);
        assert!((g[1] - 0.1).abs() < 1e-12);
        assert!((g[3] - 1e-3).abs() < 1e-15);
        assert!(geomspace(0.0, 1.0, 3).is_empty());
    }

    #[test]
    fn test_support_and_norms() {
        let v = DVector::from_vec(vec![0.0, -2.0, 0.0, 1.0]);
        assert_eq!(support(&v), vec![1, 3]);
        assert_eq!(l0_norm(&v), 2);
        assert_eq!(l1_norm(&v), 3.0);
        assert_eq!(inf_norm(&v), 2.0);
    }
}
