//! Datasets: design matrix, observations and, when known, the sparse signal
//! that generated them.

pub mod bourguignon;
pub mod deconvolution;
pub mod io;
pub mod libsvm;
pub mod ode;
pub mod portfolio;
pub mod simulated;
pub mod tabular;

pub use bourguignon::Bourguignon;
pub use deconvolution::Deconvolution;
pub use libsvm::Libsvm;
pub use ode::{Ode, OdeSystem};
pub use portfolio::Portfolio;
pub use simulated::Simulated;
pub use tabular::{SemiSimulation, Sparsity, Tabular};

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::error::{shape_mismatch, BenchError, Result};

/// The data a dataset hands to the objective.
#[derive(Debug, Clone)]
pub struct DataBundle {
    /// Design matrix (n_samples x n_features).
    pub x: DMatrix<f64>,
    /// Observations (n_samples).
    pub y: DVector<f64>,
    /// Ground-truth signal, when known.
    pub w_true: Option<DVector<f64>>,
    /// Bound on the amplitude of the entries of the solution, when known.
    pub m: Option<f64>,
}

impl DataBundle {
    pub fn new(x: DMatrix<f64>, y: DVector<f64>, w_true: Option<DVector<f64>>) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(shape_mismatch(
                format!("{} observations", x.nrows()),
                y.len(),
            ));
        }
        if let Some(w) = &w_true {
            if w.len() != x.ncols() {
                return Err(shape_mismatch(
                    format!("w_true of length {}", x.ncols()),
                    w.len(),
                ));
            }
        }
        Ok(DataBundle {
            x,
            y,
            w_true,
            m: None,
        })
    }

    /// Attach a bound on the amplitude of the solution.
    pub fn with_m(mut self, m: f64) -> Result<Self> {
        if !(m > 0.0 && m.is_finite()) {
            return Err(BenchError::DataError(format!(
                "amplitude bound must be positive and finite, got {}",
                m
            )));
        }
        self.m = Some(m);
        Ok(self)
    }

    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }
}

/// A source of benchmark data.
pub trait Dataset {
    /// Kind of the dataset, e.g. `simulated`.
    fn name(&self) -> &str;

    /// Name plus parameters, used to label results.
    fn label(&self) -> String {
        self.name().to_string()
    }

    /// Generate or load the data.
    fn get_data(&self) -> Result<DataBundle>;
}

/// Seeded generator when a random state is given, entropy otherwise.
pub fn rng_from_state(random_state: Option<u64>) -> StdRng {
    match random_state {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Vector of length `n` with standard normal entries on `k` random positions
/// and zeros elsewhere.
pub fn generate_sources(n: usize, k: usize, rng: &mut StdRng) -> DVector<f64> {
    let k = k.min(n);
    let mut w = DVector::zeros(n);
    for i in rand::seq::index::sample(rng, n, k).into_iter() {
        w[i] = rng.sample(StandardNormal);
    }
    w
}

/// Standard normal vector of length `n`.
pub fn standard_normal(n: usize, rng: &mut StdRng) -> DVector<f64> {
    DVector::from_iterator(n, (0..n).map(|_| rng.sample::<f64, _>(StandardNormal)))
}

/// Gaussian noise scaled so that `‖y‖² / ‖e‖² = snr`.
pub fn noise_at_snr(y: &DVector<f64>, snr: f64, rng: &mut StdRng) -> Result<DVector<f64>> {
    if !(snr > 0.0) {
        return Err(BenchError::InvalidParameter(format!(
            "snr must be positive, got {}",
            snr
        )));
    }
    let e = standard_normal(y.len(), rng);
    let ee = e.norm_squared();
    if ee == 0.0 {
        return Ok(e);
    }
    Ok(e * (y.norm_squared() / (snr * ee)).sqrt())
}

pub(crate) fn check_fraction(name: &str, v: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&v) {
        return Err(BenchError::InvalidParameter(format!(
            "{} must lie in [0, 1], got {}",
            name, v
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_validates_shapes() {
        let x = DMatrix::zeros(3, 2);
        assert!(DataBundle::new(x.clone(), DVector::zeros(2), None).is_err());
        assert!(DataBundle::new(x.clone(), DVector::zeros(3), Some(DVector::zeros(3))).is_err());
        let b = DataBundle::new(x, DVector::zeros(3), Some(DVector::zeros(2))).unwrap();
        assert_eq!((b.n_samples(), b.n_features()), (3, 2));
        assert!(b.clone().with_m(0.0).is_err());
        assert_eq!(b.with_m(2.0).unwrap().m, Some(2.0));
    }

    #[test]
    fn test_generate_sources_support_size() {
        let mut rng = rng_from_state(Some(0));
        let w = generate_sources(50, 7, &mut rng);
        assert_eq!(crate::linalg::l0_norm(&w), 7);
        let w = generate_sources(5, 9, &mut rng);
        assert_eq!(w.len(), 5);
    }

    #[test]
    fn test_noise_at_snr_ratio() {
        let mut rng = rng_from_state(Some(1));
        let y = standard_normal(40, &mut rng);
        let e = noise_at_snr(&y, 10.0, &mut rng).unwrap();
        let ratio = y.norm_squared() / e.norm_squared();
        assert!((ratio - 10.0).abs() < 1e-9);
        assert!(noise_at_snr(&y, 0.0, &mut rng).is_err());
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let a = standard_normal(5, &mut rng_from_state(Some(42)));
        let b = standard_normal(5, &mut rng_from_state(Some(42)));
        assert_eq!(a, b);
    }
}
