//! Simulated regression data with a correlated design.

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::Deserialize;

use super::{check_fraction, generate_sources, rng_from_state, standard_normal, DataBundle, Dataset};
use crate::error::{BenchError, Result};

/// Gaussian design whose columns follow an AR(1) process with correlation
/// `rho` between neighbouring features, and a sparse Gaussian signal.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Simulated {
    pub n_samples: usize,
    pub n_features: usize,
    /// Fraction of non-zero entries in `w_true`.
    pub density: f64,
    /// Correlation between neighbouring columns.
    pub rho: f64,
    /// `‖Xw‖ / ‖noise‖`; 0 yields pure noise, infinity a noiseless model.
    pub snr: f64,
    pub random_state: Option<u64>,
}

impl Default for Simulated {
    fn default() -> Self {
        Simulated {
            n_samples: 20,
            n_features: 50,
            density: 0.1,
            rho: 0.9,
            snr: 10.0,
            random_state: None,
        }
    }
}

impl Simulated {
    fn validate(&self) -> Result<()> {
        if self.n_samples == 0 || self.n_features == 0 {
            return Err(BenchError::InvalidParameter(
                "simulated data needs at least one sample and one feature".into(),
            ));
        }
        check_fraction("density", self.density)?;
        if !(-1.0..1.0).contains(&self.rho) {
            return Err(BenchError::InvalidParameter(format!(
                "rho must lie in [-1, 1), got {}",
                self.rho
            )));
        }
        if self.snr < 0.0 || self.snr.is_nan() {
            return Err(BenchError::InvalidParameter(format!(
                "snr must be nonnegative, got {}",
                self.snr
            )));
        }
        Ok(())
    }
}

/// Correlated design, sparse signal and noisy observations.
///
/// Returns `(X, y, w_true)`. `w_true` has `max(1, floor(density·p))` non-zeros.
pub fn make_correlated_data(
    params: &Simulated,
    rng: &mut rand::rngs::StdRng,
) -> Result<(DMatrix<f64>, DVector<f64>, DVector<f64>)> {
    params.validate()?;
    let (n, p) = (params.n_samples, params.n_features);

    let sigma = (1.0 - params.rho * params.rho).sqrt();
    let mut x = DMatrix::zeros(n, p);
    let mut u = standard_normal(n, rng);
    x.set_column(0, &u);
    for j in 1..p {
        for ui in u.iter_mut() {
            let z: f64 = rng.sample(StandardNormal);
            *ui = params.rho * *ui + sigma * z;
        }
        x.set_column(j, &u);
    }

    let nnz = ((params.density * p as f64).floor() as usize).max(1);
    let w_true = generate_sources(p, nnz, rng);

    let clean = &x * &w_true;
    let noise = standard_normal(n, rng);
    let y = if params.snr == 0.0 {
        noise
    } else if params.snr.is_infinite() || noise.norm() == 0.0 {
        clean
    } else {
        let scale = clean.norm() / (params.snr * noise.norm());
        &clean + noise * scale
    };

    Ok((x, y, w_true))
}

impl Dataset for Simulated {
    fn name(&self) -> &str {
        "simulated"
    }

    fn label(&self) -> String {
        format!(
            "simulated[n_samples={},n_features={},density={},rho={},snr={}]",
            self.n_samples, self.n_features, self.density, self.rho, self.snr
        )
    }

    fn get_data(&self) -> Result<DataBundle> {
        let mut rng = rng_from_state(self.random_state);
        let (x, y, w_true) = make_correlated_data(self, &mut rng)?;
        DataBundle::new(x, y, Some(w_true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::l0_norm;

    #[test]
    fn test_default_shapes() {
        let data = Simulated {
            random_state: Some(0),
            ..Default::default()
        }
        .get_data()
        .unwrap();
        assert_eq!(data.x.shape(), (20, 50));
        assert_eq!(data.y.len(), 20);
        assert_eq!(l0_norm(data.w_true.as_ref().unwrap()), 5);
    }

    #[test]
    fn test_noise_level_matches_snr() {
        let params = Simulated {
            n_samples: 100,
            n_features: 30,
            snr: 4.0,
            random_state: Some(3),
            ..Default::default()
        };
        let data = params.get_data().unwrap();
        let clean = &data.x * data.w_true.as_ref().unwrap();
        let noise = &data.y - &clean;
        assert!((clean.norm() / noise.norm() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_noiseless_and_pure_noise() {
        let noiseless = Simulated {
            snr: f64::INFINITY,
            random_state: Some(1),
            ..Default::default()
        }
        .get_data()
        .unwrap();
        let clean = &noiseless.x * noiseless.w_true.as_ref().unwrap();
        assert!((&noiseless.y - clean).norm() < 1e-12);

        let noise = Simulated {
            snr: 0.0,
            random_state: Some(1),
            ..Default::default()
        };
        assert!(noise.get_data().is_ok());
    }

    #[test]
    fn test_at_least_one_nonzero() {
        let data = Simulated {
            density: 0.0,
            random_state: Some(2),
            ..Default::default()
        }
        .get_data()
        .unwrap();
        assert_eq!(l0_norm(data.w_true.as_ref().unwrap()), 1);
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let bad_rho = Simulated {
            rho: 1.0,
            ..Default::default()
        };
        assert!(bad_rho.get_data().is_err());
        let bad_density = Simulated {
            density: 1.5,
            ..Default::default()
        };
        assert!(bad_density.get_data().is_err());
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let params = Simulated {
            random_state: Some(7),
            ..Default::default()
        };
        let a = params.get_data().unwrap();
        let b = params.get_data().unwrap();
        assert_eq!(a.x, b.x);
        assert_eq!(a.y, b.y);
    }
}
