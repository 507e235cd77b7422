//! Spike deconvolution through a blurring operator.

use std::path::PathBuf;

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::Deserialize;

use super::io::read_matrix_csv;
use super::{noise_at_snr, rng_from_state, DataBundle, Dataset};
use crate::error::{BenchError, Result};

/// Recover `k` spikes blurred by a convolution operator.
///
/// The operator is read from `operator` when given, otherwise it is the full
/// convolution with a sampled Gaussian kernel of standard deviation
/// `kernel_width` (in samples).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Deconvolution {
    pub k: usize,
    pub snr: f64,
    pub random_state: Option<u64>,
    pub operator: Option<PathBuf>,
    pub n_features: usize,
    pub kernel_width: f64,
}

impl Default for Deconvolution {
    fn default() -> Self {
        Deconvolution {
            k: 5,
            snr: 10.0,
            random_state: None,
            operator: None,
            n_features: 100,
            kernel_width: 3.0,
        }
    }
}

/// Full convolution matrix of a centred Gaussian kernel truncated at
/// three standard deviations.
pub fn gaussian_convolution(n_features: usize, width: f64) -> Result<DMatrix<f64>> {
    if n_features == 0 || !(width > 0.0) {
        return Err(BenchError::InvalidParameter(format!(
            "convolution needs n_features > 0 and width > 0, got {} and {}",
            n_features, width
        )));
    }
    let half = (3.0 * width).ceil() as usize;
    let kernel: Vec<f64> = (0..=2 * half)
        .map(|i| {
            let t = i as f64 - half as f64;
            (-0.5 * (t / width).powi(2)).exp()
        })
        .collect();
    let norm: f64 = kernel.iter().sum();

    let n_samples = n_features + kernel.len() - 1;
    let mut h = DMatrix::zeros(n_samples, n_features);
    for j in 0..n_features {
        for (i, kv) in kernel.iter().enumerate() {
            h[(i + j, j)] = kv / norm;
        }
    }
    Ok(h)
}

impl Dataset for Deconvolution {
    fn name(&self) -> &str {
        "deconvolution"
    }

    fn label(&self) -> String {
        format!("deconvolution[k={},snr={}]", self.k, self.snr)
    }

    fn get_data(&self) -> Result<DataBundle> {
        let mut rng = rng_from_state(self.random_state);
        let x = match &self.operator {
            Some(path) => read_matrix_csv(path)?,
            None => gaussian_convolution(self.n_features, self.kernel_width)?,
        };
        let p = x.ncols();
        if self.k > p {
            return Err(BenchError::InvalidParameter(format!(
                "cannot place {} spikes in {} features",
                self.k, p
            )));
        }

        // Spike amplitudes are kept away from zero.
        let mut w_true = DVector::zeros(p);
        for i in rand::seq::index::sample(&mut rng, p, self.k).into_iter() {
            let a: f64 = rng.sample(StandardNormal);
            w_true[i] = a + a.signum();
        }

        let clean = &x * &w_true;
        let y = &clean + noise_at_snr(&clean, self.snr, &mut rng)?;
        DataBundle::new(x, y, Some(w_true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::l0_norm;

    #[test]
    fn test_convolution_columns_sum_to_one() {
        let h = gaussian_convolution(10, 1.5).unwrap();
        assert_eq!(h.ncols(), 10);
        assert_eq!(h.nrows(), 10 + 2 * 5);
        for c in h.column_iter() {
            assert!((c.sum() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_spikes_are_away_from_zero() {
        let data = Deconvolution {
            k: 4,
            n_features: 30,
            random_state: Some(5),
            ..Default::default()
        }
        .get_data()
        .unwrap();
        let w = data.w_true.unwrap();
        assert_eq!(l0_norm(&w), 4);
        assert!(w.iter().filter(|v| **v != 0.0).all(|v| v.abs() >= 1.0));
    }

    #[test]
    fn test_too_many_spikes() {
        let ds = Deconvolution {
            k: 11,
            n_features: 10,
            ..Default::default()
        };
        assert!(ds.get_data().is_err());
    }
}
