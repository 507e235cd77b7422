//! Sparse signal observed through a fixed operator at a given input SNR.

use std::path::PathBuf;

use serde::Deserialize;

use super::io::read_matrix_csv;
use super::{generate_sources, rng_from_state, standard_normal, DataBundle, Dataset};
use crate::error::{BenchError, Result};
use crate::linalg::inf_norm;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Bourguignon {
    /// CSV file holding the operator `H` (n_samples x n_features).
    pub operator: PathBuf,
    #[serde(default = "default_n_nnz")]
    pub n_nnz: usize,
    /// Input SNR in dB.
    #[serde(default = "default_isnr")]
    pub isnr: f64,
    #[serde(default = "default_random_state")]
    pub random_state: Option<u64>,
}

fn default_n_nnz() -> usize {
    5
}

fn default_isnr() -> f64 {
    10.0
}

fn default_random_state() -> Option<u64> {
    Some(27)
}

impl Bourguignon {
    pub fn new(operator: PathBuf) -> Self {
        Bourguignon {
            operator,
            n_nnz: default_n_nnz(),
            isnr: default_isnr(),
            random_state: default_random_state(),
        }
    }
}

impl Dataset for Bourguignon {
    fn name(&self) -> &str {
        "bourguignon"
    }

    fn label(&self) -> String {
        format!("bourguignon[n_nnz={},isnr={}]", self.n_nnz, self.isnr)
    }

    fn get_data(&self) -> Result<DataBundle> {
        let h = read_matrix_csv(&self.operator)?;
        let p = h.ncols();
        if self.n_nnz == 0 || self.n_nnz > p {
            return Err(BenchError::InvalidParameter(format!(
                "n_nnz must lie in [1, {}], got {}",
                p, self.n_nnz
            )));
        }

        let mut rng = rng_from_state(self.random_state);
        let w_true = generate_sources(p, self.n_nnz, &mut rng);
        let clean = &h * &w_true;

        // Noise variance from the mean signal power and the input SNR in dB.
        let power = clean.norm_squared() / clean.len().max(1) as f64;
        let sigma0 = power * 10f64.powf(-self.isnr / 10.0);
        let y = &clean + standard_normal(clean.len(), &mut rng) * sigma0.sqrt();

        let m = inf_norm(&w_true);
        DataBundle::new(h, y, Some(w_true))?.with_m(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_loads_operator_and_sets_bound() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        for i in 0..6 {
            let row: Vec<String> = (0..4)
                .map(|j| if i == j { "1".to_string() } else { "0.1".to_string() })
                .collect();
            writeln!(f, "{}", row.join(",")).unwrap();
        }
        let ds = Bourguignon {
            n_nnz: 2,
            ..Bourguignon::new(f.path().to_path_buf())
        };
        let data = ds.get_data().unwrap();
        assert_eq!(data.x.shape(), (6, 4));
        let w = data.w_true.as_ref().unwrap();
        assert_eq!(data.m, Some(inf_norm(w)));
    }

    #[test]
    fn test_rejects_missing_file() {
        let ds = Bourguignon::new(PathBuf::from("/nonexistent/operator.csv"));
        assert!(ds.get_data().is_err());
    }
}
