//! Sparse portfolio selection recast as least squares.

use std::path::PathBuf;

use serde::Deserialize;

use super::io::{read_matrix_csv, read_vector_csv};
use super::{DataBundle, Dataset};
use crate::error::{shape_mismatch, BenchError, Result};
use crate::linalg::lstsq;

/// Covariance `S` and expected returns `p` of an asset universe.
///
/// With `X = chol(ratio·S)ᵀ` and `y` the least squares solution of
/// `Xᵀy = (1 - ratio)·p`, minimising `½‖y - Xw‖²` trades risk against return.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Portfolio {
    pub covariance: PathBuf,
    pub returns: PathBuf,
    #[serde(default = "default_ratio")]
    pub ratio: f64,
}

fn default_ratio() -> f64 {
    0.5
}

impl Portfolio {
    pub fn new(covariance: PathBuf, returns: PathBuf, ratio: f64) -> Self {
        Portfolio {
            covariance,
            returns,
            ratio,
        }
    }
}

impl Dataset for Portfolio {
    fn name(&self) -> &str {
        "portfolio"
    }

    fn label(&self) -> String {
        format!("portfolio[ratio={}]", self.ratio)
    }

    fn get_data(&self) -> Result<DataBundle> {
        if !(self.ratio > 0.0 && self.ratio < 1.0) {
            return Err(BenchError::InvalidParameter(format!(
                "ratio must lie in (0, 1), got {}",
                self.ratio
            )));
        }
        let s = read_matrix_csv(&self.covariance)?;
        let p = read_vector_csv(&self.returns)?;
        if !s.is_square() {
            return Err(BenchError::DataError(format!(
                "covariance must be square, got {}x{}",
                s.nrows(),
                s.ncols()
            )));
        }
        if p.len() != s.nrows() {
            return Err(shape_mismatch(format!("{} returns", s.nrows()), p.len()));
        }

        let chol = (s * self.ratio).cholesky().ok_or_else(|| {
            BenchError::DataError("covariance is not positive definite".into())
        })?;
        let x = chol.l().transpose();
        let y = lstsq(&x.transpose(), &(p * (1.0 - self.ratio)))?;
        DataBundle::new(x, y, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_factorises_covariance() {
        let s = write_tmp("4,2\n2,3\n");
        let p = write_tmp("1\n-1\n");
        let ds = Portfolio::new(s.path().to_path_buf(), p.path().to_path_buf(), 0.5);
        let data = ds.get_data().unwrap();

        // XᵀX recovers ratio·S.
        let xtx = data.x.transpose() * &data.x;
        assert!((xtx[(0, 0)] - 2.0).abs() < 1e-12);
        assert!((xtx[(0, 1)] - 1.0).abs() < 1e-12);
        assert!((xtx[(1, 1)] - 1.5).abs() < 1e-12);

        // Xᵀy recovers (1 - ratio)·p.
        let xty = data.x.transpose() * &data.y;
        assert!((xty[0] - 0.5).abs() < 1e-10);
        assert!((xty[1] + 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_rejects_indefinite_covariance_and_bad_ratio() {
        let s = write_tmp("1,2\n2,1\n");
        let p = write_tmp("1,1\n");
        let ds = Portfolio::new(s.path().to_path_buf(), p.path().to_path_buf(), 0.5);
        assert!(ds.get_data().is_err());

        let ds = Portfolio { ratio: 1.0, ..ds };
        assert!(matches!(ds.get_data(), Err(BenchError::InvalidParameter(_))));
    }
}
