//! Real design matrices read from CSV, with real or semi-simulated targets.

use std::path::PathBuf;

use nalgebra::DMatrix;
use serde::Deserialize;

use super::io::{read_matrix_csv, read_vector_csv};
use super::{generate_sources, noise_at_snr, rng_from_state, DataBundle, Dataset};
use crate::error::{BenchError, Result};

/// Number of non-zeros of a semi-simulated signal.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sparsity {
    /// Exact count.
    Count(usize),
    /// Fraction of the number of features, rounded down.
    Fraction(f64),
}

impl Sparsity {
    pub fn resolve(self, n_features: usize) -> Result<usize> {
        let k = match self {
            Sparsity::Count(k) => k,
            Sparsity::Fraction(f) => {
                super::check_fraction("sparsity fraction", f)?;
                (f * n_features as f64).floor() as usize
            }
        };
        if k > n_features {
            return Err(BenchError::InvalidParameter(format!(
                "{} non-zeros requested for {} features",
                k, n_features
            )));
        }
        Ok(k)
    }
}

/// Replace the real target by `X w_true + noise`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SemiSimulation {
    pub sparsity: Sparsity,
    pub snr: f64,
    #[serde(default)]
    pub random_state: Option<u64>,
}

/// Design matrix from a CSV file (lattice, MEG, ...).
///
/// The target is read from `target` when given; otherwise it is the column
/// `target_column` of the design file (default: last), which is then removed
/// from the design.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Tabular {
    #[serde(default = "default_name")]
    pub name: String,
    pub design: PathBuf,
    #[serde(default)]
    pub target: Option<PathBuf>,
    #[serde(default)]
    pub target_column: Option<usize>,
    #[serde(default)]
    pub semi_simulated: Option<SemiSimulation>,
}

fn default_name() -> String {
    "tabular".to_string()
}

impl Tabular {
    pub fn new(name: impl Into<String>, design: PathBuf) -> Self {
        Tabular {
            name: name.into(),
            design,
            target: None,
            target_column: None,
            semi_simulated: None,
        }
    }
}

fn remove_column(m: DMatrix<f64>, col: usize) -> DMatrix<f64> {
    m.remove_column(col)
}

impl Dataset for Tabular {
    fn name(&self) -> &str {
        &self.name
    }

    fn label(&self) -> String {
        match &self.semi_simulated {
            Some(s) => format!("{}[semi_simulated,snr={}]", self.name, s.snr),
            None => self.name.clone(),
        }
    }

    fn get_data(&self) -> Result<DataBundle> {
        let raw = read_matrix_csv(&self.design)?;

        let (x, y) = match &self.target {
            Some(path) => (raw, read_vector_csv(path)?),
            None => {
                if raw.ncols() < 2 {
                    return Err(BenchError::DataError(format!(
                        "{}: need at least one feature column and a target column",
                        self.design.display()
                    )));
                }
                let col = self.target_column.unwrap_or(raw.ncols() - 1);
                if col >= raw.ncols() {
                    return Err(BenchError::InvalidParameter(format!(
                        "target column {} out of range for {} columns",
                        col,
                        raw.ncols()
                    )));
                }
                let y = raw.column(col).into_owned();
                (remove_column(raw, col), y)
            }
        };

        match &self.semi_simulated {
            None => DataBundle::new(x, y, None),
            Some(sim) => {
                let k = sim.sparsity.resolve(x.ncols())?;
                let mut rng = rng_from_state(sim.random_state);
                let w_true = generate_sources(x.ncols(), k, &mut rng);
                let clean = &x * &w_true;
                let y = &clean + noise_at_snr(&clean, sim.snr, &mut rng)?;
                DataBundle::new(x, y, Some(w_true))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::l0_norm;
    use std::io::Write;

    fn design_file() -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "1,0,0,5").unwrap();
        writeln!(f, "0,1,0,6").unwrap();
        writeln!(f, "0,0,1,7").unwrap();
        writeln!(f, "1,1,1,8").unwrap();
        f
    }

    #[test]
    fn test_last_column_is_target() {
        let f = design_file();
        let data = Tabular::new("lattice", f.path().to_path_buf()).get_data().unwrap();
        assert_eq!(data.x.shape(), (4, 3));
        assert_eq!(data.y.as_slice(), &[5.0, 6.0, 7.0, 8.0]);
        assert!(data.w_true.is_none());
    }

    #[test]
    fn test_semi_simulated_fraction() {
        let f = design_file();
        let ds = Tabular {
            semi_simulated: Some(SemiSimulation {
                sparsity: Sparsity::Fraction(0.7),
                snr: 100.0,
                random_state: Some(0),
            }),
            ..Tabular::new("meg", f.path().to_path_buf())
        };
        let data = ds.get_data().unwrap();
        assert_eq!(l0_norm(data.w_true.as_ref().unwrap()), 2);
    }

    #[test]
    fn test_sparsity_resolution() {
        assert_eq!(Sparsity::Count(3).resolve(10).unwrap(), 3);
        assert_eq!(Sparsity::Fraction(0.001).resolve(7498).unwrap(), 7);
        assert!(Sparsity::Count(11).resolve(10).is_err());
        assert!(Sparsity::Fraction(2.0).resolve(10).is_err());
    }
}
