//! Regression datasets stored in the LIBSVM sparse text format.

use std::fs;
use std::path::{Path, PathBuf};

use nalgebra::{DMatrix, DVector};
use serde::Deserialize;

use super::{DataBundle, Dataset};
use crate::error::{BenchError, Result};
use crate::linalg::inf_norm;

/// A LIBSVM file (`bodyfat`, `housing`, `triazines`, ...).
///
/// Columns are standardised to zero mean and unit population variance; the
/// amplitude bound is `1.5‖Xᵀy‖∞`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Libsvm {
    pub path: PathBuf,
    /// Overrides the feature count inferred from the largest index.
    #[serde(default)]
    pub n_features: Option<usize>,
}

impl Libsvm {
    pub fn new(path: PathBuf) -> Self {
        Libsvm {
            path,
            n_features: None,
        }
    }
}

/// Parse `label idx:value ...` lines with 1-based feature indices.
pub fn read_libsvm(
    path: &Path,
    n_features: Option<usize>,
) -> Result<(DMatrix<f64>, DVector<f64>)> {
    let text = fs::read_to_string(path)?;
    let bad = |line: usize, msg: String| {
        BenchError::DataError(format!("{}:{}: {}", path.display(), line + 1, msg))
    };

    let mut labels = Vec::new();
    let mut entries = Vec::new();
    let mut max_index = 0;
    for (line_no, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let label: f64 = match fields.next() {
            Some(f) => f
                .parse()
                .map_err(|_| bad(line_no, format!("invalid label '{}'", f)))?,
            None => continue,
        };
        let row = labels.len();
        labels.push(label);
        for field in fields {
            let (idx, val) = field
                .split_once(':')
                .ok_or_else(|| bad(line_no, format!("expected index:value, got '{}'", field)))?;
            let idx: usize = idx
                .parse()
                .map_err(|_| bad(line_no, format!("invalid index '{}'", idx)))?;
            if idx == 0 {
                return Err(bad(line_no, "feature indices start at 1".into()));
            }
            let val: f64 = val
                .parse()
                .map_err(|_| bad(line_no, format!("invalid value '{}'", val)))?;
            max_index = max_index.max(idx);
            entries.push((row, idx - 1, val));
        }
    }

    if labels.is_empty() {
        return Err(BenchError::DataError(format!(
            "{}: no samples",
            path.display()
        )));
    }
    let p = match n_features {
        Some(p) if p < max_index => {
            return Err(BenchError::DataError(format!(
                "{}: feature index {} exceeds n_features = {}",
                path.display(),
                max_index,
                p
            )))
        }
        Some(p) => p,
        None => max_index,
    };

    let mut x = DMatrix::zeros(labels.len(), p);
    for (i, j, v) in entries {
        x[(i, j)] = v;
    }
    Ok((x, DVector::from_vec(labels)))
}

/// Centre every column and scale it to unit population standard deviation.
/// Constant columns end up at zero.
pub fn standardize_columns(x: &mut DMatrix<f64>) {
    let n = x.nrows() as f64;
    for mut col in x.column_iter_mut() {
        let mean = col.sum() / n;
        col.add_scalar_mut(-mean);
        let std = (col.norm_squared() / n).sqrt();
        if std > 0.0 {
            col /= std;
        }
    }
}

impl Dataset for Libsvm {
    fn name(&self) -> &str {
        "libsvm"
    }

    fn label(&self) -> String {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("libsvm[dataset={}]", stem)
    }

    fn get_data(&self) -> Result<DataBundle> {
        let (mut x, y) = read_libsvm(&self.path, self.n_features)?;
        standardize_columns(&mut x);
        let m = 1.5 * inf_norm(&x.tr_mul(&y));
        let bundle = DataBundle::new(x, y, None)?;
        if m > 0.0 {
            bundle.with_m(m)
        } else {
            Ok(bundle)
        }
    }
}
