//! Reading dense matrices and vectors from delimited text files.

use std::path::Path;

use nalgebra::{DMatrix, DVector};

use crate::error::{BenchError, Result};

/// Read a headerless, comma-separated numeric matrix.
///
/// Blank lines are skipped; every row must have the same number of fields.
pub fn read_matrix_csv(path: &Path) -> Result<DMatrix<f64>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut values = Vec::new();
    let mut ncols = None;
    let mut nrows = 0;
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        match ncols {
            None => ncols = Some(record.len()),
            Some(n) if n != record.len() => {
                return Err(BenchError::DataError(format!(
                    "{}: row {} has {} fields, expected {}",
                    path.display(),
                    line + 1,
                    record.len(),
                    n
                )));
            }
            _ => {}
        }
        for field in record.iter() {
            let v: f64 = field.parse().map_err(|_| {
                BenchError::DataError(format!(
                    "{}: row {}: cannot parse '{}' as a number",
                    path.display(),
                    line + 1,
                    field
                ))
            })?;
            values.push(v);
        }
        nrows += 1;
    }

    let ncols = ncols.ok_or_else(|| {
        BenchError::DataError(format!("{}: no numeric rows", path.display()))
    })?;
    Ok(DMatrix::from_row_slice(nrows, ncols, &values))
}

/// Read a vector stored either as a single column or as a single row.
pub fn read_vector_csv(path: &Path) -> Result<DVector<f64>> {
    let m = read_matrix_csv(path)?;
    if m.ncols() == 1 {
        Ok(m.column(0).into_owned())
    } else if m.nrows() == 1 {
        Ok(m.row(0).transpose())
    } else {
        Err(BenchError::DataError(format!(
            "{}: expected a vector, found a {}x{} matrix",
            path.display(),
            m.nrows(),
            m.ncols()
        )))
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
    fn test_read_matrix() {
        let f = write_tmp("1, 2, 3\n4, 5, 6\n\n");
        let m = read_matrix_csv(f.path()).unwrap();
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m[(1, 0)], 4.0);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let f = write_tmp("1,2\n3\n");
        assert!(read_matrix_csv(f.path()).is_err());
    }

    #[test]
    fn test_non_numeric_rejected() {
        let f = write_tmp("1,abc\n");
        assert!(read_matrix_csv(f.path()).is_err());
    }

    #[test]
    fn test_read_vector_row_or_column() {
        let col = write_tmp("1\n2\n3\n");
        let row = write_tmp("1,2,3\n");
        assert_eq!(read_vector_csv(col.path()).unwrap().len(), 3);
        assert_eq!(read_vector_csv(row.path()).unwrap()[2], 3.0);
        let mat = write_tmp("1,2\n3,4\n");
        assert!(read_vector_csv(mat.path()).is_err());
    }
}
