//! CSC assembly for the conic relaxations.
//!
//! Clarabel reads `P` as its upper triangle and `A` row by row in cone order;
//! both are assembled here from dense blocks or triplets.

use nalgebra::DMatrix;
use nalgebra_sparse::{CooMatrix, CscMatrix};

/// Gram entries with magnitude below this are left out of `P`.
const DROP_TOL: f64 = 1e-15;

/// Assemble an `nrows x ncols` CSC matrix from `(row, col, value)` entries.
///
/// Repeated positions add up; entries outside the shape are skipped.
pub fn csc_from_triplets(
    nrows: usize,
    ncols: usize,
    entries: impl IntoIterator<Item = (usize, usize, f64)>,
) -> CscMatrix<f64> {
    let mut coo = CooMatrix::new(nrows, ncols);
    entries
        .into_iter()
        .filter(|&(i, j, _)| i < nrows && j < ncols)
        .for_each(|(i, j, v)| coo.push(i, j, v));
    CscMatrix::from(&coo)
}

/// Upper triangle of the symmetric `gram`, embedded as the leading block of
/// an `n x n` matrix. The trailing variables (indicators, epigraphs) carry
/// no quadratic cost.
pub fn upper_triangle_csc(gram: &DMatrix<f64>, n: usize) -> CscMatrix<f64> {
    let k = gram.nrows().min(gram.ncols());
    let entries = (0..k)
        .flat_map(|j| (0..=j).map(move |i| (i, j)))
        .map(|(i, j)| (i, j, gram[(i, j)]))
        .filter(|(_, _, v)| v.abs() > DROP_TOL);
    csc_from_triplets(n, n, entries)
}

/// `½ xᵀ P x` where `P` holds only its upper triangle.
pub fn upper_quadratic_form(p: &CscMatrix<f64>, x: &[f64]) -> f64 {
    p.triplet_iter()
        .map(|(i, j, v)| {
            let weight = if i == j { 0.5 } else { 1.0 };
            weight * v * x[i] * x[j]
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_entries_add_up() {
        let m = csc_from_triplets(2, 2, vec![(0, 0, 1.0), (0, 0, 2.0), (1, 1, 4.0), (5, 0, 9.0)]);
        let d = DMatrix::from(&m);
        assert_eq!(d[(0, 0)], 3.0);
        assert_eq!(d[(1, 1)], 4.0);
        assert_eq!(m.nnz(), 2);
    }

    #[test]
    fn test_gram_block_is_upper_and_padded() {
        let gram = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 3.0]);
        let p = upper_triangle_csc(&gram, 4);
        assert_eq!(p.nrows(), 4);
        let d = DMatrix::from(&p);
        assert_eq!(d[(0, 1)], 1.0);
        assert_eq!(d[(1, 0)], 0.0);
        assert_eq!(d[(1, 1)], 3.0);
        assert_eq!(p.nnz(), 3);
    }

    #[test]
    fn test_quadratic_form_counts_both_halves() {
        let gram = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 3.0]);
        let p = upper_triangle_csc(&gram, 2);
        // ½ xᵀ G x at (1, -2): ½ (2 - 4 + 12) = 5.
        assert!((upper_quadratic_form(&p, &[1.0, -2.0]) - 5.0).abs() < 1e-12);
    }
}
