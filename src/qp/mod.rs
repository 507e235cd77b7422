//! Convex quadratic sub-problems: node relaxations for branch-and-bound and
//! box-constrained least squares for debiasing.
//!
//! Problems take the conic form `min ½xᵀPx + qᵀx + c  s.t.  Ax + s = b,
//! s ∈ K` where `K` stacks zero, nonnegative and second-order cones.

pub mod clarabel;

pub use self::clarabel::{solve, Primal, QpSolution, Settings, SolveStatus};

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CscMatrix;

use crate::error::{BenchError, Result};
use crate::sparse::{csc_from_triplets, upper_triangle_csc};

/// Row counts of `A` per cone, in stacking order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConeDims {
    /// Equality rows.
    pub zero: usize,
    /// Inequality rows.
    pub nonneg: usize,
    /// One entry per second-order block.
    pub soc: Vec<usize>,
}

impl ConeDims {
    pub fn total(&self) -> usize {
        self.zero + self.nonneg + self.soc.iter().sum::<usize>()
    }
}

/// A conic QP in the layout Clarabel reads.
#[derive(Debug, Clone)]
pub struct QpProblem {
    /// Upper triangle only.
    pub p: CscMatrix<f64>,
    pub q: Vec<f64>,
    pub a: CscMatrix<f64>,
    pub b: Vec<f64>,
    pub cone_dims: ConeDims,
    /// The constant `c`; Clarabel never sees it.
    pub objective_offset: f64,
}

impl QpProblem {
    pub fn num_vars(&self) -> usize {
        self.q.len()
    }
}

/// A sparse affine row `aᵀx + c`.
#[derive(Debug, Clone, Default)]
pub struct AffineRow {
    pub coeffs: Vec<(usize, f64)>,
    pub constant: f64,
}

impl AffineRow {
    pub fn new(coeffs: Vec<(usize, f64)>, constant: f64) -> Self {
        AffineRow { coeffs, constant }
    }
}

/// Incremental builder for [`QpProblem`].
#[derive(Debug, Clone)]
pub struct QpBuilder {
    n: usize,
    p_block: Option<DMatrix<f64>>,
    q: Vec<f64>,
    offset: f64,
    zero_rows: Vec<AffineRow>,
    nonneg_rows: Vec<AffineRow>,
    soc_blocks: Vec<Vec<AffineRow>>,
}

impl QpBuilder {
    /// Start a problem over `n` variables.
    pub fn new(n: usize) -> Self {
        QpBuilder {
            n,
            p_block: None,
            q: vec![0.0; n],
            offset: 0.0,
            zero_rows: Vec::new(),
            nonneg_rows: Vec::new(),
            soc_blocks: Vec::new(),
        }
    }

    /// Set the quadratic term to `sym` on the leading variables.
    pub fn quadratic(mut self, sym: DMatrix<f64>) -> Self {
        self.p_block = Some(sym);
        self
    }

    /// Add `coef` to the linear cost of variable `idx`.
    pub fn linear(mut self, idx: usize, coef: f64) -> Self {
        if idx < self.n {
            self.q[idx] += coef;
        }
        self
    }

    /// Add a constant to the objective.
    pub fn offset(mut self, c: f64) -> Self {
        self.offset += c;
        self
    }

    /// `aᵀx = rhs`.
    pub fn eq(&mut self, coeffs: Vec<(usize, f64)>, rhs: f64) {
        self.zero_rows.push(AffineRow::new(coeffs, rhs));
    }

    /// `aᵀx <= rhs`.
    pub fn le(&mut self, coeffs: Vec<(usize, f64)>, rhs: f64) {
        self.nonneg_rows.push(AffineRow::new(coeffs, rhs));
    }

    /// `(u_0, u_1, ..)` in the second-order cone `‖u_{1..}‖ <= u_0`, where each
    /// `u_k = a_kᵀx + c_k`.
    pub fn soc(&mut self, members: Vec<AffineRow>) {
        self.soc_blocks.push(members);
    }

    /// Stuff the problem into solver format.
    pub fn build(self) -> Result<QpProblem> {
        let n = self.n;
        let p = match &self.p_block {
            Some(sym) => {
                if sym.nrows() != sym.ncols() || sym.nrows() > n {
                    return Err(crate::error::shape_mismatch(
                        format!("square block of size <= {}", n),
                        format!("{}x{}", sym.nrows(), sym.ncols()),
                    ));
                }
                upper_triangle_csc(sym, n)
            }
            None => CscMatrix::zeros(n, n),
        };

        let mut triplets = Vec::new();
        let mut b = Vec::new();
        let mut row = 0;

        // Zero and nonnegative rows: s = b - Ax with A = a, b = rhs.
        for r in self.zero_rows.iter().chain(self.nonneg_rows.iter()) {
            for &(col, v) in &r.coeffs {
                check_col(col, n)?;
                triplets.push((row, col, v));
            }
            b.push(r.constant);
            row += 1;
        }

        // Cone members: s = u = aᵀx + c, hence A = -a, b = c.
        let mut soc = Vec::with_capacity(self.soc_blocks.len());
        for block in &self.soc_blocks {
            for r in block {
                for &(col, v) in &r.coeffs {
                    check_col(col, n)?;
                    triplets.push((row, col, -v));
                }
                b.push(r.constant);
                row += 1;
            }
            soc.push(block.len());
        }

        let a = csc_from_triplets(row, n, triplets);
        Ok(QpProblem {
            p,
            q: self.q,
            a,
            b,
            cone_dims: ConeDims {
                zero: self.zero_rows.len(),
                nonneg: self.nonneg_rows.len(),
                soc,
            },
            objective_offset: self.offset,
        })
    }
}

fn check_col(col: usize, n: usize) -> Result<()> {
    if col >= n {
        return Err(BenchError::InvalidParameter(format!(
            "constraint references variable {} of {}",
            col, n
        )));
    }
    Ok(())
}

/// Solve `min ½‖y - Xw‖²  s.t.  lower <= w <= upper`.
pub fn bounded_lstsq(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    lower: f64,
    upper: f64,
) -> Result<DVector<f64>> {
    if x.nrows() != y.len() {
        return Err(crate::error::shape_mismatch(x.nrows(), y.len()));
    }
    if lower > upper {
        return Err(BenchError::InvalidParameter(format!(
            "empty box [{}, {}]",
            lower, upper
        )));
    }
    let n = x.ncols();
    if n == 0 {
        return Ok(DVector::zeros(0));
    }

    let xty = x.tr_mul(y);
    let mut builder = QpBuilder::new(n)
        .quadratic(x.tr_mul(x))
        .offset(0.5 * y.norm_squared());
    for j in 0..n {
        builder = builder.linear(j, -xty[j]);
    }
    for j in 0..n {
        if upper.is_finite() {
            builder.le(vec![(j, 1.0)], upper);
        }
        if lower.is_finite() {
            builder.le(vec![(j, -1.0)], -lower);
        }
    }

    let primal = solve(&builder.build()?, &Settings::default())?.into_primal()?;
    // Interior points sit a hair inside the box.
    Ok(DVector::from_iterator(
        n,
        primal.x.into_iter().map(|v| v.clamp(lower, upper)),
    ))
}
