//! Branch-and-bound for L0-structured least squares.
//!
//! Every formulation introduces one indicator `z_j ∈ {0, 1}` per feature.
//! Nodes fix some indicators; their convex relaxation, with the free
//! indicators in `[0, 1]`, is solved by Clarabel and gives the node's lower
//! bound. Features fixed to zero are dropped from the relaxation. Incumbents
//! come from refitting the support of each relaxed solution.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::time::Instant;

use nalgebra::{DMatrix, DVector};

use crate::error::{shape_mismatch, BenchError, Result};
use crate::linalg::{l0_norm, lstsq};
use crate::qp::{bounded_lstsq, solve, AffineRow, QpBuilder, Settings, SolveStatus};

/// An indicator is integral when within this distance of 0 or 1.
const INT_TOL: f64 = 1e-6;

/// Relaxed weights below this magnitude are outside the support.
const SUPPORT_TOL: f64 = 1e-6;

/// The mixed-integer problem to solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Formulation {
    /// `½‖y - Xw‖² + λ‖w‖₀` with `|w_j| <= M z_j`.
    BigM { lmbd: f64, m: f64 },
    /// `½‖y - Xw‖²` with `|w_j| <= M z_j` and `Σ z_j <= k`.
    Cardinality { k: usize, m: f64 },
    /// `½‖y - Xw‖² + l0 Σ z_j + l2 Σ s_j` with `w_j² <= s_j z_j`, the
    /// perspective form of `l0‖w‖₀ + l2‖w‖²`.
    Perspective { l0: f64, l2: f64 },
}

impl Formulation {
    fn validate(&self) -> Result<()> {
        let ok = match *self {
            Formulation::BigM { lmbd, m } => lmbd >= 0.0 && m > 0.0 && m.is_finite(),
            Formulation::Cardinality { m, .. } => m > 0.0 && m.is_finite(),
            Formulation::Perspective { l0, l2 } => l0 >= 0.0 && l2 > 0.0 && l2.is_finite(),
        };
        if ok {
            Ok(())
        } else {
            Err(BenchError::InvalidParameter(format!(
                "invalid branch-and-bound formulation {:?}",
                self
            )))
        }
    }
}

#[derive(Debug, Clone)]
pub struct BnbSettings {
    /// Stop once `(upper - lower) / |upper|` is at most this.
    pub gap_tol: f64,
    pub max_nodes: usize,
    pub time_limit: Option<f64>,
    pub relaxation: Settings,
}

impl Default for BnbSettings {
    fn default() -> Self {
        BnbSettings {
            gap_tol: 1e-4,
            max_nodes: 10_000,
            time_limit: None,
            relaxation: Settings::default(),
        }
    }
}

impl BnbSettings {
    pub fn with_gap(gap_tol: f64) -> Self {
        BnbSettings {
            gap_tol,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BnbStatus {
    Optimal,
    NodeLimit,
    TimeLimit,
}

#[derive(Debug, Clone)]
pub struct BnbOutcome {
    pub status: BnbStatus,
    pub w: DVector<f64>,
    /// Objective of `w`.
    pub value: f64,
    pub lower_bound: f64,
    pub relative_gap: f64,
    pub nodes: usize,
}

/// Solution of a node relaxation, scattered back to full length.
#[derive(Debug, Clone)]
struct Relaxation {
    value: f64,
    w: DVector<f64>,
    z: Vec<f64>,
}

#[derive(Debug, Clone)]
struct Node {
    fixed: Vec<Option<bool>>,
    relaxation: Relaxation,
}

impl Node {
    fn bound(&self) -> f64 {
        self.relaxation.value
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.bound().total_cmp(&other.bound()) == Ordering::Equal
    }
}

impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed: the heap pops the smallest bound first.
impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        other.bound().total_cmp(&self.bound())
    }
}

struct Tree<'a> {
    x: &'a DMatrix<f64>,
    y: &'a DVector<f64>,
    formulation: Formulation,
    settings: &'a BnbSettings,
    xtx: DMatrix<f64>,
    xty: DVector<f64>,
}

impl<'a> Tree<'a> {
    fn new(
        x: &'a DMatrix<f64>,
        y: &'a DVector<f64>,
        formulation: Formulation,
        settings: &'a BnbSettings,
    ) -> Self {
        Tree {
            x,
            y,
            formulation,
            settings,
            xtx: x.tr_mul(x),
            xty: x.tr_mul(y),
        }
    }

    fn p(&self) -> usize {
        self.x.ncols()
    }

    /// Solve the relaxation of a node; `None` when it is infeasible.
    fn relax(&self, fixed: &[Option<bool>]) -> Result<Option<Relaxation>> {
        let p = self.p();
        let active: Vec<usize> = (0..p).filter(|&j| fixed[j] != Some(false)).collect();
        let na = active.len();
        let offset = 0.5 * self.y.norm_squared();
        if na == 0 {
            return Ok(Some(Relaxation {
                value: offset,
                w: DVector::zeros(p),
                z: vec![0.0; p],
            }));
        }

        let n_vars = match self.formulation {
            Formulation::Perspective { .. } => 3 * na,
            _ => 2 * na,
        };
        let gram = DMatrix::from_fn(na, na, |a, b| self.xtx[(active[a], active[b])]);
        let mut builder = QpBuilder::new(n_vars).quadratic(gram).offset(offset);
        for (a, &j) in active.iter().enumerate() {
            builder = builder.linear(a, -self.xty[j]);
            match self.formulation {
                Formulation::BigM { lmbd, .. } => builder = builder.linear(na + a, lmbd),
                Formulation::Perspective { l0, l2 } => {
                    builder = builder.linear(na + a, l0).linear(2 * na + a, l2)
                }
                Formulation::Cardinality { .. } => {}
            }
        }

        for (a, &j) in active.iter().enumerate() {
            let z = na + a;
            if fixed[j] == Some(true) {
                builder.eq(vec![(z, 1.0)], 1.0);
            } else {
                builder.le(vec![(z, 1.0)], 1.0);
                builder.le(vec![(z, -1.0)], 0.0);
            }
            match self.formulation {
                Formulation::BigM { m, .. } | Formulation::Cardinality { m, .. } => {
                    builder.le(vec![(a, 1.0), (z, -m)], 0.0);
                    builder.le(vec![(a, -1.0), (z, -m)], 0.0);
                }
                Formulation::Perspective { .. } => {
                    let s = 2 * na + a;
                    builder.soc(vec![
                        AffineRow::new(vec![(s, 1.0), (z, 1.0)], 0.0),
                        AffineRow::new(vec![(s, 1.0), (z, -1.0)], 0.0),
                        AffineRow::new(vec![(a, 2.0)], 0.0),
                    ]);
                }
            }
        }
        if let Formulation::Cardinality { k, .. } = self.formulation {
            builder.le((0..na).map(|a| (na + a, 1.0)).collect(), k as f64);
        }

        let solution = solve(&builder.build()?, &self.settings.relaxation)?;
        match solution.status {
            SolveStatus::Optimal => {}
            SolveStatus::Infeasible => return Ok(None),
            status => {
                return Err(BenchError::SolverError(format!(
                    "node relaxation ended with status {:?}",
                    status
                )))
            }
        }
        let primal = solution.into_primal()?;

        let mut w = DVector::zeros(p);
        let mut z = vec![0.0; p];
        for (a, &j) in active.iter().enumerate() {
            w[j] = primal.x[a];
            z[j] = primal.x[na + a].clamp(0.0, 1.0);
        }
        Ok(Some(Relaxation {
            value: primal.value,
            w,
            z,
        }))
    }

    /// Support suggested by a relaxed solution.
    fn rounded_support(&self, relaxation: &Relaxation) -> Vec<usize> {
        let mut ranked: Vec<usize> = (0..self.p())
            .filter(|&j| relaxation.w[j].abs() > SUPPORT_TOL)
            .collect();
        if let Formulation::Cardinality { k, .. } = self.formulation {
            ranked.sort_by(|&a, &b| relaxation.w[b].abs().total_cmp(&relaxation.w[a].abs()));
            ranked.truncate(k);
        }
        ranked.sort_unstable();
        ranked
    }

    /// Best point on `support` and its objective.
    fn refit(&self, support: &[usize]) -> Result<(f64, DVector<f64>)> {
        let p = self.p();
        let mut w = DVector::zeros(p);
        if !support.is_empty() {
            let xs = self.x.select_columns(support);
            let ws = match self.formulation {
                Formulation::BigM { m, .. } | Formulation::Cardinality { m, .. } => {
                    bounded_lstsq(&xs, self.y, -m, m)?
                }
                Formulation::Perspective { l2, .. } => {
                    let mut gram = xs.tr_mul(&xs);
                    for i in 0..support.len() {
                        gram[(i, i)] += 2.0 * l2;
                    }
                    let rhs = xs.tr_mul(self.y);
                    match gram.cholesky() {
                        Some(chol) => chol.solve(&rhs),
                        None => lstsq(&xs, self.y)?,
                    }
                }
            };
            for (i, &j) in support.iter().enumerate() {
                w[j] = ws[i];
            }
        }
        Ok((self.objective(&w), w))
    }

    fn objective(&self, w: &DVector<f64>) -> f64 {
        let fit = 0.5 * (self.y - self.x * w).norm_squared();
        match self.formulation {
            Formulation::BigM { lmbd, .. } => fit + lmbd * l0_norm(w) as f64,
            Formulation::Cardinality { .. } => fit,
            Formulation::Perspective { l0, l2 } => {
                fit + l0 * l0_norm(w) as f64 + l2 * w.norm_squared()
            }
        }
    }

    /// Free indicator furthest from integrality, if any is fractional.
    fn branching_variable(&self, node: &Node) -> Option<usize> {
        (0..self.p())
            .filter(|&j| node.fixed[j].is_none())
            .map(|j| (j, node.relaxation.z[j].min(1.0 - node.relaxation.z[j])))
            .filter(|(_, frac)| *frac > INT_TOL)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(j, _)| j)
    }
}

fn relative_gap(upper: f64, lower: f64) -> f64 {
    let gap = (upper - lower).max(0.0);
    if upper.abs() > f64::EPSILON {
        gap / upper.abs()
    } else {
        gap
    }
}

/// Best-first branch-and-bound.
///
/// `warm_start`, when given, seeds the incumbent with the refit of its
/// support.
pub fn branch_and_bound(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    formulation: Formulation,
    settings: &BnbSettings,
    warm_start: Option<&DVector<f64>>,
) -> Result<BnbOutcome> {
    formulation.validate()?;
    if x.nrows() != y.len() {
        return Err(shape_mismatch(x.nrows(), y.len()));
    }
    if !(settings.gap_tol >= 0.0) {
        return Err(BenchError::InvalidParameter(format!(
            "gap tolerance must be non-negative, got {}",
            settings.gap_tol
        )));
    }
    let start = Instant::now();
    let tree = Tree::new(x, y, formulation, settings);
    let p = tree.p();

    let mut tried: HashSet<Vec<usize>> = HashSet::new();
    let (mut upper, mut best) = tree.refit(&[])?;
    tried.insert(Vec::new());
    if let Some(ws) = warm_start {
        if ws.len() != p {
            return Err(shape_mismatch(p, ws.len()));
        }
        let support = tree.rounded_support(&Relaxation {
            value: 0.0,
            w: ws.clone(),
            z: Vec::new(),
        });
        if tried.insert(support.clone()) {
            let (value, w) = tree.refit(&support)?;
            if value < upper {
                upper = value;
                best = w;
            }
        }
    }

    let root_fixed = vec![None; p];
    let root = tree.relax(&root_fixed)?.ok_or_else(|| {
        BenchError::SolverError("root relaxation is infeasible".into())
    })?;
    let mut heap = BinaryHeap::new();
    heap.push(Node {
        fixed: root_fixed,
        relaxation: root,
    });

    let mut status = BnbStatus::Optimal;
    let mut lower = f64::INFINITY;
    let mut nodes = 0;
    while let Some(node) = heap.pop() {
        if relative_gap(upper, node.bound()) <= settings.gap_tol {
            // Best-first: every open node is at least as large.
            lower = lower.min(node.bound());
            heap.clear();
            break;
        }
        if nodes >= settings.max_nodes {
            status = BnbStatus::NodeLimit;
            lower = lower.min(node.bound());
            break;
        }
        if settings
            .time_limit
            .is_some_and(|limit| start.elapsed().as_secs_f64() >= limit)
        {
            status = BnbStatus::TimeLimit;
            lower = lower.min(node.bound());
            break;
        }
        nodes += 1;

        let support = tree.rounded_support(&node.relaxation);
        if tried.insert(support.clone()) {
            let (value, w) = tree.refit(&support)?;
            if value < upper {
                log::debug!("bnb: node {} improves incumbent to {:.6e}", nodes, value);
                upper = value;
                best = w;
            }
        }

        let j = match tree.branching_variable(&node) {
            Some(j) => j,
            None => {
                // Integral relaxation: nothing left to branch on, the
                // indicators give the support.
                let support: Vec<usize> =
                    (0..p).filter(|&j| node.relaxation.z[j] > 0.5).collect();
                if tried.insert(support.clone()) {
                    let (value, w) = tree.refit(&support)?;
                    if value < upper {
                        upper = value;
                        best = w;
                    }
                }
                continue;
            }
        };
        for value in [false, true] {
            let mut fixed = node.fixed.clone();
            fixed[j] = Some(value);
            if let Some(relaxation) = tree.relax(&fixed)? {
                let child = Node { fixed, relaxation };
                if relative_gap(upper, child.bound()) > settings.gap_tol {
                    heap.push(child);
                } else {
                    lower = lower.min(child.bound());
                }
            }
        }
    }
    if status == BnbStatus::Optimal {
        lower = lower.min(upper);
    } else if let Some(open) = heap.peek() {
        lower = lower.min(open.bound());
    }

    let gap = relative_gap(upper, lower);
    log::debug!(
        "bnb: {:?} after {} nodes, value = {:.6e}, gap = {:.2e}",
        status,
        nodes,
        upper,
        gap
    );
    Ok(BnbOutcome {
        status,
        w: best,
        value: upper,
        lower_bound: lower,
        relative_gap: gap,
        nodes,
    })
}
