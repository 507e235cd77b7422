//! Sparse identification of nonlinear dynamics.
//!
//! A trajectory of a polynomial dynamical system is simulated, its
//! derivatives are estimated by smoothed finite differences, and the system
//! coefficients are recovered by sparse regression of the derivatives on a
//! polynomial library of the noisy states.

use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::Deserialize;

use super::{rng_from_state, standard_normal, DataBundle, Dataset};
use crate::error::{BenchError, Result};

/// RK4 steps per sampling interval.
const SUBSTEPS: usize = 10;

/// Savitzky-Golay window and polynomial order used before differencing.
const SMOOTHING_WINDOW: usize = 11;
const SMOOTHING_ORDER: usize = 3;

/// A monomial as the sorted list of the state indices it multiplies;
/// `&[]` is the constant term and `&[0, 0, 2]` is `x0² x2`.
type Monomial = &'static [usize];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OdeSystem {
    Lorenz,
    VanderPol,
    Duffing,
    Lotka,
    Hopf,
    Rossler,
    Meanfield,
    AtmosphericOscillator,
    Mhd,
}

const LORENZ: (f64, f64, f64) = (10.0, 8.0 / 3.0, 28.0);
const VANDERPOL_MU: f64 = 0.5;
const DUFFING: (f64, f64) = (-1.0, 1.0);
const LOTKA: (f64, f64) = (1.0, 10.0);
const HOPF: (f64, f64, f64) = (-0.05, 1.0, 1.0);
const ROSSLER: (f64, f64, f64) = (0.2, 0.2, 5.7);
const MEANFIELD: (f64, f64, f64, f64) = (0.1, 1.0, -1.0, 1.0);
const ATMOSPHERIC: (f64, f64, f64, f64, f64, f64) = (0.05, -0.01, 3.0, -2.0, -5.0, 1.1);
/// Viscosity and resistivity of the MHD model.
const MHD: (f64, f64) = (0.0, 0.0);

/// Spread of sampled initial conditions around a canonical trajectory, as a
/// fraction of the per-state standard deviation.
const CLOSENESS: f64 = 10.0;

fn term(monomial: Monomial, coef: f64) -> (Monomial, f64) {
    (monomial, coef)
}

impl OdeSystem {
    pub fn dim(self) -> usize {
        match self {
            OdeSystem::Lorenz
            | OdeSystem::Rossler
            | OdeSystem::Meanfield
            | OdeSystem::AtmosphericOscillator => 3,
            OdeSystem::VanderPol | OdeSystem::Lotka | OdeSystem::Hopf => 2,
            OdeSystem::Duffing => 4,
            OdeSystem::Mhd => 6,
        }
    }

    fn rhs(self, x: &[f64], dx: &mut [f64]) {
        match self {
            OdeSystem::Lorenz => {
                let (sigma, beta, rho) = LORENZ;
                dx[0] = sigma * (x[1] - x[0]);
                dx[1] = x[0] * (rho - x[2]) - x[1];
                dx[2] = x[0] * x[1] - beta * x[2];
            }
            OdeSystem::VanderPol => {
                let mu = VANDERPOL_MU;
                dx[0] = x[1];
                dx[1] = mu * (1.0 - x[0] * x[0]) * x[1] - x[0];
            }
            OdeSystem::Duffing => {
                let (omega, alpha) = DUFFING;
                dx[0] = x[2];
                dx[1] = x[3];
                dx[2] = -omega * x[0] - alpha * (x[0].powi(3) + x[0] * x[1] * x[1]);
                dx[3] = -omega * x[1] - alpha * (x[0] * x[0] * x[1] + x[1].powi(3));
            }
            OdeSystem::Lotka => {
                let (a, b) = LOTKA;
                dx[0] = a * x[0] - b * x[0] * x[1];
                dx[1] = b * x[0] * x[1] - 2.0 * a * x[1];
            }
            OdeSystem::Hopf => {
                let (mu, omega, amp) = HOPF;
                let r2 = x[0] * x[0] + x[1] * x[1];
                dx[0] = mu * x[0] - omega * x[1] - amp * x[0] * r2;
                dx[1] = omega * x[0] + mu * x[1] - amp * x[1] * r2;
            }
            OdeSystem::Rossler => {
                let (a, b, c) = ROSSLER;
                dx[0] = -x[1] - x[2];
                dx[1] = x[0] + a * x[1];
                dx[2] = b + (x[0] - c) * x[2];
            }
            OdeSystem::Meanfield => {
                let (mu, omega, a, lambda) = MEANFIELD;
                dx[0] = mu * x[0] - omega * x[1] + a * x[0] * x[2];
                dx[1] = omega * x[0] + mu * x[1] + a * x[1] * x[2];
                dx[2] = lambda * (x[0] * x[0] + x[1] * x[1] - x[2]);
            }
            OdeSystem::AtmosphericOscillator => {
                let (mu1, mu2, omega, alpha, beta, sigma) = ATMOSPHERIC;
                let rotation = omega + alpha * x[1] + beta * x[2];
                dx[0] = mu1 * x[0] + sigma * x[0] * x[1];
                dx[1] = mu2 * x[1] + rotation * x[2] - sigma * x[0] * x[0];
                dx[2] = mu2 * x[2] - rotation * x[1];
            }
            OdeSystem::Mhd => {
                let (nu, mu) = MHD;
                dx[0] = -2.0 * nu * x[0] + 4.0 * (x[1] * x[2] - x[4] * x[5]);
                dx[1] = -5.0 * nu * x[1] - 7.0 * (x[0] * x[2] - x[3] * x[5]);
                dx[2] = -9.0 * nu * x[2] + 3.0 * (x[0] * x[1] - x[3] * x[4]);
                dx[3] = -2.0 * mu * x[3] + 2.0 * (x[1] * x[5] - x[2] * x[4]);
                dx[4] = -5.0 * mu * x[4] + 5.0 * (x[2] * x[3] - x[0] * x[5]);
                dx[5] = -9.0 * mu * x[5] + 9.0 * (x[0] * x[4] - x[1] * x[3]);
            }
        }
    }

    /// Non-zero coefficients of every equation.
    fn equations(self) -> Vec<Vec<(Monomial, f64)>> {
        match self {
            OdeSystem::Lorenz => {
                let (sigma, beta, rho) = LORENZ;
                vec![
                    vec![term(&[0], -sigma), term(&[1], sigma)],
                    vec![term(&[0], rho), term(&[1], -1.0), term(&[0, 2], -1.0)],
                    vec![term(&[2], -beta), term(&[0, 1], 1.0)],
                ]
            }
            OdeSystem::VanderPol => {
                let mu = VANDERPOL_MU;
                vec![
                    vec![term(&[1], 1.0)],
                    vec![term(&[0], -1.0), term(&[1], mu), term(&[0, 0, 1], -mu)],
                ]
            }
            OdeSystem::Duffing => {
                let (omega, alpha) = DUFFING;
                vec![
                    vec![term(&[2], 1.0)],
                    vec![term(&[3], 1.0)],
                    vec![term(&[0], -omega), term(&[0, 0, 0], -alpha), term(&[0, 1, 1], -alpha)],
                    vec![term(&[1], -omega), term(&[0, 0, 1], -alpha), term(&[1, 1, 1], -alpha)],
                ]
            }
            OdeSystem::Lotka => {
                let (a, b) = LOTKA;
                vec![
                    vec![term(&[0], a), term(&[0, 1], -b)],
                    vec![term(&[1], -2.0 * a), term(&[0, 1], b)],
                ]
            }
            OdeSystem::Hopf => {
                let (mu, omega, amp) = HOPF;
                vec![
                    vec![term(&[0], mu), term(&[1], -omega), term(&[0, 0, 0], -amp), term(&[0, 1, 1], -amp)],
                    vec![term(&[0], omega), term(&[1], mu), term(&[0, 0, 1], -amp), term(&[1, 1, 1], -amp)],
                ]
            }
            OdeSystem::Rossler => {
                let (a, b, c) = ROSSLER;
                vec![
                    vec![term(&[1], -1.0), term(&[2], -1.0)],
                    vec![term(&[0], 1.0), term(&[1], a)],
                    vec![term(&[], b), term(&[2], -c), term(&[0, 2], 1.0)],
                ]
            }
            OdeSystem::Meanfield => {
                let (mu, omega, a, lambda) = MEANFIELD;
                vec![
                    vec![term(&[0], mu), term(&[1], -omega), term(&[0, 2], a)],
                    vec![term(&[0], omega), term(&[1], mu), term(&[1, 2], a)],
                    vec![term(&[2], -lambda), term(&[0, 0], lambda), term(&[1, 1], lambda)],
                ]
            }
            OdeSystem::AtmosphericOscillator => {
                let (mu1, mu2, omega, alpha, beta, sigma) = ATMOSPHERIC;
                vec![
                    vec![term(&[0], mu1), term(&[0, 1], sigma)],
                    vec![
                        term(&[1], mu2),
                        term(&[2], omega),
                        term(&[0, 0], -sigma),
                        term(&[1, 2], alpha),
                        term(&[2, 2], beta),
                    ],
                    vec![
                        term(&[1], -omega),
                        term(&[2], mu2),
                        term(&[1, 1], -alpha),
                        term(&[1, 2], -beta),
                    ],
                ]
            }
            OdeSystem::Mhd => {
                let (nu, mu) = MHD;
                vec![
                    vec![term(&[0], -2.0 * nu), term(&[1, 2], 4.0), term(&[4, 5], -4.0)],
                    vec![term(&[1], -5.0 * nu), term(&[0, 2], -7.0), term(&[3, 5], 7.0)],
                    vec![term(&[2], -9.0 * nu), term(&[0, 1], 3.0), term(&[3, 4], -3.0)],
                    vec![term(&[3], -2.0 * mu), term(&[1, 5], 2.0), term(&[2, 4], -2.0)],
                    vec![term(&[4], -5.0 * mu), term(&[2, 3], 5.0), term(&[0, 5], -5.0)],
                    vec![term(&[5], -9.0 * mu), term(&[0, 4], 9.0), term(&[1, 3], -9.0)],
                ]
            }
        }
    }

    /// Smallest library degree that contains every true term.
    pub fn min_degree(self) -> usize {
        self.equations()
            .iter()
            .flatten()
            .map(|(m, _)| m.len())
            .max()
            .unwrap_or(0)
    }

    /// True coefficients as a `dim x library size` matrix.
    pub fn true_coefficients(self, degree: usize) -> Result<DMatrix<f64>> {
        if degree < self.min_degree() {
            return Err(BenchError::InvalidParameter(format!(
                "{:?} needs a library of degree at least {}, got {}",
                self,
                self.min_degree(),
                degree
            )));
        }
        let library = polynomial_library(self.dim(), degree);
        let mut coefs = DMatrix::zeros(self.dim(), library.len());
        for (row, terms) in self.equations().into_iter().enumerate() {
            for (monomial, value) in terms {
                let col = library
                    .iter()
                    .position(|m| m.as_slice() == monomial)
                    .ok_or_else(|| {
                        BenchError::InvalidParameter(format!("monomial {:?} not in library", monomial))
                    })?;
                coefs[(row, col)] = value;
            }
        }
        Ok(coefs)
    }

    fn sample_initial_condition(self, rng: &mut StdRng) -> Result<Vec<f64>> {
        Ok(match self {
            OdeSystem::Lorenz => vec![
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-5.0..5.0),
                rng.gen_range(10.0..40.0),
            ],
            OdeSystem::VanderPol => vec![
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-VANDERPOL_MU..VANDERPOL_MU),
            ],
            OdeSystem::Duffing => (0..4).map(|_| rng.gen_range(-PI..PI)).collect(),
            OdeSystem::Lotka => (0..2).map(|_| rng.gen_range(0.0..1.0f64)).collect(),
            OdeSystem::Hopf => {
                let theta: f64 = rng.gen_range(0.0..2.0 * PI);
                let r: f64 = rng.gen_range(0.75..1.25);
                vec![r * theta.cos(), r * theta.sin()]
            }
            OdeSystem::Rossler => {
                // z must stay nonnegative.
                let mut x0 = self.near_canonical(&[5.0, 3.0, 0.0], rng)?;
                x0[2] = x0[2].abs();
                x0
            }
            OdeSystem::Meanfield => {
                let mu = MEANFIELD.0;
                self.near_canonical(&[mu, mu, 0.0], rng)?
            }
            OdeSystem::AtmosphericOscillator => self.near_canonical(&[0.2, 0.1, 0.4], rng)?,
            OdeSystem::Mhd => (0..6).map(|_| rng.gen_range(-1.5..1.5)).collect(),
        })
    }

    /// A Gaussian perturbation of a random point of the trajectory from
    /// `start`, scaled by the spread of each state along it.
    fn near_canonical(self, start: &[f64], rng: &mut StdRng) -> Result<Vec<f64>> {
        let canonical = simulate(self, start, 10.0, 0.01)?;
        let row = rng.gen_range(0..canonical.nrows());
        let n = canonical.nrows() as f64;
        Ok(canonical
            .column_iter()
            .map(|col| {
                let mean = col.mean();
                let std = (col.map(|v| (v - mean).powi(2)).sum() / n).sqrt();
                let z: f64 = rng.sample(StandardNormal);
                col[row] + z * std / CLOSENESS
            })
            .collect())
    }
}

/// Monomials of total degree at most `degree` in `dim` variables, by
/// increasing degree and, within a degree, in combinations-with-replacement
/// order.
pub fn polynomial_library(dim: usize, degree: usize) -> Vec<Vec<usize>> {
    fn extend(dim: usize, left: usize, start: usize, cur: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if left == 0 {
            out.push(cur.clone());
            return;
        }
        for v in start..dim {
            cur.push(v);
            extend(dim, left - 1, v, cur, out);
            cur.pop();
        }
    }

    let mut out = Vec::new();
    for order in 0..=degree {
        extend(dim, order, 0, &mut Vec::new(), &mut out);
    }
    out
}

/// Evaluate the library on every row of `states`.
pub fn library_features(states: &DMatrix<f64>, degree: usize) -> DMatrix<f64> {
    let library = polynomial_library(states.ncols(), degree);
    DMatrix::from_fn(states.nrows(), library.len(), |i, j| {
        library[j].iter().map(|&v| states[(i, v)]).product()
    })
}

/// Integrate with classical RK4 and return the states at `0, dt, 2dt, ...`
/// strictly before `duration`.
pub fn simulate(system: OdeSystem, x0: &[f64], duration: f64, dt: f64) -> Result<DMatrix<f64>> {
    let dim = system.dim();
    if x0.len() != dim {
        return Err(crate::error::shape_mismatch(dim, x0.len()));
    }
    if !(dt > 0.0) || !(duration > 0.0) {
        return Err(BenchError::InvalidParameter(format!(
            "duration and dt must be positive, got {} and {}",
            duration, dt
        )));
    }
    let n_steps = (duration / dt - 1e-9).ceil() as usize;
    let h = dt / SUBSTEPS as f64;

    let mut out = DMatrix::zeros(n_steps, dim);
    let mut x = x0.to_vec();
    let (mut k1, mut k2, mut k3, mut k4) =
        (vec![0.0; dim], vec![0.0; dim], vec![0.0; dim], vec![0.0; dim]);
    let mut tmp = vec![0.0; dim];
    for step in 0..n_steps {
        for (j, v) in x.iter().enumerate() {
            out[(step, j)] = *v;
        }
        for _ in 0..SUBSTEPS {
            system.rhs(&x, &mut k1);
            for j in 0..dim {
                tmp[j] = x[j] + 0.5 * h * k1[j];
            }
            system.rhs(&tmp, &mut k2);
            for j in 0..dim {
                tmp[j] = x[j] + 0.5 * h * k2[j];
            }
            system.rhs(&tmp, &mut k3);
            for j in 0..dim {
                tmp[j] = x[j] + h * k3[j];
            }
            system.rhs(&tmp, &mut k4);
            for j in 0..dim {
                x[j] += h / 6.0 * (k1[j] + 2.0 * k2[j] + 2.0 * k3[j] + k4[j]);
            }
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(BenchError::NumericalError(format!(
                "{:?} trajectory diverged at step {}",
                system, step
            )));
        }
    }
    Ok(out)
}

/// Savitzky-Golay smoothing of every column. Points near the ends use the
/// polynomial fitted on the first or last full window.
fn savgol_smooth(x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let n = x.nrows();
    let mut window = SMOOTHING_WINDOW.min(n);
    if window % 2 == 0 {
        window -= 1;
    }
    if window <= SMOOTHING_ORDER {
        return Ok(x.clone());
    }

    // Hat matrix of the polynomial fit on a window, abscissae in [-1, 1].
    let half = (window - 1) as f64 / 2.0;
    let vander = DMatrix::from_fn(window, SMOOTHING_ORDER + 1, |i, k| {
        ((i as f64 - half) / half).powi(k as i32)
    });
    let gram_inv = vander
        .tr_mul(&vander)
        .try_inverse()
        .ok_or_else(|| BenchError::NumericalError("singular smoothing system".into()))?;
    let hat = &vander * gram_inv * vander.transpose();

    let mid = window / 2;
    let mut out = DMatrix::zeros(n, x.ncols());
    for i in 0..n {
        let start = i.saturating_sub(mid).min(n - window);
        let weights = hat.row(i - start);
        for j in 0..x.ncols() {
            out[(i, j)] = (0..window).map(|r| weights[r] * x[(start + r, j)]).sum();
        }
    }
    Ok(out)
}

/// Second order finite differences, centred inside and one-sided at the ends.
fn finite_difference(x: &DMatrix<f64>, dt: f64) -> Result<DMatrix<f64>> {
    let n = x.nrows();
    if n < 3 {
        return Err(BenchError::InvalidParameter(format!(
            "need at least 3 time steps to differentiate, got {}",
            n
        )));
    }
    let mut v = DMatrix::zeros(n, x.ncols());
    for j in 0..x.ncols() {
        v[(0, j)] = (-3.0 * x[(0, j)] + 4.0 * x[(1, j)] - x[(2, j)]) / (2.0 * dt);
        for i in 1..n - 1 {
            v[(i, j)] = (x[(i + 1, j)] - x[(i - 1, j)]) / (2.0 * dt);
        }
        v[(n - 1, j)] =
            (3.0 * x[(n - 1, j)] - 4.0 * x[(n - 2, j)] + x[(n - 3, j)]) / (2.0 * dt);
    }
    Ok(v)
}

/// Block-diagonal matrix with `copies` copies of `block`.
fn block_diag(block: &DMatrix<f64>, copies: usize) -> DMatrix<f64> {
    let (r, c) = block.shape();
    let mut out = DMatrix::zeros(r * copies, c * copies);
    for b in 0..copies {
        out.view_mut((b * r, b * c), (r, c)).copy_from(block);
    }
    out
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Ode {
    pub system: OdeSystem,
    pub degree: usize,
    pub duration: f64,
    /// Noise standard deviation relative to the Frobenius norm of the states.
    pub noise_ratio: f64,
    pub dt: f64,
    pub seed: Option<u64>,
}

impl Default for Ode {
    fn default() -> Self {
        Ode {
            system: OdeSystem::Lorenz,
            degree: 3,
            duration: 1.0,
            noise_ratio: 0.001,
            dt: 0.01,
            seed: None,
        }
    }
}

impl Dataset for Ode {
    fn name(&self) -> &str {
        "ode"
    }

    fn label(&self) -> String {
        format!(
            "ode[system={:?},degree={},duration={},noise_ratio={},dt={}]",
            self.system, self.degree, self.duration, self.noise_ratio, self.dt
        )
    }

    fn get_data(&self) -> Result<DataBundle> {
        if !(self.noise_ratio >= 0.0) {
            return Err(BenchError::InvalidParameter(format!(
                "noise_ratio must be nonnegative, got {}",
                self.noise_ratio
            )));
        }
        let coefs = self.system.true_coefficients(self.degree)?;
        let mut rng = rng_from_state(self.seed);

        let x0 = self.system.sample_initial_condition(&mut rng)?;
        let states = simulate(self.system, &x0, self.duration, self.dt)?;
        let derivatives = finite_difference(&savgol_smooth(&states)?, self.dt)?;

        let sigma = states.norm() * self.noise_ratio;
        let noise = standard_normal(states.len(), &mut rng) * sigma;
        let noisy =
            &states + DMatrix::from_column_slice(states.nrows(), states.ncols(), noise.as_slice());

        let dim = self.system.dim();
        let x = block_diag(&library_features(&noisy, self.degree), dim);
        let y = DVector::from_column_slice(derivatives.as_slice());
        // Row-major flattening matches the block order of the design.
        let w_true = DVector::from_column_slice(coefs.transpose().as_slice());

        log::debug!(
            "ode {:?}: {} time steps, library of {} terms",
            self.system,
            states.nrows(),
            coefs.ncols()
        );
        DataBundle::new(x, y, Some(w_true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_order() {
        let lib = polynomial_library(2, 3);
        assert_eq!(lib.len(), 10);
        assert_eq!(lib[0], Vec::<usize>::new());
        assert_eq!(lib[3], vec![0, 0]);
        assert_eq!(lib[4], vec![0, 1]);
        assert_eq!(lib[8], vec![0, 1, 1]);
        assert_eq!(polynomial_library(3, 3).len(), 20);
        assert_eq!(polynomial_library(4, 3).len(), 35);
    }

    #[test]
    fn test_lorenz_coefficients_positions() {
        let c = OdeSystem::Lorenz.true_coefficients(3).unwrap();
        assert_eq!(c.shape(), (3, 20));
        assert_eq!(c[(0, 1)], -10.0);
        assert_eq!(c[(0, 2)], 10.0);
        assert_eq!(c[(1, 6)], -1.0);
        assert_eq!(c[(2, 5)], 1.0);
        assert!(OdeSystem::Hopf.true_coefficients(2).is_err());
    }

    #[test]
    fn test_quadratic_systems_coefficients() {
        // Library of degree 3 in 3 states: 1, x0, x1, x2, x0², x0x1, x0x2, ...
        let c = OdeSystem::Meanfield.true_coefficients(3).unwrap();
        assert_eq!(c[(0, 6)], -1.0);
        assert_eq!(c[(1, 8)], -1.0);
        assert_eq!(c[(2, 3)], -1.0);
        assert_eq!(c[(2, 7)], 1.0);

        let c = OdeSystem::AtmosphericOscillator.true_coefficients(2).unwrap();
        assert_eq!(c.shape(), (3, 10));
        assert_eq!(c[(1, 9)], -5.0);
        assert_eq!(c[(2, 7)], 2.0);

        let c = OdeSystem::Mhd.true_coefficients(3).unwrap();
        assert_eq!(c.shape(), (6, 84));
        assert_eq!(OdeSystem::Mhd.min_degree(), 2);
        // Ideal MHD: only the six pairs of quadratic couplings.
        assert_eq!(c.iter().filter(|v| **v != 0.0).count(), 12);
    }

    #[test]
    fn test_rhs_agrees_with_coefficients() {
        let state = [0.3, -0.7, 0.2, 0.5, -0.1, 0.9];
        for system in [OdeSystem::Meanfield, OdeSystem::AtmosphericOscillator, OdeSystem::Mhd] {
            let dim = system.dim();
            let x = &state[..dim];
            let mut dx = vec![0.0; dim];
            system.rhs(x, &mut dx);
            let library = polynomial_library(dim, 2);
            let features: Vec<f64> =
                library.iter().map(|m| m.iter().map(|&i| x[i]).product()).collect();
            let coefs = system.true_coefficients(2).unwrap();
            for row in 0..dim {
                let predicted: f64 =
                    features.iter().enumerate().map(|(j, f)| coefs[(row, j)] * f).sum();
                assert!((predicted - dx[row]).abs() < 1e-12, "{:?} row {}", system, row);
            }
        }
    }

    #[test]
    fn test_derivatives_of_smooth_signal() {
        let dt = 0.01;
        let x = DMatrix::from_fn(100, 1, |i, _| (i as f64 * dt).sin());
        let v = finite_difference(&savgol_smooth(&x).unwrap(), dt).unwrap();
        for i in 0..100 {
            assert!((v[(i, 0)] - (i as f64 * dt).cos()).abs() < 1e-3);
        }
    }

    #[test]
    fn test_noiseless_derivatives_match_coefficients() {
        let ds = Ode {
            system: OdeSystem::VanderPol,
            noise_ratio: 0.0,
            seed: Some(0),
            ..Default::default()
        };
        let data = ds.get_data().unwrap();
        let n = 100;
        assert_eq!(data.x.shape(), (2 * n, 2 * 10));
        let residual = &data.y - &data.x * data.w_true.as_ref().unwrap();
        assert!(residual.amax() < 1e-2 * data.y.amax().max(1.0));
    }

    #[test]
    fn test_all_systems_generate() {
        for system in [
            OdeSystem::Lorenz,
            OdeSystem::VanderPol,
            OdeSystem::Duffing,
            OdeSystem::Lotka,
            OdeSystem::Hopf,
            OdeSystem::Rossler,
            OdeSystem::Meanfield,
            OdeSystem::AtmosphericOscillator,
            OdeSystem::Mhd,
        ] {
            let ds = Ode {
                system,
                seed: Some(1),
                duration: 0.2,
                ..Default::default()
            };
            let data = ds.get_data().unwrap();
            assert_eq!(data.n_features(), system.dim() * polynomial_library(system.dim(), 3).len());
        }
    }
}
