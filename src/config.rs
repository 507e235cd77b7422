//! TOML benchmark description.
//!
//! ```toml
//! [objective]
//! lmbd_ratio = 0.1
//!
//! [run]
//! max_runs = 50
//!
//! [[datasets]]
//! kind = "simulated"
//! n_samples = 100
//! n_features = 200
//!
//! [[solvers]]
//! kind = "ista"
//! acceleration = true
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::dataset::{
    Bourguignon, Dataset, Deconvolution, Libsvm, Ode, Portfolio, Simulated, Tabular,
};
use crate::error::{BenchError, Result};
use crate::objective::Objective;
use crate::runner::RunOptions;
use crate::solvers::{
    ElasticNetPath, Fista, Glm, Iht, IhtWarm, Ista, L0Bnb, L0Cd, L0Constraint, L0L2Reg, Lars,
    LassoPath, Mip, Omp, Solver, ZeroSolver,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchConfig {
    pub objective: Objective,
    pub run: RunOptions,
    pub datasets: Vec<DatasetConfig>,
    pub solvers: Vec<SolverConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatasetConfig {
    Simulated(Simulated),
    Deconvolution(Deconvolution),
    Bourguignon(Bourguignon),
    Tabular(Tabular),
    Portfolio(Portfolio),
    Libsvm(Libsvm),
    Ode(Ode),
}

impl DatasetConfig {
    pub const KINDS: &'static [&'static str] = &[
        "simulated",
        "deconvolution",
        "bourguignon",
        "tabular",
        "portfolio",
        "libsvm",
        "ode",
    ];

    pub fn build(self) -> Box<dyn Dataset> {
        match self {
            DatasetConfig::Simulated(d) => Box::new(d),
            DatasetConfig::Deconvolution(d) => Box::new(d),
            DatasetConfig::Bourguignon(d) => Box::new(d),
            DatasetConfig::Tabular(d) => Box::new(d),
            DatasetConfig::Portfolio(d) => Box::new(d),
            DatasetConfig::Libsvm(d) => Box::new(d),
            DatasetConfig::Ode(d) => Box::new(d),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SolverConfig {
    Zero(ZeroSolver),
    Ista(Ista),
    Fista(Fista),
    Iht(Iht),
    IhtWarm(IhtWarm),
    Omp(Omp),
    Lars(Lars),
    Lasso(LassoPath),
    Glm(Glm),
    Enet(ElasticNetPath),
    #[serde(rename = "l0cd")]
    L0Cd(L0Cd),
    #[serde(rename = "l0bnb")]
    L0Bnb(L0Bnb),
    Mip(Mip),
    #[serde(rename = "l0constraint")]
    L0Constraint(L0Constraint),
    #[serde(rename = "l0l2reg")]
    L0L2Reg(L0L2Reg),
}

impl SolverConfig {
    pub const KINDS: &'static [&'static str] = &[
        "zero",
        "ista",
        "fista",
        "iht",
        "iht_warm",
        "omp",
        "lars",
        "lasso",
        "glm",
        "enet",
        "l0cd",
        "l0bnb",
        "mip",
        "l0constraint",
        "l0l2reg",
    ];

    pub fn build(self) -> Box<dyn Solver> {
        match self {
            SolverConfig::Zero(s) => Box::new(s),
            SolverConfig::Ista(s) => Box::new(s),
            SolverConfig::Fista(s) => Box::new(s),
            SolverConfig::Iht(s) => Box::new(s),
            SolverConfig::IhtWarm(s) => Box::new(s),
            SolverConfig::Omp(s) => Box::new(s),
            SolverConfig::Lars(s) => Box::new(s),
            SolverConfig::Lasso(s) => Box::new(s),
            SolverConfig::Glm(s) => Box::new(s),
            SolverConfig::Enet(s) => Box::new(s),
            SolverConfig::L0Cd(s) => Box::new(s),
            SolverConfig::L0Bnb(s) => Box::new(s),
            SolverConfig::Mip(s) => Box::new(s),
            SolverConfig::L0Constraint(s) => Box::new(s),
            SolverConfig::L0L2Reg(s) => Box::new(s),
        }
    }
}

impl BenchConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: BenchConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        log::debug!("reading benchmark from {}", path.display());
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.datasets.is_empty() {
            return Err(BenchError::Config("no [[datasets]] given".into()));
        }
        if self.solvers.is_empty() {
            return Err(BenchError::Config("no [[solvers]] given".into()));
        }
        if self.run.max_runs == 0 {
            return Err(BenchError::Config("run.max_runs must be at least 1".into()));
        }
        if self.run.timeout_secs.is_some_and(|t| !(t > 0.0)) {
            return Err(BenchError::Config("run.timeout_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn datasets(&self) -> Vec<Box<dyn Dataset>> {
        self.datasets.iter().cloned().map(DatasetConfig::build).collect()
    }

    pub fn solvers(&self) -> Vec<Box<dyn Solver>> {
        self.solvers.iter().cloned().map(SolverConfig::build).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_every_section() {
        let config = BenchConfig::from_toml_str(
            r#"
            [objective]
            lmbd_ratio = 0.05
            fit_intercept = true

            [run]
            max_runs = 7
            timeout_secs = 2.5

            [[datasets]]
            kind = "simulated"
            n_samples = 30
            n_features = 40

            [[datasets]]
            kind = "ode"
            system = "vander_pol"

            [[solvers]]
            kind = "ista"
            acceleration = true

            [[solvers]]
            kind = "glm"
            estimator = "mcp"

            [[solvers]]
            kind = "l0l2reg"
            l0_ratio = 0.2
            "#,
        )
        .unwrap();
        assert_eq!(config.objective.lmbd_ratio, 0.05);
        assert!(config.objective.fit_intercept);
        assert_eq!(config.run.max_runs, 7);
        let names: Vec<String> = config.datasets().iter().map(|d| d.name().to_string()).collect();
        assert_eq!(names, vec!["simulated", "ode"]);
        let names: Vec<String> = config.solvers().iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["ista", "glm", "l0l2reg"]);
    }

    #[test]
    fn test_every_kind_parses_with_defaults() {
        for kind in SolverConfig::KINDS {
            let text = format!(
                "[[datasets]]\nkind = \"simulated\"\n[[solvers]]\nkind = \"{}\"\n",
                kind
            );
            let config = BenchConfig::from_toml_str(&text).unwrap();
            assert_eq!(config.solvers()[0].name(), *kind);
        }
    }

    #[test]
    fn test_rejects_unknown_kind_and_field() {
        let unknown = "[[datasets]]\nkind = \"nope\"\n[[solvers]]\nkind = \"zero\"\n";
        assert!(matches!(
            BenchConfig::from_toml_str(unknown),
            Err(BenchError::Toml(_))
        ));
        let typo = "[[datasets]]\nkind = \"simulated\"\nn_sample = 3\n[[solvers]]\nkind = \"zero\"\n";
        assert!(BenchConfig::from_toml_str(typo).is_err());
    }

    #[test]
    fn test_rejects_empty_benchmark() {
        assert!(matches!(
            BenchConfig::from_toml_str("[run]\nmax_runs = 3\n"),
            Err(BenchError::Config(_))
        ));
    }
}
