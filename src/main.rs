use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde::Serialize;

use sparsebench::config::{BenchConfig, DatasetConfig, SolverConfig};
use sparsebench::runner::{run_benchmark, RunRecord};
use sparsebench::Result;

#[derive(Parser)]
#[command(
    name = "sparsebench",
    about = "Benchmark sparse regression solvers",
    long_about = "Runs L0 and L1 sparse regression solvers on simulated and real datasets \
                  along the stop values of their stopping criteria, and scores every run \
                  against the data and the true signal."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the benchmark described by a TOML file
    Run {
        /// Benchmark description (.toml)
        #[arg(long, value_name = "PATH")]
        config: PathBuf,

        /// Write one CSV row per recorded run
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// List the dataset and solver kinds
    List,
}

/// One CSV row; statistics against the true signal are empty when unknown.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    dataset: &'a str,
    solver: &'a str,
    run: usize,
    stop_val: f64,
    progress: f64,
    elapsed: f64,
    objective_value: f64,
    n_nnz: usize,
    solve_time: Option<f64>,
    k: Option<usize>,
    rho: Option<f64>,
    relative_gap: Option<f64>,
    w_snr: Option<f64>,
    xw_snr: Option<f64>,
    tpr: Option<f64>,
    fpr: Option<f64>,
    tnr: Option<f64>,
    fnr: Option<f64>,
    f1s: Option<f64>,
    auc: Option<f64>,
}

impl<'a> From<&'a RunRecord> for CsvRow<'a> {
    fn from(r: &'a RunRecord) -> Self {
        let e = &r.evaluation;
        let stats = e.stats.as_ref();
        CsvRow {
            dataset: &r.dataset,
            solver: &r.solver,
            run: r.run,
            stop_val: r.stop_val,
            progress: r.progress,
            elapsed: r.elapsed,
            objective_value: e.value,
            n_nnz: e.n_nnz,
            solve_time: e.solve_time,
            k: e.k,
            rho: e.rho,
            relative_gap: e.relative_gap,
            w_snr: stats.map(|s| s.w_snr),
            xw_snr: stats.map(|s| s.xw_snr),
            tpr: stats.map(|s| s.tpr),
            fpr: stats.map(|s| s.fpr),
            tnr: stats.map(|s| s.tnr),
            fnr: stats.map(|s| s.fnr),
            f1s: stats.map(|s| s.f1s),
            auc: stats.map(|s| s.auc),
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config, output } => run_command(&config, output.as_deref()),
        Commands::List => {
            list_command();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_command(config_path: &Path, output: Option<&Path>) -> Result<()> {
    let config = BenchConfig::from_file(config_path)?;
    let datasets = config.datasets();
    let mut solvers = config.solvers();
    log::info!(
        "{} datasets x {} solvers, at most {} runs each",
        datasets.len(),
        solvers.len(),
        config.run.max_runs
    );

    let records = run_benchmark(&config.objective, &datasets, &mut solvers, &config.run)?;
    for r in &records {
        println!(
            "{:<24} {:<40} run {:>3}  stop {:<10.3e} objective {:.6e}  nnz {}",
            r.dataset, r.solver, r.run, r.stop_val, r.evaluation.value, r.evaluation.n_nnz
        );
    }

    if let Some(path) = output {
        log::info!("writing {} rows to {}", records.len(), path.display());
        let mut writer = csv::Writer::from_path(path)?;
        for r in &records {
            writer.serialize(CsvRow::from(r))?;
        }
        writer.flush()?;
    }
    Ok(())
}

fn list_command() {
    println!("datasets: {}", DatasetConfig::KINDS.join(", "));
    println!("solvers:  {}", SolverConfig::KINDS.join(", "));
}
