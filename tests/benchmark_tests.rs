//! Whole benchmarks described in TOML, from file to records.

use std::collections::BTreeSet;
use std::io::Write;

use sparsebench::prelude::*;
use tempfile::NamedTempFile;

fn config_file(text: &str) -> NamedTempFile {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(text.as_bytes()).unwrap();
    f.flush().unwrap();
    f
}

#[test]
fn test_benchmark_from_file() {
    let f = config_file(
        r#"
        [objective]
        lmbd_ratio = 0.05

        [run]
        max_runs = 12

        [[datasets]]
        kind = "simulated"
        n_samples = 25
        n_features = 30
        density = 0.1
        random_state = 0

        [[datasets]]
        kind = "deconvolution"
        n_features = 20
        k = 2
        random_state = 1

        [[solvers]]
        kind = "ista"
        acceleration = true

        [[solvers]]
        kind = "omp"

        [[solvers]]
        kind = "iht"
        "#,
    );
    let config = BenchConfig::from_file(f.path()).unwrap();
    let datasets = config.datasets();
    let mut solvers = config.solvers();
    let records = run_benchmark(&config.objective, &datasets, &mut solvers, &config.run).unwrap();

    let pairs: BTreeSet<(String, String)> = records
        .iter()
        .map(|r| (r.dataset.clone(), r.solver.clone()))
        .collect();
    assert_eq!(pairs.len(), 6, "every solver ran on every dataset: {:?}", pairs);

    for pair in &pairs {
        let runs: Vec<&RunRecord> = records
            .iter()
            .filter(|r| (&r.dataset, &r.solver) == (&pair.0, &pair.1))
            .collect();
        assert!(runs.len() <= 12, "{:?}: {} runs", pair, runs.len());
        for (i, r) in runs.iter().enumerate() {
            assert_eq!(r.run, i);
            assert!(r.elapsed >= 0.0);
            assert!(r.evaluation.stats.is_some());
        }
    }
}

#[test]
fn test_failing_solver_does_not_stop_the_benchmark() {
    // An l1_ratio of zero is rejected when the problem is set.
    let config = BenchConfig::from_toml_str(
        r#"
        [[datasets]]
        kind = "simulated"
        n_samples = 10
        n_features = 8
        random_state = 2

        [[solvers]]
        kind = "enet"
        l1_ratio = 0.0

        [[solvers]]
        kind = "zero"
        "#,
    )
    .unwrap();
    let records = run_benchmark(
        &config.objective,
        &config.datasets(),
        &mut config.solvers(),
        &config.run,
    )
    .unwrap();
    assert!(!records.is_empty());
    assert!(records.iter().all(|r| r.solver == "zero"));
}

#[test]
fn test_failing_dataset_aborts() {
    let config = BenchConfig::from_toml_str(
        r#"
        [[datasets]]
        kind = "libsvm"
        path = "/nonexistent/bodyfat.libsvm"

        [[solvers]]
        kind = "zero"
        "#,
    )
    .unwrap();
    let result = run_benchmark(
        &config.objective,
        &config.datasets(),
        &mut config.solvers(),
        &config.run,
    );
    assert!(result.is_err());
}

#[test]
fn test_missing_config_file() {
    assert!(BenchConfig::from_file("/nonexistent/bench.toml").is_err());
}
