//! Integration tests for SdxBench
//!
//! End-to-end runs with synthetic operations, executed in-process so no
//! worker binary or pod is needed.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution as _, Normal};
use sdxbench::{
    BASELINE_LABEL, BenchOptions, CANDIDATE_LABEL, Distribution, IsolationMode, Operation,
    OperationDef, ReportError, RunError, Verbosity, Verdict, from_fn, render_result,
    run_and_report, run_with_options, write_result_file,
};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

fn options(result_dir: &tempfile::TempDir) -> BenchOptions {
    BenchOptions {
        warmup_time: Duration::from_millis(5),
        measurement_time: Duration::from_millis(20),
        warmup_iterations: 1,
        measurement_iterations: 2,
        forks: 2,
        verbosity: Verbosity::Quiet,
        isolation: IsolationMode::InProcess,
        result_path: result_dir.path().join("result.txt"),
        ..Default::default()
    }
}

fn sleeper(ms: u64) -> Box<dyn Operation> {
    from_fn(move || {
        std::thread::sleep(Duration::from_millis(ms));
        Ok(())
    })
}

fn constant(ms: f64, n: usize) -> Distribution {
    Distribution::from_samples(vec![ms; n])
}

fn pair(baseline: Distribution, candidate: Distribution) -> Vec<(String, Distribution)> {
    vec![
        (BASELINE_LABEL.to_string(), baseline),
        (CANDIDATE_LABEL.to_string(), candidate),
    ]
}

fn last_line(path: &std::path::Path) -> String {
    let content = std::fs::read_to_string(path).unwrap();
    content.lines().last().unwrap_or_default().to_string()
}

#[test]
fn test_identical_means_are_not_different() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("result.txt");
    let mut console = Vec::new();

    let report =
        write_result_file(&pair(constant(5.0, 500), constant(5.0, 500)), &path, &mut console)
            .unwrap();

    assert_eq!(report.verdict, Verdict::NotDifferent);
    assert_eq!(last_line(&path), "is not statistically different");
    assert_eq!(String::from_utf8(console).unwrap(), "baseline\nsdxTest\n");
}

#[test]
fn test_separated_constants_are_different_at_999() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("result.txt");

    let report = write_result_file(
        &pair(constant(5.0, 500), constant(50.0, 500)),
        &path,
        &mut std::io::sink(),
    )
    .unwrap();

    assert_eq!(report.verdict, Verdict::Different999);
    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        content,
        "baseline:\n\tmean:\t5\n\tstdev:\t0\n\t#:\t500\n\
         sdxTest:\n\tmean:\t50\n\tstdev:\t0\n\t#:\t500\n\
         \n\nis different with 99.9% confidence\n"
    );
}

#[test]
fn test_marginal_separation_is_deterministic_for_a_seed() {
    fn draw(seed: u64) -> Vec<(String, Distribution)> {
        let mut rng = StdRng::seed_from_u64(seed);
        let baseline = Normal::new(10.0, 1.0).unwrap();
        let candidate = Normal::new(10.3, 1.0).unwrap();
        pair(
            (0..100).map(|_| baseline.sample(&mut rng)).collect(),
            (0..100).map(|_| candidate.sample(&mut rng)).collect(),
        )
    }

    let first = sdxbench::RunReport::build(&draw(42)).unwrap();
    let second = sdxbench::RunReport::build(&draw(42)).unwrap();
    assert_eq!(first.verdict, second.verdict);
    assert_eq!(render_result(&first), render_result(&second));

    // The emitted level is the strictest one the test rejects at.
    let distributions = draw(42);
    let (baseline, candidate) = (&distributions[0].1, &distributions[1].1);
    let levels = [
        (0.999, Verdict::Different999),
        (0.99, Verdict::Different99),
        (0.95, Verdict::Different95),
    ];
    let expected = levels
        .iter()
        .find(|(confidence, _)| baseline.is_different(candidate, *confidence))
        .map_or(Verdict::NotDifferent, |(_, verdict)| *verdict);
    assert_eq!(first.verdict, expected);
}

#[test]
fn test_real_runs_are_compared() {
    fn fast() -> anyhow::Result<Box<dyn Operation>> {
        Ok(sleeper(5))
    }
    fn slow() -> anyhow::Result<Box<dyn Operation>> {
        Ok(sleeper(50))
    }
    let operations = [
        OperationDef::new(CANDIDATE_LABEL, slow),
        OperationDef::new(BASELINE_LABEL, fast),
    ];

    let dir = tempfile::tempdir().unwrap();
    let options = BenchOptions {
        warmup_iterations: 0,
        measurement_time: Duration::from_millis(50),
        ..options(&dir)
    };

    let report = run_and_report(&operations, &options).unwrap();
    assert_eq!(report.verdict, Verdict::Different999);

    let content = std::fs::read_to_string(&options.result_path).unwrap();
    assert!(content.starts_with("sdxTest:\n\tmean:\t"));
    assert!(content.ends_with("\n\nis different with 99.9% confidence\n"));
}

#[test]
fn test_warmup_latency_never_reaches_the_report() {
    fn warm_start() -> anyhow::Result<Box<dyn Operation>> {
        let mut first = true;
        Ok(from_fn(move || {
            let ms = if std::mem::take(&mut first) { 100 } else { 10 };
            std::thread::sleep(Duration::from_millis(ms));
            Ok(())
        }))
    }
    let operations = [OperationDef::new("warm", warm_start)];

    let dir = tempfile::tempdir().unwrap();
    let options = BenchOptions {
        warmup_time: Duration::from_millis(50),
        measurement_time: Duration::from_millis(30),
        ..options(&dir)
    };

    let distributions = run_with_options(&operations, &options).unwrap();
    let mean = distributions[0].1.mean();
    assert!((9.5..20.0).contains(&mean), "mean {mean} ms");
    assert!(distributions[0].1.max() < 100.0);
}

#[test]
fn test_sample_count_law() {
    static INVOCATIONS: AtomicU64 = AtomicU64::new(0);
    fn counted() -> anyhow::Result<Box<dyn Operation>> {
        Ok(from_fn(|| {
            INVOCATIONS.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(3));
            Ok(())
        }))
    }
    let operations = [OperationDef::new("counted", counted)];

    let dir = tempfile::tempdir().unwrap();
    let options = BenchOptions {
        warmup_iterations: 0,
        forks: 3,
        measurement_iterations: 4,
        measurement_time: Duration::from_millis(10),
        ..options(&dir)
    };

    let distributions = run_with_options(&operations, &options).unwrap();
    let n = distributions[0].1.n() as u64;
    assert!(n >= 3 * 4);
    assert_eq!(n, INVOCATIONS.load(Ordering::SeqCst));
}

#[test]
fn test_renamed_baseline_is_a_missing_label() {
    fn quick() -> anyhow::Result<Box<dyn Operation>> {
        Ok(from_fn(|| Ok(())))
    }
    let operations = [
        OperationDef::new(CANDIDATE_LABEL, quick),
        OperationDef::new("Baseline", quick),
    ];

    let dir = tempfile::tempdir().unwrap();
    let options = BenchOptions {
        warmup_iterations: 0,
        measurement_time: Duration::from_millis(1),
        ..options(&dir)
    };

    match run_and_report(&operations, &options) {
        Err(RunError::Report(ReportError::MissingLabel(label))) => assert_eq!(label, "baseline"),
        other => panic!("expected MissingLabel, got {other:?}"),
    }
    assert!(!options.result_path.exists());
}

#[test]
fn test_failing_operation_aborts_the_run() {
    fn refused() -> anyhow::Result<Box<dyn Operation>> {
        Ok(from_fn(|| -> anyhow::Result<()> {
            anyhow::bail!("connection refused")
        }))
    }
    fn quick() -> anyhow::Result<Box<dyn Operation>> {
        Ok(from_fn(|| Ok(())))
    }
    let operations = [
        OperationDef::new(CANDIDATE_LABEL, refused),
        OperationDef::new(BASELINE_LABEL, quick),
    ];

    let dir = tempfile::tempdir().unwrap();
    let options = BenchOptions {
        warmup_iterations: 0,
        ..options(&dir)
    };

    match run_and_report(&operations, &options) {
        Err(RunError::Operation { label, message }) => {
            assert_eq!(label, CANDIDATE_LABEL);
            assert!(message.contains("Measurement iteration 0"), "{message}");
            assert!(message.contains("connection refused"), "{message}");
        }
        other => panic!("expected an operation error, got {other:?}"),
    }
    assert!(!options.result_path.exists());
}

#[test]
fn test_zero_forks_is_rejected_before_anything_runs() {
    static TOUCHED: AtomicUsize = AtomicUsize::new(0);
    fn touched() -> anyhow::Result<Box<dyn Operation>> {
        TOUCHED.fetch_add(1, Ordering::SeqCst);
        Ok(from_fn(|| {
            TOUCHED.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
    }
    let operations = [
        OperationDef::new(CANDIDATE_LABEL, touched),
        OperationDef::new(BASELINE_LABEL, touched),
    ];

    let dir = tempfile::tempdir().unwrap();
    let options = BenchOptions {
        forks: 0,
        ..options(&dir)
    };

    assert!(matches!(
        run_and_report(&operations, &options),
        Err(RunError::Configuration(_))
    ));
    assert_eq!(TOUCHED.load(Ordering::SeqCst), 0);
    assert!(!options.result_path.exists());
}

#[test]
fn test_shipped_operations() {
    let labels: Vec<&str> = sdxbench::OPERATIONS.iter().map(|d| d.label).collect();
    assert_eq!(labels, vec!["sdxTest", "baseline"]);
}
