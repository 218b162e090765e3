//! Contract tests for the probe/record/compare protocol.
//!
//! Covers the fallback comparison properties over a deterministic value grid,
//! the reference scenarios, dump idempotence, and single session creation
//! under both lifecycle policies via a counting backend.
//!
//! Run: cargo test -p accuprobe-core --test probe_suite_contract_test

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use accuprobe_core::structured_log::{LogEmitter, validate_log_line};
use accuprobe_core::{
    CheckMode, DelegatingProber, ProbeBackend, ProbeConfig, ProbeError, ProbeSuite, Prober,
    SessionPolicy,
};

/// Backend that only counts calls and returns a fixed verdict.
struct CountingBackend {
    counters: Arc<Counters>,
    verdict: bool,
}

#[derive(Default)]
struct Counters {
    inits: AtomicUsize,
    probes: AtomicUsize,
    absolute: AtomicUsize,
    relative: AtomicUsize,
    dumps: AtomicUsize,
}

impl CountingBackend {
    fn new(verdict: bool) -> (Self, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        (
            Self {
                counters: Arc::clone(&counters),
                verdict,
            },
            counters,
        )
    }
}

impl ProbeBackend for CountingBackend {
    type Session = u64;

    fn name(&self) -> &'static str {
        "counting"
    }

    fn init(&self) -> u64 {
        self.counters.inits.fetch_add(1, Ordering::SeqCst);
        0
    }

    fn probe(&self, session: &mut u64, _t: &str, _v: &str, _value: f64) -> bool {
        *session += 1;
        self.counters.probes.fetch_add(1, Ordering::SeqCst);
        self.verdict
    }

    fn probe_absolute(&self, session: &mut u64, _t: &str, _v: &str, _value: f64, _tol: f64) -> bool {
        *session += 1;
        self.counters.absolute.fetch_add(1, Ordering::SeqCst);
        self.verdict
    }

    fn probe_relative(&self, session: &mut u64, _t: &str, _v: &str, _value: f64, _tol: f64) -> bool {
        *session += 1;
        self.counters.relative.fetch_add(1, Ordering::SeqCst);
        self.verdict
    }

    fn dump(&self, _session: &mut u64) -> Result<(), ProbeError> {
        self.counters.dumps.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Backend whose dump always fails.
struct FailingDumpBackend;

impl ProbeBackend for FailingDumpBackend {
    type Session = ();

    fn name(&self) -> &'static str {
        "failing-dump"
    }

    fn init(&self) {}

    fn probe(&self, _s: &mut (), _t: &str, _v: &str, _value: f64) -> bool {
        true
    }

    fn probe_absolute(&self, _s: &mut (), _t: &str, _v: &str, _value: f64, _tol: f64) -> bool {
        true
    }

    fn probe_relative(&self, _s: &mut (), _t: &str, _v: &str, _value: f64, _tol: f64) -> bool {
        true
    }

    fn dump(&self, _s: &mut ()) -> Result<(), ProbeError> {
        Err(ProbeError::Backend("disk full".to_string()))
    }
}

fn value_grid() -> Vec<f64> {
    vec![
        0.0,
        -0.0,
        1.0,
        -1.0,
        1.000_000_1,
        0.1 + 0.2,
        0.3,
        1.0e-300,
        -1.0e-300,
        f64::MIN_POSITIVE,
        5.0e-324,
        1.0e300,
        -1.0e300,
        f64::MAX,
        std::f64::consts::PI,
        1.0005,
        1.01,
        1.05,
        1.2,
        0.9,
    ]
}

fn tolerance_grid() -> Vec<f64> {
    vec![0.0, 1.0e-12, 1.0e-3, 0.1, 0.5, 1.0, 1.0e10]
}

#[test]
fn fallback_probe_is_exact_equality() {
    let mut suite = ProbeSuite::local();
    for &v in &value_grid() {
        assert!(suite.probe("prop", "v", v, v), "v={v}");
        for &e in &value_grid() {
            assert_eq!(suite.probe("prop", "v", v, e), v == e, "v={v} e={e}");
        }
    }
}

#[test]
fn fallback_probe_check_is_absolute_tolerance() {
    let mut suite = ProbeSuite::local();
    for &v in &value_grid() {
        for &e in &value_grid() {
            for &t in &tolerance_grid() {
                assert_eq!(
                    suite.probe_check("prop", "v", v, e, t),
                    (v - e).abs() <= t,
                    "v={v} e={e} t={t}"
                );
            }
        }
    }
}

#[test]
fn fallback_probe_check_relative_is_closed_interval() {
    let mut suite = ProbeSuite::local();
    for &v in &value_grid() {
        for &e in &value_grid() {
            for &t in &tolerance_grid() {
                assert_eq!(
                    suite.probe_check_relative("prop", "v", v, e, t),
                    e - t <= v && v <= e + t,
                    "v={v} e={e} t={t}"
                );
            }
        }
    }
}

#[test]
fn zero_tolerance_agrees_with_exact_probe() {
    let mut suite = ProbeSuite::local();
    for &v in &value_grid() {
        for &e in &value_grid() {
            let exact = suite.probe("prop", "v", v, e);
            assert_eq!(suite.probe_check("prop", "v", v, e, 0.0), exact, "v={v} e={e}");
            assert_eq!(
                suite.probe_check_relative("prop", "v", v, e, 0.0),
                exact,
                "v={v} e={e}"
            );
        }
    }
}

#[test]
fn reference_scenarios() {
    let mut suite = ProbeSuite::local();
    assert!(suite.probe("t1", "x", 1.0, 1.0));
    assert!(!suite.probe("t1", "x", 1.0, 1.000_000_1));
    assert!(suite.probe_check("t1", "x", 1.0, 1.0005, 0.001));
    assert!(!suite.probe_check("t1", "x", 1.0, 1.01, 0.001));
    assert!(suite.probe_check_relative("t1", "x", 1.05, 1.0, 0.1));
    assert!(!suite.probe_check_relative("t1", "x", 1.2, 1.0, 0.1));
}

#[test]
fn nan_fails_every_fallback_probe() {
    let mut suite = ProbeSuite::local();
    assert!(!suite.probe("nan", "x", f64::NAN, f64::NAN));
    assert!(!suite.probe_check("nan", "x", f64::NAN, 1.0, 1.0e10));
    assert!(!suite.probe_check_relative("nan", "x", 1.0, f64::NAN, 1.0e10));
}

#[test]
fn fallback_dump_is_idempotent_and_verdict_neutral() {
    for dumps in [0usize, 1, 5] {
        let mut suite = ProbeSuite::local();
        for _ in 0..dumps {
            suite.dump().expect("fallback dump never fails");
        }
        assert!(suite.probe("t1", "x", 1.0, 1.0));
        assert!(suite.probe_check("t1", "x", 1.0, 1.0005, 0.001));
        assert!(!suite.probe_check_relative("t1", "x", 1.2, 1.0, 0.1));
        let summary = suite.shutdown();
        assert_eq!(summary.dumps as usize, dumps + 1);
        assert_eq!(summary.sessions_created, 0);
        assert!(summary.final_dump_error.is_none());
    }
}

#[test]
fn session_is_created_once_under_lazy_policy() {
    let (backend, counters) = CountingBackend::new(true);
    let mut suite = ProbeSuite::delegating(backend, SessionPolicy::Lazy);
    assert_eq!(counters.inits.load(Ordering::SeqCst), 0);

    for i in 0..100i32 {
        let v = f64::from(i);
        suite.probe("lazy", "x", v, v);
        suite.probe_check("lazy", "y", v, v, 0.1);
        suite.probe_check_relative("lazy", "z", v, v, 0.1);
    }
    assert_eq!(counters.inits.load(Ordering::SeqCst), 1);
    assert_eq!(counters.probes.load(Ordering::SeqCst), 100);
    assert_eq!(counters.absolute.load(Ordering::SeqCst), 100);
    assert_eq!(counters.relative.load(Ordering::SeqCst), 100);

    let summary = suite.shutdown();
    assert_eq!(summary.sessions_created, 1);
    assert_eq!(counters.dumps.load(Ordering::SeqCst), 1);
    assert_eq!(counters.inits.load(Ordering::SeqCst), 1);
}

#[test]
fn session_is_created_once_under_eager_policy() {
    let (backend, counters) = CountingBackend::new(true);
    let mut suite = ProbeSuite::delegating(backend, SessionPolicy::Eager);
    assert_eq!(counters.inits.load(Ordering::SeqCst), 1);
    for _ in 0..50 {
        suite.probe("eager", "x", 1.0, 1.0);
    }
    drop(suite);
    assert_eq!(counters.inits.load(Ordering::SeqCst), 1);
    assert_eq!(counters.dumps.load(Ordering::SeqCst), 1);
}

#[test]
fn delegating_verdict_comes_from_backend() {
    let (backend, _) = CountingBackend::new(false);
    let mut suite = ProbeSuite::delegating(backend, SessionPolicy::Lazy);
    // Locally these would all pass.
    assert!(!suite.probe("t1", "x", 1.0, 1.0));
    assert!(!suite.probe_check("t1", "x", 1.0, 1.0, 1.0));
    assert!(!suite.probe_check_relative("t1", "x", 1.0, 1.0, 1.0));

    let (backend, _) = CountingBackend::new(true);
    let mut suite = ProbeSuite::delegating(backend, SessionPolicy::Lazy);
    // Locally this would fail.
    assert!(suite.probe("t1", "x", 1.0, 2.0));
}

#[test]
fn dump_without_probes_opens_the_single_session() {
    let (backend, counters) = CountingBackend::new(true);
    let suite = ProbeSuite::delegating(backend, SessionPolicy::Lazy);
    let summary = suite.shutdown();
    assert_eq!(summary.total_probes(), 0);
    assert_eq!(summary.sessions_created, 1);
    assert_eq!(counters.inits.load(Ordering::SeqCst), 1);
    assert_eq!(counters.dumps.load(Ordering::SeqCst), 1);
}

#[test]
fn explicit_dumps_plus_final_dump() {
    let (backend, counters) = CountingBackend::new(true);
    let mut suite = ProbeSuite::delegating(backend, SessionPolicy::Lazy);
    suite.probe("t", "x", 1.0, 1.0);
    suite.dump().unwrap();
    suite.dump().unwrap();
    let summary = suite.shutdown();
    assert_eq!(summary.dumps, 3);
    assert_eq!(counters.dumps.load(Ordering::SeqCst), 3);
}

#[test]
fn close_treats_the_last_explicit_dump_as_final() {
    let (backend, counters) = CountingBackend::new(true);
    let (emitter, buf) = LogEmitter::to_buffer("close");
    let mut suite = ProbeSuite::delegating(backend, SessionPolicy::Lazy).with_log(emitter);
    suite.probe("t", "x", 1.0, 1.0);
    suite.dump().unwrap();
    let summary = suite.close();
    assert_eq!(summary.dumps, 1);
    assert_eq!(counters.dumps.load(Ordering::SeqCst), 1);

    let text = String::from_utf8(buf.lock().clone()).unwrap();
    let entries: Vec<_> = text
        .lines()
        .map(|l| validate_log_line(l, 0).unwrap())
        .collect();
    assert_eq!(entries.iter().filter(|e| e.event == "dump").count(), 1);
    let shutdown = entries.last().unwrap();
    assert_eq!(shutdown.event, "suite_shutdown");
    assert_eq!(
        shutdown.details.as_ref().unwrap()["final_dump_skipped"],
        serde_json::Value::Bool(true)
    );
}

#[test]
fn mismatched_policy_is_rejected_at_initialize() {
    let (backend, _) = CountingBackend::new(true);
    let prober = DelegatingProber::new(backend, SessionPolicy::Lazy);
    let err = ProbeSuite::initialize(
        ProbeConfig::delegating(SessionPolicy::Eager),
        Box::new(prober),
    )
    .unwrap_err();
    assert!(err.to_string().contains("session policy"));
}

#[test]
fn failing_final_dump_is_reported_not_panicked() {
    let (emitter, buf) = LogEmitter::to_buffer("failing");
    let mut suite =
        ProbeSuite::delegating(FailingDumpBackend, SessionPolicy::Lazy).with_log(emitter);
    assert!(suite.dump().is_err());
    let summary = suite.shutdown();
    assert_eq!(summary.final_dump_error.as_deref(), Some("backend: disk full"));

    let text = String::from_utf8(buf.lock().clone()).unwrap();
    let dump_errors = text
        .lines()
        .map(|l| validate_log_line(l, 0).unwrap())
        .filter(|e| e.event == "dump" && e.details.is_some())
        .count();
    assert_eq!(dump_errors, 2);
}

#[test]
fn injected_prober_matches_config() {
    let (backend, counters) = CountingBackend::new(true);
    let prober = DelegatingProber::new(backend, SessionPolicy::Eager);
    assert_eq!(prober.sessions_created(), 1);
    let mut suite = ProbeSuite::initialize(
        ProbeConfig::delegating(SessionPolicy::Eager),
        Box::new(prober),
    )
    .unwrap();
    assert!(suite.check(CheckMode::Relative, "t", "x", 3.0, 0.0, 0.0));
    assert_eq!(counters.relative.load(Ordering::SeqCst), 1);
}
