//! Process-wide probe registry behind the C ABI.
//!
//! C and Fortran callers cannot hold a `ProbeSuite`, so this module keeps the
//! single per-process suite behind one lock and a three-state lifecycle:
//!
//! ```text
//! Uninit --(first probe | qmckl_probes_initialize)--> Ready --(shutdown | atexit)--> Finished
//! ```
//!
//! `Finished` is terminal: later probes are answered with local comparisons
//! and never open a second backend session. With a backend, the first such
//! probe prints one warning to stderr and all of them are counted in
//! [`RegistrySnapshot::late_probes`].
//!
//! Teardown uses [`ProbeSuite::close`]: when the caller already flushed with
//! `qmckl_dump_probes` and probed nothing since, the exit hook does not dump
//! a second time.

use std::sync::atomic::{AtomicBool, Ordering};

use accuprobe_core::structured_log::{LogEmitter, LogLevel};
use accuprobe_core::{CheckMode, ProbeConfig, ProbeError, ProbeSuite, SessionPolicy};
use parking_lot::Mutex;

/// Path of the optional JSONL probe log.
pub const LOG_PATH_ENV: &str = "ACCUPROBE_LOG";

enum Lifecycle {
    Uninit,
    Ready(ProbeSuite),
    Finished {
        backend_enabled: bool,
        late_probes: u64,
    },
}

/// Observable registry state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninit,
    Ready,
    Finished,
}

/// Point-in-time view of the registry for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrySnapshot {
    pub state: LifecycleState,
    pub backend_enabled: bool,
    pub sessions_created: u32,
    pub probes: u64,
    pub dumps: u32,
    /// Probes answered locally after shutdown.
    pub late_probes: u64,
}

/// Backend selection fixed by cargo features.
const COMPILED_IN: ProbeConfig = ProbeConfig::build_time(cfg!(feature = "vfc-ci"));

static LIFECYCLE: Mutex<Lifecycle> = parking_lot::const_mutex(Lifecycle::Uninit);
static EXIT_HOOK_REGISTERED: AtomicBool = AtomicBool::new(false);
static LATE_PROBE_WARNED: AtomicBool = AtomicBool::new(false);

/// Builds the suite for a policy; replaces the compiled-in choice in tests.
pub type SuiteFactory = fn(SessionPolicy) -> ProbeSuite;

#[cfg(debug_assertions)]
static SUITE_FACTORY: Mutex<Option<SuiteFactory>> = parking_lot::const_mutex(None);

#[cfg(feature = "vfc-ci")]
fn build_suite(policy: SessionPolicy) -> ProbeSuite {
    ProbeSuite::delegating(crate::vfc_backend::VfcBackend, policy)
}

#[cfg(not(feature = "vfc-ci"))]
fn build_suite(_policy: SessionPolicy) -> ProbeSuite {
    ProbeSuite::local()
}

fn open_suite(policy: SessionPolicy) -> ProbeSuite {
    #[cfg(debug_assertions)]
    let suite = match *SUITE_FACTORY.lock() {
        Some(factory) => factory(policy),
        None => build_suite(policy),
    };
    #[cfg(not(debug_assertions))]
    let suite = build_suite(policy);
    match std::env::var_os(LOG_PATH_ENV) {
        Some(path) => match LogEmitter::to_file(std::path::Path::new(&path), "abi") {
            Ok(emitter) => suite.with_log(emitter),
            Err(_) => suite,
        },
        None => suite,
    }
}

extern "C" fn dump_at_exit() {
    shutdown();
}

fn register_exit_hook() {
    if EXIT_HOOK_REGISTERED.swap(true, Ordering::SeqCst) {
        return;
    }
    // SAFETY: `dump_at_exit` is a plain extern "C" fn with no captured state.
    let rc = unsafe { libc::atexit(dump_at_exit) };
    if rc != 0 {
        EXIT_HOOK_REGISTERED.store(false, Ordering::SeqCst);
    }
}

/// Run `f` on the process suite, creating it first if needed.
///
/// Returns `None` once the registry is finished.
fn with_suite<R>(policy: SessionPolicy, f: impl FnOnce(&mut ProbeSuite) -> R) -> Option<R> {
    let mut guard = LIFECYCLE.lock();
    if matches!(*guard, Lifecycle::Uninit) {
        *guard = Lifecycle::Ready(open_suite(policy));
        register_exit_hook();
    }
    match &mut *guard {
        Lifecycle::Ready(suite) => Some(f(suite)),
        Lifecycle::Uninit | Lifecycle::Finished { .. } => None,
    }
}

/// Count a probe that arrived after shutdown; warn once if a backend would
/// have recorded it.
fn note_late_probe(test_name: &str, var_name: &str) {
    let mut guard = LIFECYCLE.lock();
    if let Lifecycle::Finished {
        backend_enabled,
        late_probes,
    } = &mut *guard
    {
        *late_probes += 1;
        if *backend_enabled && !LATE_PROBE_WARNED.swap(true, Ordering::SeqCst) {
            eprintln!(
                "accuprobe: probe {test_name}/{var_name} after shutdown answered locally; \
                 the backend will not record it or any later probe"
            );
        }
    }
}

/// Eager initialisation: open the suite (and backend session) now.
pub fn initialize() {
    let _ = with_suite(SessionPolicy::Eager, |_| ());
}

/// Run one probe through the process suite.
pub fn probe(
    mode: CheckMode,
    test_name: &str,
    var_name: &str,
    value: f64,
    expected: f64,
    accuracy_target: f64,
) -> bool {
    with_suite(SessionPolicy::Lazy, |suite| {
        suite.check(mode, test_name, var_name, value, expected, accuracy_target)
    })
    .unwrap_or_else(|| {
        note_late_probe(test_name, var_name);
        mode.evaluate(value, expected, accuracy_target)
    })
}

/// Flush the process suite. No-op once finished.
pub fn dump() {
    let _ = with_suite(SessionPolicy::Lazy, |suite| {
        // Failures are already logged by the suite.
        let _ = suite.dump();
    });
}

/// Final dump, at most once per process, skipped when the last explicit
/// dump already flushed everything. Idempotent.
pub fn shutdown() {
    let mut guard = LIFECYCLE.lock();
    let backend_enabled = match &*guard {
        Lifecycle::Ready(suite) => suite.backend_enabled(),
        Lifecycle::Uninit => COMPILED_IN.backend.is_enabled(),
        Lifecycle::Finished { .. } => return,
    };
    let previous = std::mem::replace(
        &mut *guard,
        Lifecycle::Finished {
            backend_enabled,
            late_probes: 0,
        },
    );
    drop(guard);
    if let Lifecycle::Ready(suite) = previous {
        // Lock released: the backend's dump runs without holding the registry.
        let _ = suite.close();
    }
}

/// Record an argument the ABI refused to forward.
pub fn reject(symbol: &'static str, err: &ProbeError) {
    let mut guard = LIFECYCLE.lock();
    if let Lifecycle::Ready(suite) = &mut *guard {
        suite.note(
            LogLevel::Warn,
            "abi_rejected_argument",
            serde_json::json!({ "symbol": symbol, "error": err.to_string() }),
        );
    }
}

#[must_use]
pub fn snapshot() -> RegistrySnapshot {
    let guard = LIFECYCLE.lock();
    match &*guard {
        Lifecycle::Uninit => RegistrySnapshot {
            state: LifecycleState::Uninit,
            backend_enabled: COMPILED_IN.backend.is_enabled(),
            sessions_created: 0,
            probes: 0,
            dumps: 0,
            late_probes: 0,
        },
        Lifecycle::Ready(suite) => {
            let summary = suite.summary();
            RegistrySnapshot {
                state: LifecycleState::Ready,
                backend_enabled: suite.backend_enabled(),
                sessions_created: summary.sessions_created,
                probes: summary.total_probes(),
                dumps: summary.dumps,
                late_probes: 0,
            }
        }
        Lifecycle::Finished {
            backend_enabled,
            late_probes,
        } => RegistrySnapshot {
            state: LifecycleState::Finished,
            backend_enabled: *backend_enabled,
            sessions_created: 0,
            probes: 0,
            dumps: 0,
            late_probes: *late_probes,
        },
    }
}

/// Test-only: return the registry to `Uninit`, shutting down any live suite
/// and restoring the compiled-in suite factory.
#[cfg(debug_assertions)]
#[doc(hidden)]
pub fn reset_for_tests() {
    shutdown();
    *LIFECYCLE.lock() = Lifecycle::Uninit;
    *SUITE_FACTORY.lock() = None;
    LATE_PROBE_WARNED.store(false, Ordering::SeqCst);
}

/// Test-only: build the next suite with `factory` instead of the
/// compiled-in backend. Takes effect on the next `Uninit -> Ready`.
#[cfg(debug_assertions)]
#[doc(hidden)]
pub fn set_suite_factory_for_tests(factory: SuiteFactory) {
    *SUITE_FACTORY.lock() = Some(factory);
}

#[cfg(all(test, not(feature = "vfc-ci")))]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_runs_uninit_ready_finished() {
        reset_for_tests();
        assert_eq!(snapshot().state, LifecycleState::Uninit);

        assert!(probe(CheckMode::Absolute, "unit", "x", 1.0, 1.0005, 0.001));
        let snap = snapshot();
        assert_eq!(snap.state, LifecycleState::Ready);
        assert_eq!(snap.probes, 1);

        dump();
        assert_eq!(snapshot().dumps, 1);

        shutdown();
        assert_eq!(snapshot().state, LifecycleState::Finished);
        // Still answered, locally, without reopening the registry.
        assert!(probe(CheckMode::Exact, "unit", "x", 2.0, 2.0, 0.0));
        assert!(!probe(CheckMode::Relative, "unit", "x", 1.2, 1.0, 0.1));
        let snap = snapshot();
        assert_eq!(snap.state, LifecycleState::Finished);
        assert_eq!(snap.late_probes, 2);

        reset_for_tests();
        assert_eq!(snapshot().state, LifecycleState::Uninit);
    }
}
