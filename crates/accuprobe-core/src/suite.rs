//! `ProbeSuite`: the context object a test harness creates once, probes
//! through, and shuts down.
//!
//! The suite owns the selected [`Prober`] (and through it the registry and
//! its session), tallies verdicts per check tier, and optionally writes one
//! structured log event per probe. The final dump happens exactly once: in
//! [`ProbeSuite::shutdown`], or on drop if the harness never called it.

use serde::Serialize;

use crate::backend::ProbeBackend;
use crate::compare::CheckMode;
use crate::config::{BackendMode, ProbeConfig, SessionPolicy};
use crate::error::ProbeError;
use crate::prober::{DelegatingProber, LocalProber, Prober};
use crate::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome};

/// Verdict counts for one check tier.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckTally {
    pub probes: u64,
    pub passed: u64,
    pub failed: u64,
}

impl CheckTally {
    fn record(&mut self, passed: bool) {
        self.probes += 1;
        if passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// What a suite did over its lifetime, returned by [`ProbeSuite::shutdown`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuiteSummary {
    pub prober: &'static str,
    pub backend: BackendMode,
    pub policy: SessionPolicy,
    pub exact: CheckTally,
    pub absolute: CheckTally,
    pub relative: CheckTally,
    pub dumps: u32,
    pub sessions_created: u32,
    /// Error text of the final dump, if it failed.
    pub final_dump_error: Option<String>,
}

impl SuiteSummary {
    #[must_use]
    pub fn total_probes(&self) -> u64 {
        self.exact.probes + self.absolute.probes + self.relative.probes
    }

    #[must_use]
    pub fn total_failed(&self) -> u64 {
        self.exact.failed + self.absolute.failed + self.relative.failed
    }
}

/// Whether teardown dumps unconditionally or only when observations are
/// still unflushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FinalDump {
    Always,
    IfPending,
}

pub struct ProbeSuite {
    config: ProbeConfig,
    prober: Box<dyn Prober + Send>,
    log: Option<LogEmitter>,
    exact: CheckTally,
    absolute: CheckTally,
    relative: CheckTally,
    dumps: u32,
    /// Observations made since the last dump.
    pending: u64,
    sessions_logged: u32,
    final_dump_error: Option<String>,
    finished: bool,
}

impl std::fmt::Debug for ProbeSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeSuite")
            .field("config", &self.config)
            .field("prober", &self.prober.name())
            .field("dumps", &self.dumps)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl ProbeSuite {
    /// Build a suite around an already-selected prober.
    ///
    /// Fails if `config.backend` disagrees with what `prober` actually does.
    pub fn initialize(
        config: ProbeConfig,
        prober: Box<dyn Prober + Send>,
    ) -> Result<Self, ProbeError> {
        if config.backend.is_enabled() != prober.backend_enabled() {
            return Err(ProbeError::InvalidSetting {
                kind: "backend",
                value: format!(
                    "config says {}, prober '{}' says {}",
                    config.backend.as_str(),
                    prober.name(),
                    if prober.backend_enabled() {
                        "enabled"
                    } else {
                        "disabled"
                    }
                ),
            });
        }
        if prober.backend_enabled() && config.policy != prober.session_policy() {
            return Err(ProbeError::InvalidSetting {
                kind: "session policy",
                value: format!(
                    "config says {}, prober '{}' says {}",
                    config.policy.as_str(),
                    prober.name(),
                    prober.session_policy().as_str()
                ),
            });
        }
        Ok(Self::from_parts(config, prober))
    }

    /// Stateless fallback suite.
    #[must_use]
    pub fn local() -> Self {
        Self::from_parts(ProbeConfig::fallback(), Box::new(LocalProber))
    }

    /// Suite delegating to `backend` with the given session policy.
    #[must_use]
    pub fn delegating<B>(backend: B, policy: SessionPolicy) -> Self
    where
        B: ProbeBackend + Send + 'static,
        B::Session: Send + 'static,
    {
        Self::from_parts(
            ProbeConfig::delegating(policy),
            Box::new(DelegatingProber::new(backend, policy)),
        )
    }

    fn from_parts(config: ProbeConfig, prober: Box<dyn Prober + Send>) -> Self {
        Self {
            config,
            prober,
            log: None,
            exact: CheckTally::default(),
            absolute: CheckTally::default(),
            relative: CheckTally::default(),
            dumps: 0,
            pending: 0,
            sessions_logged: 0,
            final_dump_error: None,
            finished: false,
        }
    }

    /// Attach a structured log; emits `suite_initialized` immediately.
    #[must_use]
    pub fn with_log(mut self, emitter: LogEmitter) -> Self {
        self.log = Some(emitter);
        let config = self.config;
        let sessions = self.prober.sessions_created();
        let prober = self.prober.name();
        self.log_with(LogLevel::Info, "suite_initialized", |e| {
            e.with_config(config.backend.as_str(), config.policy.as_str())
                .with_sessions_created(sessions)
                .with_details(serde_json::json!({ "prober": prober }))
        });
        self.note_session();
        self
    }

    #[must_use]
    pub fn config(&self) -> ProbeConfig {
        self.config
    }

    #[must_use]
    pub fn backend_enabled(&self) -> bool {
        self.prober.backend_enabled()
    }

    #[must_use]
    pub fn sessions_created(&self) -> u32 {
        self.prober.sessions_created()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Exact comparison (or backend probe).
    pub fn probe(&mut self, test_name: &str, var_name: &str, value: f64, expected: f64) -> bool {
        let passed = self.prober.probe(test_name, var_name, value, expected);
        self.after_probe(CheckMode::Exact, test_name, var_name, value, expected, None, passed);
        passed
    }

    /// Absolute-tolerance comparison (or backend absolute check).
    pub fn probe_check(
        &mut self,
        test_name: &str,
        var_name: &str,
        value: f64,
        expected: f64,
        accuracy_target: f64,
    ) -> bool {
        let passed = self
            .prober
            .probe_check(test_name, var_name, value, expected, accuracy_target);
        self.after_probe(
            CheckMode::Absolute,
            test_name,
            var_name,
            value,
            expected,
            Some(accuracy_target),
            passed,
        );
        passed
    }

    /// Interval comparison (or backend relative check).
    pub fn probe_check_relative(
        &mut self,
        test_name: &str,
        var_name: &str,
        value: f64,
        expected: f64,
        accuracy_target: f64,
    ) -> bool {
        let passed =
            self.prober
                .probe_check_relative(test_name, var_name, value, expected, accuracy_target);
        self.after_probe(
            CheckMode::Relative,
            test_name,
            var_name,
            value,
            expected,
            Some(accuracy_target),
            passed,
        );
        passed
    }

    /// Dispatch on `mode`; `accuracy_target` is ignored for exact probes.
    pub fn check(
        &mut self,
        mode: CheckMode,
        test_name: &str,
        var_name: &str,
        value: f64,
        expected: f64,
        accuracy_target: f64,
    ) -> bool {
        match mode {
            CheckMode::Exact => self.probe(test_name, var_name, value, expected),
            CheckMode::Absolute => {
                self.probe_check(test_name, var_name, value, expected, accuracy_target)
            }
            CheckMode::Relative => {
                self.probe_check_relative(test_name, var_name, value, expected, accuracy_target)
            }
        }
    }

    /// Flush accumulated observations. A no-op without a backend; callable
    /// any number of times.
    pub fn dump(&mut self) -> Result<(), ProbeError> {
        let result = self.prober.dump();
        self.dumps += 1;
        self.pending = 0;
        self.note_session();
        let error = result.as_ref().err().map(ToString::to_string);
        let level = if error.is_some() {
            LogLevel::Error
        } else {
            LogLevel::Debug
        };
        let sessions = self.prober.sessions_created();
        self.log_with(level, "dump", |e| {
            let e = e.with_sessions_created(sessions);
            match error {
                Some(err) => e.with_details(serde_json::json!({ "error": err })),
                None => e,
            }
        });
        result
    }

    /// Write a free-form event to the attached log, if any.
    pub fn note(&mut self, level: LogLevel, event: &str, details: serde_json::Value) {
        self.log_with(level, event, |e| e.with_details(details));
    }

    /// Final dump and summary. The dump runs here and never again.
    pub fn shutdown(mut self) -> SuiteSummary {
        self.finish(FinalDump::Always);
        self.summary()
    }

    /// Like [`ProbeSuite::shutdown`], but skips the final dump when an
    /// explicit [`ProbeSuite::dump`] already flushed every observation.
    ///
    /// This is the exit path for callers that flush on their own before
    /// teardown: the backend sees that flush as the last dump.
    pub fn close(mut self) -> SuiteSummary {
        self.finish(FinalDump::IfPending);
        self.summary()
    }

    /// Observations recorded since the last dump.
    #[must_use]
    pub fn pending_observations(&self) -> u64 {
        self.pending
    }

    /// Snapshot of the tallies so far.
    #[must_use]
    pub fn summary(&self) -> SuiteSummary {
        SuiteSummary {
            prober: self.prober.name(),
            backend: self.config.backend,
            policy: self.config.policy,
            exact: self.exact,
            absolute: self.absolute,
            relative: self.relative,
            dumps: self.dumps,
            sessions_created: self.prober.sessions_created(),
            final_dump_error: self.final_dump_error.clone(),
        }
    }

    fn finish(&mut self, final_dump: FinalDump) {
        if self.finished {
            return;
        }
        self.finished = true;
        let flushed = self.dumps > 0 && self.pending == 0;
        let skip_dump = matches!(final_dump, FinalDump::IfPending) && flushed;
        if !skip_dump && let Err(err) = self.dump() {
            self.final_dump_error = Some(err.to_string());
        }
        let summary = self.summary();
        self.log_with(LogLevel::Info, "suite_shutdown", |e| {
            e.with_sessions_created(summary.sessions_created)
                .with_details(serde_json::json!({
                    "probes": summary.total_probes(),
                    "failed": summary.total_failed(),
                    "dumps": summary.dumps,
                    "final_dump_skipped": skip_dump,
                }))
        });
        if let Some(log) = self.log.as_mut() {
            let _ = log.flush();
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn after_probe(
        &mut self,
        mode: CheckMode,
        test_name: &str,
        var_name: &str,
        value: f64,
        expected: f64,
        accuracy_target: Option<f64>,
        passed: bool,
    ) {
        self.pending += 1;
        match mode {
            CheckMode::Exact => self.exact.record(passed),
            CheckMode::Absolute => self.absolute.record(passed),
            CheckMode::Relative => self.relative.record(passed),
        }
        self.note_session();
        self.log_with(LogLevel::Info, "probe", |e| {
            e.with_probe(mode, test_name, var_name)
                .with_values(value, expected, accuracy_target)
                .with_outcome(Outcome::from(passed))
        });
    }

    /// Log `session_created` the first time the prober reports a session.
    fn note_session(&mut self) {
        let sessions = self.prober.sessions_created();
        if sessions > self.sessions_logged {
            self.sessions_logged = sessions;
            let policy = self.config.policy;
            let backend = self.prober.name();
            self.log_with(LogLevel::Info, "session_created", |e| {
                e.with_config(BackendMode::Enabled.as_str(), policy.as_str())
                    .with_sessions_created(sessions)
                    .with_details(serde_json::json!({ "backend": backend }))
            });
        }
    }

    /// Logging never affects verdicts; write failures are dropped.
    fn log_with(
        &mut self,
        level: LogLevel,
        event: &str,
        build: impl FnOnce(LogEntry) -> LogEntry,
    ) {
        if let Some(log) = self.log.as_mut() {
            let entry = build(log.entry(level, event));
            let _ = log.emit_entry(entry);
        }
    }
}

impl Drop for ProbeSuite {
    fn drop(&mut self) {
        self.finish(FinalDump::Always);
    }
}
