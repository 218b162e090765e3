//! The probe capability and its two implementations.
//!
//! Which one a suite gets is decided once, at configuration time:
//! [`LocalProber`] when the backend is disabled, [`DelegatingProber`] when it
//! is enabled.

use crate::backend::ProbeBackend;
use crate::compare::{self, CheckMode};
use crate::config::SessionPolicy;
use crate::error::ProbeError;
use crate::registry::ProbeRegistry;

/// Probe/record/compare capability.
pub trait Prober {
    /// Short name for logs (`local`, or the backend's name).
    fn name(&self) -> &'static str;

    fn backend_enabled(&self) -> bool;

    fn probe(&mut self, test_name: &str, var_name: &str, value: f64, expected: f64) -> bool;

    fn probe_check(
        &mut self,
        test_name: &str,
        var_name: &str,
        value: f64,
        expected: f64,
        accuracy_target: f64,
    ) -> bool;

    fn probe_check_relative(
        &mut self,
        test_name: &str,
        var_name: &str,
        value: f64,
        expected: f64,
        accuracy_target: f64,
    ) -> bool;

    fn dump(&mut self) -> Result<(), ProbeError>;

    /// Sessions opened so far; always 0 without a backend.
    fn sessions_created(&self) -> u32 {
        0
    }

    /// When the backend session is opened. Meaningless without a backend.
    fn session_policy(&self) -> SessionPolicy {
        SessionPolicy::default()
    }

    /// Dispatch on `mode`. `accuracy_target` is ignored for exact probes.
    fn check(
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
}

/// Stateless fallback: verdicts are pure functions of the arguments.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalProber;

impl Prober for LocalProber {
    fn name(&self) -> &'static str {
        "local"
    }

    fn backend_enabled(&self) -> bool {
        false
    }

    fn probe(&mut self, _test_name: &str, _var_name: &str, value: f64, expected: f64) -> bool {
        compare::exact(value, expected)
    }

    fn probe_check(
        &mut self,
        _test_name: &str,
        _var_name: &str,
        value: f64,
        expected: f64,
        accuracy_target: f64,
    ) -> bool {
        compare::within_absolute(value, expected, accuracy_target)
    }

    fn probe_check_relative(
        &mut self,
        _test_name: &str,
        _var_name: &str,
        value: f64,
        expected: f64,
        accuracy_target: f64,
    ) -> bool {
        compare::within_interval(value, expected, accuracy_target)
    }

    fn dump(&mut self) -> Result<(), ProbeError> {
        Ok(())
    }
}

/// Forwards every probe to a backend through the registry's single session.
///
/// The expected value is not forwarded; the verdict is whatever the backend
/// returns.
pub struct DelegatingProber<B: ProbeBackend> {
    registry: ProbeRegistry<B>,
}

impl<B: ProbeBackend> DelegatingProber<B> {
    #[must_use]
    pub fn new(backend: B, policy: SessionPolicy) -> Self {
        Self {
            registry: ProbeRegistry::new(backend, policy),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &ProbeRegistry<B> {
        &self.registry
    }
}

impl<B: ProbeBackend> Prober for DelegatingProber<B> {
    fn name(&self) -> &'static str {
        self.registry.backend().name()
    }

    fn backend_enabled(&self) -> bool {
        true
    }

    fn probe(&mut self, test_name: &str, var_name: &str, value: f64, _expected: f64) -> bool {
        self.registry
            .with_session(|backend, session| backend.probe(session, test_name, var_name, value))
    }

    fn probe_check(
        &mut self,
        test_name: &str,
        var_name: &str,
        value: f64,
        _expected: f64,
        accuracy_target: f64,
    ) -> bool {
        self.registry.with_session(|backend, session| {
            backend.probe_absolute(session, test_name, var_name, value, accuracy_target)
        })
    }

    fn probe_check_relative(
        &mut self,
        test_name: &str,
        var_name: &str,
        value: f64,
        _expected: f64,
        accuracy_target: f64,
    ) -> bool {
        self.registry.with_session(|backend, session| {
            backend.probe_relative(session, test_name, var_name, value, accuracy_target)
        })
    }

    fn dump(&mut self) -> Result<(), ProbeError> {
        self.registry.dump()
    }

    fn sessions_created(&self) -> u32 {
        self.registry.sessions_created()
    }

    fn session_policy(&self) -> SessionPolicy {
        self.registry.policy()
    }
}
