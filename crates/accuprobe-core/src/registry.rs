//! Probe registry: sole owner of the backend session.
//!
//! The registry holds at most one [`ProbeBackend::Session`]. It is created
//! once, by [`ProbeRegistry::new`] under [`SessionPolicy::Eager`] or by the
//! first [`ProbeRegistry::ensure_session`] under [`SessionPolicy::Lazy`], and
//! lives until the registry is dropped. After creation the registry itself
//! never changes; only the backend mutates the session it was handed.

use crate::backend::ProbeBackend;
use crate::config::SessionPolicy;
use crate::error::ProbeError;

pub struct ProbeRegistry<B: ProbeBackend> {
    backend: B,
    session: Option<B::Session>,
    policy: SessionPolicy,
    sessions_created: u32,
}

impl<B: ProbeBackend> ProbeRegistry<B> {
    #[must_use]
    pub fn new(backend: B, policy: SessionPolicy) -> Self {
        let mut registry = Self {
            backend,
            session: None,
            policy,
            sessions_created: 0,
        };
        if matches!(policy, SessionPolicy::Eager) {
            registry.ensure_session();
        }
        registry
    }

    /// Return the session, creating it if this is the first use.
    pub fn ensure_session(&mut self) -> &mut B::Session {
        let Self {
            backend,
            session,
            sessions_created,
            ..
        } = self;
        session.get_or_insert_with(|| {
            *sessions_created += 1;
            backend.init()
        })
    }

    /// Run `f` against the backend and its (possibly freshly created) session.
    pub fn with_session<R>(&mut self, f: impl FnOnce(&B, &mut B::Session) -> R) -> R {
        let Self {
            backend,
            session,
            sessions_created,
            ..
        } = self;
        let session = session.get_or_insert_with(|| {
            *sessions_created += 1;
            backend.init()
        });
        f(backend, session)
    }

    /// Flush the session through the backend. Safe with zero observations;
    /// creates the session first if nothing has touched it yet.
    pub fn dump(&mut self) -> Result<(), ProbeError> {
        self.with_session(|backend, session| backend.dump(session))
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    /// Number of sessions ever created by this registry (0 or 1).
    #[must_use]
    pub fn sessions_created(&self) -> u32 {
        self.sessions_created
    }

    #[must_use]
    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[must_use]
    pub fn session(&self) -> Option<&B::Session> {
        self.session.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingBackend;

    #[test]
    fn lazy_registry_starts_empty() {
        let registry = ProbeRegistry::new(RecordingBackend::default(), SessionPolicy::Lazy);
        assert!(!registry.is_initialized());
        assert_eq!(registry.sessions_created(), 0);
    }

    #[test]
    fn eager_registry_initializes_on_construction() {
        let registry = ProbeRegistry::new(RecordingBackend::default(), SessionPolicy::Eager);
        assert!(registry.is_initialized());
        assert_eq!(registry.sessions_created(), 1);
    }

    #[test]
    fn ensure_session_is_idempotent() {
        for policy in [SessionPolicy::Lazy, SessionPolicy::Eager] {
            let mut registry = ProbeRegistry::new(RecordingBackend::default(), policy);
            for _ in 0..5 {
                registry.ensure_session();
            }
            assert_eq!(registry.sessions_created(), 1, "{policy:?}");
        }
    }

    #[test]
    fn with_session_reaches_the_same_session() {
        let mut registry = ProbeRegistry::new(RecordingBackend::default(), SessionPolicy::Lazy);
        registry.with_session(|b, s| b.probe(s, "t", "a", 1.0));
        registry.with_session(|b, s| b.probe(s, "t", "b", 2.0));
        let session = registry.session().unwrap();
        assert_eq!(session.observations().len(), 2);
        assert_eq!(registry.sessions_created(), 1);
    }

    #[test]
    fn dump_without_observations_is_safe() {
        let mut registry = ProbeRegistry::new(RecordingBackend::default(), SessionPolicy::Lazy);
        registry.dump().unwrap();
        registry.dump().unwrap();
        assert_eq!(registry.sessions_created(), 1);
        assert_eq!(registry.session().unwrap().dumps(), 2);
    }
}
