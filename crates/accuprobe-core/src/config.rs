//! Probe configuration.
//!
//! Two knobs, both fixed before the first probe runs:
//! - [`BackendMode`]: `enabled` delegates every observation to a
//!   stochastic-arithmetic backend and keeps one session; `disabled` (default)
//!   computes verdicts locally and keeps no state.
//! - [`SessionPolicy`]: `lazy` (default) opens the backend session on the first
//!   probe that needs it, `eager` opens it when the registry is built.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProbeError;

/// Whether verdicts come from the backend or from local arithmetic.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Forward to the backend capability and maintain a probe session.
    Enabled,
    /// Local fallback comparisons, stateless.
    #[default]
    Disabled,
}

impl BackendMode {
    /// Parse from string (case-insensitive). Unknown input falls back to
    /// [`BackendMode::Disabled`] so a typo never pulls in a backend.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "enabled" | "on" | "true" | "1" | "vfc" | "backend" => Self::Enabled,
            _ => Self::Disabled,
        }
    }

    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
        }
    }
}

/// When the backend session is created.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPolicy {
    /// On the first probe (or dump) that needs the session.
    #[default]
    Lazy,
    /// When the registry is constructed, before any probe.
    Eager,
}

impl FromStr for SessionPolicy {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lazy" | "on-demand" | "first-use" => Ok(Self::Lazy),
            "eager" | "startup" | "load-time" => Ok(Self::Eager),
            _ => Err(ProbeError::InvalidSetting {
                kind: "session policy",
                value: s.to_string(),
            }),
        }
    }
}

impl SessionPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lazy => "lazy",
            Self::Eager => "eager",
        }
    }
}

/// Complete probe configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub backend: BackendMode,
    pub policy: SessionPolicy,
}

impl ProbeConfig {
    /// Stateless local comparisons.
    #[must_use]
    pub const fn fallback() -> Self {
        Self {
            backend: BackendMode::Disabled,
            policy: SessionPolicy::Lazy,
        }
    }

    /// Backend delegation with the given session policy.
    #[must_use]
    pub const fn delegating(policy: SessionPolicy) -> Self {
        Self {
            backend: BackendMode::Enabled,
            policy,
        }
    }

    /// Configuration selected by cargo features at build time: `enabled` is
    /// the crate-level switch the caller compiled in.
    #[must_use]
    pub const fn build_time(enabled: bool) -> Self {
        if enabled {
            Self::delegating(SessionPolicy::Lazy)
        } else {
            Self::fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_backend_modes() {
        assert_eq!(BackendMode::from_str_loose("enabled"), BackendMode::Enabled);
        assert_eq!(BackendMode::from_str_loose("ON"), BackendMode::Enabled);
        assert_eq!(BackendMode::from_str_loose("vfc"), BackendMode::Enabled);
        assert_eq!(BackendMode::from_str_loose("off"), BackendMode::Disabled);
        assert_eq!(BackendMode::from_str_loose("bogus"), BackendMode::Disabled);
    }

    #[test]
    fn parse_session_policies() {
        assert_eq!("lazy".parse::<SessionPolicy>().unwrap(), SessionPolicy::Lazy);
        assert_eq!("EAGER".parse::<SessionPolicy>().unwrap(), SessionPolicy::Eager);
        assert_eq!(
            "load-time".parse::<SessionPolicy>().unwrap(),
            SessionPolicy::Eager
        );
        let err = "sometimes".parse::<SessionPolicy>().unwrap_err();
        assert!(err.to_string().contains("sometimes"));
    }

    #[test]
    fn default_is_stateless_fallback() {
        let config = ProbeConfig::default();
        assert_eq!(config, ProbeConfig::fallback());
        assert!(!config.backend.is_enabled());
    }

    #[test]
    fn build_time_switch() {
        assert_eq!(ProbeConfig::build_time(false), ProbeConfig::fallback());
        assert_eq!(
            ProbeConfig::build_time(true),
            ProbeConfig::delegating(SessionPolicy::Lazy)
        );
    }
}
