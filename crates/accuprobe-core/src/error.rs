//! Error type for the non-verdict paths (dump, config, argument marshaling).
//!
//! Probe verdicts are plain `bool`s; nothing here is raised for a value that is
//! merely out of tolerance.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{field} is not a valid probe name: {reason}")]
    InvalidName {
        field: &'static str,
        reason: &'static str,
    },
    #[error("null {0} pointer")]
    NullArgument(&'static str),
    #[error("unrecognized {kind} setting: {value:?}")]
    InvalidSetting { kind: &'static str, value: String },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("backend: {0}")]
    Backend(String),
}
