//! Fixture loading and validation.

use std::path::{Path, PathBuf};

use accuprobe_core::CheckMode;
use serde::{Deserialize, Serialize};

/// Errors from reading or checking a fixture file.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid fixture JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("fixture set '{0}' has no cases")]
    Empty(String),
    #[error("case '{case}': {check} check needs an accuracy_target")]
    MissingTarget { case: String, check: &'static str },
    #[error("case '{case}': duplicate case name")]
    DuplicateCase { case: String },
}

/// A single probe case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeCase {
    /// Case identifier, unique within the set.
    pub name: String,
    /// Test name handed to the probe.
    pub test_name: String,
    /// Variable name handed to the probe.
    pub var_name: String,
    /// Which comparison to run.
    pub check: CheckMode,
    /// Computed value.
    pub value: f64,
    /// Reference value.
    pub expected: f64,
    /// Tolerance for `absolute` and `relative` checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy_target: Option<f64>,
    /// Verdict the local comparison should return.
    pub expect_pass: bool,
}

impl ProbeCase {
    /// Tolerance passed to the suite; `0.0` for exact probes.
    #[must_use]
    pub fn target(&self) -> f64 {
        self.accuracy_target.unwrap_or(0.0)
    }
}

/// A collection of probe cases for one kernel or test family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeFixtureSet {
    /// Schema version.
    pub version: String,
    /// Family name (usually the kernel under test).
    pub family: String,
    /// Individual cases, run in order.
    pub cases: Vec<ProbeCase>,
}

impl ProbeFixtureSet {
    /// Parse and validate a fixture set from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, FixtureError> {
        let set: Self = serde_json::from_str(json)?;
        set.validate()?;
        Ok(set)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load and validate a fixture set from a file.
    pub fn from_file(path: &Path) -> Result<Self, FixtureError> {
        let content = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Reject empty sets, duplicate case names, and tolerance checks
    /// without a target.
    pub fn validate(&self) -> Result<(), FixtureError> {
        if self.cases.is_empty() {
            return Err(FixtureError::Empty(self.family.clone()));
        }
        let mut seen = std::collections::HashSet::new();
        for case in &self.cases {
            if !seen.insert(case.name.as_str()) {
                return Err(FixtureError::DuplicateCase {
                    case: case.name.clone(),
                });
            }
            if case.check.takes_target() && case.accuracy_target.is_none() {
                return Err(FixtureError::MissingTarget {
                    case: case.name.clone(),
                    check: case.check.as_str(),
                });
            }
        }
        Ok(())
    }
}
