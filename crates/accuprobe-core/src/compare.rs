//! Local comparison semantics used when no backend is available.
//!
//! All three checks are ordinary IEEE-754 comparisons: a NaN in any argument
//! fails, infinities compare numerically, and a negative accuracy target
//! never passes.

use serde::{Deserialize, Serialize};

/// Strictness tier of a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckMode {
    /// `value == expected`.
    Exact,
    /// `|value - expected| <= target`.
    Absolute,
    /// `expected - target <= value <= expected + target`.
    Relative,
}

impl CheckMode {
    /// Parse from string (case-insensitive). Unknown input yields `None`.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "exact" | "eq" | "probe" => Some(Self::Exact),
            "absolute" | "abs" | "check" => Some(Self::Absolute),
            "relative" | "rel" | "interval" | "check_relative" => Some(Self::Relative),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Absolute => "absolute",
            Self::Relative => "relative",
        }
    }

    /// Whether the check consumes an accuracy target.
    #[must_use]
    pub const fn takes_target(self) -> bool {
        !matches!(self, Self::Exact)
    }

    /// Evaluate the local verdict for this tier. `target` is ignored for
    /// [`CheckMode::Exact`].
    #[must_use]
    pub fn evaluate(self, value: f64, expected: f64, target: f64) -> bool {
        match self {
            Self::Exact => exact(value, expected),
            Self::Absolute => within_absolute(value, expected, target),
            Self::Relative => within_interval(value, expected, target),
        }
    }
}

#[inline]
#[must_use]
pub fn exact(value: f64, expected: f64) -> bool {
    value == expected
}

#[inline]
#[must_use]
pub fn within_absolute(value: f64, expected: f64, target: f64) -> bool {
    (value - expected).abs() <= target
}

#[inline]
#[must_use]
pub fn within_interval(value: f64, expected: f64, target: f64) -> bool {
    expected - target <= value && value <= expected + target
}
