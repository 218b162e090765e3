//! Fixture harness for accuprobe.
//!
//! This crate provides:
//! - Fixtures: JSON probe cases with the verdict each one should produce
//! - Runner: drive a [`ProbeSuite`](accuprobe_core::ProbeSuite) through a fixture set
//! - Reports: human-readable + machine-readable run summaries
//! - The `probe-harness` CLI tying them to the structured log

#![forbid(unsafe_code)]

pub mod fixtures;
pub mod report;
pub mod runner;

pub use fixtures::{FixtureError, ProbeCase, ProbeFixtureSet};
pub use report::RunReport;
pub use runner::{CaseResult, ProbeRunner};
