//! # accuprobe-core
//!
//! Safe Rust numerical-accuracy probes for scientific-kernel test suites.
//!
//! A probe records a computed `f64` at a named checkpoint and compares it
//! against a reference value, either exactly, within an absolute tolerance,
//! or within a closed interval around the reference. Verdicts come from one
//! of two [`Prober`] implementations:
//!
//! - [`LocalProber`]: stateless fallback, pure comparisons from [`compare`].
//! - [`DelegatingProber`]: forwards every observation to a stochastic-arithmetic
//!   [`ProbeBackend`] through a single session owned by a [`ProbeRegistry`].
//!
//! # Architecture
//!
//! ```text
//! test harness -> ProbeSuite -> Prober -> (compare | ProbeRegistry -> ProbeBackend)
//! ```
//!
//! No `unsafe` code is permitted at the crate level; the C ABI lives in
//! `accuprobe-abi`.

#![deny(unsafe_code)]

pub mod backend;
pub mod compare;
pub mod config;
pub mod error;
pub mod prober;
pub mod registry;
mod serde_float;
pub mod structured_log;
pub mod suite;

pub use backend::{DumpSink, Observation, ProbeBackend, RecordingBackend};
pub use compare::CheckMode;
pub use config::{BackendMode, ProbeConfig, SessionPolicy};
pub use error::ProbeError;
pub use prober::{DelegatingProber, LocalProber, Prober};
pub use registry::ProbeRegistry;
pub use suite::{ProbeSuite, SuiteSummary};
