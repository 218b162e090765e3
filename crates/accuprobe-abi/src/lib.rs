// Every extern "C" export takes raw pointers from C or Fortran callers and
// validates them at runtime; the contract is documented once, here.
#![allow(clippy::missing_safety_doc)]
//! # accuprobe-abi
//!
//! `extern "C"` boundary for accuprobe.
//!
//! Produces a `cdylib` (`libaccuprobe_abi.so`) exporting the `qmckl_probe*`
//! symbols, their Fortran-callable `_f` variants, and the registry lifecycle
//! hooks. Every call is routed through one process-wide [`ProbeSuite`]:
//!
//! ```text
//! C / Fortran caller -> ABI entry (this crate) -> runtime registry -> prober -> verdict
//! ```
//!
//! Without the `vfc-ci` feature the prober compares locally. With it, probes
//! are recorded by Verificarlo's `libvfc_probes` and dumped on exit.
//!
//! Name pointers must be null or NUL-terminated. A null or non-UTF-8 name,
//! or a null `_f` argument, makes the call return `false` without recording.
//!
//! [`ProbeSuite`]: accuprobe_core::ProbeSuite

#[macro_use]
mod macros;

pub mod probe_abi;
pub mod runtime_registry;
pub mod util;

#[cfg(feature = "vfc-ci")]
pub mod vfc_backend;
