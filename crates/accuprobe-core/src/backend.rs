//! Backend capability interface and the in-memory recording backend.
//!
//! A backend is the stochastic-arithmetic analysis collaborator: it owns the
//! meaning of a verdict in delegating mode and the format of the dump. The
//! core only ever talks to it through [`ProbeBackend`] and a single session
//! handed out by [`ProbeBackend::init`].

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::compare::CheckMode;
use crate::error::ProbeError;

/// Capability offered by a stochastic-arithmetic backend.
///
/// `expected` values never cross this boundary: the backend judges a value
/// against its own cross-run statistics, not against a local reference.
pub trait ProbeBackend {
    /// Opaque accumulated state for one process lifetime.
    type Session;

    /// Human-readable backend name for logs.
    fn name(&self) -> &'static str;

    fn init(&self) -> Self::Session;

    fn probe(
        &self,
        session: &mut Self::Session,
        test_name: &str,
        var_name: &str,
        value: f64,
    ) -> bool;

    fn probe_absolute(
        &self,
        session: &mut Self::Session,
        test_name: &str,
        var_name: &str,
        value: f64,
        tolerance: f64,
    ) -> bool;

    fn probe_relative(
        &self,
        session: &mut Self::Session,
        test_name: &str,
        var_name: &str,
        value: f64,
        tolerance: f64,
    ) -> bool;

    /// Persist every observation accumulated in `session`.
    fn dump(&self, session: &mut Self::Session) -> Result<(), ProbeError>;
}

/// One recorded probe observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub test_name: String,
    pub var_name: String,
    /// Non-finite values are written as `"NaN"`, `"inf"` or `"-inf"`.
    #[serde(with = "crate::serde_float")]
    pub value: f64,
    /// `None` for a plain probe; the tolerance tier otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check: Option<CheckMode>,
    #[serde(
        default,
        with = "crate::serde_float::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub accuracy_target: Option<f64>,
}

/// Where a [`RecordingBackend`] writes its dump.
#[derive(Debug, Clone, Default)]
pub enum DumpSink {
    /// Drop the dump on the floor.
    #[default]
    Discard,
    /// Replace the contents of a shared buffer (tests, in-process consumers).
    Buffer(Arc<Mutex<Vec<u8>>>),
    /// Truncate and rewrite a JSONL file.
    File(PathBuf),
}

impl DumpSink {
    /// A fresh shared buffer sink plus a handle for reading it back.
    #[must_use]
    pub fn buffer() -> (Self, Arc<Mutex<Vec<u8>>>) {
        let buf = Arc::new(Mutex::new(Vec::new()));
        (Self::Buffer(Arc::clone(&buf)), buf)
    }
}

/// Accumulated observations of a [`RecordingBackend`].
#[derive(Debug, Default)]
pub struct RecordingSession {
    observations: Vec<Observation>,
    dumps: u32,
}

impl RecordingSession {
    #[must_use]
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Number of dumps performed on this session.
    #[must_use]
    pub fn dumps(&self) -> u32 {
        self.dumps
    }
}

/// Append-only in-memory backend that dumps its journal as JSONL.
///
/// Accepts every observation whose test and variable names are non-empty.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    sink: DumpSink,
}

impl RecordingBackend {
    #[must_use]
    pub fn new(sink: DumpSink) -> Self {
        Self { sink }
    }

    fn record(
        session: &mut RecordingSession,
        test_name: &str,
        var_name: &str,
        value: f64,
        check: Option<CheckMode>,
        accuracy_target: Option<f64>,
    ) -> bool {
        if test_name.is_empty() || var_name.is_empty() {
            return false;
        }
        session.observations.push(Observation {
            test_name: test_name.to_string(),
            var_name: var_name.to_string(),
            value,
            check,
            accuracy_target,
        });
        true
    }
}

fn write_jsonl<W: Write>(out: &mut W, observations: &[Observation]) -> Result<(), ProbeError> {
    for obs in observations {
        let line = serde_json::to_string(obs)?;
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

impl ProbeBackend for RecordingBackend {
    type Session = RecordingSession;

    fn name(&self) -> &'static str {
        "recording"
    }

    fn init(&self) -> RecordingSession {
        RecordingSession::default()
    }

    fn probe(
        &self,
        session: &mut RecordingSession,
        test_name: &str,
        var_name: &str,
        value: f64,
    ) -> bool {
        Self::record(session, test_name, var_name, value, None, None)
    }

    fn probe_absolute(
        &self,
        session: &mut RecordingSession,
        test_name: &str,
        var_name: &str,
        value: f64,
        tolerance: f64,
    ) -> bool {
        Self::record(
            session,
            test_name,
            var_name,
            value,
            Some(CheckMode::Absolute),
            Some(tolerance),
        )
    }

    fn probe_relative(
        &self,
        session: &mut RecordingSession,
        test_name: &str,
        var_name: &str,
        value: f64,
        tolerance: f64,
    ) -> bool {
        Self::record(
            session,
            test_name,
            var_name,
            value,
            Some(CheckMode::Relative),
            Some(tolerance),
        )
    }

    fn dump(&self, session: &mut RecordingSession) -> Result<(), ProbeError> {
        session.dumps += 1;
        match &self.sink {
            DumpSink::Discard => Ok(()),
            DumpSink::Buffer(buf) => {
                let mut out = Vec::new();
                write_jsonl(&mut out, &session.observations)?;
                *buf.lock() = out;
                Ok(())
            }
            DumpSink::File(path) => {
                let mut out = BufWriter::new(File::create(path)?);
                write_jsonl(&mut out, &session.observations)
            }
        }
    }
}
