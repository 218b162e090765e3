//! CLI entrypoint for the accuprobe fixture harness.

use std::path::{Path, PathBuf};

use accuprobe_core::structured_log::{LogEmitter, validate_log_file};
use accuprobe_core::{DumpSink, ProbeSuite, RecordingBackend, SessionPolicy};
use accuprobe_harness::{ProbeFixtureSet, ProbeRunner, RunReport};
use clap::{Parser, Subcommand, ValueEnum};

/// Probe tooling for accuprobe.
#[derive(Debug, Parser)]
#[command(name = "probe-harness")]
#[command(about = "Run accuracy-probe fixtures and check probe logs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// Local comparisons, no session.
    Local,
    /// In-memory recording backend, dumped as JSONL.
    Recording,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Policy {
    /// Open the backend session on the first probe.
    Lazy,
    /// Open the backend session before any probe.
    Eager,
}

impl From<Policy> for SessionPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Lazy => Self::Lazy,
            Policy::Eager => Self::Eager,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Probe every case of a fixture file and compare verdicts.
    Run {
        /// Fixture JSON path.
        #[arg(long)]
        fixture: PathBuf,
        /// Verdict source.
        #[arg(long, value_enum, default_value_t = Backend::Local)]
        backend: Backend,
        /// Session policy for backend runs.
        #[arg(long, value_enum, default_value_t = Policy::Lazy)]
        policy: Policy,
        /// Structured JSONL log path (`-` for stderr).
        #[arg(long)]
        log: Option<PathBuf>,
        /// Dump path for the recording backend.
        #[arg(long)]
        dump: Option<PathBuf>,
        /// Output report path (markdown; JSON is written alongside).
        #[arg(long)]
        report: Option<PathBuf>,
        /// Optional fixed timestamp string for deterministic report generation.
        #[arg(long)]
        timestamp: Option<String>,
    },
    /// Validate a structured probe log against the JSONL schema.
    ValidateLog {
        /// Structured JSONL log path.
        #[arg(long)]
        log: PathBuf,
    },
}

fn build_suite(
    backend: Backend,
    policy: SessionPolicy,
    dump: Option<PathBuf>,
    log: Option<&Path>,
) -> Result<ProbeSuite, Box<dyn std::error::Error>> {
    let suite = match backend {
        Backend::Local => {
            if dump.is_some() {
                eprintln!("--dump ignored: the local backend keeps no observations");
            }
            ProbeSuite::local()
        }
        Backend::Recording => {
            let sink = dump.map_or(DumpSink::Discard, DumpSink::File);
            ProbeSuite::delegating(RecordingBackend::new(sink), policy)
        }
    };
    Ok(match log {
        Some(path) if path == Path::new("-") => suite.with_log(LogEmitter::to_stderr("harness")),
        Some(path) => suite.with_log(LogEmitter::to_file(path, "harness")?),
        None => suite,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            fixture,
            backend,
            policy,
            log,
            dump,
            report,
            timestamp,
        } => {
            let fixtures = ProbeFixtureSet::from_file(&fixture)?;
            eprintln!(
                "Probing {} case(s) from {} ({})",
                fixtures.cases.len(),
                fixture.display(),
                fixtures.family
            );

            let mut suite = build_suite(backend, policy.into(), dump, log.as_deref())?;
            let runner = ProbeRunner::new(fixtures.family.clone());
            let results = runner.run(&fixtures, &mut suite);
            let summary = suite.shutdown();

            let report_doc = RunReport::new(
                runner.campaign,
                timestamp.unwrap_or_else(|| format!("{:?}", std::time::SystemTime::now())),
                summary,
                results,
            );

            eprintln!(
                "Run complete: total={}, passed={}, failed={}",
                report_doc.total, report_doc.passed, report_doc.failed
            );
            if let Some(err) = &report_doc.suite.final_dump_error {
                eprintln!("Final dump failed: {err}");
            }

            if let Some(report_path) = report {
                eprintln!("Writing report to {}", report_path.display());
                std::fs::write(&report_path, report_doc.to_markdown())?;
                let json_path = report_path.with_extension("json");
                std::fs::write(&json_path, report_doc.to_json())?;
            }

            if !report_doc.all_passed() {
                return Err("Probe fixture run failed".into());
            }
        }
        Command::ValidateLog { log } => {
            let (lines, errors) = validate_log_file(&log)?;
            if errors.is_empty() {
                eprintln!("{}: {lines} line(s), schema OK", log.display());
            } else {
                for err in &errors {
                    eprintln!("{err}");
                }
                return Err(format!(
                    "{}: {} schema error(s) in {lines} line(s)",
                    log.display(),
                    errors.len()
                )
                .into());
            }
        }
    }

    Ok(())
}
