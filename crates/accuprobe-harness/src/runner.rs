//! Probe execution engine.

use accuprobe_core::{CheckMode, ProbeSuite};
use serde::{Deserialize, Serialize};

use crate::fixtures::{ProbeCase, ProbeFixtureSet};

/// Outcome of running one fixture case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    /// `family/name` of the case.
    pub case_name: String,
    pub test_name: String,
    pub var_name: String,
    pub check: CheckMode,
    /// Verdict the suite returned.
    pub verdict: bool,
    /// Verdict the fixture expects, when it applies.
    ///
    /// `None` when a backend produced the verdict: fixture expectations
    /// describe the local comparison only.
    pub expected_verdict: Option<bool>,
}

impl CaseResult {
    /// True unless the verdict contradicts an applicable expectation.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.expected_verdict.is_none_or(|e| e == self.verdict)
    }
}

/// Runs fixture sets through a [`ProbeSuite`].
#[derive(Debug, Clone)]
pub struct ProbeRunner {
    /// Name of the run, carried into reports.
    pub campaign: String,
}

impl ProbeRunner {
    #[must_use]
    pub fn new(campaign: impl Into<String>) -> Self {
        Self {
            campaign: campaign.into(),
        }
    }

    /// Probe every case in order and collect the verdicts.
    pub fn run(&self, fixtures: &ProbeFixtureSet, suite: &mut ProbeSuite) -> Vec<CaseResult> {
        let local = !suite.backend_enabled();
        fixtures
            .cases
            .iter()
            .map(|case| {
                let verdict = execute_case(case, suite);
                CaseResult {
                    case_name: format!("{}/{}", fixtures.family, case.name),
                    test_name: case.test_name.clone(),
                    var_name: case.var_name.clone(),
                    check: case.check,
                    verdict,
                    expected_verdict: local.then_some(case.expect_pass),
                }
            })
            .collect()
    }
}

fn execute_case(case: &ProbeCase, suite: &mut ProbeSuite) -> bool {
    suite.check(
        case.check,
        &case.test_name,
        &case.var_name,
        case.value,
        case.expected,
        case.target(),
    )
}
