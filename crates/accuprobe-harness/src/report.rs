//! Report generation for probe runs.

use accuprobe_core::SuiteSummary;
use serde::Serialize;

use crate::runner::CaseResult;

/// Summary of one harness run: per-case results plus what the suite saw.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Report title.
    pub title: String,
    /// Campaign name from the runner.
    pub campaign: String,
    /// Timestamp (UTC).
    pub timestamp: String,
    /// Cases run.
    pub total: usize,
    /// Cases whose verdict matched (or had no applicable expectation).
    pub passed: usize,
    /// Cases whose verdict contradicted the fixture.
    pub failed: usize,
    /// Suite tallies, dumps and sessions.
    pub suite: SuiteSummary,
    /// Individual results, in fixture order.
    pub results: Vec<CaseResult>,
}

impl RunReport {
    #[must_use]
    pub fn new(
        campaign: impl Into<String>,
        timestamp: impl Into<String>,
        suite: SuiteSummary,
        results: Vec<CaseResult>,
    ) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed()).count();
        Self {
            title: String::from("accuprobe Probe Report"),
            campaign: campaign.into(),
            timestamp: timestamp.into(),
            total,
            passed,
            failed: total - passed,
            suite,
            results,
        }
    }

    /// Returns true if no case contradicted its fixture.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.suite.final_dump_error.is_none()
    }

    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", self.title));
        out.push_str(&format!("- Campaign: {}\n", self.campaign));
        out.push_str(&format!("- Timestamp: {}\n", self.timestamp));
        out.push_str(&format!(
            "- Prober: {} (backend {}, policy {})\n",
            self.suite.prober,
            self.suite.backend.as_str(),
            self.suite.policy.as_str()
        ));
        out.push_str(&format!("- Total: {}\n", self.total));
        out.push_str(&format!("- Passed: {}\n", self.passed));
        out.push_str(&format!("- Failed: {}\n", self.failed));
        out.push_str(&format!(
            "- Sessions: {}, dumps: {}\n",
            self.suite.sessions_created, self.suite.dumps
        ));
        if let Some(err) = &self.suite.final_dump_error {
            out.push_str(&format!("- Final dump failed: {err}\n"));
        }
        out.push('\n');

        out.push_str("| Case | Check | Verdict | Expected | Status |\n");
        out.push_str("|------|-------|---------|----------|--------|\n");
        for r in &self.results {
            let expected = match r.expected_verdict {
                Some(true) => "pass",
                Some(false) => "fail",
                None => "-",
            };
            let verdict = if r.verdict { "pass" } else { "fail" };
            let status = if r.passed() { "PASS" } else { "FAIL" };
            out.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                r.case_name,
                r.check.as_str(),
                verdict,
                expected,
                status
            ));
        }
        out
    }

    /// Render the report as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accuprobe_core::{CheckMode, ProbeSuite};

    fn result(name: &str, verdict: bool, expected: Option<bool>) -> CaseResult {
        CaseResult {
            case_name: name.to_string(),
            test_name: "t".to_string(),
            var_name: "v".to_string(),
            check: CheckMode::Absolute,
            verdict,
            expected_verdict: expected,
        }
    }

    #[test]
    fn counts_and_renders_failures() {
        let summary = ProbeSuite::local().shutdown();
        let report = RunReport::new(
            "smoke",
            "2026-10-18T00:00:00Z",
            summary,
            vec![
                result("f/a", true, Some(true)),
                result("f/b", true, Some(false)),
            ],
        );
        assert_eq!(report.total, 2);
        assert_eq!(report.passed, 1);
        assert_eq!(report.failed, 1);
        assert!(!report.all_passed());

        let md = report.to_markdown();
        assert!(md.starts_with("# accuprobe Probe Report"));
        assert!(md.contains("| f/b | absolute | pass | fail | FAIL |"));
        assert!(md.contains("- Prober: local (backend disabled, policy lazy)"));

        let json: serde_json::Value = serde_json::from_str(&report.to_json()).unwrap();
        assert_eq!(json["failed"], 1);
        assert_eq!(json["suite"]["prober"], "local");
        assert_eq!(json["results"][1]["expected_verdict"], false);
    }
}
