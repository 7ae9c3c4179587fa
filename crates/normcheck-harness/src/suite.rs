//! The built-in case list and suite-level results.

use serde::Serialize;

use crate::case::{CaseReport, TestCase};
use crate::precision::Precision::{Half, Single};

const DEFAULT_CASES: &[TestCase] = &[
    TestCase::new(1, 32, 4, Half),
    TestCase::new(1, 32, 512, Half),
    TestCase::new(1, 64, 4, Half),
    TestCase::new(1, 128, 128, Half),
    TestCase::new(1, 256, 256, Half),
    TestCase::new(1, 512, 512, Half),
    TestCase::new(1, 8, 4, Single),
    TestCase::new(1, 128, 128, Single),
    TestCase::new(1, 256, 256, Single),
    TestCase::new(1, 512, 512, Single),
    TestCase::new(1, 1024, 1024, Single),
    TestCase::new(1, 4096, 1024, Single),
    TestCase::new(1, 1024, 4096, Single),
    TestCase::new(2, 64, 64, Single),
    TestCase::new(2, 128, 128, Single),
    TestCase::new(8, 4096, 1024, Single),
    TestCase::new(8, 1024, 4096, Single),
];

/// The fixed, ordered suite: small to large shapes in both precisions.
pub fn default_cases() -> &'static [TestCase] {
    DEFAULT_CASES
}

/// Result of one case within a suite.
#[derive(Clone, Debug, Serialize)]
pub struct CaseOutcome {
    pub case: TestCase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<CaseReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CaseOutcome {
    pub fn passed(report: CaseReport) -> Self {
        Self {
            case: report.case,
            report: Some(report),
            error: None,
        }
    }

    pub fn failed(case: TestCase, error: &crate::HarnessError) -> Self {
        Self {
            case,
            report: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_pass(&self) -> bool {
        self.error.is_none()
    }
}

/// Cumulative result of a suite run.
#[derive(Clone, Debug, Serialize)]
pub struct SuiteReport {
    pub backend: String,
    pub outcomes: Vec<CaseOutcome>,
}

impl SuiteReport {
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(CaseOutcome::is_pass)
    }

    pub fn failures(&self) -> Vec<&CaseOutcome> {
        self.outcomes.iter().filter(|o| !o.is_pass()).collect()
    }

    pub fn passed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_pass()).count()
    }
}
