//! Expected-failure reclassification.
//!
//! A failed case whose failure message (minus a leading `"failed "`) is in the
//! profile's ignore set becomes `ignored_on_failure`: its suite loses one
//! failure and gains one ignored failure. The case element is kept intact and
//! only its failure marker is re-tagged on output.
//!
//! Reclassified cases are no longer `failed`, so applying this twice is a
//! no-op.

use dm_config::IgnoreProfile;
use serde::Serialize;
use tracing::{info, warn};

use crate::model::{CaseRecord, CaseStatus, SuiteChild, TestReport, TestSuite};

/// Prefix some producers put in front of the test name in failure messages.
pub const FAILED_PREFIX: &str = "failed ";

/// What a reclassification pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReclassifyOutcome {
    /// Cases moved from `failed` to `ignored_on_failure`.
    pub reclassified: Vec<CaseRecord>,
    /// Ignored failures left as failed because their suite declares no failures.
    pub unaccounted: Vec<CaseRecord>,
}

impl ReclassifyOutcome {
    pub fn is_empty(&self) -> bool {
        self.reclassified.is_empty() && self.unaccounted.is_empty()
    }
}

/// The ignore-set key for a failure message.
pub fn ignore_key(message: &str) -> &str {
    message.strip_prefix(FAILED_PREFIX).unwrap_or(message)
}

/// Reclassify expected failures in place.
///
/// The flaky list of the profile is informational and not consulted.
pub fn reclassify(report: &mut TestReport, ignore: &IgnoreProfile) -> ReclassifyOutcome {
    let mut outcome = ReclassifyOutcome::default();
    if ignore.ignore.is_empty() {
        return outcome;
    }

    report.update(|suites| {
        for suite in suites.iter_mut() {
            reclassify_suite(suite, ignore, &mut outcome);
        }
    });

    if !outcome.reclassified.is_empty() {
        info!(
            target: "report.reclassified",
            count = outcome.reclassified.len(),
            "Reclassified expected failures"
        );
    }
    outcome
}

fn reclassify_suite(suite: &mut TestSuite, ignore: &IgnoreProfile, outcome: &mut ReclassifyOutcome) {
    let TestSuite {
        name,
        children,
        record,
        ..
    } = suite;

    for child in children.iter_mut() {
        let SuiteChild::Case(case) = child else {
            continue;
        };
        if case.status != CaseStatus::Failed {
            continue;
        }
        let Some(message) = case.failure_message() else {
            continue;
        };
        if !ignore.is_ignored(ignore_key(message)) {
            continue;
        }

        if record.failures == 0 {
            warn!(
                target: "report.reclassify_unaccounted",
                suite = %name,
                case = %case.qualified_name(),
                "Ignored failure in a suite that declares no failures; left as failed"
            );
            outcome.unaccounted.push(case.record(name));
            continue;
        }

        record.failures -= 1;
        record.ignored_on_failure = record.ignored_on_failure.saturating_add(1);
        case.status = CaseStatus::IgnoredOnFailure;
        info!(
            target: "report.case_ignored",
            suite = %name,
            case = %case.qualified_name(),
            message = case.failure_message().unwrap_or_default(),
            "Failed test is ignored for this driver version"
        );
        outcome.reclassified.push(case.record(name));
    }
}
