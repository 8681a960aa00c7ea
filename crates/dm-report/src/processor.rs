//! Memoized processing of one report file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use dm_config::IgnoreProfile;
use serde::Serialize;
use tracing::{debug, info};

use crate::model::{CaseRecord, SuiteRecord, SUMMARY_KEY};
use crate::writer::{summary_path, write_detail, write_summary};
use crate::{aggregate, reclassify, tag_classnames, Result};

/// Post-reclassification view of a processed report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub suites: BTreeMap<String, SuiteRecord>,
    pub aggregate: SuiteRecord,
    pub reclassified: Vec<CaseRecord>,
}

impl ReportSummary {
    /// Whether any error or non-ignored failure remains.
    pub fn is_failed(&self) -> bool {
        self.aggregate.is_failed()
    }

    /// Suite records plus the aggregate under `testsuite_summary`.
    pub fn flatten(&self) -> BTreeMap<String, SuiteRecord> {
        let mut flat = self.suites.clone();
        flat.insert(SUMMARY_KEY.to_string(), self.aggregate);
        flat
    }
}

/// A report file on disk together with the tag and ignore list it is
/// processed with.
///
/// [`JunitReport::summary`] runs aggregation, reclassification and both
/// writers exactly once; later calls return the cached result. A failed run
/// is not cached.
#[derive(Debug)]
pub struct JunitReport {
    path: PathBuf,
    tag: String,
    ignore: IgnoreProfile,
    summary: Mutex<Option<Arc<ReportSummary>>>,
}

impl JunitReport {
    pub fn new(path: impl Into<PathBuf>, tag: impl Into<String>, ignore: IgnoreProfile) -> Self {
        let ignore_count = ignore.ignore.len();
        let report = Self {
            path: path.into(),
            tag: tag.into(),
            ignore,
            summary: Mutex::new(None),
        };
        debug!(
            target: "report.created",
            path = %report.path.display(),
            tag = %report.tag,
            ignored = ignore_count,
            "Report handle created"
        );
        report
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn ignore(&self) -> &IgnoreProfile {
        &self.ignore
    }

    pub fn summary_path(&self) -> PathBuf {
        summary_path(&self.path)
    }

    /// Prefix the class names in the raw file with this report's tag.
    ///
    /// Must run before the first [`JunitReport::summary`] call.
    pub fn tag_classnames(&self) -> Result<usize> {
        tag_classnames(&self.path, &self.tag)
    }

    /// Process the report once and return the summary.
    pub fn summary(&self) -> Result<Arc<ReportSummary>> {
        let mut slot = self.summary.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(summary) = slot.as_ref() {
            return Ok(Arc::clone(summary));
        }

        let mut report = aggregate(&self.path)?;
        let outcome = reclassify(&mut report, &self.ignore);
        write_summary(&report, &self.summary_path())?;
        write_detail(&report, &self.path)?;

        let summary = Arc::new(ReportSummary {
            suites: report.records(),
            aggregate: *report.aggregate(),
            reclassified: outcome.reclassified,
        });
        info!(
            target: "report.processed",
            path = %self.path.display(),
            tag = %self.tag,
            failed = summary.is_failed(),
            ignored_on_failure = summary.aggregate.ignored_on_failure,
            "Report processed"
        );
        *slot = Some(Arc::clone(&summary));
        Ok(summary)
    }

    pub fn is_failed(&self) -> Result<bool> {
        Ok(self.summary()?.is_failed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReportError;
    use std::fs;
    use tempfile::TempDir;

    const RAW: &str = r#"<testsuites>
  <testsuite name="S" tests="2" failures="1" errors="0" time="1.0">
    <testcase classname="C" name="bad"><failure message="failed C.bad"/></testcase>
    <testcase classname="C" name="good"/>
  </testsuite>
</testsuites>"#;

    fn ignoring(test: &str) -> IgnoreProfile {
        IgnoreProfile {
            ignore: [test.to_string()].into(),
            ..Default::default()
        }
    }

    #[test]
    fn summary_is_computed_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("r.xml");
        fs::write(&path, RAW).unwrap();

        let report = JunitReport::new(&path, "1.0.0", ignoring("C.bad"));
        let first = report.summary().unwrap();
        assert!(!first.is_failed());
        assert_eq!(first.aggregate.ignored_on_failure, 1);

        // Changing the file afterwards does not trigger a re-parse.
        fs::write(&path, "not xml").unwrap();
        let second = report.summary().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!report.is_failed().unwrap());
    }

    #[test]
    fn flatten_adds_aggregate_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("r.xml");
        fs::write(&path, RAW).unwrap();

        let summary = JunitReport::new(&path, "1.0.0", IgnoreProfile::default())
            .summary()
            .unwrap();
        let flat = summary.flatten();
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[SUMMARY_KEY].failures, 1);
        assert!(summary.is_failed());
    }

    #[test]
    fn missing_report_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("late.xml");
        let report = JunitReport::new(&path, "1.0.0", IgnoreProfile::default());

        assert!(matches!(report.summary(), Err(ReportError::NotFound { .. })));
        fs::write(&path, RAW).unwrap();
        assert_eq!(report.summary().unwrap().aggregate.tests, 2);
    }

    #[test]
    fn unusable_suite_name_leaves_report_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("r.xml");
        let raw = RAW.replace(r#"name="S""#, r#"name="My Suite""#);
        fs::write(&path, &raw).unwrap();

        let report = JunitReport::new(&path, "1.0.0", ignoring("C.bad"));
        assert!(matches!(report.summary(), Err(ReportError::Structure { .. })));
        assert_eq!(fs::read_to_string(&path).unwrap(), raw);
        assert!(!report.summary_path().exists());
    }

    #[test]
    fn concurrent_first_access_processes_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("r.xml");
        fs::write(&path, RAW).unwrap();
        let report = Arc::new(JunitReport::new(&path, "1.0.0", ignoring("C.bad")));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let report = Arc::clone(&report);
                std::thread::spawn(move || report.summary().unwrap())
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        for summary in &results[1..] {
            assert!(Arc::ptr_eq(&results[0], summary));
        }
        assert_eq!(results[0].suites["S"].failures, 0);
        assert_eq!(results[0].suites["S"].ignored_on_failure, 1);
    }
}
