//! Typed report records.
//!
//! A [`TestReport`] owns its suites and keeps the aggregate record in sync:
//! every mutation goes through a method that recomputes it before returning.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};

use crate::xml::XmlElement;

/// Key of the aggregate record in flattened summaries.
pub const SUMMARY_KEY: &str = "testsuite_summary";

/// Element name of a failure that was reclassified as expected.
pub const IGNORED_ON_FAILURE_TAG: &str = "ignored_on_failure";

/// Per-suite counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SuiteRecord {
    #[serde(serialize_with = "serialize_time")]
    pub time: f64,
    pub tests: u64,
    pub errors: u64,
    pub skipped: u64,
    pub failures: u64,
    pub ignored_on_failure: u64,
}

fn serialize_time<S: Serializer>(time: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64((time * 1000.0).round() / 1000.0)
}

impl SuiteRecord {
    /// Elementwise addition.
    pub fn add(&mut self, other: &SuiteRecord) {
        self.time += other.time;
        self.tests = self.tests.saturating_add(other.tests);
        self.errors = self.errors.saturating_add(other.errors);
        self.skipped = self.skipped.saturating_add(other.skipped);
        self.failures = self.failures.saturating_add(other.failures);
        self.ignored_on_failure = self
            .ignored_on_failure
            .saturating_add(other.ignored_on_failure);
    }

    /// Elementwise sum of records.
    pub fn sum<'a>(records: impl IntoIterator<Item = &'a SuiteRecord>) -> SuiteRecord {
        let mut total = SuiteRecord::default();
        for record in records {
            total.add(record);
        }
        total
    }

    /// Failing outcomes that count against the run.
    pub fn is_failed(&self) -> bool {
        self.errors > 0 || self.failures > 0
    }

    /// `time` formatted the way summaries carry it.
    pub fn time_string(&self) -> String {
        format!("{:.3}", self.time)
    }
}

/// Outcome of a single test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Passed,
    Failed,
    Errored,
    Skipped,
    IgnoredOnFailure,
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaseStatus::Passed => write!(f, "passed"),
            CaseStatus::Failed => write!(f, "failed"),
            CaseStatus::Errored => write!(f, "errored"),
            CaseStatus::Skipped => write!(f, "skipped"),
            CaseStatus::IgnoredOnFailure => write!(f, "ignored_on_failure"),
        }
    }
}

/// Flat view of a test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub suite: String,
    pub name: String,
    pub status: CaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A `<testcase>` element and its classification.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub(crate) element: XmlElement,
    pub(crate) status: CaseStatus,
}

impl TestCase {
    pub(crate) fn from_element(element: XmlElement) -> Self {
        let has = |tag: &str| element.children.iter().any(|c| c.name == tag);
        let status = if has("failure") {
            CaseStatus::Failed
        } else if has("error") {
            CaseStatus::Errored
        } else if has(IGNORED_ON_FAILURE_TAG) {
            CaseStatus::IgnoredOnFailure
        } else if has("skipped") {
            CaseStatus::Skipped
        } else {
            CaseStatus::Passed
        };
        Self { element, status }
    }

    pub fn name(&self) -> &str {
        self.element.attr("name").unwrap_or_default()
    }

    pub fn classname(&self) -> Option<&str> {
        self.element.attr("classname")
    }

    /// `classname.name`, or just `name` without a classname.
    pub fn qualified_name(&self) -> String {
        match self.classname() {
            Some(classname) if !classname.is_empty() => format!("{}.{}", classname, self.name()),
            _ => self.name().to_string(),
        }
    }

    pub fn status(&self) -> CaseStatus {
        self.status
    }

    /// Whether the case carries a `<skipped>` marker.
    pub fn has_skip_marker(&self) -> bool {
        self.element.children.iter().any(|c| c.name == "skipped")
    }

    /// `message` attribute of the failure (or reclassified failure) marker.
    pub fn failure_message(&self) -> Option<&str> {
        self.element
            .children
            .iter()
            .find(|c| c.name == "failure" || c.name == IGNORED_ON_FAILURE_TAG)
            .and_then(|c| c.attr("message"))
    }

    /// The original element with a reclassified failure marker re-tagged.
    pub fn to_element(&self) -> XmlElement {
        let mut element = self.element.clone();
        if self.status == CaseStatus::IgnoredOnFailure {
            if let Some(marker) = element.children.iter_mut().find(|c| c.name == "failure") {
                marker.name = IGNORED_ON_FAILURE_TAG.to_string();
            }
        }
        element
    }

    pub fn record(&self, suite: &str) -> CaseRecord {
        CaseRecord {
            suite: suite.to_string(),
            name: self.qualified_name(),
            status: self.status,
            message: self.failure_message().map(str::to_string),
        }
    }
}

/// Child of a `<testsuite>`, kept in document order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SuiteChild {
    Case(TestCase),
    Other(XmlElement),
}

/// A `<testsuite>` element with its counts.
#[derive(Debug, Clone, PartialEq)]
pub struct TestSuite {
    pub(crate) name: String,
    pub(crate) attributes: Vec<(String, String)>,
    pub(crate) children: Vec<SuiteChild>,
    pub(crate) record: SuiteRecord,
}

impl TestSuite {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record(&self) -> &SuiteRecord {
        &self.record
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn cases(&self) -> impl Iterator<Item = &TestCase> {
        self.children.iter().filter_map(|child| match child {
            SuiteChild::Case(case) => Some(case),
            SuiteChild::Other(_) => None,
        })
    }

    /// The suite element as written to the detail report.
    ///
    /// A declared `failures` attribute carries the current count.
    pub fn to_element(&self) -> XmlElement {
        let mut element = XmlElement::new("testsuite");
        element.attributes = self.attributes.clone();
        if element.attr("failures").is_some() {
            element.set_attr("failures", self.record.failures.to_string());
        }
        element.children = self
            .children
            .iter()
            .map(|child| match child {
                SuiteChild::Case(case) => case.to_element(),
                SuiteChild::Other(other) => other.clone(),
            })
            .collect();
        element
    }
}

/// A parsed report: all suites plus their aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct TestReport {
    suites: Vec<TestSuite>,
    aggregate: SuiteRecord,
}

impl TestReport {
    pub fn new(suites: Vec<TestSuite>) -> Self {
        let aggregate = SuiteRecord::sum(suites.iter().map(|s| &s.record));
        Self { suites, aggregate }
    }

    pub fn suites(&self) -> &[TestSuite] {
        &self.suites
    }

    /// Mutate the suites; the aggregate is recomputed before returning.
    pub(crate) fn update<T>(&mut self, f: impl FnOnce(&mut [TestSuite]) -> T) -> T {
        let result = f(&mut self.suites);
        self.aggregate = SuiteRecord::sum(self.suites.iter().map(|s| &s.record));
        result
    }

    /// Per-suite records keyed by suite name; suites sharing a name are summed.
    pub fn records(&self) -> BTreeMap<String, SuiteRecord> {
        let mut records: BTreeMap<String, SuiteRecord> = BTreeMap::new();
        for suite in &self.suites {
            records
                .entry(suite.name.clone())
                .or_default()
                .add(&suite.record);
        }
        records
    }

    pub fn aggregate(&self) -> &SuiteRecord {
        &self.aggregate
    }

    pub fn is_failed(&self) -> bool {
        self.aggregate.is_failed()
    }

    pub fn cases(&self) -> Vec<CaseRecord> {
        self.suites
            .iter()
            .flat_map(|suite| suite.cases().map(|case| case.record(&suite.name)))
            .collect()
    }

    /// The full `<testsuites>` tree as written to the detail report.
    pub fn to_element(&self) -> XmlElement {
        let mut root = XmlElement::new("testsuites");
        root.children = self.suites.iter().map(TestSuite::to_element).collect();
        root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tests: u64, failures: u64, time: f64) -> SuiteRecord {
        SuiteRecord {
            time,
            tests,
            failures,
            ..Default::default()
        }
    }

    #[test]
    fn sum_is_elementwise() {
        let total = SuiteRecord::sum(&[record(3, 1, 0.5), record(4, 0, 1.25)]);
        assert_eq!(total.tests, 7);
        assert_eq!(total.failures, 1);
        assert!((total.time - 1.75).abs() < 1e-9);
    }

    #[test]
    fn is_failed_counts_errors_and_failures() {
        assert!(!SuiteRecord::default().is_failed());
        let errored = SuiteRecord {
            errors: 1,
            ..Default::default()
        };
        assert!(errored.is_failed());
        assert!(record(1, 1, 0.0).is_failed());
    }

    #[test]
    fn time_serializes_with_three_decimals() {
        let json = serde_json::to_string(&record(1, 0, 1.23456)).unwrap();
        assert!(json.contains("\"time\":1.235"), "{json}");
        assert_eq!(record(1, 0, 2.0).time_string(), "2.000");
    }

    #[test]
    fn case_status_from_markers() {
        let case = |marker: Option<&str>| {
            let mut el = XmlElement::new("testcase").with_attr("name", "t");
            if let Some(m) = marker {
                el.children.push(XmlElement::new(m));
            }
            TestCase::from_element(el).status()
        };
        assert_eq!(case(None), CaseStatus::Passed);
        assert_eq!(case(Some("failure")), CaseStatus::Failed);
        assert_eq!(case(Some("error")), CaseStatus::Errored);
        assert_eq!(case(Some("skipped")), CaseStatus::Skipped);
        assert_eq!(case(Some("ignored_on_failure")), CaseStatus::IgnoredOnFailure);
        assert_eq!(case(Some("system-out")), CaseStatus::Passed);
    }

    #[test]
    fn qualified_name_uses_classname() {
        let el = XmlElement::new("testcase")
            .with_attr("classname", "Ns.Fixture")
            .with_attr("name", "Test");
        assert_eq!(TestCase::from_element(el).qualified_name(), "Ns.Fixture.Test");

        let bare = XmlElement::new("testcase").with_attr("name", "Test");
        assert_eq!(TestCase::from_element(bare).qualified_name(), "Test");
    }
}
