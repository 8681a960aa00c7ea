//! Report parsing and count aggregation.
//!
//! Suite counts come from the `<testsuite>` attributes. Producers that omit
//! the `skipped` attribute still emit per-case `<skipped/>` markers, so a
//! missing `skipped` is computed from the direct cases instead.
//! `ignored_on_failure` is never declared; it counts reclassified markers, so
//! a detail report that was already processed reads back with its counts.

use std::path::Path;

use tracing::{debug, info};

use crate::model::{CaseStatus, SuiteChild, SuiteRecord, TestCase, TestReport, TestSuite};
use crate::xml::{parse_document, XmlElement};
use crate::{ReportError, Result};

/// Parse the report at `path` into typed records.
pub fn aggregate(path: &Path) -> Result<TestReport> {
    if !path.is_file() {
        return Err(ReportError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;
    let report = aggregate_str(&content, path)?;

    let total = report.aggregate();
    info!(
        target: "report.aggregated",
        path = %path.display(),
        suites = report.suites().len(),
        tests = total.tests,
        failures = total.failures,
        errors = total.errors,
        skipped = total.skipped,
        "Aggregated report"
    );
    Ok(report)
}

/// Parse report content; `source` is only used in error messages.
pub fn aggregate_str(content: &str, source: &Path) -> Result<TestReport> {
    let root = parse_document(content).map_err(|message| ReportError::Xml {
        path: source.to_path_buf(),
        message,
    })?;

    let mut suites = Vec::new();
    match root.name.as_str() {
        "testsuites" => {
            for child in root.children {
                if child.name == "testsuite" {
                    collect_suite(child, source, &mut suites)?;
                } else {
                    debug!(
                        target: "report.skip_element",
                        element = %child.name,
                        "Dropping non-suite element under <testsuites>"
                    );
                }
            }
        }
        "testsuite" => collect_suite(root, source, &mut suites)?,
        other => {
            return Err(ReportError::Structure {
                path: source.to_path_buf(),
                message: format!("root element is <{other}>, expected <testsuites> or <testsuite>"),
            })
        }
    }
    Ok(TestReport::new(suites))
}

/// Convert a `<testsuite>` element, flattening nested suites after it.
fn collect_suite(element: XmlElement, source: &Path, out: &mut Vec<TestSuite>) -> Result<()> {
    let name = element
        .attr("name")
        .ok_or_else(|| ReportError::Structure {
            path: source.to_path_buf(),
            message: "<testsuite> without a name attribute".to_string(),
        })?
        .to_string();

    let XmlElement {
        attributes,
        children: raw_children,
        ..
    } = element;

    let mut children = Vec::new();
    let mut nested = Vec::new();
    for child in raw_children {
        match child.name.as_str() {
            "testcase" => children.push(SuiteChild::Case(TestCase::from_element(child))),
            "testsuite" => nested.push(child),
            _ => children.push(SuiteChild::Other(child)),
        }
    }

    let declared = |attribute: &str| {
        attributes
            .iter()
            .find(|(k, _)| k == attribute)
            .map(|(_, v)| v.as_str())
    };
    let count = |attribute: &str| -> Result<u64> {
        declared(attribute)
            .map(|raw| parse_count(&name, attribute, raw))
            .unwrap_or(Ok(0))
    };

    let skipped = match declared("skipped") {
        Some(raw) => parse_count(&name, "skipped", raw)?,
        None => children
            .iter()
            .filter(|child| matches!(child, SuiteChild::Case(case) if case.has_skip_marker()))
            .count() as u64,
    };
    let time = match declared("time") {
        Some(raw) => parse_time(&name, raw)?,
        None => 0.0,
    };

    let record = SuiteRecord {
        time,
        tests: count("tests")?,
        errors: count("errors")?,
        skipped,
        failures: count("failures")?,
        ignored_on_failure: children
            .iter()
            .filter(|child| {
                matches!(child, SuiteChild::Case(case) if case.status() == CaseStatus::IgnoredOnFailure)
            })
            .count() as u64,
    };

    out.push(TestSuite {
        name,
        attributes,
        children,
        record,
    });
    for suite in nested {
        collect_suite(suite, source, out)?;
    }
    Ok(())
}

/// Parse a count attribute, stripping thousands separators.
fn parse_count(suite: &str, attribute: &str, raw: &str) -> Result<u64> {
    raw.replace(',', "")
        .trim()
        .parse::<u64>()
        .map_err(|_| ReportError::InvalidCount {
            suite: suite.to_string(),
            attribute: attribute.to_string(),
            value: raw.to_string(),
        })
}

fn parse_time(suite: &str, raw: &str) -> Result<f64> {
    match raw.replace(',', "").trim().parse::<f64>() {
        Ok(time) if time.is_finite() && time >= 0.0 => Ok(time),
        _ => Err(ReportError::InvalidCount {
            suite: suite.to_string(),
            attribute: "time".to_string(),
            value: raw.to_string(),
        }),
    }
}
