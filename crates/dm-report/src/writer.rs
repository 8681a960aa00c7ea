//! Summary and detail report writers.
//!
//! All files are written to a temporary sibling and renamed into place. The
//! detail writer additionally keeps a `<stem>_origin.<ext>` copy of the raw
//! report until the rewritten file has been committed.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::model::{TestReport, SUMMARY_KEY};
use crate::xml::{to_pretty_string, XmlElement};
use crate::{ReportError, Result};

/// `<dir>/<stem><suffix>.<ext>` next to `path`.
fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}{suffix}"),
    };
    path.with_file_name(name)
}

/// Where the summary for a report is written: `<stem>_summary.<ext>`.
pub fn summary_path(report_path: &Path) -> PathBuf {
    sibling_with_suffix(report_path, "_summary")
}

/// Where the raw report is kept while the detail report is rewritten.
pub fn origin_path(report_path: &Path) -> PathBuf {
    sibling_with_suffix(report_path, "_origin")
}

/// Attributes the summary element sets besides the per-suite ones.
const RESERVED_ATTRIBUTES: [&str; 3] = ["name", SUMMARY_KEY, "time"];

/// Whether `name` can be written as an XML attribute name.
fn is_attribute_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Build the flat summary element written to `destination`.
///
/// One attribute per suite holding its JSON count map, the aggregate under
/// `testsuite_summary`, and the total time with three decimals. Suite names
/// that are not attribute names, or that collide with those three, are
/// rejected.
pub fn summary_element(report: &TestReport, destination: &Path) -> Result<XmlElement> {
    let name = destination
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| SUMMARY_KEY.to_string());
    let mut element = XmlElement::new("testsuite").with_attr("name", name);

    for (suite, record) in report.records() {
        if !is_attribute_name(&suite) || RESERVED_ATTRIBUTES.contains(&suite.as_str()) {
            return Err(ReportError::Structure {
                path: destination.to_path_buf(),
                message: format!("suite name '{suite}' cannot be a summary attribute"),
            });
        }
        element.set_attr(&suite, serde_json::to_string(&record)?);
    }
    element.set_attr(SUMMARY_KEY, serde_json::to_string(report.aggregate())?);
    element.set_attr("time", report.aggregate().time_string());
    Ok(element)
}

/// Write the summary file, creating parent directories as needed.
pub fn write_summary(report: &TestReport, destination: &Path) -> Result<()> {
    let element = summary_element(report, destination)?;
    let content = to_pretty_string(&element).map_err(|message| ReportError::Xml {
        path: destination.to_path_buf(),
        message,
    })?;

    info!(
        target: "report.summary_written",
        path = %destination.display(),
        suites = report.suites().len(),
        "Creating summary report"
    );
    write_atomic(destination, content.as_bytes())
}

/// Replace the report at `destination` with the reclassified tree.
///
/// The raw file is copied to [`origin_path`] first. If the rewrite fails the
/// copy is left behind; once the new file is in place it is removed.
pub fn write_detail(report: &TestReport, destination: &Path) -> Result<()> {
    let content = to_pretty_string(&report.to_element()).map_err(|message| ReportError::Xml {
        path: destination.to_path_buf(),
        message,
    })?;

    let origin = origin_path(destination);
    let had_original = destination.is_file();
    if had_original {
        fs::copy(destination, &origin).map_err(|e| ReportError::io(&origin, e))?;
    }

    if let Err(err) = write_atomic(destination, content.as_bytes()) {
        if had_original {
            warn!(
                target: "report.detail_failed",
                origin = %origin.display(),
                error = %err,
                "Rewriting report failed; raw report kept"
            );
        }
        return Err(err);
    }

    if had_original {
        if let Err(err) = fs::remove_file(&origin) {
            warn!(
                target: "report.origin_cleanup",
                path = %origin.display(),
                error = %err,
                "Failed to remove raw report copy"
            );
        }
    }
    info!(
        target: "report.detail_written",
        path = %destination.display(),
        "Rewrote report with reclassified failures"
    );
    Ok(())
}

/// Write `content` to a temporary sibling and rename it over `path`.
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ReportError::io(parent, e))?;
    }
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    let tmp_path = path.with_file_name(format!(".{}.tmp.{}", file_name, std::process::id()));

    let written = (|| -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(ReportError::io(path, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{aggregate, aggregate_str, SuiteRecord};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    const RAW: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<testsuites>
  <testsuite name="A" tests="2" failures="1" time="0.5">
    <properties><property name="seed" value="42"/></properties>
    <testcase classname="A" name="x"><failure message="failed A.x">boom</failure></testcase>
    <testcase classname="A" name="y"/>
    <system-out>log line</system-out>
  </testsuite>
</testsuites>
"#;

    #[test]
    fn derived_paths() {
        let p = Path::new("/tmp/results/scylla_3.22.0.xml");
        assert_eq!(
            summary_path(p),
            PathBuf::from("/tmp/results/scylla_3.22.0_summary.xml")
        );
        assert_eq!(
            origin_path(p),
            PathBuf::from("/tmp/results/scylla_3.22.0_origin.xml")
        );
        assert_eq!(summary_path(Path::new("report")), PathBuf::from("report_summary"));
    }

    #[test]
    fn summary_has_stringified_records_and_aggregate() {
        let dir = TempDir::new().unwrap();
        let report = aggregate_str(RAW, Path::new("r.xml")).unwrap();
        let dest = dir.path().join("nested").join("r_summary.xml");

        write_summary(&report, &dest).unwrap();

        let written = crate::xml::parse_document(&fs::read_to_string(&dest).unwrap()).unwrap();
        assert_eq!(written.attr("name"), Some("r_summary"));
        assert_eq!(written.attr("time"), Some("0.500"));
        let suite: SuiteRecord = serde_json::from_str(written.attr("A").unwrap()).unwrap();
        assert_eq!(suite.failures, 1);
        let total: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(written.attr(SUMMARY_KEY).unwrap()).unwrap();
        assert_eq!(total["tests"], 2);
    }

    #[test]
    fn unusable_suite_names_are_rejected_before_writing() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("r_summary.xml");

        for suite in ["My Suite", "time", "name", SUMMARY_KEY, "1st"] {
            let raw = format!(
                r#"<testsuites><testsuite name="{suite}" tests="1"/><testsuite name="Ok" tests="2"/></testsuites>"#
            );
            let report = aggregate_str(&raw, Path::new("r.xml")).unwrap();
            let err = write_summary(&report, &dest).unwrap_err();
            assert!(
                matches!(err, ReportError::Structure { ref message, .. } if message.contains(suite)),
                "{suite}: {err}"
            );
            assert!(!dest.exists());
        }
    }

    #[test]
    fn dotted_and_dashed_suite_names_are_kept() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("r_summary.xml");
        let report = aggregate_str(
            r#"<testsuites>
  <testsuite name="Cassandra.Tests.Core-Pool_1" tests="1"/>
  <testsuite name="Überprüfung" tests="2"/>
</testsuites>"#,
            Path::new("r.xml"),
        )
        .unwrap();

        write_summary(&report, &dest).unwrap();

        let written = crate::xml::parse_document(&fs::read_to_string(&dest).unwrap()).unwrap();
        // name, two suites, aggregate, time
        assert_eq!(written.attributes.len(), 5);
        let suite: SuiteRecord =
            serde_json::from_str(written.attr("Cassandra.Tests.Core-Pool_1").unwrap()).unwrap();
        assert_eq!(suite.tests, 1);
        assert!(written.attr("Überprüfung").is_some());
    }

    #[test]
    fn detail_replaces_report_and_discards_origin() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("r.xml");
        fs::write(&path, RAW).unwrap();

        let report = aggregate(&path).unwrap();
        write_detail(&report, &path).unwrap();

        assert!(!origin_path(&path).exists());
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().flatten().collect();
        assert_eq!(leftovers.len(), 1);

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("<testsuites>\n  <testsuite"));
        assert!(text.contains("boom"));
        assert!(text.contains("log line"));
        assert!(text.contains(r#"<property name="seed" value="42"/>"#));

        let reread = aggregate(&path).unwrap();
        assert_eq!(reread.cases(), report.cases());
        assert_eq!(reread.records(), report.records());
    }

    #[test]
    fn failed_rewrite_keeps_raw_copy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("r.xml");
        fs::write(&path, RAW).unwrap();
        let report = aggregate(&path).unwrap();

        // A directory squatting on the temp name makes the write fail.
        let tmp = dir
            .path()
            .join(format!(".r.xml.tmp.{}", std::process::id()));
        fs::create_dir(&tmp).unwrap();

        assert!(write_detail(&report, &path).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), RAW);
        assert_eq!(fs::read_to_string(origin_path(&path)).unwrap(), RAW);
    }
}
