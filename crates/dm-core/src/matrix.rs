//! Per-version run loop over already-produced reports.
//!
//! Each version is processed independently: a failing version records its
//! failure reason in its metadata file and the loop moves on.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use dm_config::{ProfileStore, VersionProfile};
use dm_report::{JunitReport, ReportSummary, SuiteRecord};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::exit_codes::ExitCode;
use crate::logging::Stage;
use crate::metadata::{metadata_path, RunMetadata};
use crate::output::format_elapsed;
use crate::Result;

/// Options for one matrix run.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatrixOptions {
    /// Prefix classnames with the driver version before processing.
    pub tag_classnames: bool,
}

/// A version whose report was processed.
#[derive(Debug, Clone)]
pub struct ProcessedVersion {
    pub profile: VersionProfile,
    pub report: PathBuf,
    pub summary: Arc<ReportSummary>,
}

/// Result of one version in a matrix run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VersionOutcome {
    Completed {
        profile: String,
        failed: bool,
        time: String,
        summary: BTreeMap<String, SuiteRecord>,
    },
    Failed {
        exception: String,
    },
}

impl VersionOutcome {
    pub fn is_clean(&self) -> bool {
        matches!(self, VersionOutcome::Completed { failed: false, .. })
    }
}

/// Results of every version in a matrix run.
#[derive(Debug, Clone, Serialize)]
pub struct MatrixReport {
    pub status: String,
    pub results: BTreeMap<String, VersionOutcome>,
}

impl MatrixReport {
    pub fn exit_code(&self) -> ExitCode {
        if self.results.values().all(VersionOutcome::is_clean) {
            ExitCode::Clean
        } else {
            ExitCode::TestsFailed
        }
    }
}

pub struct MatrixRunner<'a> {
    settings: &'a Settings,
    store: ProfileStore,
    options: MatrixOptions,
}

impl<'a> MatrixRunner<'a> {
    pub fn new(settings: &'a Settings, options: MatrixOptions) -> Self {
        let store = ProfileStore::new(settings.profile_root())
            .with_default_profile(settings.default_profile.clone());
        Self {
            settings,
            store,
            options,
        }
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    /// Resolve the profile for `version` and process its report.
    ///
    /// Writes the success metadata record; failures are left to the caller.
    pub fn process_version(&self, version: &str) -> Result<ProcessedVersion> {
        info!(
            target: "matrix.version_started",
            version,
            flavor = %self.settings.flavor,
            stage = %Stage::Resolve,
            "Processing driver version"
        );
        let profile = self.store.resolve(version)?;

        let report_path = self.settings.report_path(version);
        let report = JunitReport::new(&report_path, version, profile.ignore.clone());
        if self.options.tag_classnames {
            let tagged = report.tag_classnames()?;
            debug!(target: "matrix.tagged", version, tagged, stage = %Stage::Tag, "Tagged classnames");
        }
        debug!(
            target: "matrix.processing",
            version,
            profile = %profile.id,
            report = %report_path.display(),
            stage = %Stage::Process,
            "Processing report"
        );
        let summary = report.summary()?;

        let metadata = RunMetadata::success(self.settings, version);
        let path = metadata_path(self.settings, version);
        if let Err(err) = metadata.write(&path) {
            error!(
                target: "matrix.metadata_failed",
                version,
                path = %path.display(),
                error = %err,
                "Failed to write metadata"
            );
        }

        Ok(ProcessedVersion {
            profile,
            report: report_path,
            summary,
        })
    }

    /// Process every version, recording failures instead of stopping.
    pub fn run(&self, versions: &[String]) -> MatrixReport {
        let mut results = BTreeMap::new();

        for version in versions {
            let outcome = match self.process_version(version) {
                Ok(processed) => {
                    let failed = processed.summary.is_failed();
                    info!(
                        target: "matrix.version_done",
                        version = %version,
                        profile = %processed.profile.id,
                        failed,
                        stage = %Stage::Publish,
                        "Driver matrix results"
                    );
                    VersionOutcome::Completed {
                        profile: processed.profile.id.clone(),
                        failed,
                        time: format_elapsed(processed.summary.aggregate.time),
                        summary: processed.summary.flatten(),
                    }
                }
                Err(err) => {
                    let reason = err.to_string();
                    error!(
                        target: "matrix.version_failed",
                        version = %version,
                        error = %reason,
                        "Driver version failed"
                    );
                    let metadata = RunMetadata::failure(self.settings, version, reason.clone());
                    if let Err(write_err) = metadata.write(&metadata_path(self.settings, version)) {
                        warn!(
                            target: "matrix.metadata_failed",
                            version = %version,
                            error = %write_err,
                            "Failed to write failure metadata"
                        );
                    }
                    VersionOutcome::Failed { exception: reason }
                }
            };
            results.insert(version.clone(), outcome);
        }

        let clean = results.values().all(VersionOutcome::is_clean);
        MatrixReport {
            status: if clean { "SUCCESS" } else { "FAILED" }.to_string(),
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const FAILING: &str = r#"<testsuites>
  <testsuite name="S" tests="2" failures="1" errors="0" time="61.5">
    <testcase classname="C" name="flaky"><failure message="failed C.flaky"/></testcase>
    <testcase classname="C" name="ok"/>
  </testsuite>
</testsuites>"#;

    fn settings(root: &Path) -> Settings {
        Settings {
            versions_dir: root.join("versions"),
            results_dir: root.join("results"),
            ..Settings::default()
        }
    }

    fn add_profile(settings: &Settings, id: &str, ignore: &str) {
        let dir = settings.profile_root().join(id);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("ignore.yaml"), ignore).unwrap();
    }

    fn add_report(settings: &Settings, version: &str, content: &str) {
        let path = settings.report_path(version);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn clean_version_after_reclassification() {
        let root = TempDir::new().unwrap();
        let settings = settings(root.path());
        add_profile(&settings, "3.20.0", "tests:\n  ignore:\n    - C.flaky\n");
        add_report(&settings, "3.22.0", FAILING);

        let report = MatrixRunner::new(&settings, MatrixOptions::default())
            .run(&["3.22.0".to_string()]);

        assert_eq!(report.status, "SUCCESS");
        assert_eq!(report.exit_code(), ExitCode::Clean);
        match &report.results["3.22.0"] {
            VersionOutcome::Completed {
                profile,
                failed,
                time,
                summary,
            } => {
                assert_eq!(profile, "3.20.0");
                assert!(!failed);
                assert_eq!(time, "0:01:01.500");
                assert_eq!(summary["testsuite_summary"].ignored_on_failure, 1);
            }
            other => panic!("unexpected outcome {other:?}"),
        }

        let meta = RunMetadata::read(&metadata_path(&settings, "3.22.0")).unwrap();
        assert_eq!(meta.junit_result.as_deref(), Some("./scylla_3.22.0.xml"));
    }

    #[test]
    fn one_failing_version_does_not_stop_the_others() {
        let root = TempDir::new().unwrap();
        let settings = settings(root.path());
        add_profile(&settings, "3.0.0", "");
        add_report(&settings, "3.1.0", FAILING);

        let report = MatrixRunner::new(&settings, MatrixOptions::default())
            .run(&["2.0.0".to_string(), "3.1.0".to_string(), "3.2.0".to_string()]);

        assert_eq!(report.status, "FAILED");
        assert_eq!(report.exit_code(), ExitCode::TestsFailed);
        assert!(matches!(
            report.results["2.0.0"],
            VersionOutcome::Failed { ref exception } if exception.contains("2.0.0")
        ));
        assert!(matches!(
            report.results["3.1.0"],
            VersionOutcome::Completed { failed: true, .. }
        ));
        assert!(matches!(report.results["3.2.0"], VersionOutcome::Failed { .. }));

        let meta = RunMetadata::read(&metadata_path(&settings, "3.2.0")).unwrap();
        assert!(meta.failure_reason.unwrap().contains("does not exist"));
    }

    #[test]
    fn classnames_are_tagged_when_requested() {
        let root = TempDir::new().unwrap();
        let settings = settings(root.path());
        add_profile(&settings, "master", "");
        add_report(&settings, "main-branch", FAILING);

        let runner = MatrixRunner::new(&settings, MatrixOptions { tag_classnames: true });
        let processed = runner.process_version("main-branch").unwrap();
        assert_eq!(processed.profile.id, "master");

        let text = fs::read_to_string(settings.report_path("main-branch")).unwrap();
        assert!(text.contains(r#"classname="main-branch.C""#));
    }
}
