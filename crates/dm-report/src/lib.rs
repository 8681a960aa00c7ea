//! JUnit report processing for the driver matrix.
//!
//! Pipeline for one report file:
//! 1. [`tag_classnames`]: prefix every `classname` with the driver version tag
//! 2. [`aggregate`]: parse suites and cases into typed records with counts
//! 3. [`reclassify`]: mark expected failures as `ignored_on_failure`
//! 4. [`write_summary`] / [`write_detail`]: persist the results
//!
//! [`JunitReport`] runs steps 2-4 once and memoizes the summary.
//!
//! # Example
//!
//! ```no_run
//! use dm_config::IgnoreProfile;
//! use dm_report::JunitReport;
//! use std::path::Path;
//!
//! let report = JunitReport::new(
//!     Path::new("test_results/3.22.0/scylla_3.22.0.xml"),
//!     "3.22.0",
//!     IgnoreProfile::default(),
//! );
//! report.tag_classnames().unwrap();
//! let summary = report.summary().unwrap();
//! println!("failed: {}", summary.is_failed());
//! ```

pub mod aggregate;
pub mod error;
pub mod model;
pub mod processor;
pub mod reclassify;
pub mod tag;
pub mod writer;
pub mod xml;

pub use aggregate::{aggregate, aggregate_str};
pub use error::{ReportError, Result};
pub use model::{CaseRecord, CaseStatus, SuiteRecord, TestCase, TestReport, TestSuite, SUMMARY_KEY};
pub use processor::{JunitReport, ReportSummary};
pub use reclassify::{reclassify, ReclassifyOutcome};
pub use tag::{tag_classnames, tag_classnames_str};
pub use writer::{origin_path, summary_path, write_detail, write_summary};
