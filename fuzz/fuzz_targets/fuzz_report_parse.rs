//! Fuzz target for JUnit report parsing.
//!
//! Any input that parses must keep the aggregate equal to the sum of the
//! suite records, before and after reclassification.

#![no_main]

use std::path::Path;

use dm_config::IgnoreProfile;
use dm_report::{aggregate_str, reclassify, SuiteRecord};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(mut report) = aggregate_str(text, Path::new("fuzz.xml")) else {
        return;
    };

    assert_counts(&SuiteRecord::sum(report.records().values()), report.aggregate());

    let mut ignore = IgnoreProfile::default();
    for case in report.cases() {
        if let Some(message) = case.message {
            ignore.ignore.insert(message.strip_prefix("failed ").unwrap_or(&message).to_string());
        }
    }
    reclassify(&mut report, &ignore);
    assert_counts(&SuiteRecord::sum(report.records().values()), report.aggregate());
});

fn assert_counts(sum: &SuiteRecord, total: &SuiteRecord) {
    assert_eq!(sum.tests, total.tests);
    assert_eq!(sum.errors, total.errors);
    assert_eq!(sum.skipped, total.skipped);
    assert_eq!(sum.failures, total.failures);
    assert_eq!(sum.ignored_on_failure, total.ignored_on_failure);
}
