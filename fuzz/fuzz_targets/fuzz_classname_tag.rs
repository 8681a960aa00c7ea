//! Fuzz target for classname tagging.
//!
//! A file is tagged as a whole: either nothing changes or every class name
//! gets the prefix, and a second pass never changes anything.

#![no_main]

use arbitrary::Arbitrary;
use dm_report::tag_classnames_str;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct TagInput {
    report: String,
    tag: String,
}

fuzz_target!(|input: TagInput| {
    let (once, tagged) = tag_classnames_str(&input.report, &input.tag);
    if tagged == 0 {
        assert_eq!(once, input.report);
    } else {
        assert_eq!(tagged, input.report.matches("classname=\"").count());
    }

    let (twice, retagged) = tag_classnames_str(&once, &input.tag);
    assert_eq!(retagged, 0);
    assert_eq!(once, twice);
});
