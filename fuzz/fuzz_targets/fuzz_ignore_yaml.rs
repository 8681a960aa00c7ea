//! Fuzz target for ignore.yaml parsing.

#![no_main]

use dm_config::IgnoreProfile;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(profile) = IgnoreProfile::from_yaml(text) {
            let _ = profile.test_filter();
        }
    }
});
