//! Fuzz target for project file parsing.

#![no_main]

use std::path::Path;

use boxforge::ir::io_json::from_project_str;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };

    let _ = from_project_str(json, Path::new("/fuzz"));
});
