//! Fuzz target for augmentation config parsing and validation.
//!
//! Anything that parses must validate without panicking.

#![no_main]

use boxforge::config::AugmentConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    let Ok(yaml) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(config) = serde_yaml::from_str::<AugmentConfig>(yaml) {
        let _ = config.validate();
        let _ = config.samples_per_image();
    }
});
