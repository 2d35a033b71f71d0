//! Fuzz target for `--split` ratio parsing.

#![no_main]

use boxforge::split::SplitRatio;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(ratio) = text.parse::<SplitRatio>() {
        assert_eq!(ratio.counts(10).iter().sum::<usize>(), 10);
    }
});
