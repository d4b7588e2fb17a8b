#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let output = marcview::process(data);
    if output.is_fatal() {
        assert!(output.text.is_empty());
    }
});
