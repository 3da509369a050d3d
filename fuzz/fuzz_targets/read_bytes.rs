#![no_main]
use libfuzzer_sys::fuzz_target;

// Feeds arbitrary bytes straight in as a candidate XML document, exercising the XML
// reader, attribute parsing, and base64/XLI decode paths together.
fuzz_target!(|data: &[u8]| {
    let _ = sierraecg::read_bytes(data, true);
});
