#![no_main]

use libfuzzer_sys::fuzz_target;
use ripcurl::parser::FrameParser;

// Spec §7: "the session must not crash on any input byte sequence."
// Feeds arbitrary bytes to the incremental frame parser a chunk at a
// time, the way a real transport would deliver them across several
// `poll()` calls.
fuzz_target!(|data: &[u8]| {
    let mut parser = FrameParser::new(65536);

    for chunk in data.chunks(17) {
        if parser.feed(chunk).is_err() {
            break;
        }
    }
});
