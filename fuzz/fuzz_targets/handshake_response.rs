#![no_main]

use libfuzzer_sys::fuzz_target;
use ripcurl::handshake::HandshakeResponseParser;

// Spec §7: the opening-handshake parser must reject malformed 101
// responses without panicking, regardless of how the bytes are
// chunked across `feed` calls.
fuzz_target!(|data: &[u8]| {
    let mut parser = HandshakeResponseParser::new("dGhlIHNhbXBsZSBub25jZQ==");

    for chunk in data.chunks(23) {
        if parser.feed(chunk).is_err() {
            break;
        }
    }
});
