//! Streaming UTF-8 validation, resumable across chunk boundaries.
//!
//! Table-driven DFA after Bjoern Hoehrmann's "Flexible and Economical
//! UTF-8 Decoder" (<https://bjoern.hoehrmann.de/utf8/decoder/dfa/>).
//! `State::ACCEPT` is the only accepting state; any other value means
//! the validator is mid-codepoint (or has latched into `REJECT`, which
//! never recovers).

/// DFA transition/character-class table, 256 class bytes followed by
/// the state-transition table.
#[rustfmt::skip]
const UTF8_TABLE: [u8; 364] = [
    // The first 256 entries map a byte to a character class.
    0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0, 0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,
    0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0, 0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,
    0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0, 0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,
    0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0, 0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,
    1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1, 9,9,9,9,9,9,9,9,9,9,9,9,9,9,9,9,
    7,7,7,7,7,7,7,7,7,7,7,7,7,7,7,7, 7,7,7,7,7,7,7,7,7,7,7,7,7,7,7,7,
    8,8,2,2,2,2,2,2,2,2,2,2,2,2,2,2, 2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,2,
    10,3,3,3,3,3,3,3,3,3,3,3,3,4,3,3, 11,6,6,6,5,8,8,8,8,8,8,8,8,8,8,8,
    // The state-transition table, indexed by (state, class).
    0,12,24,36,60,96,84,12,12,12,48,72, 12,12,12,12,12,12,12,12,12,12,12,12,
    12,0,12,12,12,12,12,0,12,0,12,12, 12,24,12,12,12,12,12,24,12,24,12,12,
    12,12,12,12,12,12,12,24,12,12,12,12, 12,24,12,12,12,12,12,12,12,24,12,12,
    12,12,12,12,12,12,12,36,12,36,12,12, 12,36,12,12,12,12,12,36,12,36,12,12,
    12,36,12,12,12,12,12,12,12,12,12,12,
];

/// The accepting "between codepoints" state. `Validator::new()` starts
/// here and a fully-validated string must end back here.
pub const ACCEPT: u32 = 0;
/// The terminal rejecting state. Once reached it never changes.
pub const REJECT: u32 = 12;

fn decode(state: &mut u32, byte: u8) -> u32 {
    let class = UTF8_TABLE[byte as usize] as u32;
    *state = UTF8_TABLE[256 + (*state + class) as usize] as u32;
    *state
}

/// Feeds `bytes` through the DFA starting at `state`, mutating `state`
/// in place. Returns `false` as soon as the stream becomes invalid
/// (state reaches [`REJECT`]); once rejected the state never recovers.
///
/// `state == ACCEPT` both before and after a call means the fed bytes
/// form a complete sequence of whole codepoints. Calling this again
/// with more bytes continues validation exactly where it left off,
/// which is what lets the frame parser validate a Text message's
/// payload incrementally across both read chunks and Continuation
/// frame boundaries (spec property P3).
pub fn validate_incremental(bytes: &[u8], state: &mut u32) -> bool {
    for &byte in bytes {
        if decode(state, byte) == REJECT {
            return false;
        }
    }
    true
}

/// Validates a complete, non-streamed byte sequence.
pub fn validate_complete(bytes: &[u8]) -> bool {
    let mut state = ACCEPT;
    validate_incremental(bytes, &mut state) && state == ACCEPT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ascii() {
        assert!(validate_complete(b"hello world"));
    }

    #[test]
    fn accepts_multibyte() {
        assert!(validate_complete("héllo wörld \u{1F600}".as_bytes()));
    }

    #[test]
    fn rejects_overlong_encoding() {
        // overlong encoding of U+002F ('/')
        assert!(!validate_complete(&[0xC0, 0xAF]));
    }

    #[test]
    fn rejects_surrogate_half() {
        // 0xED 0xA0 0x80 encodes U+D800, a lone surrogate
        assert!(!validate_complete(&[0xED, 0xA0, 0x80]));
    }

    #[test]
    fn rejects_beyond_max_codepoint() {
        // 0xF4 0x90 0x80 0x80 would encode U+110000, past U+10FFFF
        assert!(!validate_complete(&[0xF4, 0x90, 0x80, 0x80]));
    }

    #[test]
    fn streaming_matches_whole_buffer_for_split_codepoint() {
        let text = "a\u{1F600}b".as_bytes();
        for split in 0..=text.len() {
            let (first, second) = text.split_at(split);
            let mut state = ACCEPT;
            let ok_first = validate_incremental(first, &mut state);
            let ok_second = ok_first && validate_incremental(second, &mut state);
            assert!(ok_second && state == ACCEPT, "split at {split} failed");
        }
    }

    #[test]
    fn rejects_truncated_multibyte_sequence() {
        let mut state = ACCEPT;
        // first byte of a 4-byte sequence, nothing else
        assert!(validate_incremental(&[0xF0], &mut state));
        assert_ne!(state, ACCEPT);
    }

    #[test]
    fn rejection_is_sticky() {
        let mut state = ACCEPT;
        assert!(!validate_incremental(&[0xFF], &mut state));
        assert_eq!(state, REJECT);
        // feeding valid ASCII afterward must not un-reject
        assert!(!validate_incremental(b"a", &mut state));
        assert_eq!(state, REJECT);
    }
}
