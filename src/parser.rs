//! The incremental, byte-fed frame parser (spec §4.C).
//!
//! [`FrameParser::feed`] accepts an arbitrary chunk of transport bytes
//! and returns every [`ParseEvent`] the chunk completes. State survives
//! across calls so a frame (or a fragmented message) can straddle any
//! number of `feed` calls, independent of how the transport happened
//! to chunk the underlying stream (property P4).

use crate::error::Error;
use crate::frame::{apply_mask, Frame, FrameHeader, OpCode, MAX_HEADER_SIZE};
use crate::message::Message;
use crate::utf8;
use bytes::{Buf, BytesMut};

/// The default per-frame / per-reassembled-message budget (spec §4.G).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 65536;

/// A fact the parser can report back to its caller (normally
/// [`crate::session::Session`]) as soon as enough bytes have arrived.
#[derive(Debug, Clone)]
pub enum ParseEvent {
    /// Every accepted frame, final or not, control or data — the
    /// diagnostic hook spec §4.C calls `frame_callback`.
    Frame(Frame),
    /// A complete Text/Binary/Ping/Pong message, reassembled across
    /// Continuation frames if necessary.
    Message(Message),
}

struct FragmentedMessage {
    opcode: OpCode,
    payload: Vec<u8>,
    utf8_state: u32,
}

/// Byte-fed frame parser. Owns the reassembly buffer for an
/// in-progress fragmented message and the unconsumed tail of whatever
/// was last fed to it.
pub struct FrameParser {
    buffer: BytesMut,
    fragmented: Option<FragmentedMessage>,
    max_frame_size: usize,
}

impl FrameParser {
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            fragmented: None,
            max_frame_size,
        }
    }

    /// Feeds `bytes` into the parser and returns every event the new
    /// bytes complete, in order. Leaves any incomplete trailing frame
    /// buffered for the next call.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<ParseEvent>, Error> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        loop {
            let Some((header, header_len)) = FrameHeader::decode(&self.buffer)? else {
                break;
            };

            self.check_ordering(&header)?;

            let budget = self.max_frame_size.saturating_sub(MAX_HEADER_SIZE) as u64;
            if header.payload_len > budget {
                return Err(Error::ExceededMaxPayloadSize);
            }

            let total_len = header_len + header.payload_len as usize;
            if self.buffer.len() < total_len {
                break;
            }

            let mut payload = self.buffer[header_len..total_len].to_vec();
            self.buffer.advance(total_len);
            if let Some(key) = header.masking_key {
                apply_mask(key, &mut payload, 0);
            }

            let frame = Frame { header, payload };
            events.push(ParseEvent::Frame(frame.clone()));
            self.handle_completed_frame(frame, &mut events)?;
        }

        Ok(events)
    }

    /// Spec §4.C steps 2-3: the opcodes legal to see while a
    /// fragmented message is or isn't already in progress.
    fn check_ordering(&self, header: &FrameHeader) -> Result<(), Error> {
        match header.opcode {
            OpCode::Continuation if self.fragmented.is_none() => Err(Error::UnexpectedContinuationFrame),
            OpCode::Text | OpCode::Binary if self.fragmented.is_some() => Err(Error::ExpectedContinuationFrame),
            _ => Ok(()),
        }
    }

    fn handle_completed_frame(&mut self, frame: Frame, events: &mut Vec<ParseEvent>) -> Result<(), Error> {
        match frame.header.opcode {
            OpCode::Ping | OpCode::Pong => {
                events.push(ParseEvent::Message(Message::from_frame(frame)?));
            }
            // Close is reported only via ParseEvent::Frame; the session
            // drives the closing handshake off the raw opcode.
            OpCode::Close => {}
            OpCode::Text | OpCode::Binary if frame.header.fin => {
                events.push(ParseEvent::Message(Message::from_frame(frame)?));
            }
            OpCode::Text | OpCode::Binary => {
                let mut utf8_state = utf8::ACCEPT;
                if frame.header.opcode == OpCode::Text && !utf8::validate_incremental(&frame.payload, &mut utf8_state) {
                    return Err(Error::InvalidUtf8);
                }
                if frame.payload.len() > self.max_frame_size {
                    return Err(Error::ExceededMaxPayloadSize);
                }
                self.fragmented = Some(FragmentedMessage {
                    opcode: frame.header.opcode,
                    payload: frame.payload,
                    utf8_state,
                });
            }
            OpCode::Continuation => {
                let fragmented = self.fragmented.as_mut().ok_or(Error::UnexpectedContinuationFrame)?;

                if fragmented.opcode == OpCode::Text && !utf8::validate_incremental(&frame.payload, &mut fragmented.utf8_state) {
                    self.fragmented = None;
                    return Err(Error::InvalidUtf8);
                }
                fragmented.payload.extend_from_slice(&frame.payload);
                if fragmented.payload.len() > self.max_frame_size {
                    self.fragmented = None;
                    return Err(Error::ExceededMaxPayloadSize);
                }

                if frame.header.fin {
                    let fragmented = self.fragmented.take().expect("checked above");
                    if fragmented.opcode == OpCode::Text && fragmented.utf8_state != utf8::ACCEPT {
                        return Err(Error::InvalidUtf8);
                    }
                    let assembled = Frame::new(true, fragmented.opcode, fragmented.payload, false, None);
                    events.push(ParseEvent::Message(Message::from_frame(assembled)?));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut as Buf2;

    fn encode_frame(fin: bool, opcode: OpCode, payload: &[u8]) -> Vec<u8> {
        let header = FrameHeader::new(fin, opcode, false, None, payload.len() as u64);
        let mut buf = Buf2::new();
        header.encode(&mut buf).unwrap();
        buf.extend_from_slice(payload);
        buf.to_vec()
    }

    #[test]
    fn single_frame_text_message() {
        let mut parser = FrameParser::new(DEFAULT_MAX_FRAME_SIZE);
        let bytes = encode_frame(true, OpCode::Text, b"hello");
        let events = parser.feed(&bytes).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ParseEvent::Frame(_)));
        match &events[1] {
            ParseEvent::Message(Message::Text(text)) => assert_eq!(text, "hello"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn fragmented_text_with_interleaved_ping() {
        // E2 from spec §8.
        let mut bytes = Vec::new();
        bytes.extend(encode_frame(false, OpCode::Text, b"Hel"));
        bytes.extend(encode_frame(false, OpCode::Ping, b"p"));
        bytes.extend(encode_frame(true, OpCode::Continuation, b"lo"));

        let mut parser = FrameParser::new(DEFAULT_MAX_FRAME_SIZE);
        let events = parser.feed(&bytes).unwrap();

        let frame_count = events.iter().filter(|e| matches!(e, ParseEvent::Frame(_))).count();
        assert_eq!(frame_count, 3);

        let messages: Vec<&Message> = events
            .iter()
            .filter_map(|e| match e {
                ParseEvent::Message(m) => Some(m),
                _ => None,
            })
            .collect();
        assert_eq!(messages.len(), 2);
        match messages[0] {
            Message::Ping(payload) => assert_eq!(payload, b"p"),
            other => panic!("unexpected message: {other:?}"),
        }
        match messages[1] {
            Message::Text(text) => assert_eq!(text, "Hello"),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn chunk_independence_matches_whole_buffer() {
        let mut whole = Vec::new();
        whole.extend(encode_frame(false, OpCode::Binary, b"0123456789"));
        whole.extend(encode_frame(true, OpCode::Continuation, b"abcdef"));

        let mut one_shot = FrameParser::new(DEFAULT_MAX_FRAME_SIZE);
        let one_shot_events = one_shot.feed(&whole).unwrap();

        for split in 1..whole.len() {
            let mut chunked = FrameParser::new(DEFAULT_MAX_FRAME_SIZE);
            let (a, b) = whole.split_at(split);
            let mut chunked_events = chunked.feed(a).unwrap();
            chunked_events.extend(chunked.feed(b).unwrap());

            assert_eq!(chunked_events.len(), one_shot_events.len(), "split at {split}");
        }
    }

    #[test]
    fn invalid_utf8_single_frame_is_rejected() {
        let mut parser = FrameParser::new(DEFAULT_MAX_FRAME_SIZE);
        let bytes = encode_frame(true, OpCode::Text, &[0xC0, 0xAF]);
        let err = parser.feed(&bytes).unwrap_err();
        assert!(matches!(err, Error::InvalidUtf8));
    }

    #[test]
    fn invalid_utf8_across_continuation_is_rejected() {
        let mut bytes = Vec::new();
        bytes.extend(encode_frame(false, OpCode::Text, &[0xE2, 0x82])); // split euro sign
        bytes.extend(encode_frame(true, OpCode::Continuation, &[0xFF])); // invalid continuation byte

        let mut parser = FrameParser::new(DEFAULT_MAX_FRAME_SIZE);
        let err = parser.feed(&bytes).unwrap_err();
        assert!(matches!(err, Error::InvalidUtf8));
    }

    #[test]
    fn unexpected_continuation_without_fragmentation() {
        // E4 from spec §8.
        let mut parser = FrameParser::new(DEFAULT_MAX_FRAME_SIZE);
        let bytes = encode_frame(true, OpCode::Continuation, b"");
        let err = parser.feed(&bytes).unwrap_err();
        assert!(matches!(err, Error::UnexpectedContinuationFrame));
    }

    #[test]
    fn text_frame_while_fragmented_is_rejected() {
        let mut parser = FrameParser::new(DEFAULT_MAX_FRAME_SIZE);
        parser.feed(&encode_frame(false, OpCode::Text, b"a")).unwrap();
        let err = parser.feed(&encode_frame(true, OpCode::Text, b"b")).unwrap_err();
        assert!(matches!(err, Error::ExpectedContinuationFrame));
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut parser = FrameParser::new(16);
        let bytes = encode_frame(true, OpCode::Binary, &vec![0u8; 32]);
        let err = parser.feed(&bytes).unwrap_err();
        assert!(matches!(err, Error::ExceededMaxPayloadSize));
    }

    #[test]
    fn close_frame_yields_only_a_frame_event_not_a_message() {
        let mut parser = FrameParser::new(DEFAULT_MAX_FRAME_SIZE);
        let bytes = encode_frame(true, OpCode::Close, &[]);
        let events = parser.feed(&bytes).unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ParseEvent::Frame(_)));
    }
}
