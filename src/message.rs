use crate::error::Error;
use crate::frame::{Frame, OpCode};

/// The logical unit delivered to the application (spec §3): a
/// reassembled Text/Binary message, or a control-frame payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
}

impl Message {
    /// Converts a complete frame (single-frame message, or the
    /// synthetic frame a fully-reassembled fragmented message is
    /// packaged into) into the `Message` the application sees.
    pub fn from_frame(frame: Frame) -> Result<Self, Error> {
        match frame.header.opcode {
            OpCode::Text => Ok(Message::Text(String::from_utf8(frame.payload).map_err(|_| Error::InvalidUtf8)?)),
            OpCode::Binary => Ok(Message::Binary(frame.payload)),
            OpCode::Ping => Ok(Message::Ping(frame.payload)),
            OpCode::Pong => Ok(Message::Pong(frame.payload)),
            OpCode::Close | OpCode::Continuation => Err(Error::InvalidOpcode),
        }
    }

    pub fn as_binary(&self) -> &[u8] {
        match self {
            Message::Text(text) => text.as_bytes(),
            Message::Binary(data) | Message::Ping(data) | Message::Pong(data) => data,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Message::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Splits a Text/Binary message into one or more frames no larger
    /// than `max_frame_size`, the first carrying the real opcode and
    /// every following one a Continuation, only the last with `fin`.
    /// Ping/Pong are always sent as a single frame via `Session::send_frame`
    /// directly, so they aren't represented here.
    pub fn to_frames(self, max_frame_size: usize) -> Vec<Frame> {
        let (opcode, payload) = match self {
            Message::Text(text) => (OpCode::Text, text.into_bytes()),
            Message::Binary(data) => (OpCode::Binary, data),
            Message::Ping(data) => (OpCode::Ping, data),
            Message::Pong(data) => (OpCode::Pong, data),
        };

        if payload.is_empty() {
            return vec![Frame::new(true, opcode, payload, false, None)];
        }

        let mut frames: Vec<Frame> = payload
            .chunks(max_frame_size.max(1))
            .enumerate()
            .map(|(i, chunk)| {
                let chunk_opcode = if i == 0 { opcode } else { OpCode::Continuation };
                Frame::new(false, chunk_opcode, chunk.to_vec(), false, None)
            })
            .collect();

        if let Some(last) = frames.last_mut() {
            last.header.fin = true;
        }

        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_frame_rejects_close_and_continuation() {
        let close = Frame::new(true, OpCode::Close, vec![], false, None);
        assert!(matches!(Message::from_frame(close), Err(Error::InvalidOpcode)));

        let cont = Frame::new(true, OpCode::Continuation, vec![], false, None);
        assert!(matches!(Message::from_frame(cont), Err(Error::InvalidOpcode)));
    }

    #[test]
    fn to_frames_single_chunk_when_small() {
        let frames = Message::Text("hi".to_string()).to_frames(65536);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].header.fin);
        assert_eq!(frames[0].header.opcode, OpCode::Text);
    }

    #[test]
    fn to_frames_splits_into_continuations() {
        let payload = vec![7u8; 10];
        let frames = Message::Binary(payload.clone()).to_frames(4);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].header.opcode, OpCode::Binary);
        assert!(!frames[0].header.fin);
        assert_eq!(frames[1].header.opcode, OpCode::Continuation);
        assert!(!frames[1].header.fin);
        assert_eq!(frames[2].header.opcode, OpCode::Continuation);
        assert!(frames[2].header.fin);

        let reassembled: Vec<u8> = frames.into_iter().flat_map(|f| f.payload).collect();
        assert_eq!(reassembled, payload);
    }

    #[test]
    fn to_frames_empty_payload_is_one_final_frame() {
        let frames = Message::Binary(vec![]).to_frames(65536);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].header.fin);
    }
}
