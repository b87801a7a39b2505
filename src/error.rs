use std::string::FromUtf8Error;
use thiserror::Error;
use tokio::time::error::Elapsed;
use url::ParseError;

/// The crate's single error currency. Every fallible operation in
/// `ripcurl` returns one of these variants.
#[derive(Error, Debug)]
pub enum Error {
    // General errors
    #[error("{source}")]
    Timeout {
        #[from]
        source: Elapsed,
    },

    #[error("IO error: {source}")]
    IOError {
        #[from]
        source: std::io::Error,
    },

    #[error("{source}")]
    FromUtf8Error {
        #[from]
        source: FromUtf8Error,
    },

    // Opening handshake errors (spec §4.D)
    #[error("{source}")]
    URLParseError {
        #[from]
        source: ParseError,
    },

    #[error("invalid scheme in websocket URL, expected ws:// or wss://")]
    InvalidUrl,

    #[error("URL has no host")]
    URLNoHost,

    #[error("opening handshake HTTP status was not 101 Switching Protocols")]
    InvalidOpeningHandshakeHttpStatus,

    #[error("failed to parse the opening handshake response: {0}")]
    FailedToParseOpeningHandshakeResponse(&'static str),

    // Framing errors (spec §4.B)
    #[error("reserved bit set without a negotiated extension")]
    NonzeroReservedBit,

    #[error("control frames must not be fragmented")]
    NonFinalControlFrame,

    #[error("control frame payload larger than 125 bytes")]
    ControlFramePayloadTooLarge,

    #[error("masking key must not be zero when masked=true")]
    MaskingKeyIsZero,

    #[error("invalid opcode")]
    InvalidOpcode,

    #[error("frame payload exceeds max_frame_size")]
    ExceededMaxPayloadSize,

    // Fragmentation errors (spec §4.C)
    #[error("expected a continuation, ping, pong or close frame while a fragmented message is in progress")]
    ExpectedContinuationFrame,

    #[error("unexpected continuation frame: no fragmented message in progress")]
    UnexpectedContinuationFrame,

    #[error("invalid UTF-8 in a text message")]
    InvalidUtf8,

    // Session errors (spec §4.G/§7)
    #[error("sendFrame called while the connection is not open")]
    WebsocketConnectionIsNotOpen,

    #[error("socket failed to connect")]
    SocketFailedToConnect,

    #[error("operation cancelled")]
    CancelledOperation,
}
