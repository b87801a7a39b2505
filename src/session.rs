//! The websocket session state machine (spec §3, §4.G, §5, §7).
//!
//! Orchestrates the opening handshake, the incremental frame parser,
//! and a pluggable [`Transport`], enforcing the
//! `Connecting -> Open -> Closing -> Closed` lifecycle, ping/pong
//! auto-reply, and the closing handshake. `poll()` is the sole
//! progress-making call (spec §5): it owns the sequence the frame
//! parser used to reach back into the session via a callback in the
//! source, replaced here by `FrameParser::feed` returning the events
//! for `Session` to drive (spec §9).

use crate::close::CloseCode;
use crate::config::Settings;
use crate::error::Error;
use crate::frame::{apply_mask, Frame, FrameHeader, OpCode};
use crate::handshake::{self, HandshakeOutcome, HandshakeResponseParser};
use crate::message::Message;
use crate::parser::{FrameParser, ParseEvent};
use crate::rng::{DefaultMaskKeySource, MaskKeySource};
use crate::transport::{TcpTransport, Transport};
use crate::url::WsUrl;
use async_trait::async_trait;
use bytes::BytesMut;
use log::{debug, trace, warn};
use std::time::Instant;

/// Session lifecycle (spec §3). Initial state is `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// The session's outward callback surface (spec §6), replacing the
/// source's four function pointers plus `user_data` with a single
/// trait a caller implements (spec §9's polymorphism redesign note).
/// Every method has a no-op default so a caller only overrides what it
/// cares about.
#[async_trait]
pub trait Handler: Send {
    async fn on_open(&mut self) {}
    async fn on_message(&mut self, _message: Message) {}
    async fn on_frame(&mut self, _frame: &Frame) {}
    async fn on_close(&mut self, _code: CloseCode) {}
    async fn on_error(&mut self, _error: &Error) {}
}

/// A [`Handler`] that ignores every event, for callers that only want
/// to drive `poll()`/`send_*` and inspect state directly.
#[derive(Debug, Default)]
pub struct NoopHandler;

impl Handler for NoopHandler {}

/// Per-`poll()` transport read size (spec §4.G step 2). The source
/// reads into a stack buffer of this size; implementations may choose
/// larger, which is why it isn't part of `Settings`.
const READ_CHUNK_SIZE: usize = 1024;

/// Distinguishes a genuine peer half-close from any other transport
/// read failure (spec §9's open question, resolved: `Transport::read`
/// returning `Ok(0)` means "nothing readable yet", while a real EOF is
/// surfaced as an `Err` wrapping `UnexpectedEof` — see `transport.rs`).
/// `poll()` reports the former as `EndpointGoingAway` rather than
/// lumping it in with `UnexpectedError`.
fn is_peer_half_close(err: &Error) -> bool {
    matches!(err, Error::IOError { source } if source.kind() == std::io::ErrorKind::UnexpectedEof)
}

/// Orchestrates a single client websocket connection (spec §4.G).
///
/// `Session` exclusively owns the transport handle, the handshake
/// parser (only while `Connecting`), the frame parser, and the
/// masking-key source, matching spec §3's ownership rules. The
/// application drives it by calling `poll()` repeatedly; every
/// callback fires synchronously from inside that call (spec §5).
pub struct Session<T: Transport, H: Handler> {
    transport: T,
    handler: H,
    settings: Settings,
    mask_source: Box<dyn MaskKeySource>,
    state: SessionState,
    handshake_parser: Option<HandshakeResponseParser>,
    frame_parser: FrameParser,
    close_sent: bool,
    closing_since: Option<Instant>,
}

impl<H: Handler> Session<TcpTransport, H> {
    /// Creates a session backed by the default plain-TCP transport.
    pub fn new(handler: H, settings: Settings) -> Self {
        Self::with_transport(TcpTransport::new(), handler, settings)
    }
}

impl<T: Transport, H: Handler> Session<T, H> {
    /// Creates a session over a caller-supplied transport (spec §4.F),
    /// e.g. a TLS transport or, in tests, an in-memory double.
    pub fn with_transport(transport: T, handler: H, settings: Settings) -> Self {
        let max_frame_size = settings.max_frame_size;
        Self {
            transport,
            handler,
            settings,
            mask_source: Box::new(DefaultMaskKeySource::new()),
            state: SessionState::Closed,
            handshake_parser: None,
            frame_parser: FrameParser::new(max_frame_size),
            close_sent: false,
            closing_since: None,
        }
    }

    /// Swaps in a caller-provided masking-key source (spec §5: "should
    /// expose a seedable or injectable RNG"), e.g. a deterministic one
    /// for tests.
    pub fn set_mask_key_source(&mut self, source: Box<dyn MaskKeySource>) {
        self.mask_source = source;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn handler(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Parses `url`, connects the transport, and sends the opening
    /// HTTP Upgrade request (spec §4.G "connect(url) sequence").
    /// `Closed -> Connecting` on success; reverts to `Closed` and
    /// surfaces the error on any failure, including URL parse errors.
    pub async fn connect(&mut self, url: &str) -> Result<(), Error> {
        let parsed = WsUrl::parse(url)?;

        if parsed.is_secure() && !self.transport.supports_tls() {
            return Err(Error::InvalidUrl);
        }

        self.state = SessionState::Connecting;

        if let Err(err) = self.transport.connect(&parsed.host, parsed.port).await {
            self.state = SessionState::Closed;
            return Err(err);
        }

        let key = handshake::generate_websocket_key();
        let request = handshake::build_request(&parsed, &key);
        if let Err(err) = self.transport.write(request.as_bytes()).await {
            self.state = SessionState::Closed;
            return Err(err);
        }

        self.handshake_parser = Some(HandshakeResponseParser::new(&key));
        debug!("sent opening handshake to {}", parsed.host_with_port());
        Ok(())
    }

    /// Drives the session forward by one step (spec §4.G "poll()
    /// contract"). Not re-entrant on the same session (spec §5).
    pub async fn poll(&mut self) -> Result<(), Error> {
        if self.state == SessionState::Closing {
            if let Some(since) = self.closing_since {
                if since.elapsed() >= self.settings.close_handshake_timeout {
                    warn!("closing handshake timed out, forcing disconnect");
                    self.force_disconnect(CloseCode::EndpointGoingAway).await;
                    return Ok(());
                }
            }
        }

        if self.state == SessionState::Closed {
            return Ok(());
        }

        if let Some(cancel) = &self.settings.cancel_callback {
            if !cancel() {
                self.disconnect(true).await;
                return Err(Error::CancelledOperation);
            }
        }

        let mut buf = [0u8; READ_CHUNK_SIZE];
        let n = match self.transport.read(&mut buf).await {
            Ok(n) => n,
            Err(err) => {
                let code = if is_peer_half_close(&err) {
                    CloseCode::EndpointGoingAway
                } else {
                    CloseCode::UnexpectedError
                };
                self.force_disconnect(code).await;
                self.handler.on_error(&err).await;
                return Err(err);
            }
        };
        if n == 0 {
            return Ok(());
        }
        let data = buf[..n].to_vec();

        if self.state == SessionState::Connecting {
            return self.drive_handshake(&data).await;
        }

        self.process_incoming(&data).await
    }

    async fn drive_handshake(&mut self, data: &[u8]) -> Result<(), Error> {
        let parser = self
            .handshake_parser
            .as_mut()
            .expect("Connecting state always owns a handshake parser");

        match parser.feed(data) {
            Ok(HandshakeOutcome::Incomplete) => Ok(()),
            Ok(HandshakeOutcome::Complete { trailing }) => {
                self.handshake_parser = None;
                self.state = SessionState::Open;
                debug!("opening handshake complete, session is open");
                self.handler.on_open().await;
                if trailing.is_empty() {
                    Ok(())
                } else {
                    self.process_incoming(&trailing).await
                }
            }
            Err(err) => {
                self.state = SessionState::Closed;
                warn!("opening handshake failed: {err}");
                self.handler.on_error(&err).await;
                Err(err)
            }
        }
    }

    async fn process_incoming(&mut self, data: &[u8]) -> Result<(), Error> {
        let events = match self.frame_parser.feed(data) {
            Ok(events) => events,
            Err(err) => {
                let code = if matches!(err, Error::InvalidUtf8) {
                    CloseCode::InconsistentData
                } else {
                    CloseCode::ProtocolError
                };
                warn!("protocol error, closing with {}: {err}", code.as_u16());
                if !self.send_close_if_needed(code).await {
                    self.finish_close(code).await;
                }
                self.handler.on_error(&err).await;
                return Err(err);
            }
        };

        for event in events {
            match event {
                ParseEvent::Frame(frame) => {
                    if let Some(cb) = &self.settings.frame_callback {
                        cb(&frame);
                    }
                    self.handler.on_frame(&frame).await;
                    if frame.header.opcode == OpCode::Close {
                        self.handle_peer_close(frame.payload).await?;
                        return Ok(());
                    }
                }
                ParseEvent::Message(message) => {
                    if let Message::Ping(payload) = &message {
                        trace!("replying to ping with pong");
                        self.write_frame(true, OpCode::Pong, payload).await?;
                    }
                    self.handler.on_message(message).await;
                }
            }
        }

        Ok(())
    }

    /// Spec §4.G "Auto-reply... On receiving Close".
    async fn handle_peer_close(&mut self, payload: Vec<u8>) -> Result<(), Error> {
        let code = match payload.len() {
            0 => CloseCode::NormalClosure,
            1 => CloseCode::ProtocolError,
            _ => {
                let code_value = u16::from_be_bytes([payload[0], payload[1]]);
                if payload.len() > 2 && std::str::from_utf8(&payload[2..]).is_err() {
                    CloseCode::InconsistentData
                } else if !CloseCode::is_valid_on_wire(code_value) {
                    CloseCode::ProtocolError
                } else {
                    CloseCode::from_u16(code_value)
                }
            }
        };

        if !self.send_close_if_needed(code).await {
            self.finish_close(code).await;
        }
        Ok(())
    }

    /// Sends a single Close frame if one hasn't already been sent this
    /// session (invariant I3). Returns `true` if the session is
    /// already `Closed` by the time this returns — either a prior call
    /// already sent the close frame and later tore the session down,
    /// or this attempt's write failed and `fail_write` force-closed it
    /// with `UnexpectedError`. Callers must check this before their own
    /// state transition or a `finish_close` call, or they'll resurrect
    /// an already-`Closed` session or fire `on_close` a second time.
    async fn send_close_if_needed(&mut self, code: CloseCode) -> bool {
        if self.close_sent {
            return self.state == SessionState::Closed;
        }
        let payload = code.as_u16().to_be_bytes().to_vec();
        // A close frame is sent best-effort here: the session is
        // already tearing down, and a failed write shouldn't mask the
        // original reason for closing.
        let result = self.write_frame(true, OpCode::Close, &payload).await;
        self.close_sent = true;
        result.is_err()
    }

    async fn finish_close(&mut self, code: CloseCode) {
        let _ = self.transport.disconnect().await;
        self.state = SessionState::Closed;
        self.handler.on_close(code).await;
    }

    async fn force_disconnect(&mut self, code: CloseCode) {
        let _ = self.transport.disconnect().await;
        self.state = SessionState::Closed;
        self.handler.on_close(code).await;
    }

    /// Spec §4.G "disconnect(immediate)". `immediate=true` tears the
    /// transport down right away; `immediate=false` starts the normal
    /// closing handshake and its 2s timeout (spec §5).
    pub async fn disconnect(&mut self, immediate: bool) {
        if immediate {
            self.force_disconnect(CloseCode::EndpointGoingAway).await;
            return;
        }

        if self.state != SessionState::Open {
            return;
        }

        if self.send_close_if_needed(CloseCode::NormalClosure).await {
            // The write failed and `fail_write` already force-closed
            // the session with its own code; don't resurrect a
            // `Closed` session back into `Closing`.
            return;
        }
        self.state = SessionState::Closing;
        self.closing_since = Some(Instant::now());
    }

    /// Spec §4.G `send_frame`. Returns
    /// `WebsocketConnectionIsNotOpen` (spec invariant I2) unless the
    /// session is `Open`.
    pub async fn send_frame(&mut self, opcode: OpCode, payload: Vec<u8>) -> Result<(), Error> {
        if self.state != SessionState::Open {
            return Err(Error::WebsocketConnectionIsNotOpen);
        }
        self.write_frame(true, opcode, &payload).await
    }

    pub async fn send_ping(&mut self, payload: Vec<u8>) -> Result<(), Error> {
        self.send_frame(OpCode::Ping, payload).await
    }

    pub async fn send_pong(&mut self, payload: Vec<u8>) -> Result<(), Error> {
        self.send_frame(OpCode::Pong, payload).await
    }

    /// Sends a Text/Binary message, splitting it across Continuation
    /// frames when it exceeds `max_frame_size` (an ambient enrichment
    /// over spec §4.G's single-frame `send_frame`, matching the
    /// teacher crate's `send_large_data_fragmented`).
    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<(), Error> {
        self.send_message(Message::Text(text.into())).await
    }

    pub async fn send_binary(&mut self, data: Vec<u8>) -> Result<(), Error> {
        self.send_message(Message::Binary(data)).await
    }

    async fn send_message(&mut self, message: Message) -> Result<(), Error> {
        if self.state != SessionState::Open {
            return Err(Error::WebsocketConnectionIsNotOpen);
        }
        for frame in message.to_frames(self.settings.max_frame_size) {
            self.write_frame(frame.header.fin, frame.header.opcode, &frame.payload).await?;
        }
        Ok(())
    }

    /// Spec §4.G `send_frame` algorithm: encode the header, write it,
    /// then mask and write the payload in `write_chunk_size` chunks
    /// with a fresh masking key per frame (spec invariant I4). Bypasses
    /// the `Open`-only check so the closing handshake and pong
    /// auto-replies can use it while `Closing` (spec invariant I2's
    /// carve-out for internal sends).
    async fn write_frame(&mut self, fin: bool, opcode: OpCode, payload: &[u8]) -> Result<(), Error> {
        let key = self.mask_source.next_key();
        let header = FrameHeader::new(fin, opcode, true, Some(key), payload.len() as u64);

        let mut header_bytes = BytesMut::new();
        header.encode(&mut header_bytes)?;

        if let Err(err) = self.transport.write(&header_bytes).await {
            return Err(self.fail_write(err).await);
        }

        let chunk_size = self.settings.write_chunk_size.max(1);
        for (i, chunk) in payload.chunks(chunk_size).enumerate() {
            let offset = i * chunk_size;
            let mut masked = chunk.to_vec();
            apply_mask(key, &mut masked, offset);
            if let Err(err) = self.transport.write(&masked).await {
                return Err(self.fail_write(err).await);
            }
        }

        Ok(())
    }

    async fn fail_write(&mut self, err: Error) -> Error {
        self.force_disconnect(CloseCode::UnexpectedError).await;
        self.handler.on_error(&err).await;
        err
    }
}
