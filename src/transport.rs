//! The pluggable byte transport the session drives (spec §4.F).
//!
//! Replaces the original C source's `void*` handle plus
//! `snIOCallbacks` function-pointer table (spec §9's polymorphism
//! redesign note) with an async trait. `TcpTransport` is the default,
//! plain-TCP implementation; a test transport and a TLS transport both
//! implement the same trait.

use crate::error::Error;
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Connect/read/write/disconnect contract for the byte channel a
/// session is driven over.
///
/// `read` returns `Ok(0)` for "nothing readable right now" — a
/// non-blocking-ish poll, not an end-of-stream signal. A genuine
/// peer half-close is an `Err`, which `Session::poll` maps to
/// `EndpointGoingAway` rather than treating it as just more silence
/// (spec §9's open question on this exact ambiguity).
#[async_trait]
pub trait Transport: Send {
    async fn connect(&mut self, host: &str, port: u16) -> Result<(), Error>;

    /// Reads into `buf`, returning the number of bytes read.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error>;

    /// Writes the entirety of `buf` or returns an error; partial
    /// writes are retried internally.
    async fn write(&mut self, buf: &[u8]) -> Result<(), Error>;

    async fn disconnect(&mut self) -> Result<(), Error>;

    /// Whether this transport speaks TLS over the wire and can
    /// therefore honor a `wss://` URL. `Session::connect` rejects a
    /// `wss` URL with `Error::InvalidUrl` for any transport that
    /// answers `false` here (spec §4.E's "a `wss` URL routed through
    /// the default transport is a configuration error"), rather than
    /// silently speaking plaintext websocket to a TLS port.
    fn supports_tls(&self) -> bool {
        false
    }
}

/// The default transport: a plain (non-TLS) TCP socket.
pub struct TcpTransport {
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self { stream: None }
    }

    fn stream_mut(&mut self) -> Result<&mut TcpStream, Error> {
        self.stream.as_mut().ok_or(Error::SocketFailedToConnect)
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&mut self, host: &str, port: u16) -> Result<(), Error> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|_| Error::SocketFailedToConnect)?;
        self.stream = Some(stream);
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let n = self.stream_mut()?.read(buf).await?;
        if n == 0 && !buf.is_empty() {
            return Err(Error::IOError {
                source: std::io::Error::from(std::io::ErrorKind::UnexpectedEof),
            });
        }
        Ok(n)
    }

    async fn write(&mut self, buf: &[u8]) -> Result<(), Error> {
        self.stream_mut()?.write_all(buf).await?;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), Error> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
        Ok(())
    }
}
