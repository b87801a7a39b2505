//! A client-side implementation of the WebSocket protocol, RFC 6455.
//!
//! `ripcurl` performs the opening HTTP handshake, reads and writes
//! framed binary/text/control messages over a byte stream, enforces
//! the protocol's fragmentation and UTF-8 invariants, and drives a
//! clean closing handshake — the client role only; a server
//! implementation, `permessage-deflate`, subprotocol negotiation, and
//! TLS are not part of this crate (a TLS-capable transport can
//! implement [`transport::Transport`] the same way [`transport::TcpTransport`] does).
//!
//! It's an async library built on the tokio runtime. The entry point
//! for most callers is [`session::Session`], driven by repeatedly
//! calling [`session::Session::poll`]; [`client::EventClient`] wraps
//! that in a background task and a [`futures::Stream`] of
//! [`client::Event`]s for callers who don't want to own the poll loop.
//!
//! ```no_run
//! use ripcurl::session::{NoopHandler, Session};
//! use ripcurl::config::Settings;
//!
//! # async fn run() -> Result<(), ripcurl::error::Error> {
//! let mut session = Session::new(NoopHandler, Settings::default());
//! session.connect("ws://localhost:9001/").await?;
//! loop {
//!     session.poll().await?;
//! }
//! # }
//! ```

pub mod client;
pub mod close;
pub mod config;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod message;
pub mod parser;
pub mod rng;
pub mod session;
pub mod transport;
pub mod url;
mod utf8;
