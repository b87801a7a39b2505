//! The high-level asynchronous wrapper spec §1 calls out as external
//! to the core: it runs a [`Session`] on a background task and
//! marshals its callbacks onto an mpsc channel exposed as a `Stream`
//! (spec §6's event contract), the same shape as the teacher crate's
//! `EventStream`/`Event` (`src/event.rs`, `src/split.rs`), adapted
//! from server-side multi-client fan-out to a single client
//! connection. Kept deliberately minimal: callers needing full control
//! over scheduling use [`Session::poll`] directly instead.

use crate::close::CloseCode;
use crate::config::Settings;
use crate::error::Error;
use crate::frame::{Frame, OpCode};
use crate::message::Message;
use crate::session::{Handler, Session, SessionState};
use async_trait::async_trait;
use futures::Stream;
use log::warn;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{Receiver, Sender, UnboundedSender};
use tokio::task::JoinHandle;

/// Spec §6's outward callback table, reified as a channel payload
/// instead of a direct function call. `Error` carries its `Display`
/// text rather than the `Error` value itself, since the crate's error
/// type wraps foreign errors (`std::io::Error`) that aren't `Clone`
/// and a channel payload must be an owned, sendable value.
#[derive(Debug)]
pub enum Event {
    Open,
    Message(Message),
    Frame(Frame),
    Close(CloseCode),
    Error(String),
}

/// A [`Stream`] of [`Event`]s, wrapping the receiving half of the
/// channel [`EventClient::connect`] spawns. Callers don't interact
/// with the underlying `mpsc` channel directly.
pub struct EventStream {
    receiver: Receiver<Event>,
}

impl EventStream {
    fn new(receiver: Receiver<Event>) -> Self {
        Self { receiver }
    }
}

impl Stream for EventStream {
    type Item = Event;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        Pin::new(&mut this.receiver).poll_recv(cx)
    }
}

struct ChannelHandler {
    sender: Sender<Event>,
}

#[async_trait]
impl Handler for ChannelHandler {
    async fn on_open(&mut self) {
        let _ = self.sender.send(Event::Open).await;
    }

    async fn on_message(&mut self, message: Message) {
        let _ = self.sender.send(Event::Message(message)).await;
    }

    async fn on_frame(&mut self, frame: &Frame) {
        let _ = self.sender.send(Event::Frame(frame.clone())).await;
    }

    async fn on_close(&mut self, code: CloseCode) {
        let _ = self.sender.send(Event::Close(code)).await;
    }

    async fn on_error(&mut self, error: &Error) {
        let _ = self.sender.send(Event::Error(error.to_string())).await;
    }
}

enum Command {
    SendFrame(OpCode, Vec<u8>),
    SendText(String),
    SendBinary(Vec<u8>),
    Disconnect(bool),
}

/// A handle to a [`Session`] running on a background task. Dropping
/// it leaves the task (and the connection) running; call
/// [`EventClient::disconnect`] and [`EventClient::join`] for a clean
/// shutdown.
pub struct EventClient {
    commands: UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl EventClient {
    /// Connects to `url` and spawns the background poll loop. Returns
    /// once the opening HTTP Upgrade request has been sent (mirroring
    /// `Session::connect`); the `Open` event on the returned
    /// `EventStream` signals the 101 response has been validated.
    pub async fn connect(url: &str, settings: Settings) -> Result<(Self, EventStream), Error> {
        let (event_tx, event_rx) = mpsc::channel(128);
        let (command_tx, mut command_rx) = mpsc::unbounded_channel::<Command>();

        let mut session = Session::new(ChannelHandler { sender: event_tx.clone() }, settings);
        session.connect(url).await?;

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    command = command_rx.recv() => {
                        match command {
                            Some(Command::SendFrame(opcode, payload)) => {
                                if let Err(err) = session.send_frame(opcode, payload).await {
                                    warn!("send_frame failed: {err}");
                                }
                            }
                            Some(Command::SendText(text)) => {
                                if let Err(err) = session.send_text(text).await {
                                    warn!("send_text failed: {err}");
                                }
                            }
                            Some(Command::SendBinary(data)) => {
                                if let Err(err) = session.send_binary(data).await {
                                    warn!("send_binary failed: {err}");
                                }
                            }
                            Some(Command::Disconnect(immediate)) => {
                                session.disconnect(immediate).await;
                            }
                            None => break,
                        }
                    }
                    result = session.poll() => {
                        if let Err(err) = result {
                            warn!("session poll error: {err}");
                        }
                    }
                }

                if session.state() == SessionState::Closed {
                    break;
                }
            }
        });

        Ok((Self { commands: command_tx, task }, EventStream::new(event_rx)))
    }

    pub fn send_frame(&self, opcode: OpCode, payload: Vec<u8>) {
        let _ = self.commands.send(Command::SendFrame(opcode, payload));
    }

    pub fn send_text(&self, text: impl Into<String>) {
        let _ = self.commands.send(Command::SendText(text.into()));
    }

    pub fn send_binary(&self, data: Vec<u8>) {
        let _ = self.commands.send(Command::SendBinary(data));
    }

    pub fn send_ping(&self, payload: Vec<u8>) {
        self.send_frame(OpCode::Ping, payload);
    }

    pub fn disconnect(&self, immediate: bool) {
        let _ = self.commands.send(Command::Disconnect(immediate));
    }

    /// Awaits the background task's completion, e.g. after calling
    /// `disconnect`.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

impl Drop for EventClient {
    fn drop(&mut self) {
        self.task.abort();
    }
}
