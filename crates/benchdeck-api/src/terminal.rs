//! Terminal session over the controller's Socket.IO channel.
//!
//! One session per [`TerminalChannel`]. Output arrives as `term_out` events
//! and is fanned out through a [`tokio::sync::broadcast`] channel; input and
//! resizes go out as `term_in` / `term_resize`. The session is never
//! re-established automatically: once it ends, callers open a new channel.
//!
//! # Example
//!
//! ```rust,ignore
//! use benchdeck_api::{TerminalChannel, TerminalEvent, TerminalSize};
//! use tokio_util::sync::CancellationToken;
//!
//! let url = benchdeck_api::socketio::socket_url(&base)?;
//! let mut term = TerminalChannel::connect(url, TerminalSize::new(120, 40), &CancellationToken::new());
//! let mut rx = term.events();
//!
//! while let Ok(event) = rx.recv().await {
//!     if let TerminalEvent::Output(text) = event {
//!         print!("{text}");
//!     }
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::Error;
use crate::socketio::{self, Packet};

const EVENT_CHANNEL_CAPACITY: usize = 1024;
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

// ── Public types ─────────────────────────────────────────────────────

/// Terminal dimensions announced on open and on every resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TerminalSize {
    pub cols: u16,
    pub rows: u16,
}

impl TerminalSize {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }
}

impl Default for TerminalSize {
    fn default() -> Self {
        Self { cols: 80, rows: 24 }
    }
}

/// Lifecycle and output events of a terminal session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalEvent {
    /// Namespace joined and `term_open` sent.
    Connected,
    /// Text to render verbatim.
    Output(String),
    /// Session ended without error.
    Disconnected(String),
    /// Connect or transport failure; the session is over.
    Error(String),
}

// ── TerminalChannel ──────────────────────────────────────────────────

/// Handle to one running terminal session.
pub struct TerminalChannel {
    outbound: mpsc::UnboundedSender<String>,
    size: watch::Sender<TerminalSize>,
    open: Arc<AtomicBool>,
    event_rx: broadcast::Receiver<TerminalEvent>,
    cancel: CancellationToken,
}

impl TerminalChannel {
    /// Spawn the session task and return immediately.
    ///
    /// Must be called from within a Tokio runtime. Connection progress is
    /// reported through [`subscribe`](Self::subscribe). The session runs on
    /// a child of `cancel` and also ends when the handle is dropped.
    pub fn connect(url: Url, size: TerminalSize, cancel: &CancellationToken) -> Self {
        let cancel = cancel.child_token();
        let (event_tx, event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (size_tx, size_rx) = watch::channel(size);
        let open = Arc::new(AtomicBool::new(false));

        tokio::spawn(session_task(
            url,
            outbound_rx,
            size_rx,
            Arc::clone(&open),
            event_tx,
            cancel.clone(),
        ));

        Self {
            outbound,
            size: size_tx,
            open,
            event_rx,
            cancel,
        }
    }

    /// New receiver for session events from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<TerminalEvent> {
        self.event_rx.resubscribe()
    }

    /// Receiver holding every event since [`connect`](Self::connect),
    /// including a `Connected` or `Error` the caller may otherwise miss.
    /// Later calls behave like [`subscribe`](Self::subscribe).
    pub fn events(&mut self) -> broadcast::Receiver<TerminalEvent> {
        let fresh = self.event_rx.resubscribe();
        std::mem::replace(&mut self.event_rx, fresh)
    }

    /// Whether the session is joined and accepting input.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Forward keystroke text as a `term_in` event.
    ///
    /// Returns [`Error::ChannelDisconnected`] when the session is not open;
    /// the text is dropped, not queued.
    pub fn send_input(&self, text: &str) -> Result<(), Error> {
        self.send_frame(Packet::event("term_in", serde_json::Value::String(text.to_owned())))
    }

    /// Record new dimensions and announce them with `term_resize`.
    ///
    /// The size is kept even when the session is not open, so the next
    /// `term_open` carries it.
    pub fn resize(&self, size: TerminalSize) -> Result<(), Error> {
        self.size.send_replace(size);
        self.send_frame(Packet::event("term_resize", size_payload(size)))
    }

    /// Current terminal dimensions.
    pub fn size(&self) -> TerminalSize {
        *self.size.borrow()
    }

    /// Tear the session down.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    fn send_frame(&self, frame: String) -> Result<(), Error> {
        if !self.is_open() {
            return Err(Error::ChannelDisconnected);
        }
        self.outbound
            .send(frame)
            .map_err(|_| Error::ChannelDisconnected)
    }
}

impl Drop for TerminalChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn size_payload(size: TerminalSize) -> serde_json::Value {
    serde_json::json!({ "cols": size.cols, "rows": size.rows })
}

// ── Session task ─────────────────────────────────────────────────────

async fn session_task(
    url: Url,
    mut outbound: mpsc::UnboundedReceiver<String>,
    size: watch::Receiver<TerminalSize>,
    open: Arc<AtomicBool>,
    events: broadcast::Sender<TerminalEvent>,
    cancel: CancellationToken,
) {
    info!(url = %url, "opening terminal session");

    let result = tokio::select! {
        biased;
        () = cancel.cancelled() => Ok("closed by client".to_owned()),
        result = run_session(&url, &mut outbound, &size, &open, &events) => result,
    };

    open.store(false, Ordering::SeqCst);

    let event = match result {
        Ok(reason) => {
            info!(%reason, "terminal session ended");
            TerminalEvent::Disconnected(reason)
        }
        Err(e) => {
            warn!(error = %e, "terminal session failed");
            TerminalEvent::Error(e.to_string())
        }
    };
    // No subscribers is fine.
    let _ = events.send(event);
}

/// Connect, join the default namespace, then pump frames until the session
/// ends. Returns the disconnect reason.
async fn run_session(
    url: &Url,
    outbound: &mut mpsc::UnboundedReceiver<String>,
    size: &watch::Receiver<TerminalSize>,
    open: &AtomicBool,
    events: &broadcast::Sender<TerminalEvent>,
) -> Result<String, Error> {
    let uri: tungstenite::http::Uri = url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::SocketConnect(e.to_string()))?;

    let (ws_stream, _response) = tokio_tungstenite::connect_async(ClientRequestBuilder::new(uri))
        .await
        .map_err(|e| Error::SocketConnect(e.to_string()))?;

    let (mut write, mut read) = ws_stream.split();

    tokio::time::timeout(HANDSHAKE_TIMEOUT, handshake(&mut write, &mut read))
        .await
        .map_err(|_| Error::SocketConnect("handshake timed out".into()))??;

    open.store(true, Ordering::SeqCst);
    let _ = events.send(TerminalEvent::Connected);

    let initial = *size.borrow();
    debug!(cols = initial.cols, rows = initial.rows, "announcing terminal size");
    send_text(&mut write, Packet::event("term_open", size_payload(initial))).await?;

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if let Some(reason) = handle_frame(&text, &mut write, events).await? {
                        return Ok(reason);
                    }
                }
                Some(Ok(Message::Close(frame))) => return close_reason(frame),
                Some(Err(e)) => return Err(Error::SocketConnect(e.to_string())),
                None => return Ok("stream ended".into()),
                Some(Ok(_)) => {}
            },
            Some(frame) = outbound.recv() => {
                trace!(len = frame.len(), "sending terminal frame");
                send_text(&mut write, frame).await?;
            }
        }
    }
}

/// Engine.IO open, then `40` until the server confirms the namespace.
async fn handshake<W, R>(write: &mut W, read: &mut R) -> Result<(), Error>
where
    W: Sink<Message, Error = tungstenite::Error> + Unpin,
    R: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        let text = match read.next().await {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | None => {
                return Err(Error::SocketConnect("closed during handshake".into()));
            }
            Some(Err(e)) => return Err(Error::SocketConnect(e.to_string())),
            Some(Ok(_)) => continue,
        };

        match socketio::decode(&text)? {
            Packet::Open(info) => {
                debug!(sid = %info.sid, ping_interval = info.ping_interval, "engine.io open");
                send_text(write, Packet::Connect(None).encode()).await?;
            }
            Packet::Connect(_) => return Ok(()),
            Packet::ConnectError(detail) => {
                return Err(Error::SocketConnect(format!("namespace rejected: {detail}")));
            }
            Packet::Ping => send_text(write, Packet::Pong.encode()).await?,
            Packet::Close | Packet::Disconnect => {
                return Err(Error::SocketConnect("closed during handshake".into()));
            }
            _ => {}
        }
    }
}

/// Handle one text frame of an open session. `Some(reason)` ends it.
async fn handle_frame<W>(
    text: &str,
    write: &mut W,
    events: &broadcast::Sender<TerminalEvent>,
) -> Result<Option<String>, Error>
where
    W: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    match socketio::decode(text) {
        Ok(Packet::Ping) => send_text(write, Packet::Pong.encode()).await?,
        Ok(Packet::Event { name, data }) => {
            if let Some(event) = output_event(&name, data) {
                let _ = events.send(event);
            }
        }
        Ok(Packet::Disconnect) => return Ok(Some("server ended the session".into())),
        Ok(Packet::Close) => return Ok(Some("server closed the connection".into())),
        Ok(Packet::ConnectError(detail)) => {
            return Err(Error::SocketConnect(format!("namespace rejected: {detail}")));
        }
        Ok(_) => {}
        Err(e) => debug!(error = %e, "ignoring undecodable frame"),
    }
    Ok(None)
}

/// Map an inbound event to terminal output. Only `term_out` strings render.
fn output_event(name: &str, data: serde_json::Value) -> Option<TerminalEvent> {
    match (name, data) {
        ("term_out", serde_json::Value::String(text)) => Some(TerminalEvent::Output(text)),
        (other, _) => {
            trace!(event = other, "ignoring socket event");
            None
        }
    }
}

fn close_reason(frame: Option<tungstenite::protocol::CloseFrame>) -> Result<String, Error> {
    match frame {
        Some(cf) if cf.code != tungstenite::protocol::frame::coding::CloseCode::Normal => {
            Err(Error::SocketClosed {
                code: u16::from(cf.code),
                reason: cf.reason.as_str().to_owned(),
            })
        }
        _ => Ok("server closed the connection".into()),
    }
}

async fn send_text<W>(write: &mut W, frame: String) -> Result<(), Error>
where
    W: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    write
        .send(Message::text(frame))
        .await
        .map_err(|e| Error::SocketConnect(e.to_string()))
}
