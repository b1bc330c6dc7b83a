//! Room channel connection
//!
//! One WebSocket per client. A reader task decodes frames into the inbound
//! buffer and a writer task drains an unbounded queue of outbound messages.
//! There is no reconnection: a close or transport error ends the session.

use std::sync::Arc;

use futures_util::{Sink, SinkExt, StreamExt};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::game::attributes::PlayerAttributes;
use crate::game::state::PlayerId;
use crate::metrics::SessionMetrics;
use crate::net::inbound::{InboundBufferError, InboundSender};
use crate::net::protocol::{ActionPayload, RoomMessage};
use crate::net::sync::LaunchSink;
use crate::util::vec2::Vec2;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Handshake in progress
    Connecting,
    /// Open in both directions
    Connected,
    /// Local close requested
    Disconnecting,
    /// Fully closed, by either side or by a transport error
    Disconnected,
}

/// Connection errors
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("invalid room url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("connection closed")]
    Closed,
}

/// Identity and attributes announced when joining the room channel
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectParams {
    pub room_id: String,
    pub user_id: PlayerId,
    pub icon_url: String,
    pub attributes: PlayerAttributes,
    pub point: Vec2,
}

impl ConnectParams {
    /// Room channel URL with the join parameters in the query string
    pub fn url(&self, base: &str) -> Result<Url, ConnectionError> {
        let params = [
            ("room_id", self.room_id.clone()),
            ("user_id", self.user_id.clone()),
            ("icon_url", self.icon_url.clone()),
            ("power", self.attributes.power.to_string()),
            ("weight", self.attributes.weight.to_string()),
            ("volume", self.attributes.volume.to_string()),
            ("cd", self.attributes.cooldown_ms.to_string()),
            ("x", self.point.x.to_string()),
            ("y", self.point.y.to_string()),
        ];
        Ok(Url::parse_with_params(base, &params)?)
    }
}

#[derive(Debug)]
enum Outbound {
    Message(RoomMessage),
    Close,
}

/// Clonable handle for queueing outbound messages
#[derive(Clone)]
pub struct RoomSender {
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl RoomSender {
    /// Queue a message. Returns false once the writer has stopped.
    pub fn send(&self, message: RoomMessage) -> bool {
        self.outbound.send(Outbound::Message(message)).is_ok()
    }
}

impl LaunchSink for RoomSender {
    fn send_launch(&self, action: ActionPayload) {
        let player_id = action.id.clone();
        if !self.send(RoomMessage::Action(action)) {
            debug!(player_id = %player_id, "Launch not sent, room channel closed");
        }
    }
}

/// Open room channel
///
/// Dropping the connection closes the socket. Move it to transfer ownership
/// (for example from the waiting room to the match).
pub struct RoomConnection {
    session_id: Uuid,
    state: Arc<RwLock<ConnectionState>>,
    sender: RoomSender,
}

impl RoomConnection {
    /// Connect and spawn the reader and writer tasks
    pub async fn connect(
        url: &Url,
        inbound: InboundSender,
        metrics: Arc<SessionMetrics>,
    ) -> Result<Self, ConnectionError> {
        let session_id = Uuid::new_v4();
        let state = Arc::new(RwLock::new(ConnectionState::Connecting));

        let (stream, _response) = connect_async(url.as_str()).await.map_err(|e| {
            *state.write() = ConnectionState::Disconnected;
            e
        })?;
        let (write, mut read) = stream.split();
        *state.write() = ConnectionState::Connected;
        info!(session_id = %session_id, host = url.host_str().unwrap_or(""), "Room channel connected");

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<Outbound>();

        tokio::spawn(write_loop(
            write,
            outbound_rx,
            Arc::clone(&state),
            Arc::clone(&metrics),
            session_id,
        ));

        let reader_state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        let text = text.as_str();
                        metrics.record_received(text.len());
                        let message = match RoomMessage::decode(text) {
                            Ok(message) => message,
                            Err(e) => {
                                metrics.record_dropped();
                                warn!(session_id = %session_id, error = %e, "Dropped room message");
                                continue;
                            }
                        };
                        debug!(kind = message.kind(), "Room message received");
                        match inbound.try_send(message) {
                            Ok(()) => {}
                            Err(InboundBufferError::Full) => {
                                metrics.record_dropped();
                                warn!(session_id = %session_id, "Inbound buffer full, message dropped");
                            }
                            Err(InboundBufferError::Disconnected) => break,
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        info!(session_id = %session_id, ?frame, "Room channel closed by peer");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(session_id = %session_id, error = %e, "Room channel read failed");
                        break;
                    }
                }
            }
            *reader_state.write() = ConnectionState::Disconnected;
        });

        Ok(Self {
            session_id,
            state,
            sender: RoomSender { outbound: outbound_tx },
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Outbound handle, usable as a [`LaunchSink`]
    pub fn sender(&self) -> RoomSender {
        self.sender.clone()
    }

    /// Queue a message for the writer task
    pub fn send(&self, message: RoomMessage) -> Result<(), ConnectionError> {
        if !self.is_open() || !self.sender.send(message) {
            return Err(ConnectionError::Closed);
        }
        Ok(())
    }

    /// Start the close handshake
    pub fn close(&self) {
        let mut state = self.state.write();
        if matches!(*state, ConnectionState::Connecting | ConnectionState::Connected) {
            *state = ConnectionState::Disconnecting;
            let _ = self.sender.outbound.send(Outbound::Close);
            info!(session_id = %self.session_id, "Closing room channel");
        }
    }
}

/// Drain the outbound queue into the socket
///
/// A failed write marks the connection disconnected so the owner can end
/// the session.
async fn write_loop<S>(
    mut write: S,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    state: Arc<RwLock<ConnectionState>>,
    metrics: Arc<SessionMetrics>,
    session_id: Uuid,
) where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    while let Some(item) = outbound.recv().await {
        let message = match item {
            Outbound::Message(message) => message,
            Outbound::Close => break,
        };
        let text = match message.encode() {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Failed to encode outbound message");
                continue;
            }
        };
        let len = text.len();
        if let Err(e) = write.send(Message::text(text)).await {
            error!(session_id = %session_id, error = %e, "Room channel write failed");
            *state.write() = ConnectionState::Disconnected;
            return;
        }
        metrics.record_sent(len);
    }
    if let Err(e) = write.close().await {
        debug!(session_id = %session_id, error = %e, "Close handshake failed");
    }
}

impl Drop for RoomConnection {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for RoomConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomConnection")
            .field("session_id", &self.session_id)
            .field("state", &self.state())
            .finish()
    }
}
