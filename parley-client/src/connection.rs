use futures_util::StreamExt;
use log::{info, warn};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};

use parley_protocol::PushEvent;

use crate::{dispatch::dispatch, ClientContext, ClientEvent};

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Error)]
pub enum ConnectionError {
    /// At most one live channel per client instance
    #[error("A channel is already attached")]
    AlreadyAttached,
    /// A closed lifecycle never reopens; reconnection is a new client's job
    #[error("The connection lifecycle is terminal")]
    Closed,
    #[error("Failed to open channel: {0}")]
    Open(String),
}

/// The lifecycle of the duplex channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    /// Transport is up, identity not yet bound
    Open,
    /// An `init` event bound a conn_id; outgoing mutating calls carry it
    Identified,
    /// Terminal. No further events are dispatched.
    Closed,
}

/// Identity and lifecycle of the one duplex channel a client owns.
///
/// The conn_id is a server-issued opaque token, bound once during the `init`
/// handshake and attached to outgoing mutating requests so the server can
/// suppress echoes of this client's own actions.
#[derive(Debug)]
pub struct Connection {
    state: ConnectionState,
    conn_id: Option<String>,
}

impl Connection {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            conn_id: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn conn_id(&self) -> Option<&str> {
        self.conn_id.as_deref()
    }

    /// Moves to `Connecting`. Fails if a channel was ever attached: opening
    /// a second one is a programming error, not a runtime race.
    pub fn begin_connect(&mut self) -> Result<(), ConnectionError> {
        match self.state {
            ConnectionState::Disconnected => {
                self.state = ConnectionState::Connecting;
                Ok(())
            }
            ConnectionState::Closed => Err(ConnectionError::Closed),
            _ => Err(ConnectionError::AlreadyAttached),
        }
    }

    /// Transport-level open callback
    pub fn mark_open(&mut self) {
        if self.state == ConnectionState::Connecting {
            self.state = ConnectionState::Open;
        }
    }

    /// Binds the identity carried by an `init` event. First-wins: identity
    /// is never reassigned mid-life, so a re-delivered `init` with another
    /// value is ignored.
    pub fn bind(&mut self, conn_id: &str) -> bool {
        if self.state == ConnectionState::Closed {
            return false;
        }

        match &self.conn_id {
            Some(existing) => {
                if existing != conn_id {
                    warn!(
                        "ignoring init rebind attempt ({} is already bound)",
                        existing
                    );
                }
                false
            }
            None => {
                self.conn_id = Some(conn_id.to_string());
                self.state = ConnectionState::Identified;
                info!("identity bound: {}", conn_id);
                true
            }
        }
    }

    /// Terminal close. Returns false if already closed.
    pub fn close(&mut self) -> bool {
        if self.state == ConnectionState::Closed {
            return false;
        }

        self.state = ConnectionState::Closed;
        true
    }
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads the channel until it ends, handing every decoded frame to the
/// dispatcher in strict arrival order. Each frame triggers one synchronous
/// reconcile step before the next is read.
pub(crate) async fn drive_channel(context: ClientContext, mut stream: WsStream) {
    while let Some(frame) = stream.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                warn!("transport error: {}", err);
                break;
            }
        };

        let text = match frame {
            Message::Text(text) => text,
            Message::Close(_) => break,
            // Pings are answered by the transport; anything else is noise
            _ => continue,
        };

        if let Some(event) = PushEvent::decode(text.as_str()) {
            dispatch(&context, event);
        }
    }

    close_channel(&context);
}

/// Drives the lifecycle to `Closed` and notifies the view layer, once
pub(crate) fn close_channel(context: &ClientContext) {
    if context.connection.lock().close() {
        info!("channel closed");
        context.emit(ClientEvent::ConnectionClosed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_transitions() {
        let mut connection = Connection::new();
        assert_eq!(connection.state(), ConnectionState::Disconnected);

        connection.begin_connect().expect("connect from disconnected");
        assert_eq!(connection.state(), ConnectionState::Connecting);

        connection.mark_open();
        assert_eq!(connection.state(), ConnectionState::Open);

        assert!(connection.bind("c-1"));
        assert_eq!(connection.state(), ConnectionState::Identified);

        assert!(connection.close());
        assert_eq!(connection.state(), ConnectionState::Closed);
        assert!(!connection.close(), "close is terminal and idempotent");
    }

    #[test]
    fn test_second_attach_is_rejected() {
        let mut connection = Connection::new();
        connection.begin_connect().expect("first attach");

        assert!(
            matches!(
                connection.begin_connect(),
                Err(ConnectionError::AlreadyAttached)
            ),
            "one live channel per client instance"
        );
    }

    #[test]
    fn test_closed_lifecycle_never_reopens() {
        let mut connection = Connection::new();
        connection.begin_connect().expect("attach");
        connection.close();

        assert!(matches!(
            connection.begin_connect(),
            Err(ConnectionError::Closed)
        ));
    }

    #[test]
    fn test_identity_binds_once() {
        let mut connection = Connection::new();
        connection.begin_connect().expect("attach");
        connection.mark_open();

        assert!(connection.bind("c-1"));
        assert!(!connection.bind("c-2"), "second init is ignored");
        assert_eq!(
            connection.conn_id(),
            Some("c-1"),
            "first-wins: the bound identity does not change"
        );
    }
}
