use crossbeam::channel::{Receiver, Sender};
use parley_protocol::{MessageData, UserData};

pub type EventSender = Sender<ClientEvent>;
pub type EventReceiver = Receiver<ClientEvent>;

/// Events emitted by the client as reconciled state changes.
///
/// Idempotent no-op reconciliations emit nothing, so the view layer never
/// sees a change that didn't happen.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The identity handshake completed and a conn_id is bound
    IdentityBound { conn_id: String },
    /// The duplex channel closed. Terminal for this lifecycle.
    ConnectionClosed,
    /// A room appeared in the directory
    RoomAdded { room_id: String },
    /// A room left the directory. If this is the room currently being
    /// viewed, the view layer is expected to navigate away.
    RoomRemoved { room_id: String },
    /// A user became an occupant of a room
    MemberJoined { room_id: String, user: UserData },
    /// A user moved to a room's exited set
    MemberExited { room_id: String, user_id: String },
    /// A message was appended to the focused conversation
    MessageAppended {
        room_id: String,
        message: MessageData,
    },
    /// A provisional message was confirmed in place by the server
    MessageConfirmed {
        room_id: String,
        temp_id: String,
        message: MessageData,
    },
    /// A provisional message failed. It stays visible, flagged, not retried.
    MessageFailed {
        room_id: String,
        temp_id: String,
        reason: String,
    },
}
