use log::debug;
use serde::{Deserialize, Serialize};

use crate::{MessageData, RoomData, UserData};

/// An event pushed by the server over the duplex channel.
///
/// The set of kinds is closed. A frame that decodes into one of these
/// variants is guaranteed to carry every field the reconcilers need,
/// so they never re-validate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PushEvent {
    /// The identity handshake, sent once per socket by the server
    Init { conn_id: String },
    /// A new conversation entry in some room
    Message(MessageData),
    /// A room came into existence, with its full initial state
    CreateRoom {
        room: RoomData,
        users: Vec<UserData>,
        conversations: Vec<MessageData>,
        exited_users: Vec<UserData>,
    },
    /// A room was deleted. Terminal: later events for this id are noise.
    DeleteRoom { room_id: String },
    /// A user became an occupant of a room
    JoinRoom { room_id: String, user: UserData },
    /// A user left a room
    ExitRoom { room_id: String, user_id: String },
}

impl PushEvent {
    /// Decodes one inbound frame payload.
    ///
    /// The channel may carry debug or out-of-band text, so anything that is
    /// not a well-formed event of a known kind is dropped as noise.
    pub fn decode(frame: &str) -> Option<Self> {
        match serde_json::from_str(frame) {
            Ok(event) => Some(event),
            Err(err) => {
                debug!("dropping undecodable frame: {}", err);
                None
            }
        }
    }
}
