use serde::{Deserialize, Serialize};

/// A chat user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub id: String,
    pub username: String,
}

/// A chat room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomData {
    pub id: String,
    pub name: String,
    /// The user that created the room. Immutable for the room's lifetime.
    pub owner_id: String,
    /// The most recent message, used for room listings
    pub last_message: String,
    pub created_at: String,
}

/// A single conversation entry as it exists on the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageData {
    pub id: String,
    pub user_id: String,
    pub room_id: String,
    pub message: String,
    /// An opaque timestamp, carried for display only.
    /// Conversation order is insertion order, never a re-sort by this field.
    pub created_at: String,
}

/// One entry of the room listing snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomListing {
    pub room: RoomData,
    /// The current occupants of the room
    pub users: Vec<UserData>,
}

/// The full snapshot of a focused room, used to seed conversation state
/// before any push event is applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room: RoomData,
    pub users: Vec<UserData>,
    pub conversations: Vec<MessageData>,
    /// Historical occupants, retained so past messages still resolve a username
    pub exited_users: Vec<UserData>,
}
