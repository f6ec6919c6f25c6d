use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use parley_protocol::{MessageData, RoomData, RoomListing, RoomSnapshot};

mod http;
pub use http::*;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-success status
    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },
    /// The server could not be reached at all
    #[error("Failed to reach server: {0}")]
    Transport(String),
    /// The response body did not have the expected shape
    #[error("Failed to parse response: {0}")]
    Malformed(String),
}

/// Represents a type that can perform the chat server's request/response
/// API: snapshot fetches and the mutating room and conversation calls.
///
/// Mutating calls that must be echo-suppressed take the bound conn_id; it is
/// omitted for actions issued before the identity handshake completes, which
/// the server treats as "no suppression needed".
#[async_trait]
pub trait Api: Send + Sync + 'static {
    /// The room listing snapshot that seeds the directory
    async fn list_rooms(&self) -> Result<Vec<RoomListing>>;
    /// The focused-room snapshot that seeds conversation state
    async fn room_snapshot(&self, room_id: &str) -> Result<RoomSnapshot>;

    async fn create_room(&self, new_room: NewRoom, conn_id: Option<&str>) -> Result<RoomData>;
    async fn delete_room(&self, room_id: &str) -> Result<()>;
    async fn join_room(&self, room_id: &str, conn_id: Option<&str>) -> Result<()>;
    async fn exit_room(&self, room_id: &str, conn_id: Option<&str>) -> Result<()>;
    async fn send_message(
        &self,
        new_message: NewMessage,
        conn_id: Option<&str>,
    ) -> Result<MessageData>;
}

#[derive(Debug, Clone, Serialize)]
pub struct NewRoom {
    pub room_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMessage {
    pub room_id: String,
    pub message: String,
}
