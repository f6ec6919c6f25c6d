mod api;
mod connection;
mod conversation;
mod dispatch;
mod events;
mod pending;
mod rooms;
mod util;

use std::sync::Arc;

use chrono::Utc;
use crossbeam::channel::unbounded;
use log::info;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;

pub use api::{Api, ApiError, HttpApi, NewMessage, NewRoom, CONN_ID_HEADER};
pub use connection::{Connection, ConnectionError, ConnectionState};
pub use conversation::*;
pub use events::*;
pub use pending::*;
pub use rooms::*;

use connection::{close_channel, drive_channel};
use parley_protocol::{MessageData, RoomData, UserData};
use util::random_string;

/// The parley client core: one duplex channel, a room directory, and the
/// focused conversation, reconciled under snapshots, optimistic local
/// mutations, and the push event stream.
pub struct Client<A> {
    api: Arc<A>,
    session_user: UserData,
    context: ClientContext,
    event_receiver: EventReceiver,
    channel_task: Mutex<Option<JoinHandle<()>>>,
}

/// A type passed to various components of the client, to access shared
/// reconciler state and emit events.
#[derive(Clone)]
pub struct ClientContext {
    pub connection: Arc<Mutex<Connection>>,
    pub rooms: Arc<RoomDirectory>,
    pub conversation: Arc<Conversation>,
    pub pending: Arc<PendingMutations>,

    event_sender: EventSender,
}

impl ClientContext {
    pub(crate) fn new() -> (Self, EventReceiver) {
        let (event_sender, event_receiver) = unbounded();

        let context = Self {
            connection: Default::default(),
            rooms: Default::default(),
            conversation: Default::default(),
            pending: Default::default(),
            event_sender,
        };

        (context, event_receiver)
    }

    pub fn emit(&self, event: ClientEvent) {
        self.event_sender.send(event).expect("event is sent");
    }
}

impl<A> Client<A>
where
    A: Api,
{
    /// Creates a client for an authenticated session user
    pub fn new(api: A, session_user: UserData) -> Self {
        let (context, event_receiver) = ClientContext::new();

        Self {
            api: Arc::new(api),
            session_user,
            context,
            event_receiver,
            channel_task: Default::default(),
        }
    }

    /// Opens the duplex channel and starts delivering push events.
    /// At most one channel per client; a closed lifecycle never reopens.
    pub async fn connect(&self, url: &str) -> Result<(), ConnectionError> {
        self.context.connection.lock().begin_connect()?;

        let stream = match connect_async(url).await {
            Ok((stream, _)) => stream,
            Err(err) => {
                close_channel(&self.context);
                return Err(ConnectionError::Open(err.to_string()));
            }
        };

        self.context.connection.lock().mark_open();
        info!("channel open, awaiting identity handshake");

        let task = tokio::spawn(drive_channel(self.context.clone(), stream));
        *self.channel_task.lock() = Some(task);

        Ok(())
    }

    /// Tears the channel down. Terminal; in-flight mutating calls are not
    /// cancelled, but their completions will be discarded.
    pub fn disconnect(&self) {
        if let Some(task) = self.channel_task.lock().take() {
            task.abort();
        }

        close_channel(&self.context);
    }

    /// Seeds the room directory from the server listing snapshot
    pub async fn load_rooms(&self) -> Result<(), ApiError> {
        let listings = self.api.list_rooms().await?;
        self.context.rooms.seed(listings);

        Ok(())
    }

    /// Focuses a room: fetches its snapshot, resets the conversation
    /// working set to the snapshot history, and refreshes the directory's
    /// view of its occupancy
    pub async fn focus_room(&self, room_id: &str) -> Result<(), ApiError> {
        let snapshot = self.api.room_snapshot(room_id).await?;

        self.context
            .conversation
            .focus(&snapshot.room.id, snapshot.conversations.clone());
        self.context.rooms.apply_snapshot(snapshot);

        Ok(())
    }

    /// Creates a room. The HTTP response governs this client's own
    /// optimistic view; the push event is what other clients act on.
    pub async fn create_room(&self, room_name: &str) -> Result<RoomData, ApiError> {
        let key = random_string(16);
        self.context
            .pending
            .begin(MutationKind::CreateRoom, &key, None);

        let new_room = NewRoom {
            room_name: room_name.to_string(),
        };
        let result = self
            .api
            .create_room(new_room, self.bound_conn_id().as_deref())
            .await;

        match result {
            Ok(room) => {
                self.context.pending.confirm(&key);

                if !self.is_torn_down() {
                    let inserted = self.context.rooms.apply_create(
                        room.clone(),
                        vec![self.session_user.clone()],
                        vec![],
                    );

                    if inserted {
                        self.context.emit(ClientEvent::RoomAdded {
                            room_id: room.id.clone(),
                        });
                    }
                }

                Ok(room)
            }
            Err(err) => {
                self.context.pending.fail(&key);
                Err(err)
            }
        }
    }

    /// Deletes a room this user owns
    pub async fn delete_room(&self, room_id: &str) -> Result<(), ApiError> {
        let key = random_string(16);
        self.context
            .pending
            .begin(MutationKind::DeleteRoom, &key, Some(room_id));

        match self.api.delete_room(room_id).await {
            Ok(()) => {
                self.context.pending.confirm(&key);

                if !self.is_torn_down() {
                    self.context.conversation.clear_focus(room_id);

                    if self.context.rooms.apply_delete(room_id) {
                        self.context.emit(ClientEvent::RoomRemoved {
                            room_id: room_id.to_string(),
                        });
                    }
                }

                Ok(())
            }
            Err(err) => {
                self.context.pending.fail(&key);
                Err(err)
            }
        }
    }

    /// Joins a room as the session user
    pub async fn join_room(&self, room_id: &str) -> Result<(), ApiError> {
        let key = random_string(16);
        self.context
            .pending
            .begin(MutationKind::JoinRoom, &key, Some(room_id));

        let result = self
            .api
            .join_room(room_id, self.bound_conn_id().as_deref())
            .await;

        match result {
            Ok(()) => {
                self.context.pending.confirm(&key);

                if !self.is_torn_down() {
                    let joined = self
                        .context
                        .rooms
                        .apply_join(room_id, self.session_user.clone());

                    if joined {
                        self.context.emit(ClientEvent::MemberJoined {
                            room_id: room_id.to_string(),
                            user: self.session_user.clone(),
                        });
                    }
                }

                Ok(())
            }
            Err(err) => {
                self.context.pending.fail(&key);
                Err(err)
            }
        }
    }

    /// Leaves a room, dropping conversation focus if it was the focused one
    pub async fn exit_room(&self, room_id: &str) -> Result<(), ApiError> {
        let key = random_string(16);
        self.context
            .pending
            .begin(MutationKind::ExitRoom, &key, Some(room_id));

        let result = self
            .api
            .exit_room(room_id, self.bound_conn_id().as_deref())
            .await;

        match result {
            Ok(()) => {
                self.context.pending.confirm(&key);

                if !self.is_torn_down() {
                    self.context.conversation.clear_focus(room_id);

                    let exited = self
                        .context
                        .rooms
                        .apply_exit(room_id, &self.session_user.id);

                    if exited {
                        self.context.emit(ClientEvent::MemberExited {
                            room_id: room_id.to_string(),
                            user_id: self.session_user.id.clone(),
                        });
                    }
                }

                Ok(())
            }
            Err(err) => {
                self.context.pending.fail(&key);
                Err(err)
            }
        }
    }

    /// Sends a message optimistically: a provisional entry with a client
    /// temp id is appended immediately and the HTTP response later confirms
    /// it in place, never as a duplicate.
    pub async fn send_message(&self, room_id: &str, text: &str) -> Result<MessageData, ApiError> {
        let temp_id = random_string(21);

        let provisional = MessageData {
            id: temp_id.clone(),
            user_id: self.session_user.id.clone(),
            room_id: room_id.to_string(),
            message: text.to_string(),
            created_at: Utc::now().to_rfc3339(),
        };

        self.context
            .pending
            .begin(MutationKind::SendMessage, &temp_id, Some(room_id));
        self.context.conversation.append_provisional(provisional);

        let new_message = NewMessage {
            room_id: room_id.to_string(),
            message: text.to_string(),
        };
        let result = self
            .api
            .send_message(new_message, self.bound_conn_id().as_deref())
            .await;

        match result {
            Ok(confirmed) => {
                self.context.pending.confirm(&temp_id);

                if self.is_torn_down() {
                    return Ok(confirmed);
                }

                match self.context.conversation.confirm(&temp_id, confirmed.clone()) {
                    ConfirmOutcome::Replaced | ConfirmOutcome::Deduplicated => {
                        self.context.emit(ClientEvent::MessageConfirmed {
                            room_id: room_id.to_string(),
                            temp_id,
                            message: confirmed.clone(),
                        });
                    }
                    ConfirmOutcome::Unknown => {}
                }

                Ok(confirmed)
            }
            Err(err) => {
                self.context.pending.fail(&temp_id);

                if !self.is_torn_down() && self.context.conversation.mark_failed(&temp_id) {
                    self.context.emit(ClientEvent::MessageFailed {
                        room_id: room_id.to_string(),
                        temp_id,
                        reason: err.to_string(),
                    });
                }

                Err(err)
            }
        }
    }

    /// Receive events from the client.
    pub fn wait_for_event(&self) -> ClientEvent {
        self.event_receiver
            .recv()
            .expect("event is received without error")
    }

    /// A receiver of view-layer notifications
    pub fn events(&self) -> EventReceiver {
        self.event_receiver.clone()
    }

    pub fn session_user(&self) -> &UserData {
        &self.session_user
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.context.connection.lock().state()
    }

    pub fn conn_id(&self) -> Option<String> {
        self.bound_conn_id()
    }

    /// All known rooms in stable listing order
    pub fn rooms(&self) -> Vec<Room> {
        self.context.rooms.list()
    }

    pub fn room(&self, room_id: &str) -> Option<Room> {
        self.context.rooms.get(room_id)
    }

    /// The focused conversation's working set, in rendering order
    pub fn conversation(&self) -> Vec<ConversationEntry> {
        self.context.conversation.entries()
    }

    pub fn focused_room(&self) -> Option<String> {
        self.context.conversation.focused_room()
    }

    fn bound_conn_id(&self) -> Option<String> {
        self.context.connection.lock().conn_id().map(str::to_string)
    }

    // Completions that land after teardown must not touch reconciler state
    fn is_torn_down(&self) -> bool {
        self.context.connection.lock().state() == ConnectionState::Closed
    }
}
