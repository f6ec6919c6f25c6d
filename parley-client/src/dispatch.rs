use parley_protocol::PushEvent;

use crate::{ClientContext, ClientEvent};

/// Routes one decoded push event to the reconciler that owns its state.
///
/// Events are handled strictly in arrival order and never reordered here.
/// Every arm is robust to events for unknown or already-removed rooms, and
/// no-op reconciliations emit nothing.
pub(crate) fn dispatch(context: &ClientContext, event: PushEvent) {
    match event {
        PushEvent::Init { conn_id } => {
            if context.connection.lock().bind(&conn_id) {
                context.emit(ClientEvent::IdentityBound { conn_id });
            }
        }
        PushEvent::Message(message) => {
            let room_id = message.room_id.clone();

            if context.conversation.apply_incoming(message.clone()) {
                context.emit(ClientEvent::MessageAppended { room_id, message });
            }
        }
        PushEvent::CreateRoom {
            room,
            users,
            // History only matters once the room is focused, which pulls
            // its own snapshot
            conversations: _,
            exited_users,
        } => {
            let room_id = room.id.clone();

            if context.rooms.apply_create(room, users, exited_users) {
                context.emit(ClientEvent::RoomAdded { room_id });
            }
        }
        PushEvent::DeleteRoom { room_id } => {
            // Terminal for the room: a focused conversation is torn down so
            // later message events for this id find nothing to append to
            context.conversation.clear_focus(&room_id);

            if context.rooms.apply_delete(&room_id) {
                context.emit(ClientEvent::RoomRemoved { room_id });
            }
        }
        PushEvent::JoinRoom { room_id, user } => {
            if context.rooms.apply_join(&room_id, user.clone()) {
                context.emit(ClientEvent::MemberJoined { room_id, user });
            }
        }
        PushEvent::ExitRoom { room_id, user_id } => {
            if context.rooms.apply_exit(&room_id, &user_id) {
                context.emit(ClientEvent::MemberExited { room_id, user_id });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use parley_protocol::{MessageData, RoomData, UserData};

    use super::*;
    use crate::{ConnectionState, EventReceiver};

    fn context() -> (ClientContext, EventReceiver) {
        ClientContext::new()
    }

    fn user(id: &str, username: &str) -> UserData {
        UserData {
            id: id.to_string(),
            username: username.to_string(),
        }
    }

    fn room_data(id: &str) -> RoomData {
        RoomData {
            id: id.to_string(),
            name: "general".to_string(),
            owner_id: "u1".to_string(),
            last_message: String::new(),
            created_at: "2024-05-01T10:00:00Z".to_string(),
        }
    }

    fn create_room_event(id: &str) -> PushEvent {
        PushEvent::CreateRoom {
            room: room_data(id),
            users: vec![user("u1", "mira")],
            conversations: vec![],
            exited_users: vec![],
        }
    }

    #[test]
    fn test_init_binds_identity_once() {
        let (context, events) = context();
        context.connection.lock().begin_connect().expect("attach");
        context.connection.lock().mark_open();

        dispatch(
            &context,
            PushEvent::Init {
                conn_id: "c-1".to_string(),
            },
        );
        dispatch(
            &context,
            PushEvent::Init {
                conn_id: "c-2".to_string(),
            },
        );

        let connection = context.connection.lock();
        assert_eq!(connection.state(), ConnectionState::Identified);
        assert_eq!(connection.conn_id(), Some("c-1"));

        assert!(
            matches!(events.try_recv(), Ok(ClientEvent::IdentityBound { conn_id }) if conn_id == "c-1")
        );
        assert!(
            events.try_recv().is_err(),
            "ignored rebind emits nothing"
        );
    }

    #[test]
    fn test_duplicate_create_emits_once() {
        let (context, events) = context();

        dispatch(&context, create_room_event("r1"));
        dispatch(&context, create_room_event("r1"));

        assert_eq!(context.rooms.list().len(), 1);
        assert!(matches!(events.try_recv(), Ok(ClientEvent::RoomAdded { .. })));
        assert!(events.try_recv().is_err(), "replayed create emits nothing");
    }

    #[test]
    fn test_delete_tears_down_focused_conversation() {
        let (context, events) = context();

        dispatch(&context, create_room_event("r1"));
        context.conversation.focus("r1", vec![]);
        let _ = events.try_recv();

        dispatch(
            &context,
            PushEvent::DeleteRoom {
                room_id: "r1".to_string(),
            },
        );

        assert!(context.conversation.focused_room().is_none());
        assert!(matches!(events.try_recv(), Ok(ClientEvent::RoomRemoved { .. })));

        // Terminal: events referencing the id are no-ops now
        dispatch(
            &context,
            PushEvent::JoinRoom {
                room_id: "r1".to_string(),
                user: user("u2", "oli"),
            },
        );
        dispatch(
            &context,
            PushEvent::Message(MessageData {
                id: "m1".to_string(),
                user_id: "u2".to_string(),
                room_id: "r1".to_string(),
                message: "too late".to_string(),
                created_at: "2024-05-01T10:00:00Z".to_string(),
            }),
        );

        assert!(context.rooms.list().is_empty(), "directory unchanged");
        assert!(events.try_recv().is_err(), "no-ops emit nothing");
    }

    #[test]
    fn test_membership_events_round_trip() {
        let (context, events) = context();
        dispatch(&context, create_room_event("r1"));
        let _ = events.try_recv();

        dispatch(
            &context,
            PushEvent::JoinRoom {
                room_id: "r1".to_string(),
                user: user("u2", "oli"),
            },
        );
        dispatch(
            &context,
            PushEvent::ExitRoom {
                room_id: "r1".to_string(),
                user_id: "u2".to_string(),
            },
        );

        assert!(matches!(events.try_recv(), Ok(ClientEvent::MemberJoined { .. })));
        assert!(matches!(events.try_recv(), Ok(ClientEvent::MemberExited { .. })));
        assert_eq!(
            context.rooms.resolve_username("r1", "u2").as_deref(),
            Some("oli"),
            "exited member remains resolvable"
        );
    }
}
