use log::debug;
use parking_lot::Mutex;
use parley_protocol::MessageData;

/// Where a conversation entry stands relative to server truth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Locally synthesized, awaiting the server response
    Pending,
    Confirmed,
    /// The send failed. The entry stays visible, flagged, and is not retried.
    Failed,
}

#[derive(Debug, Clone)]
pub struct ConversationEntry {
    pub message: MessageData,
    pub status: EntryStatus,
}

/// The outcome of confirming a provisional entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// The provisional entry was overwritten in place
    Replaced,
    /// The push echo landed first, so the confirmed entry already existed
    /// and the provisional one was dropped instead
    Deduplicated,
    /// No entry carries the temp id, e.g. focus moved to another room
    Unknown,
}

/// Ordered message history for the currently focused room.
///
/// Entries are appended strictly at the tail and never re-sorted by
/// timestamp; insertion order is the source of truth for rendering order.
/// Switching focus resets the working set to the new room's confirmed
/// history.
#[derive(Default)]
pub struct Conversation {
    state: Mutex<ConversationState>,
}

#[derive(Default)]
struct ConversationState {
    room_id: Option<String>,
    entries: Vec<ConversationEntry>,
}

impl Conversation {
    /// Focuses a room, seeding the working set with its confirmed history
    pub fn focus(&self, room_id: &str, history: Vec<MessageData>) {
        let entries = history
            .into_iter()
            .map(|message| ConversationEntry {
                message,
                status: EntryStatus::Confirmed,
            })
            .collect();

        let mut state = self.state.lock();
        state.room_id = Some(room_id.to_string());
        state.entries = entries;
    }

    /// Drops focus if the given room is the focused one. Used when the
    /// focused room is deleted: deletion is terminal, so later message
    /// events for it must find nothing to append to.
    pub fn clear_focus(&self, room_id: &str) -> bool {
        let mut state = self.state.lock();

        if state.room_id.as_deref() != Some(room_id) {
            return false;
        }

        state.room_id = None;
        state.entries.clear();
        true
    }

    pub fn focused_room(&self) -> Option<String> {
        self.state.lock().room_id.clone()
    }

    /// Appends an inbound message at the tail.
    ///
    /// No-op unless the message belongs to the focused room, and always
    /// deduplicated by server id first so the push echo of an
    /// already-confirmed entry is never appended twice.
    pub fn apply_incoming(&self, message: MessageData) -> bool {
        let mut state = self.state.lock();

        if state.room_id.as_deref() != Some(message.room_id.as_str()) {
            debug!("ignoring message for unfocused room {}", message.room_id);
            return false;
        }

        if state.entries.iter().any(|e| e.message.id == message.id) {
            debug!("ignoring duplicate message {}", message.id);
            return false;
        }

        state.entries.push(ConversationEntry {
            message,
            status: EntryStatus::Confirmed,
        });
        true
    }

    /// Appends a provisional entry for an in-flight send
    pub fn append_provisional(&self, message: MessageData) -> bool {
        let mut state = self.state.lock();

        if state.room_id.as_deref() != Some(message.room_id.as_str()) {
            return false;
        }

        state.entries.push(ConversationEntry {
            message,
            status: EntryStatus::Pending,
        });
        true
    }

    /// Overwrites a provisional entry with the server-confirmed one, at the
    /// same position. Called only from the mutation tracker's resolution
    /// path; a raw append must never confirm an in-flight entry.
    pub fn confirm(&self, temp_id: &str, confirmed: MessageData) -> ConfirmOutcome {
        let mut state = self.state.lock();

        if state.entries.iter().any(|e| e.message.id == confirmed.id) {
            state.entries.retain(|e| e.message.id != temp_id);
            return ConfirmOutcome::Deduplicated;
        }

        match state.entries.iter_mut().find(|e| e.message.id == temp_id) {
            Some(entry) => {
                entry.message = confirmed;
                entry.status = EntryStatus::Confirmed;
                ConfirmOutcome::Replaced
            }
            None => ConfirmOutcome::Unknown,
        }
    }

    /// Flags a provisional entry as failed, leaving it visible
    pub fn mark_failed(&self, temp_id: &str) -> bool {
        let mut state = self.state.lock();

        match state.entries.iter_mut().find(|e| e.message.id == temp_id) {
            Some(entry) => {
                entry.status = EntryStatus::Failed;
                true
            }
            None => false,
        }
    }

    /// The working set, in rendering order
    pub fn entries(&self) -> Vec<ConversationEntry> {
        self.state.lock().entries.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str, room_id: &str, text: &str) -> MessageData {
        MessageData {
            id: id.to_string(),
            user_id: "u1".to_string(),
            room_id: room_id.to_string(),
            message: text.to_string(),
            created_at: "2024-05-01T10:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_append_only_for_focused_room() {
        let conversation = Conversation::default();
        conversation.focus("r1", vec![]);

        assert!(conversation.apply_incoming(message("m1", "r1", "hi")));
        assert!(
            !conversation.apply_incoming(message("m2", "r2", "elsewhere")),
            "message for another room is a no-op"
        );
        assert_eq!(conversation.entries().len(), 1);
    }

    #[test]
    fn test_echo_is_deduplicated() {
        let conversation = Conversation::default();
        conversation.focus("r1", vec![message("m1", "r1", "hi")]);

        assert!(
            !conversation.apply_incoming(message("m1", "r1", "hi")),
            "push echo of a confirmed entry is not appended again"
        );
        assert_eq!(conversation.entries().len(), 1);
    }

    #[test]
    fn test_confirm_replaces_in_place() {
        let conversation = Conversation::default();
        conversation.focus("r1", vec![message("m1", "r1", "first")]);
        conversation.append_provisional(message("tmp1", "r1", "second"));
        conversation.apply_incoming(message("m2", "r1", "third"));

        let outcome = conversation.confirm("tmp1", message("s9", "r1", "second"));
        assert_eq!(outcome, ConfirmOutcome::Replaced);

        let entries = conversation.entries();
        let ids: Vec<_> = entries.iter().map(|e| e.message.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["m1", "s9", "m2"],
            "confirmed entry keeps the provisional position"
        );
        assert!(
            entries.iter().all(|e| e.message.id != "tmp1"),
            "temp id is gone"
        );
        assert_eq!(entries[1].status, EntryStatus::Confirmed);
    }

    #[test]
    fn test_confirm_after_echo_drops_provisional() {
        let conversation = Conversation::default();
        conversation.focus("r1", vec![]);
        conversation.append_provisional(message("tmp1", "r1", "hi"));

        // The push echo beat the HTTP response
        conversation.apply_incoming(message("s9", "r1", "hi"));

        let outcome = conversation.confirm("tmp1", message("s9", "r1", "hi"));
        assert_eq!(outcome, ConfirmOutcome::Deduplicated);

        let entries = conversation.entries();
        assert_eq!(entries.len(), 1, "exactly one entry with the server id");
        assert_eq!(entries[0].message.id, "s9");
    }

    #[test]
    fn test_failed_send_stays_visible() {
        let conversation = Conversation::default();
        conversation.focus("r1", vec![]);
        conversation.append_provisional(message("tmp1", "r1", "hi"));

        assert!(conversation.mark_failed("tmp1"));

        let entries = conversation.entries();
        assert_eq!(entries.len(), 1, "entry is not removed");
        assert_eq!(entries[0].status, EntryStatus::Failed);
    }

    #[test]
    fn test_focus_switch_resets_working_set() {
        let conversation = Conversation::default();
        conversation.focus("r1", vec![message("m1", "r1", "hi")]);

        conversation.focus("r2", vec![message("m2", "r2", "yo")]);

        let entries = conversation.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message.room_id, "r2");
        assert_eq!(conversation.focused_room().as_deref(), Some("r2"));
    }

    #[test]
    fn test_clear_focus_only_for_matching_room() {
        let conversation = Conversation::default();
        conversation.focus("r1", vec![message("m1", "r1", "hi")]);

        assert!(!conversation.clear_focus("r2"), "other room leaves focus alone");
        assert!(conversation.clear_focus("r1"));
        assert!(conversation.focused_room().is_none());
        assert!(
            !conversation.apply_incoming(message("m3", "r1", "late")),
            "messages for the deleted room find nothing to append to"
        );
    }
}
