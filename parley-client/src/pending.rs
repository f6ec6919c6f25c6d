use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Kinds of locally-issued actions awaiting server confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    SendMessage,
    CreateRoom,
    DeleteRoom,
    JoinRoom,
    ExitRoom,
}

/// A locally-generated action that has not been confirmed by the server yet.
///
/// For send-message the correlation key is the client-generated temp id,
/// carried through the outgoing request and matched against the HTTP
/// response. For room actions the key only ties the begin to its own call's
/// completion; the push event is the authoritative signal for other
/// observers.
#[derive(Debug, Clone)]
pub struct PendingMutation {
    pub key: String,
    pub kind: MutationKind,
    pub room_id: Option<String>,
    pub issued_at: DateTime<Utc>,
}

/// Tracks in-flight optimistic mutations, bridging the gap between user
/// intent and server truth.
///
/// This is the only component permitted to convert provisional conversation
/// entries into confirmed ones: callers resolve a record here first, then
/// apply the confirmed value through the conversation's confirm path.
#[derive(Default)]
pub struct PendingMutations {
    records: Mutex<Vec<PendingMutation>>,
}

impl PendingMutations {
    /// Records a pending mutation. The caller renders its provisional value
    /// immediately; the record exists until confirmed or failed.
    pub fn begin(&self, kind: MutationKind, key: &str, room_id: Option<&str>) -> PendingMutation {
        let record = PendingMutation {
            key: key.to_string(),
            kind,
            room_id: room_id.map(str::to_string),
            issued_at: Utc::now(),
        };

        self.records.lock().push(record.clone());
        record
    }

    /// Resolves a pending mutation as confirmed, removing its record
    pub fn confirm(&self, key: &str) -> Option<PendingMutation> {
        self.take(key)
    }

    /// Resolves a pending mutation as failed, removing its record
    pub fn fail(&self, key: &str) -> Option<PendingMutation> {
        self.take(key)
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.records.lock().iter().any(|r| r.key == key)
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    fn take(&self, key: &str) -> Option<PendingMutation> {
        let mut records = self.records.lock();
        let position = records.iter().position(|r| r.key == key)?;

        Some(records.remove(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_and_confirm() {
        let pending = PendingMutations::default();

        pending.begin(MutationKind::SendMessage, "tmp1", Some("r1"));
        assert!(pending.is_pending("tmp1"));

        let record = pending.confirm("tmp1").expect("record exists");
        assert_eq!(record.kind, MutationKind::SendMessage);
        assert_eq!(record.room_id.as_deref(), Some("r1"));
        assert!(!pending.is_pending("tmp1"), "confirm removes the record");
    }

    #[test]
    fn test_resolving_twice_yields_nothing() {
        let pending = PendingMutations::default();
        pending.begin(MutationKind::CreateRoom, "k1", None);

        assert!(pending.fail("k1").is_some());
        assert!(pending.fail("k1").is_none(), "record is gone after the first resolution");
        assert!(pending.confirm("k1").is_none());
    }
}
