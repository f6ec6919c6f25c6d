mod room;

use log::debug;
use parking_lot::Mutex;
use parley_protocol::{RoomData, RoomListing, RoomSnapshot, UserData};

pub use room::*;

/// The client-local set of rooms and their occupancy.
///
/// Rooms are kept in insertion order so listing iteration is stable; display
/// ordering beyond that is the view layer's concern. Every apply operation
/// is idempotent under replay of the same event, and events referencing an
/// unknown room are benign no-ops because the directory may legitimately lag
/// a fast create/delete sequence from other clients.
#[derive(Default)]
pub struct RoomDirectory {
    rooms: Mutex<Vec<Room>>,
}

impl RoomDirectory {
    /// Replaces the directory contents with a server room-listing snapshot
    pub fn seed(&self, listings: Vec<RoomListing>) {
        let rooms = listings
            .into_iter()
            .map(|listing| Room::new(listing.room, listing.users, vec![]))
            .collect();

        *self.rooms.lock() = rooms;
    }

    /// Refreshes one room's occupancy from a focused-room snapshot,
    /// inserting the room if the listing hasn't caught up yet
    pub fn apply_snapshot(&self, snapshot: RoomSnapshot) {
        let mut rooms = self.rooms.lock();
        let refreshed = Room::new(snapshot.room, snapshot.users, snapshot.exited_users);

        match rooms.iter_mut().find(|r| r.id() == refreshed.id()) {
            Some(existing) => *existing = refreshed,
            None => rooms.push(refreshed),
        }
    }

    /// Inserts a new room. Returns false if the id is already present, so a
    /// duplicate create event never duplicates the entry.
    pub fn apply_create(
        &self,
        room: RoomData,
        users: Vec<UserData>,
        exited_users: Vec<UserData>,
    ) -> bool {
        let mut rooms = self.rooms.lock();

        if rooms.iter().any(|r| r.id() == room.id) {
            debug!("ignoring create for already known room {}", room.id);
            return false;
        }

        rooms.push(Room::new(room, users, exited_users));
        true
    }

    /// Removes a room. Returns false if it was already gone.
    pub fn apply_delete(&self, room_id: &str) -> bool {
        let mut rooms = self.rooms.lock();
        let before = rooms.len();

        rooms.retain(|r| r.id() != room_id);
        rooms.len() != before
    }

    /// Adds a user to a room's membership set. No-op when the room is
    /// unknown or the user already belongs.
    pub fn apply_join(&self, room_id: &str, user: UserData) -> bool {
        let mut rooms = self.rooms.lock();

        match rooms.iter_mut().find(|r| r.id() == room_id) {
            Some(room) => room.add_member(user),
            None => {
                debug!("ignoring join for unknown room {}", room_id);
                false
            }
        }
    }

    /// Moves a user from a room's membership set to its exited set.
    /// No-op when the room is unknown or the user is not a member.
    pub fn apply_exit(&self, room_id: &str, user_id: &str) -> bool {
        let mut rooms = self.rooms.lock();

        match rooms.iter_mut().find(|r| r.id() == room_id) {
            Some(room) => room.exit_member(user_id),
            None => {
                debug!("ignoring exit for unknown room {}", room_id);
                false
            }
        }
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.lock().iter().any(|r| r.id() == room_id)
    }

    pub fn get(&self, room_id: &str) -> Option<Room> {
        self.rooms.lock().iter().find(|r| r.id() == room_id).cloned()
    }

    /// All rooms, in stable insertion order
    pub fn list(&self) -> Vec<Room> {
        self.rooms.lock().clone()
    }

    pub fn resolve_username(&self, room_id: &str, user_id: &str) -> Option<String> {
        self.rooms
            .lock()
            .iter()
            .find(|r| r.id() == room_id)
            .and_then(|r| r.resolve_username(user_id).map(str::to_string))
    }
}
