use parley_protocol::{RoomData, UserData};

/// A room as observed by this client.
///
/// Occupancy is split into a membership set and an exited set. A user id is
/// in at most one of the two at a time; exited users are never fully
/// discarded so historical message authorship stays resolvable.
#[derive(Debug, Clone)]
pub struct Room {
    pub data: RoomData,
    members: Vec<UserData>,
    exited: Vec<UserData>,
}

impl Room {
    pub fn new(data: RoomData, members: Vec<UserData>, exited: Vec<UserData>) -> Self {
        // Membership wins if the server hands us a user in both sets
        let exited = exited
            .into_iter()
            .filter(|user| !members.iter().any(|m| m.id == user.id))
            .collect();

        Self {
            data,
            members,
            exited,
        }
    }

    pub fn id(&self) -> &str {
        &self.data.id
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m.id == user_id)
    }

    /// Adds a user to the membership set. Returns false if they already
    /// belong, so duplicate join events never duplicate membership.
    /// A rejoin clears the user's prior-exit status.
    pub fn add_member(&mut self, user: UserData) -> bool {
        if self.is_member(&user.id) {
            return false;
        }

        self.exited.retain(|e| e.id != user.id);
        self.members.push(user);

        true
    }

    /// Moves a user from the membership set to the exited set.
    /// Returns false if the user is not a member.
    pub fn exit_member(&mut self, user_id: &str) -> bool {
        let position = match self.members.iter().position(|m| m.id == user_id) {
            Some(position) => position,
            None => return false,
        };

        let user = self.members.remove(position);
        self.exited.push(user);

        true
    }

    /// Resolves a user id to a username, consulting current and historical
    /// occupants alike
    pub fn resolve_username(&self, user_id: &str) -> Option<&str> {
        self.members
            .iter()
            .chain(self.exited.iter())
            .find(|u| u.id == user_id)
            .map(|u| u.username.as_str())
    }

    pub fn members(&self) -> &[UserData] {
        &self.members
    }

    pub fn exited(&self) -> &[UserData] {
        &self.exited
    }
}
