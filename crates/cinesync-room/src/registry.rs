//! The room registry.
//!
//! Two indexes are kept in lockstep: rooms by name, and the room each user
//! is in. A user is in at most one room, and a room exists only while it
//! has at least one member. Every mutating method restores both
//! properties before returning.

use std::collections::HashMap;
use std::time::Instant;

use cinesync_protocol::{PlayStatus, UserId};

use crate::{Room, RoomError, RoomName, User};

/// Result of [`RoomRegistry::add_user`].
#[derive(Debug)]
pub enum JoinOutcome<'a> {
    /// The user was added; the room was created if it did not exist.
    Joined(&'a Room),
    /// The user was already a member of the requested room. Nothing
    /// changed.
    AlreadyInRoom(&'a Room),
    /// The user is a member of a different room, returned here. Nothing
    /// changed; the caller decides whether to [`move_user`].
    ///
    /// [`move_user`]: RoomRegistry::move_user
    InAnotherRoom(&'a Room),
}

/// A user leaving a room.
#[derive(Debug, Clone)]
pub struct Departure {
    /// The user record as it was in the room.
    pub user: User,
    pub room: RoomName,
    /// The user was the last member and the room is gone.
    pub room_closed: bool,
}

/// Result of [`RoomRegistry::move_user`].
#[derive(Debug)]
pub struct Move<'a> {
    /// Where the user was before, if anywhere.
    pub previous: Option<Departure>,
    /// The room the user is in now.
    pub room: &'a Room,
}

/// Authoritative room and membership state.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomName, Room>,
    user_rooms: HashMap<UserId, RoomName>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Puts `user` into `room`, creating the room if needed.
    ///
    /// A user already in a room is left where they are; see
    /// [`JoinOutcome`].
    pub fn add_user(&mut self, user: User, room: RoomName) -> JoinOutcome<'_> {
        let id = user.id();
        if let Some(current) = self.user_rooms.get(&id).cloned() {
            if self.rooms.contains_key(&current) {
                let existing = &self.rooms[&current];
                return if current == room {
                    JoinOutcome::AlreadyInRoom(existing)
                } else {
                    JoinOutcome::InAnotherRoom(existing)
                };
            }
            tracing::warn!(user = %id, room = %current, "stale membership dropped");
            self.user_rooms.remove(&id);
        }

        JoinOutcome::Joined(self.enter(user, room))
    }

    /// Takes `user` out of whatever room it is in and puts it into `room`.
    ///
    /// Never fails. The previous room is destroyed if the user was its
    /// last member, and `room` is created if it does not exist.
    pub fn move_user(&mut self, user: User, room: RoomName) -> Move<'_> {
        let previous = self.remove_user(user.id());
        let room = self.enter(user, room);
        Move { previous, room }
    }

    /// Removes the user from its room, destroying the room if it empties.
    ///
    /// Returns `None` if the user was in no room, so calling it twice is
    /// harmless.
    pub fn remove_user(&mut self, id: UserId) -> Option<Departure> {
        let name = self.user_rooms.remove(&id)?;
        let Some(room) = self.rooms.get_mut(&name) else {
            tracing::warn!(user = %id, room = %name, "membership pointed at missing room");
            return None;
        };
        let Some(user) = room.remove(id) else {
            tracing::warn!(user = %id, room = %name, "user missing from its room");
            return None;
        };

        let room_closed = room.is_empty();
        if room_closed {
            self.rooms.remove(&name);
            tracing::info!(room = %name, "room destroyed");
        }
        tracing::debug!(user = %id, room = %name, "user left room");

        Some(Departure {
            user,
            room: name,
            room_closed,
        })
    }

    /// Overwrites the play state of the user's room. Last write wins.
    ///
    /// # Errors
    /// [`RoomError::NotInAnyRoom`] if the user is in no room.
    pub fn update_play_state(
        &mut self,
        id: UserId,
        status: PlayStatus,
        current_time: f64,
    ) -> Result<&Room, RoomError> {
        let name = self
            .user_rooms
            .get(&id)
            .ok_or(RoomError::NotInAnyRoom(id))?;
        let room = self
            .rooms
            .get_mut(name)
            .ok_or(RoomError::NotInAnyRoom(id))?;

        room.play_state_mut().set(status, current_time, Instant::now());
        tracing::debug!(
            user = %id,
            room = %room.name(),
            status = ?status,
            current_time,
            "play state updated"
        );
        Ok(&*room)
    }

    // Inserts without checking current membership.
    fn enter(&mut self, user: User, name: RoomName) -> &Room {
        let id = user.id();
        self.user_rooms.insert(id, name.clone());
        let room = self.rooms.entry(name).or_insert_with_key(|name| {
            tracing::info!(room = %name, "room created");
            Room::new(name.clone())
        });
        room.insert(user);
        tracing::debug!(user = %id, room = %room.name(), members = room.len(), "user joined room");
        room
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    pub fn find_user_by_id(&self, id: UserId) -> Option<&User> {
        self.find_room_by_user(id)?.user(id)
    }

    pub fn find_room_by_user(&self, id: UserId) -> Option<&Room> {
        let name = self.user_rooms.get(&id)?;
        self.rooms.get(name)
    }

    pub fn room(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name)
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Number of users currently in a room.
    pub fn user_count(&self) -> usize {
        self.user_rooms.len()
    }
}
