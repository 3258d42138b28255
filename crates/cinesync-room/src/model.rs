//! Entities owned by the registry.
//!
//! Constructors check the same length limits as the request contracts,
//! so an entity that exists is always valid regardless of how it was
//! built.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use cinesync_protocol::{
    FILE_NAME_MAX, FILE_NAME_MIN, PlayStatus, ROOM_NAME_MAX, ROOM_NAME_MIN,
    USER_NAME_MAX, USER_NAME_MIN, UserId,
};

use crate::RoomError;

fn check_len(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), RoomError> {
    let len = value.chars().count();
    if (min..=max).contains(&len) {
        Ok(())
    } else {
        Err(RoomError::InvalidField {
            field,
            reason: format!("length {len} outside {min}..={max}"),
        })
    }
}

// ---------------------------------------------------------------------------
// RoomName
// ---------------------------------------------------------------------------

/// A room's unique key, 2–20 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomName(String);

impl RoomName {
    pub fn new(name: impl Into<String>) -> Result<Self, RoomError> {
        let name = name.into();
        check_len("room name", &name, ROOM_NAME_MIN, ROOM_NAME_MAX)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for RoomName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// File / User
// ---------------------------------------------------------------------------

/// Metadata of the media file a user is watching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    name: String,
    size: u64,
}

impl File {
    pub fn new(name: impl Into<String>, size: u64) -> Result<Self, RoomError> {
        let name = name.into();
        check_len("file name", &name, FILE_NAME_MIN, FILE_NAME_MAX)?;
        Ok(Self { name, size })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// A connected participant.
///
/// The id is the id of the owning connection. A user is always created
/// by a join, which always declares a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    name: String,
    file: File,
}

impl User {
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        file: File,
    ) -> Result<Self, RoomError> {
        let name = name.into();
        check_len("user name", &name, USER_NAME_MIN, USER_NAME_MAX)?;
        Ok(Self { id, name, file })
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file(&self) -> &File {
        &self.file
    }
}

// ---------------------------------------------------------------------------
// PlayState
// ---------------------------------------------------------------------------

/// A room's shared playback clock.
///
/// `current_time` is the media offset (seconds) at the moment of the last
/// change, `updated_at` is when that change happened on the server.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayState {
    status: PlayStatus,
    current_time: f64,
    updated_at: Instant,
}

impl PlayState {
    pub fn status(&self) -> PlayStatus {
        self.status
    }

    /// Offset recorded at the last change.
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn updated_at(&self) -> Instant {
        self.updated_at
    }

    /// Offset the media should be at by `now`.
    ///
    /// Only a playing room advances; paused and stopped rooms stay at the
    /// recorded offset. A `now` earlier than `updated_at` counts as no
    /// time elapsed.
    pub fn effective_time(&self, now: Instant) -> f64 {
        match self.status {
            PlayStatus::Playing => {
                self.current_time
                    + now.saturating_duration_since(self.updated_at).as_secs_f64()
            }
            PlayStatus::Paused | PlayStatus::Stopped => self.current_time,
        }
    }

    pub(crate) fn set(
        &mut self,
        status: PlayStatus,
        current_time: f64,
        now: Instant,
    ) {
        self.status = status;
        self.current_time = current_time;
        self.updated_at = now;
    }
}

impl Default for PlayState {
    /// Stopped at the beginning.
    fn default() -> Self {
        Self {
            status: PlayStatus::Stopped,
            current_time: 0.0,
            updated_at: Instant::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// A named group of users sharing one playback state.
#[derive(Debug, Clone)]
pub struct Room {
    name: RoomName,
    users: HashMap<UserId, User>,
    play_state: PlayState,
}

impl Room {
    pub(crate) fn new(name: RoomName) -> Self {
        Self {
            name,
            users: HashMap::new(),
            play_state: PlayState::default(),
        }
    }

    pub fn name(&self) -> &RoomName {
        &self.name
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn contains(&self, id: UserId) -> bool {
        self.users.contains_key(&id)
    }

    /// Members in no particular order.
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn play_state(&self) -> &PlayState {
        &self.play_state
    }

    pub(crate) fn play_state_mut(&mut self) -> &mut PlayState {
        &mut self.play_state
    }

    pub(crate) fn insert(&mut self, user: User) {
        self.users.insert(user.id(), user);
    }

    pub(crate) fn remove(&mut self, id: UserId) -> Option<User> {
        self.users.remove(&id)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_room_name_limits() {
        assert!(RoomName::new("a").is_err());
        assert!(RoomName::new("ab").is_ok());
        assert!(RoomName::new("x".repeat(20)).is_ok());
        assert!(RoomName::new("x".repeat(21)).is_err());
    }

    #[test]
    fn test_file_name_limits() {
        assert!(File::new("ab", 1).is_err());
        assert!(File::new("abc", 0).is_ok());
        assert!(File::new("x".repeat(101), 1).is_err());
    }

    #[test]
    fn test_user_name_limits() {
        let file = File::new("film.mkv", 1).unwrap();
        assert!(User::new(UserId(1), "a", file.clone()).is_err());
        let err = User::new(UserId(1), "x".repeat(21), file.clone()).unwrap_err();
        assert!(err.to_string().contains("user name"));
        let user = User::new(UserId(1), "alice", file).unwrap();
        assert_eq!(user.name(), "alice");
        assert_eq!(user.file().name(), "film.mkv");
    }

    #[test]
    fn test_play_state_default_is_stopped_at_zero() {
        let state = PlayState::default();
        assert_eq!(state.status(), PlayStatus::Stopped);
        assert_eq!(state.current_time(), 0.0);
    }

    #[test]
    fn test_effective_time_advances_only_while_playing() {
        let t0 = Instant::now();
        let later = t0 + Duration::from_millis(2500);
        let mut state = PlayState::default();

        state.set(PlayStatus::Playing, 10.0, t0);
        assert_eq!(state.effective_time(later), 12.5);

        state.set(PlayStatus::Paused, 10.0, t0);
        assert_eq!(state.effective_time(later), 10.0);

        state.set(PlayStatus::Stopped, 0.0, t0);
        assert_eq!(state.effective_time(later), 0.0);
    }

    #[test]
    fn test_effective_time_ignores_clock_before_update() {
        let t0 = Instant::now() + Duration::from_secs(5);
        let mut state = PlayState::default();
        state.set(PlayStatus::Playing, 3.0, t0);
        assert_eq!(state.effective_time(Instant::now()), 3.0);
    }
}
