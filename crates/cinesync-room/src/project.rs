//! Projections from room entities to wire DTOs.

use std::time::Instant;

use cinesync_protocol::{
    FileDto, JoinedPayload, PlayStateDto, RoomDto, UserDto, UserShortDto,
};

use crate::{File, PlayState, Room, User};

impl From<&File> for FileDto {
    fn from(file: &File) -> Self {
        Self {
            name: file.name().to_owned(),
            size: file.size(),
        }
    }
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id(),
            name: user.name().to_owned(),
            file: user.file().into(),
        }
    }
}

impl From<&User> for UserShortDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id(),
            name: user.name().to_owned(),
        }
    }
}

impl From<&Room> for RoomDto {
    fn from(room: &Room) -> Self {
        Self {
            name: room.name().as_str().to_owned(),
        }
    }
}

impl PlayState {
    /// Wire view of this state as of `now`, carrying the effective time.
    pub fn project(&self, seek: bool, now: Instant) -> PlayStateDto {
        PlayStateDto {
            play_state: self.status(),
            current_time: self.effective_time(now),
            seek,
        }
    }
}

/// What a user is told after joining (or re-joining) `room`.
pub fn joined_payload(user: &User, room: &Room, now: Instant) -> JoinedPayload {
    JoinedPayload {
        user: user.into(),
        room: room.into(),
        play_state: room.play_state().project(false, now),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use cinesync_protocol::{PlayStatus, UserId};

    use super::*;
    use crate::RoomName;

    fn alice() -> User {
        let file = File::new("film.mkv", 700).unwrap();
        User::new(UserId(4), "alice", file).unwrap()
    }

    #[test]
    fn test_user_projections() {
        let user = alice();
        let full = UserDto::from(&user);
        assert_eq!(full.id, UserId(4));
        assert_eq!(full.file.name, "film.mkv");
        assert_eq!(full.file.size, 700);

        let short = UserShortDto::from(&user);
        assert_eq!(short.name, "alice");
    }

    #[test]
    fn test_project_uses_effective_time() {
        let t0 = Instant::now();
        let mut state = PlayState::default();
        state.set(PlayStatus::Playing, 100.0, t0);

        let dto = state.project(true, t0 + Duration::from_secs(4));
        assert_eq!(dto.play_state, PlayStatus::Playing);
        assert_eq!(dto.current_time, 104.0);
        assert!(dto.seek);
    }

    #[test]
    fn test_joined_payload_for_fresh_room() {
        let room = Room::new(RoomName::new("r1").unwrap());
        let payload = joined_payload(&alice(), &room, Instant::now());
        assert_eq!(payload.room.name, "r1");
        assert_eq!(payload.user.name, "alice");
        assert_eq!(payload.play_state.play_state, PlayStatus::Stopped);
        assert_eq!(payload.play_state.current_time, 0.0);
        assert!(!payload.play_state.seek);
    }
}
