//! Data transfer objects: what peers see of users, rooms and playback.
//!
//! These are plain projections. They are built from room entities by the
//! room crate and never flow back into it.

use serde::{Deserialize, Serialize};

use crate::{FieldErrors, PlayStatus, UserId};

/// File metadata as shown to peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDto {
    pub name: String,
    pub size: u64,
}

/// Full user view: identity plus the file the user is watching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: UserId,
    pub name: String,
    pub file: FileDto,
}

/// Minimal user view, used where the file is irrelevant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserShortDto {
    pub id: UserId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDto {
    pub name: String,
}

/// A room's playback state as broadcast to peers.
///
/// `current_time` is the effective position at projection time, not the
/// raw stored offset. `seek` tells receivers to jump instead of easing
/// towards the new position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayStateDto {
    pub play_state: PlayStatus,
    pub current_time: f64,
    pub seek: bool,
}

/// Payload of `you-joined-room` and `you-reconnected-to-room`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedPayload {
    pub user: UserDto,
    pub room: RoomDto,
    pub play_state: PlayStateDto,
}

/// Payload of every `error-*` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

impl ErrorPayload {
    /// An error with a message only.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fields: None,
        }
    }

    /// An error carrying per-field validation messages.
    pub fn invalid(message: impl Into<String>, fields: FieldErrors) -> Self {
        Self {
            message: message.into(),
            fields: Some(fields),
        }
    }
}
