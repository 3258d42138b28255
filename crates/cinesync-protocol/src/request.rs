//! Typed inbound requests and their constraint contracts.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    Constraint, FieldRule, PlayStatus, RequestError, ValueKind, validate,
};

// ---------------------------------------------------------------------------
// Length limits, shared with the room entities
// ---------------------------------------------------------------------------

pub const USER_NAME_MIN: usize = 2;
pub const USER_NAME_MAX: usize = 20;
pub const ROOM_NAME_MIN: usize = 2;
pub const ROOM_NAME_MAX: usize = 20;
pub const FILE_NAME_MIN: usize = 3;
pub const FILE_NAME_MAX: usize = 100;
pub const MESSAGE_MIN: usize = 1;
pub const MESSAGE_MAX: usize = 200;

/// Largest accepted file size in bytes: the largest integer every JSON
/// client carries exactly (2^53 - 1).
pub const FILE_SIZE_MAX: u64 = (1 << 53) - 1;

/// A request payload with a declarative validation contract.
pub trait Request: DeserializeOwned {
    /// Rules the raw payload must satisfy before it is deserialized.
    const RULES: &'static [FieldRule];
}

/// Validates `data` against `R::RULES`, then deserializes it.
///
/// # Errors
/// - [`RequestError::Invalid`] with every violated field
/// - [`RequestError::Malformed`] if deserialization still fails
pub fn decode_request<R: Request>(data: Value) -> Result<R, RequestError> {
    validate(&data, R::RULES).map_err(RequestError::Invalid)?;
    serde_json::from_value(data).map_err(RequestError::Malformed)
}

// ---------------------------------------------------------------------------
// join-room
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInput {
    pub name: String,
    #[serde(deserialize_with = "integral_size")]
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInput {
    pub name: String,
    pub file: FileInput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInput {
    pub name: String,
}

/// `{user: {name, file: {name, size}}, room: {name}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoomRequest {
    pub user: UserInput,
    pub room: RoomInput,
}

impl Request for JoinRoomRequest {
    const RULES: &'static [FieldRule] = &[
        FieldRule::new(
            "user",
            Constraint::new().required().kind(ValueKind::Object),
        ),
        FieldRule::new(
            "user.name",
            Constraint::new()
                .required()
                .kind(ValueKind::String)
                .length(USER_NAME_MIN, USER_NAME_MAX),
        ),
        FieldRule::new(
            "user.file",
            Constraint::new().required().kind(ValueKind::Object),
        ),
        FieldRule::new(
            "user.file.name",
            Constraint::new()
                .required()
                .kind(ValueKind::String)
                .length(FILE_NAME_MIN, FILE_NAME_MAX),
        ),
        FieldRule::new(
            "user.file.size",
            Constraint::new()
                .required()
                .kind(ValueKind::Number)
                .integer()
                .at_least(0.0)
                .at_most(FILE_SIZE_MAX as f64),
        ),
        FieldRule::new(
            "room",
            Constraint::new().required().kind(ValueKind::Object),
        ),
        FieldRule::new(
            "room.name",
            Constraint::new()
                .required()
                .kind(ValueKind::String)
                .length(ROOM_NAME_MIN, ROOM_NAME_MAX),
        ),
    ];
}

/// JSON has one number type; `1024.0` is a valid integral size.
fn integral_size<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let n = serde_json::Number::deserialize(d)?;
    n.as_u64()
        .or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f < 2f64.powi(64))
                .map(|f| f as u64)
        })
        .ok_or_else(|| de::Error::custom(format!("invalid file size {n}")))
}

// ---------------------------------------------------------------------------
// change-play-state
// ---------------------------------------------------------------------------

/// `{playState, currentTime, seek?, sync?}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePlayStateRequest {
    pub play_state: PlayStatus,
    pub current_time: f64,
    #[serde(default)]
    pub seek: Option<bool>,
    /// Set by the client's periodic clock sync. A sync updates the room
    /// state but is not broadcast.
    #[serde(default)]
    pub sync: Option<bool>,
}

impl ChangePlayStateRequest {
    pub fn is_seek(&self) -> bool {
        self.seek.unwrap_or(false)
    }

    pub fn is_sync(&self) -> bool {
        self.sync.unwrap_or(false)
    }
}

impl Request for ChangePlayStateRequest {
    const RULES: &'static [FieldRule] = &[
        FieldRule::new(
            "playState",
            Constraint::new()
                .required()
                .kind(ValueKind::String)
                .one_of(&PlayStatus::WIRE_NAMES),
        ),
        FieldRule::new(
            "currentTime",
            Constraint::new()
                .required()
                .kind(ValueKind::Number)
                .at_least(0.0),
        ),
        FieldRule::new("seek", Constraint::new().kind(ValueKind::Boolean)),
        FieldRule::new("sync", Constraint::new().kind(ValueKind::Boolean)),
    ];
}

// ---------------------------------------------------------------------------
// send-message
// ---------------------------------------------------------------------------

/// `{message}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
}

impl Request for SendMessageRequest {
    const RULES: &'static [FieldRule] = &[FieldRule::new(
        "message",
        Constraint::new()
            .required()
            .kind(ValueKind::String)
            .length(MESSAGE_MIN, MESSAGE_MAX),
    )];
}
