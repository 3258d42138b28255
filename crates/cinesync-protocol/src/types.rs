//! Core protocol types for cinesync's wire format.
//!
//! Every WebSocket message is a single JSON object with two keys:
//!
//! ```text
//! { "event": "join-room", "data": { ...payload... } }
//! ```
//!
//! Inbound frames keep `data` as raw JSON: the payload has to pass the
//! validation gate before it is turned into a typed request, so that a
//! bad payload can be answered with per-field messages instead of a
//! single serde error.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ErrorPayload, JoinedPayload, PlayStateDto, UserDto, UserShortDto};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Identity of a user: the id of the connection that owns it.
///
/// `#[serde(transparent)]` puts it on the wire as a plain number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// PlayStatus
// ---------------------------------------------------------------------------

/// Playback status shared by everyone in a room.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayStatus {
    Playing,
    Paused,
    #[default]
    Stopped,
}

impl PlayStatus {
    /// Every status as it appears on the wire.
    pub const WIRE_NAMES: [&'static str; 3] = ["PLAYING", "PAUSED", "STOPPED"];
}

impl fmt::Display for PlayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Playing => write!(f, "PLAYING"),
            Self::Paused => write!(f, "PAUSED"),
            Self::Stopped => write!(f, "STOPPED"),
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Events a client may send.
///
/// Disconnect is not listed: it is raised by the transport, never sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClientEvent {
    JoinRoom,
    LeaveRoom,
    ChangePlayState,
    SendMessage,
}

impl fmt::Display for ClientEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::JoinRoom => "join-room",
            Self::LeaveRoom => "leave-room",
            Self::ChangePlayState => "change-play-state",
            Self::SendMessage => "send-message",
        };
        f.write_str(name)
    }
}

/// A frame received from a client, with its payload still unvalidated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundFrame {
    pub event: ClientEvent,

    /// Raw payload. A frame without `data` (e.g. `leave-room`) gets an
    /// empty object.
    #[serde(default = "empty_object")]
    pub data: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Events the server sends.
///
/// `#[serde(tag = "event", content = "data")]` produces the adjacently
/// tagged shape `{ "event": "user-left-room", "data": { "user": ... } }`.
/// `you-*` events go to the originating connection only; `user-*`,
/// `changed-*` and `sent-*` events go to the rest of the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    // -- Membership --
    YouJoinedRoom(JoinedPayload),
    UserJoinedRoom { user: UserDto },
    YouReconnectedToRoom(JoinedPayload),
    UserReconnectedToRoom { user: UserDto },
    YouLeftRoom {},
    UserLeftRoom { user: UserShortDto },

    // -- Playback and chat --
    ChangedPlayState(PlayStateDto),
    SentMessageToRoom { message: String, user: UserShortDto },

    // -- Errors, one per request kind --
    ErrorJoiningRoom(ErrorPayload),
    ErrorLeavingRoom(ErrorPayload),
    ErrorChangingPlayState(ErrorPayload),
    ErrorSendingMessage(ErrorPayload),
}

impl ServerEvent {
    /// Builds the error event that answers a failed `event` request.
    pub fn error_for(event: ClientEvent, payload: ErrorPayload) -> Self {
        match event {
            ClientEvent::JoinRoom => Self::ErrorJoiningRoom(payload),
            ClientEvent::LeaveRoom => Self::ErrorLeavingRoom(payload),
            ClientEvent::ChangePlayState => {
                Self::ErrorChangingPlayState(payload)
            }
            ClientEvent::SendMessage => Self::ErrorSendingMessage(payload),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
