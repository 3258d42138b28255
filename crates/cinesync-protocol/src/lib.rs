//! Wire protocol for cinesync.
//!
//! This crate defines the "language" that watch-party clients and the
//! server speak:
//!
//! - **Frames** ([`InboundFrame`], [`ServerEvent`]): the `{event, data}`
//!   objects that travel on the wire.
//! - **DTOs** ([`UserDto`], [`RoomDto`], [`PlayStateDto`], ...): the
//!   projections of room entities that peers get to see.
//! - **Requests** ([`JoinRoomRequest`], ...): typed inbound payloads, each
//!   with its declarative constraint contract.
//! - **Validation** ([`validate`], [`FieldRule`], [`FieldErrors`]): the
//!   gate that checks raw payloads against those contracts.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how frames become bytes.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the room
//! registry. It doesn't know about connections' lifecycles or rooms' state,
//! only about the shapes of what goes in and out.
//!
//! ```text
//! Transport (bytes) → Protocol (frames, validated requests) → Room registry
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod dto;
mod error;
mod request;
mod types;
mod validate;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::{Codec, JsonCodec};
pub use dto::{
    ErrorPayload, FileDto, JoinedPayload, PlayStateDto, RoomDto, UserDto,
    UserShortDto,
};
pub use error::{ProtocolError, RequestError};
pub use request::{
    ChangePlayStateRequest, FILE_NAME_MAX, FILE_NAME_MIN, FILE_SIZE_MAX, FileInput,
    JoinRoomRequest, MESSAGE_MAX, MESSAGE_MIN, ROOM_NAME_MAX, ROOM_NAME_MIN,
    Request, RoomInput, SendMessageRequest, USER_NAME_MAX, USER_NAME_MIN,
    UserInput, decode_request,
};
pub use types::{ClientEvent, InboundFrame, PlayStatus, ServerEvent, UserId};
pub use validate::{
    Constraint, FieldErrors, FieldRule, Length, Numericality, ValueKind,
    validate,
};
