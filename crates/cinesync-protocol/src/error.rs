//! Error types for the protocol layer.
//!
//! [`ProtocolError`] is about bytes that could not become frames (or the
//! reverse). [`RequestError`] is about a frame's payload that failed its
//! request contract. The two are kept apart because they are handled
//! differently: a bad frame is skipped, a bad request is answered with an
//! error event naming the offending fields.

use crate::FieldErrors;

/// Errors that can occur while encoding or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, an unknown event name, or a frame
    /// without an `event` field.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}

/// Errors produced when a request payload is checked and decoded.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// One or more fields violate the request's constraint contract.
    #[error("invalid request: {} field(s) rejected", .0.len())]
    Invalid(FieldErrors),

    /// The payload passed validation but still could not be decoded into
    /// the typed request. Indicates a contract that is looser than the
    /// request type.
    #[error("malformed request: {0}")]
    Malformed(#[source] serde_json::Error),
}
