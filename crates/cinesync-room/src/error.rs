//! Error types for the room layer.

use cinesync_protocol::UserId;

/// Errors that can occur during room operations.
///
/// Join conflicts are not errors: they are reported through
/// [`JoinOutcome`](crate::JoinOutcome).
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The user is not a member of any room.
    #[error("user {0} is not in any room")]
    NotInAnyRoom(UserId),

    /// An entity could not be built because a field violates its limits.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },
}
