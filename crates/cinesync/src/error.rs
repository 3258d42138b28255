//! Unified error type for cinesync.

use cinesync_protocol::ProtocolError;
use cinesync_room::RoomError;
use cinesync_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impls,
/// so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum CinesyncError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (invalid entity, not in a room).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The configuration could not be read.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use cinesync_protocol::UserId;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "taken");
        let err: CinesyncError = TransportError::BindFailed(io).into();
        assert!(matches!(err, CinesyncError::Transport(_)));
        assert!(err.to_string().contains("taken"));
    }

    #[test]
    fn test_from_protocol_error() {
        let json = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: CinesyncError = ProtocolError::Decode(json).into();
        assert!(matches!(err, CinesyncError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err: CinesyncError = RoomError::NotInAnyRoom(UserId(3)).into();
        assert!(matches!(err, CinesyncError::Room(_)));
        assert!(err.to_string().contains("not in any room"));
    }

    #[test]
    fn test_from_config_error() {
        let err: CinesyncError = ConfigError::Invalid {
            key: "PORT",
            value: "x".into(),
            reason: "not a number".into(),
        }
        .into();
        assert!(matches!(err, CinesyncError::Config(_)));
    }
}
