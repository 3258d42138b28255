//! # cinesync
//!
//! Room server for synchronized watch parties.
//!
//! Clients connect over WebSocket, join a named room, and share one
//! playback state (playing, paused or stopped at an offset) plus a chat.
//! The server keeps the authoritative registry of who is in which room
//! and relays every change to the rest of the room.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cinesync::prelude::*;
//!
//! # async fn start() -> Result<(), CinesyncError> {
//! let config = ServerConfig::from_env()?;
//! init_logging(&config.log_filter);
//! let server = CinesyncServer::builder().config(config).build().await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod events;
mod handler;
mod logging;
mod server;

pub use config::{ConfigError, ServerConfig};
pub use error::CinesyncError;
pub use events::{EventHandler, INTERNAL_ERROR, INVALID_REQUEST, NOT_IN_ROOM};
pub use logging::init_logging;
pub use server::{CinesyncServer, CinesyncServerBuilder};

pub mod prelude {
    pub use crate::{
        CinesyncError, CinesyncServer, CinesyncServerBuilder, ConfigError,
        EventHandler, ServerConfig, init_logging,
    };
    pub use cinesync_protocol::{
        ClientEvent, Codec, ErrorPayload, InboundFrame, JsonCodec,
        PlayStatus, ServerEvent, UserId,
    };
    pub use cinesync_room::{RoomRegistry, RoomError};
    pub use cinesync_transport::{ConnectionId, Hub, Multicast};
}
