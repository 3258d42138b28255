//! Room and user registry for cinesync.
//!
//! The registry is the single source of truth for who is in which room
//! and for each room's shared playback state. It is a plain synchronous
//! structure; callers serialize access to it (the server keeps it behind
//! one async mutex).
//!
//! # Key types
//!
//! - [`RoomRegistry`]: join / move / leave / play-state transitions
//! - [`JoinOutcome`]: result of a join: joined, already there, or
//!   in another room
//! - [`Room`], [`User`], [`File`], [`PlayState`]: the entities it owns
//! - [`RoomName`]: a validated room key

mod error;
mod model;
mod project;
mod registry;

pub use error::RoomError;
pub use model::{File, PlayState, Room, RoomName, User};
pub use project::joined_payload;
pub use registry::{Departure, JoinOutcome, Move, RoomRegistry};
