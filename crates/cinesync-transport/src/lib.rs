//! Transport layer for cinesync.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! the network protocol, and the [`Multicast`] trait the room server uses
//! to address connections and named connection groups.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
mod hub;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use hub::{Hub, Outbox};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::future::Future;

/// Opaque identifier for a connection.
///
/// Unique for the lifetime of the process. The room layer uses it as the
/// identity of the user behind the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;
}

/// A single connection that can send and receive bytes.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends data to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next message from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

/// Addressing of connections and named connection groups.
///
/// This is the whole surface the event handlers need from the transport:
/// group membership plus "send to one" and "send to a group but one".
/// Delivery is fire-and-forget; a message for a connection that is already
/// gone is dropped.
///
/// The methods return `Send` futures so handlers generic over the
/// multicast can run inside spawned tasks.
pub trait Multicast: Send + Sync + 'static {
    /// Adds a connection to a group. Joining twice is a no-op.
    fn join_group(
        &self,
        conn: ConnectionId,
        group: &str,
    ) -> impl Future<Output = ()> + Send;

    /// Removes a connection from a group. Unknown members are ignored.
    fn leave_group(
        &self,
        conn: ConnectionId,
        group: &str,
    ) -> impl Future<Output = ()> + Send;

    /// Queues a message for a single connection.
    fn emit_to(
        &self,
        conn: ConnectionId,
        data: Vec<u8>,
    ) -> impl Future<Output = ()> + Send;

    /// Queues a message for every member of `group` except `except`.
    fn broadcast_except(
        &self,
        group: &str,
        except: ConnectionId,
        data: Vec<u8>,
    ) -> impl Future<Output = ()> + Send;
}
