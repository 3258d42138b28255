//! In-process multicast hub: per-connection outboxes plus named groups.

use std::collections::{HashMap, HashSet};

use tokio::sync::{Mutex, mpsc};

use crate::{ConnectionId, Multicast};

/// Receiving end of a connection's outbound queue.
///
/// The connection's writer task drains it onto the socket.
pub type Outbox = mpsc::UnboundedReceiver<Vec<u8>>;

/// Routes outbound messages to registered connections and groups.
///
/// Sends never wait on the network: each connection owns an unbounded
/// queue, so a slow peer cannot stall a broadcast to the rest of its
/// group.
#[derive(Default)]
pub struct Hub {
    inner: Mutex<HubInner>,
}

#[derive(Default)]
struct HubInner {
    peers: HashMap<ConnectionId, mpsc::UnboundedSender<Vec<u8>>>,
    groups: HashMap<String, HashSet<ConnectionId>>,
}

impl Hub {
    /// Creates an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection and returns its outbox.
    ///
    /// Registering an id again replaces the previous outbox.
    pub async fn register(&self, conn: ConnectionId) -> Outbox {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().await.peers.insert(conn, tx);
        tracing::debug!(%conn, "connection registered");
        rx
    }

    /// Forgets a connection and removes it from every group.
    pub async fn unregister(&self, conn: ConnectionId) {
        let mut inner = self.inner.lock().await;
        inner.peers.remove(&conn);
        inner.groups.retain(|_, members| {
            members.remove(&conn);
            !members.is_empty()
        });
        tracing::debug!(%conn, "connection unregistered");
    }

    /// Returns the members of a group, sorted by id.
    pub async fn group_members(&self, group: &str) -> Vec<ConnectionId> {
        let inner = self.inner.lock().await;
        let mut members: Vec<ConnectionId> = inner
            .groups
            .get(group)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    /// Returns the number of non-empty groups.
    pub async fn group_count(&self) -> usize {
        self.inner.lock().await.groups.len()
    }
}

impl HubInner {
    fn send(&self, conn: ConnectionId, data: Vec<u8>) {
        if let Some(tx) = self.peers.get(&conn) {
            // A closed receiver means the writer task already exited.
            let _ = tx.send(data);
        }
    }
}

impl Multicast for Hub {
    async fn join_group(&self, conn: ConnectionId, group: &str) {
        let mut inner = self.inner.lock().await;
        if !inner.peers.contains_key(&conn) {
            tracing::debug!(%conn, group, "join_group for unknown connection ignored");
            return;
        }
        inner.groups.entry(group.to_owned()).or_default().insert(conn);
    }

    async fn leave_group(&self, conn: ConnectionId, group: &str) {
        let mut inner = self.inner.lock().await;
        if let Some(members) = inner.groups.get_mut(group) {
            members.remove(&conn);
            if members.is_empty() {
                inner.groups.remove(group);
            }
        }
    }

    async fn emit_to(&self, conn: ConnectionId, data: Vec<u8>) {
        self.inner.lock().await.send(conn, data);
    }

    async fn broadcast_except(
        &self,
        group: &str,
        except: ConnectionId,
        data: Vec<u8>,
    ) {
        let inner = self.inner.lock().await;
        let Some(members) = inner.groups.get(group) else {
            return;
        };
        for member in members.iter().filter(|m| **m != except) {
            inner.send(*member, data.clone());
        }
    }
}
