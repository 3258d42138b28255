//! Per-connection handler: outbound writer plus inbound event loop.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register with the hub → get the connection's outbox
//!   2. Spawn a writer that drains the outbox onto the socket
//!   3. Loop: receive frames → decode → dispatch to the event handler
//!   4. On exit, the guard runs disconnect and unregisters

use std::sync::Arc;

use cinesync_protocol::{Codec, InboundFrame};
use cinesync_transport::{
    Connection, ConnectionId, Outbox, WebSocketConnection,
};

use crate::CinesyncError;
use crate::server::ServerState;

/// Drop guard that removes the connection's user and unregisters it.
///
/// Runs even if the handler panics. Since `Drop` is synchronous, the
/// cleanup is spawned as a fire-and-forget task.
struct ConnectionGuard<C: Codec + Clone> {
    conn_id: ConnectionId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec + Clone> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.events.disconnect(conn_id).await;
            state.events.multicast().unregister(conn_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec + Clone>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), CinesyncError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let outbox = state.events.multicast().register(conn_id).await;
    let _guard = ConnectionGuard {
        conn_id,
        state: Arc::clone(&state),
    };

    // The writer stops once unregister drops the outbox's sender.
    tokio::spawn(write_loop(Arc::clone(&conn), outbox));

    let result = read_loop(&conn, &state).await;

    if let Err(e) = conn.close().await {
        tracing::trace!(%conn_id, error = %e, "close after read loop failed");
    }

    // _guard drops here → disconnect fires.
    result
}

async fn write_loop(conn: Arc<WebSocketConnection>, mut outbox: Outbox) {
    let conn_id = conn.id();
    while let Some(data) = outbox.recv().await {
        if let Err(e) = conn.send(&data).await {
            tracing::debug!(%conn_id, error = %e, "send failed, writer exiting");
            break;
        }
    }
}

async fn read_loop<C: Codec + Clone>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
) -> Result<(), CinesyncError> {
    let conn_id = conn.id();

    loop {
        let received = match state.idle_timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, conn.recv()).await {
                    Ok(received) => received,
                    Err(_) => {
                        tracing::info!(%conn_id, "connection idle, closing");
                        return Ok(());
                    }
                }
            }
            None => conn.recv().await,
        };

        let data = match received {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let frame: InboundFrame = match state.codec.decode(&data) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "skipping undecodable frame");
                continue;
            }
        };

        state.events.dispatch(conn_id, frame).await;
    }
}
