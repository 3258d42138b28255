//! `CinesyncServer` builder and server loop.
//!
//! This is the entry point for running a cinesync server. It ties
//! together all the layers: transport → protocol → events → room registry.

use std::sync::Arc;
use std::time::Duration;

use cinesync_protocol::{Codec, JsonCodec};
use cinesync_transport::{Hub, Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{CinesyncError, EventHandler, ServerConfig};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec + Clone> {
    pub(crate) events: EventHandler<Hub, C>,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Option<Duration>,
}

/// Builder for configuring and starting a cinesync server.
///
/// # Example
///
/// ```rust,no_run
/// use cinesync::prelude::*;
///
/// # async fn start() -> Result<(), CinesyncError> {
/// let server = CinesyncServer::builder()
///     .bind("127.0.0.1:8000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Default)]
pub struct CinesyncServerBuilder {
    config: ServerConfig,
}

impl CinesyncServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the idle timeout. `None` disables it.
    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Binds the listener and builds the server with [`JsonCodec`].
    pub async fn build(self) -> Result<CinesyncServer, CinesyncError> {
        let transport =
            WebSocketTransport::bind(&self.config.bind_addr).await?;

        let state = Arc::new(ServerState {
            events: EventHandler::new(Hub::new(), JsonCodec),
            codec: JsonCodec,
            idle_timeout: self.config.idle_timeout,
        });

        Ok(CinesyncServer { transport, state })
    }
}

/// A bound cinesync server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct CinesyncServer<C: Codec + Clone = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl CinesyncServer {
    /// Creates a new builder.
    pub fn builder() -> CinesyncServerBuilder {
        CinesyncServerBuilder::new()
    }
}

impl<C: Codec + Clone> CinesyncServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop.
    ///
    /// Spawns a handler task for each connection. Runs until the task is
    /// dropped or the process exits; a failed accept is logged and the
    /// loop continues.
    pub async fn run(mut self) -> Result<(), CinesyncError> {
        tracing::info!("cinesync server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }
    }
}
