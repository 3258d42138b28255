//! cinesync server binary.
//!
//! Reads its settings from the environment (and a `.env` file if present),
//! then serves until Ctrl-C.

use cinesync::prelude::*;

#[tokio::main]
async fn main() -> Result<(), CinesyncError> {
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env()?;
    init_logging(&config.log_filter);

    let server = CinesyncServer::builder().config(config).build().await?;
    match server.local_addr() {
        Ok(addr) => tracing::info!(%addr, "listening"),
        Err(e) => tracing::warn!(error = %e, "local address unavailable"),
    }

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            Ok(())
        }
    }
}
