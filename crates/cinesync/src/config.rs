//! Server configuration.
//!
//! Every setting has a default, so an empty environment yields a working
//! server on `0.0.0.0:8000`.

use std::time::Duration;

/// Environment variable for the full bind address (`host:port`).
pub const ENV_BIND: &str = "CINESYNC_BIND";
/// Environment variable for the port alone; binds on all interfaces.
pub const ENV_PORT: &str = "PORT";
/// Environment variable for the idle timeout in whole seconds.
pub const ENV_IDLE_TIMEOUT: &str = "CINESYNC_IDLE_TIMEOUT_SECS";
/// Environment variable for the log filter directive.
pub const ENV_LOG: &str = "CINESYNC_LOG";

const DEFAULT_PORT: u16 = 8000;

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable was set but could not be parsed.
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Settings for a [`CinesyncServer`](crate::CinesyncServer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,
    /// Close connections that send nothing for this long. `None` keeps
    /// idle connections open.
    pub idle_timeout: Option<Duration>,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{DEFAULT_PORT}"),
            idle_timeout: None,
            log_filter: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] if a variable is set to a value
    /// that cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// `CINESYNC_BIND` wins over `PORT`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(addr) = get(ENV_BIND) {
            config.bind_addr = addr;
        } else if let Some(port) = get(ENV_PORT) {
            let port =
                port.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                    key: ENV_PORT,
                    value: port.clone(),
                    reason: e.to_string(),
                })?;
            config.bind_addr = format!("0.0.0.0:{port}");
        }

        if let Some(secs) = get(ENV_IDLE_TIMEOUT) {
            let parsed =
                secs.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                    key: ENV_IDLE_TIMEOUT,
                    value: secs.clone(),
                    reason: e.to_string(),
                })?;
            // Zero disables the timeout.
            config.idle_timeout =
                (parsed > 0).then(|| Duration::from_secs(parsed));
        }

        if let Some(filter) = get(ENV_LOG) {
            config.log_filter = filter;
        }

        Ok(config)
    }
}
