//! Settings types with compiled defaults.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Default frame size cap (1 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Root settings object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrokerSettings {
    /// Listener and per-connection limits.
    pub server: ServerSettings,
    /// Log output.
    pub logging: LoggingSettings,
    /// Credential store selection.
    pub credentials: CredentialSettings,
}

impl BrokerSettings {
    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.server.max_connections == 0 {
            return Err(SettingsError::InvalidValue(
                "server.maxConnections must be at least 1".into(),
            ));
        }
        if self.server.send_queue_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "server.sendQueueCapacity must be at least 1".into(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(SettingsError::InvalidValue("logging.level is empty".into()));
        }
        Ok(())
    }
}

/// Listener and per-connection limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Simultaneous connections accepted before new sockets are refused.
    pub max_connections: usize,
    /// Outgoing frames buffered per connection before sends are dropped.
    pub send_queue_capacity: usize,
    /// Largest accepted incoming frame in bytes. `0` disables the cap.
    pub max_frame_size: usize,
}

impl ServerSettings {
    /// Frame cap as an option, `None` when unbounded.
    pub fn frame_limit(&self) -> Option<usize> {
        (self.max_frame_size > 0).then_some(self.max_frame_size)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7777,
            max_connections: 1024,
            send_queue_capacity: 1024,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter level when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Credential store selection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CredentialSettings {
    /// `SQLite` database path. `None` keeps users in memory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,
}
