//! Server configuration.

use serde::{Deserialize, Serialize};
use stomp_settings::ServerSettings;

/// Configuration for the STOMP TCP server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` picks a free port).
    pub port: u16,
    /// Connections accepted before new sockets are refused.
    pub max_connections: usize,
    /// Per-connection outgoing frame queue.
    pub send_queue_capacity: usize,
    /// Largest accepted incoming frame in bytes, unbounded if `None`.
    pub max_frame_size: Option<usize>,
}

impl ServerConfig {
    /// `host:port` string handed to the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Per-connection limits.
    pub fn limits(&self) -> ConnectionLimits {
        ConnectionLimits {
            send_queue_capacity: self.send_queue_capacity.max(1),
            max_frame_size: self.max_frame_size,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from(&ServerSettings::default())
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            max_connections: settings.max_connections,
            send_queue_capacity: settings.send_queue_capacity,
            max_frame_size: settings.frame_limit(),
        }
    }
}

/// Limits applied to each accepted connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectionLimits {
    /// Outgoing frames buffered before sends are dropped. At least 1.
    pub send_queue_capacity: usize,
    /// Incoming frame cap.
    pub max_frame_size: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_settings() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 7777);
        assert_eq!(cfg.max_connections, 1024);
        assert_eq!(cfg.max_frame_size, Some(1024 * 1024));
        assert_eq!(cfg.bind_addr(), "127.0.0.1:7777");
    }

    #[test]
    fn zero_frame_size_setting_is_unbounded() {
        let settings = ServerSettings {
            max_frame_size: 0,
            ..ServerSettings::default()
        };
        assert_eq!(ServerConfig::from(&settings).max_frame_size, None);
    }

    #[test]
    fn limits_never_zero_capacity() {
        let cfg = ServerConfig {
            send_queue_capacity: 0,
            ..ServerConfig::default()
        };
        assert_eq!(cfg.limits().send_queue_capacity, 1);
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = ServerConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ServerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
