//! # stomp-broker
//!
//! STOMP broker binary: loads settings, picks a credential store, and runs
//! the TCP server until Ctrl-C.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use stomp_auth::{CredentialStore, InMemoryCredentialStore, SqliteCredentialStore};
use stomp_server::{ProtocolContext, ServerConfig, ShutdownCoordinator, StompServer};
use stomp_settings::{BrokerSettings, CredentialSettings};
use tracing::{debug, info, warn};

/// STOMP 1.2 pub/sub broker.
#[derive(Parser, Debug)]
#[command(name = "stomp-broker", about = "STOMP 1.2 pub/sub broker")]
struct Cli {
    /// Settings file (defaults to `~/.stomp/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// `SQLite` user database. Users are kept in memory when unset.
    #[arg(long)]
    users_db: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    /// Overlay explicit flags on loaded settings.
    fn apply(&self, settings: &mut BrokerSettings) {
        if let Some(ref host) = self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(ref path) = self.users_db {
            settings.credentials.database_path = Some(path.to_string_lossy().into_owned());
        }
        if let Some(ref level) = self.log_level {
            settings.logging.level.clone_from(level);
        }
    }
}

/// Defaults, settings file, environment, then CLI flags.
fn resolve_settings(cli: &Cli) -> Result<BrokerSettings> {
    let mut settings = match cli.config {
        Some(ref path) => stomp_settings::load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => stomp_settings::load_settings().context("Failed to load settings")?,
    };
    cli.apply(&mut settings);
    settings.validate().context("Invalid settings")?;
    Ok(settings)
}

fn open_credential_store(settings: &CredentialSettings) -> Result<Arc<dyn CredentialStore>> {
    match settings.database_path.as_deref() {
        Some(path) => {
            let store = SqliteCredentialStore::open(Path::new(path))
                .with_context(|| format!("Failed to open user database: {path}"))?;
            info!(path, "using SQLite credential store");
            Ok(Arc::new(store))
        }
        None => {
            info!("using in-memory credential store");
            Ok(Arc::new(InMemoryCredentialStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = resolve_settings(&cli)?;

    if cli.json_logs {
        stomp_core::logging::init_json_subscriber(&settings.logging.level);
    } else {
        stomp_core::logging::init_subscriber(&settings.logging.level);
    }

    let metrics = stomp_server::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;

    let credentials = open_credential_store(&settings.credentials)?;
    let ctx = ProtocolContext::new(credentials);
    let server = StompServer::bind(ServerConfig::from(&settings.server), ctx)
        .await
        .context("Failed to bind server")?;
    let addr = server.local_addr().context("Failed to read bound address")?;
    info!(
        %addr,
        max_connections = settings.server.max_connections,
        "STOMP broker listening"
    );

    let coordinator = ShutdownCoordinator::new();
    let server_task = tokio::spawn(server.run(coordinator.token()));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    info!("Shutting down...");
    if !coordinator.drain(vec![server_task]).await {
        warn!("connections did not close in time");
    }
    debug!(
        snapshot = %stomp_server::metrics::render(&metrics),
        "final metrics"
    );
    info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stomp_core::ConnectionId;
    use stomp_auth::LoginOutcome;

    #[test]
    fn cli_defaults_leave_settings_alone() {
        let cli = Cli::parse_from(["stomp-broker"]);
        let mut settings = BrokerSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings, BrokerSettings::default());
        assert!(!cli.json_logs);
    }

    #[test]
    fn cli_flags_override_settings() {
        let cli = Cli::parse_from([
            "stomp-broker",
            "--host",
            "0.0.0.0",
            "--port",
            "61613",
            "--users-db",
            "/var/lib/stomp/users.db",
            "--log-level",
            "debug",
            "--json-logs",
        ]);
        let mut settings = BrokerSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 61613);
        assert_eq!(
            settings.credentials.database_path.as_deref(),
            Some("/var/lib/stomp/users.db")
        );
        assert_eq!(settings.logging.level, "debug");
        assert!(cli.json_logs);
    }

    #[test]
    fn cli_rejects_bad_port() {
        assert!(Cli::try_parse_from(["stomp-broker", "--port", "70000"]).is_err());
    }

    #[test]
    fn config_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"server": {"port": 9000, "maxConnections": 8}, "logging": {"level": "warn"}}"#,
        )
        .unwrap();
        let cli = Cli::parse_from([
            "stomp-broker",
            "--config",
            path.to_str().unwrap(),
            "--port",
            "9001",
        ]);

        let settings = resolve_settings(&cli).unwrap();
        assert_eq!(settings.server.max_connections, 8);
        assert_eq!(settings.server.port, 9001);
    }

    #[test]
    fn invalid_config_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        let cli = Cli::parse_from(["stomp-broker", "--config", path.to_str().unwrap()]);

        let err = resolve_settings(&cli).unwrap_err();
        assert!(err.to_string().contains("Failed to load settings"));
    }

    #[test]
    fn empty_log_level_flag_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{}").unwrap();
        let cli = Cli::parse_from([
            "stomp-broker",
            "--config",
            path.to_str().unwrap(),
            "--log-level",
            " ",
        ]);

        let err = resolve_settings(&cli).unwrap_err();
        assert_eq!(err.to_string(), "Invalid settings");
    }

    #[test]
    fn memory_store_without_database_path() {
        let store = open_credential_store(&CredentialSettings::default()).unwrap();
        assert_eq!(
            store.login(ConnectionId::new(1), "alice", "pw"),
            LoginOutcome::AddedNewUser
        );
    }

    #[test]
    fn sqlite_store_with_database_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("users.db");
        let settings = CredentialSettings {
            database_path: Some(path.to_string_lossy().into_owned()),
        };

        let store = open_credential_store(&settings).unwrap();
        assert_eq!(
            store.login(ConnectionId::new(1), "alice", "pw"),
            LoginOutcome::AddedNewUser
        );
        assert!(path.exists());
    }
}
