use std::{
    path::{Path, PathBuf},
    sync::{Arc, LazyLock},
};

use anyhow::Context;
use missive_api::{ApiConfig, ApiServer};
use missive_common::{Signal, audit, audit::AuditConfig, internal, logging};
use missive_delivery::{DeliveryConfig, NotificationService, TransportConfig};
use missive_store::StoreConfig;
use serde::Deserialize;
use tokio::sync::broadcast;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "MISSIVE_CONFIG";

const DEFAULT_CONFIG_PATHS: [&str; 2] = ["./missive.config.ron", "/etc/missive/missive.config.ron"];

/// Top-level service configuration
///
/// Every section is optional; an empty `Missive ()` runs an in-memory store
/// with the log-only transport on `[::]:8000`.
#[derive(Debug, Default, Deserialize)]
pub struct Missive {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

pub static SHUTDOWN_BROADCAST: LazyLock<broadcast::Sender<Signal>> = LazyLock::new(|| {
    let (sender, _receiver) = broadcast::channel(64);
    sender
});

/// Wait for SIGTERM or Ctrl-C, then tell everything to shut down
#[tracing::instrument(level = "trace")]
async fn shutdown() -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            internal!(level = INFO, "CTRL+C entered, shutting down");
        }
        _ = terminate.recv() => {
            internal!(level = INFO, "Terminate Signal received, shutting down");
        }
    };

    SHUTDOWN_BROADCAST
        .send(Signal::Shutdown)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Interrupted, e.to_string()))?;

    Ok(())
}

impl Missive {
    /// Parse a RON configuration
    ///
    /// # Errors
    /// Returns an error if the configuration is not valid RON for this type.
    pub fn from_ron(content: &str) -> anyhow::Result<Self> {
        Ok(ron::from_str(content)?)
    }

    /// Read and parse a RON configuration file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        Self::from_ron(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Build the record store, transport and notification service
    ///
    /// # Errors
    /// Returns an error if the store or transport cannot be set up.
    pub fn service(&self) -> anyhow::Result<NotificationService> {
        let store = self
            .store
            .clone()
            .into_store()
            .context("Failed to initialise record store")?;
        let transport = self
            .transport
            .clone()
            .into_transport()
            .context("Failed to initialise mail transport")?;

        internal!(
            level = INFO,
            "Using {store:?} with {transport:?} (serialize identical sends: {})",
            self.delivery.serialize_identical_sends
        );

        Ok(NotificationService::new(store, transport, &self.delivery))
    }

    /// Run the service until it is told to shut down
    ///
    /// # Errors
    ///
    /// Returns an error if any component fails to initialise, or the API
    /// server fails while running.
    #[tracing::instrument(level = "trace", skip_all, err)]
    pub async fn run(self) -> anyhow::Result<()> {
        logging::init();
        audit::init(self.audit.clone());

        internal!("Controller running");

        let service = Arc::new(self.service()?);
        let server = ApiServer::new(&self.api, service).await?;

        let serve = server.serve(SHUTDOWN_BROADCAST.subscribe());
        tokio::pin!(serve);

        tokio::select! {
            r = &mut serve => {
                internal!(level = ERROR, "API server stopped unexpectedly");
                return r.map_err(Into::into);
            }
            r = shutdown() => r?,
        }

        internal!("Shutting down...");

        // Let in-flight requests finish
        serve.await?;

        Ok(())
    }
}

/// Find the configuration file using the following precedence:
/// 1. An explicit path (`--config`, or `MISSIVE_CONFIG` through clap)
/// 2. ./missive.config.ron (current working directory)
/// 3. /etc/missive/missive.config.ron (system-wide config)
///
/// # Errors
/// Returns an error if an explicit path does not exist, or no default exists.
pub fn find_config_file(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        anyhow::bail!("Config file does not exist: {}", path.display());
    }

    let default_paths = DEFAULT_CONFIG_PATHS.map(PathBuf::from);

    for path in &default_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let paths_tried = default_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    anyhow::bail!(
        "No configuration file found. Tried:\n  - --config / {CONFIG_ENV}\n{paths_tried}"
    )
}
