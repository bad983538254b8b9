use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;

mod config;
pub mod plex;
pub mod sync;

pub use config::{default_config_path, locate as locate_config, AppConfig, ConfigError};
use plex::{PlexClient, PlexError, PlexWebSocket};
use sync::{SessionManager, SyncError};

/// Keeps the default audio and subtitle tracks of a season in line with
/// what viewers pick while watching.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
  /// Path to the configuration file
  #[arg(short, long, value_name = "FILE")]
  pub config: Option<PathBuf>,

  /// Log at debug level
  #[arg(short, long)]
  pub debug: bool,
}

/// Errors that stop the service.
#[derive(Debug, Error)]
pub enum AppError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error("Plex server error: {0}")]
  Plex(#[from] PlexError),

  #[error(transparent)]
  Sync(#[from] SyncError),
}

/// Run the service until Ctrl-C or until the notification stream fails.
pub async fn run(cli: Cli) -> Result<(), AppError> {
  let config_path = config::locate(cli.config.as_deref());
  let config = AppConfig::load_from(config_path.as_deref())?;
  init_logging(cli.debug || config.app.debug);
  match &config_path {
    Some(path) => log::info!("Loaded config from {}", path.display()),
    None => log::info!("No config file found, using defaults"),
  }

  let token = config.token()?;
  let client = Arc::new(PlexClient::new(&config.server_url(), token)?);
  let identity = client.connect().await?;

  let websocket = PlexWebSocket::new();
  let events = websocket
    .take_event_receiver()
    .ok_or_else(|| SyncError::Transport("Notification channel already taken".to_string()))?;
  websocket.connect(&client.websocket_url()).await?;

  let manager = SessionManager::new(
    client.clone(),
    config.eviction_policy(),
    config.app.propagation_workers,
  );

  let result = tokio::select! {
    result = manager.run(events) => result,
    _ = tokio::signal::ctrl_c() => {
      log::info!("Received Ctrl-C, shutting down");
      Ok(())
    }
  };

  websocket.disconnect().await;
  log::info!("Disconnected from Plex Server {}", identity.machine_identifier);
  Ok(result?)
}

fn init_logging(debug: bool) {
  let level = if debug {
    log::LevelFilter::Debug
  } else {
    log::LevelFilter::Info
  };
  // RUST_LOG, when set, wins over the configured level.
  let _ = env_logger::Builder::new()
    .filter_level(level)
    .parse_default_env()
    .target(env_logger::Target::Stderr)
    .try_init();
}
