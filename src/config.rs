//! Application configuration loaded from TOML with environment overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::sync::EvictionPolicy;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_DIR_NAME: &str = "plex-track-sync";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("Failed to read config file: {0}")]
  Io(#[from] std::io::Error),

  #[error("Failed to parse config file: {0}")]
  Parse(#[from] toml::de::Error),

  #[error("Invalid configuration: {0}")]
  Invalid(String),

  #[error("No Plex token configured, set plex.token or PLEX_API_TOKEN")]
  MissingToken,
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
  #[serde(default)]
  pub plex: PlexConfig,

  #[serde(default)]
  pub app: AppSettings,
}

/// Plex server connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlexConfig {
  /// Server host name or address.
  #[serde(default = "default_host")]
  pub host: String,

  #[serde(default = "default_port")]
  pub port: u16,

  /// X-Plex-Token of the server owner.
  #[serde(default)]
  pub token: Option<String>,

  /// Use https/wss instead of http/ws.
  #[serde(default)]
  pub secure: bool,
}

/// Service behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
  /// Log at debug level.
  #[serde(default)]
  pub debug: bool,

  /// Episodes updated concurrently during a season update.
  #[serde(default = "default_propagation_workers")]
  pub propagation_workers: usize,

  /// Forget clients idle for this many minutes (0 = never).
  #[serde(default = "default_session_idle_minutes")]
  pub session_idle_minutes: u64,

  /// Upper bound on tracked clients (0 = unbounded).
  #[serde(default = "default_max_sessions")]
  pub max_sessions: usize,
}

fn default_host() -> String {
  "127.0.0.1".to_string()
}

fn default_port() -> u16 {
  32400
}

fn default_propagation_workers() -> usize {
  1
}

fn default_session_idle_minutes() -> u64 {
  360
}

fn default_max_sessions() -> usize {
  256
}

impl Default for PlexConfig {
  fn default() -> Self {
    Self {
      host: default_host(),
      port: default_port(),
      token: None,
      secure: false,
    }
  }
}

impl Default for AppSettings {
  fn default() -> Self {
    Self {
      debug: false,
      propagation_workers: default_propagation_workers(),
      session_idle_minutes: default_session_idle_minutes(),
      max_sessions: default_max_sessions(),
    }
  }
}

impl AppConfig {
  /// Load configuration from `path`, or defaults when there is none.
  ///
  /// Environment overrides are applied last. Pick the path with [`locate`].
  pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
    let mut config = match path {
      Some(path) => Self::from_toml_str(&std::fs::read_to_string(path)?)?,
      None => Self::default(),
    };
    config.apply_overrides(|key| std::env::var(key).ok())?;
    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
  }

  pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
    Ok(toml::from_str(content)?)
  }

  /// Apply `PLEX_HOST`, `PLEX_PORT` and `PLEX_API_TOKEN` from `lookup`.
  pub fn apply_overrides(
    &mut self,
    lookup: impl Fn(&str) -> Option<String>,
  ) -> Result<(), ConfigError> {
    if let Some(host) = lookup("PLEX_HOST").filter(|v| !v.trim().is_empty()) {
      self.plex.host = host;
    }
    if let Some(port) = lookup("PLEX_PORT").filter(|v| !v.trim().is_empty()) {
      self.plex.port = port
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("PLEX_PORT is not a port: {}", port)))?;
    }
    if let Some(token) = lookup("PLEX_API_TOKEN").filter(|v| !v.trim().is_empty()) {
      self.plex.token = Some(token);
    }
    Ok(())
  }

  /// Validate configuration values.
  pub fn validate(&self) -> Result<(), String> {
    if self.plex.host.trim().is_empty() {
      return Err("Plex host cannot be empty".to_string());
    }
    if self.plex.port == 0 {
      return Err("Plex port cannot be 0".to_string());
    }
    if self.app.propagation_workers < 1 || self.app.propagation_workers > 32 {
      return Err("Propagation workers must be between 1 and 32".to_string());
    }
    Ok(())
  }

  /// The configured token, which is required to start.
  pub fn token(&self) -> Result<&str, ConfigError> {
    self
      .plex
      .token
      .as_deref()
      .map(str::trim)
      .filter(|t| !t.is_empty())
      .ok_or(ConfigError::MissingToken)
  }

  /// Base URL of the Plex server.
  pub fn server_url(&self) -> String {
    let scheme = if self.plex.secure { "https" } else { "http" };
    format!("{}://{}:{}", scheme, self.plex.host, self.plex.port)
  }

  pub fn eviction_policy(&self) -> EvictionPolicy {
    EvictionPolicy {
      idle_timeout: (self.app.session_idle_minutes > 0)
        .then(|| Duration::from_secs(self.app.session_idle_minutes * 60)),
      max_sessions: (self.app.max_sessions > 0).then_some(self.app.max_sessions),
    }
  }
}

/// Config file in the user config directory.
pub fn default_config_path() -> Option<PathBuf> {
  dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Config file to read: `explicit` when given (it must exist), else
/// `./config.toml`, else the user config directory.
pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
  if let Some(path) = explicit {
    return Some(path.to_path_buf());
  }
  let local = PathBuf::from(CONFIG_FILE_NAME);
  if local.is_file() {
    return Some(local);
  }
  default_config_path().filter(|path| path.is_file())
}
