//! Plex error types.

use thiserror::Error;

/// Errors that can occur when interacting with Plex.
#[derive(Debug, Error)]
pub enum PlexError {
  #[error("HTTP request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("HTTP error: {0}")]
  HttpError(String),

  #[error("WebSocket error: {0}")]
  WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

  #[error("Invalid server URL: {0}")]
  InvalidUrl(String),

  #[error("Item not found: {0}")]
  NotFound(String),
}
