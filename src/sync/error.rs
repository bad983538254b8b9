//! Errors raised while processing a playback event.

use thiserror::Error;

use crate::plex::PlexError;

/// Errors surfaced by the sync core.
///
/// A stream with no counterpart in another episode is not an error; the
/// matcher reports it as `None`.
#[derive(Debug, Error)]
pub enum SyncError {
  #[error("Media source unavailable: {0}")]
  SourceUnavailable(#[from] PlexError),

  #[error("Episode {rating_key} has no selected audio stream")]
  NoSelectedAudioStream { rating_key: String },

  #[error("Episode {rating_key} has no playable media part")]
  NoMediaPart { rating_key: String },

  #[error("Notification transport failed: {0}")]
  Transport(String),
}
