//! The media server seam used by the sync core.

use std::future::Future;

use super::error::PlexError;
use super::types::MediaItem;

/// Read and write access to a media server library.
///
/// Every read goes to the server; implementations must not hand back cached
/// items, since the selected streams of an episode change between calls.
pub trait MediaServer: Send + Sync {
  /// Fetch a single item by rating key, with its media, parts and streams.
  fn fetch_item(
    &self,
    rating_key: &str,
  ) -> impl Future<Output = Result<MediaItem, PlexError>> + Send;

  /// List the episodes of a season, in episode order.
  fn season_episodes(
    &self,
    season_rating_key: &str,
  ) -> impl Future<Output = Result<Vec<MediaItem>, PlexError>> + Send;

  /// Mark an audio stream as the default for a part.
  fn set_default_audio_stream(
    &self,
    part_id: i64,
    stream_id: i64,
  ) -> impl Future<Output = Result<(), PlexError>> + Send;

  /// Mark a subtitle stream as the default for a part.
  fn set_default_subtitle_stream(
    &self,
    part_id: i64,
    stream_id: i64,
  ) -> impl Future<Output = Result<(), PlexError>> + Send;

  /// Turn subtitles off by default for a part.
  fn reset_default_subtitle_stream(
    &self,
    part_id: i64,
  ) -> impl Future<Output = Result<(), PlexError>> + Send;
}
