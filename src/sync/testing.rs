//! In-memory media server for tests.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::plex::{MediaItem, MediaServer, PlexError};

/// A default stream change recorded by the fake.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Write {
  Audio(i64, i64),
  Subtitle(i64, i64),
  ResetSubtitle(i64),
}

#[derive(Default)]
pub struct FakeServer {
  items: Mutex<Vec<MediaItem>>,
  writes: Mutex<Vec<Write>>,
  failing_fetches: Mutex<HashMap<String, usize>>,
  failing_seasons: Mutex<HashSet<String>>,
  failing_parts: Mutex<HashSet<i64>>,
  fetches: AtomicUsize,
}

impl FakeServer {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&self, item: MediaItem) {
    self.items.lock().push(item);
  }

  pub fn writes(&self) -> Vec<Write> {
    self.writes.lock().clone()
  }

  pub fn fetches(&self) -> usize {
    self.fetches.load(Ordering::SeqCst)
  }

  /// Every fetch of `rating_key` fails.
  pub fn fail_fetch(&self, rating_key: &str) {
    self.failing_fetches.lock().insert(rating_key.to_string(), usize::MAX);
  }

  /// The next `times` fetches of `rating_key` fail.
  pub fn fail_fetch_times(&self, rating_key: &str, times: usize) {
    self.failing_fetches.lock().insert(rating_key.to_string(), times);
  }

  pub fn fail_season(&self, season_rating_key: &str) {
    self.failing_seasons.lock().insert(season_rating_key.to_string());
  }

  pub fn fail_writes_for_part(&self, part_id: i64) {
    self.failing_parts.lock().insert(part_id);
  }

  /// Simulate a viewer picking a stream in their player.
  pub fn select(&self, rating_key: &str, stream_id: i64) {
    let mut items = self.items.lock();
    let Some(item) = items.iter_mut().find(|i| i.rating_key == rating_key) else {
      return;
    };
    for part in item.media.iter_mut().flat_map(|m| m.parts.iter_mut()) {
      let Some(stream_type) = part
        .streams
        .iter()
        .find(|s| s.id == stream_id)
        .map(|s| s.stream_type)
      else {
        continue;
      };
      for stream in part.streams.iter_mut().filter(|s| s.stream_type == stream_type) {
        stream.selected = stream.id == stream_id;
      }
    }
  }

  /// Simulate a viewer turning subtitles off.
  pub fn deselect_subtitles(&self, rating_key: &str) {
    let mut items = self.items.lock();
    if let Some(item) = items.iter_mut().find(|i| i.rating_key == rating_key) {
      for part in item.media.iter_mut().flat_map(|m| m.parts.iter_mut()) {
        for stream in part.streams.iter_mut().filter(|s| s.is_subtitle()) {
          stream.selected = false;
        }
      }
    }
  }

  fn write(&self, part_id: i64, write: Write) -> Result<(), PlexError> {
    if self.failing_parts.lock().contains(&part_id) {
      return Err(PlexError::HttpError(format!("HTTP 500 - part {}", part_id)));
    }
    self.writes.lock().push(write);
    Ok(())
  }
}

impl MediaServer for FakeServer {
  async fn fetch_item(&self, rating_key: &str) -> Result<MediaItem, PlexError> {
    self.fetches.fetch_add(1, Ordering::SeqCst);
    {
      let mut failing = self.failing_fetches.lock();
      if let Some(remaining) = failing.get_mut(rating_key) {
        if *remaining > 0 {
          *remaining = remaining.saturating_sub(1);
          return Err(PlexError::HttpError("HTTP 503 - unavailable".to_string()));
        }
      }
    }
    self
      .items
      .lock()
      .iter()
      .find(|i| i.rating_key == rating_key)
      .cloned()
      .ok_or_else(|| PlexError::NotFound(rating_key.to_string()))
  }

  async fn season_episodes(&self, season_rating_key: &str) -> Result<Vec<MediaItem>, PlexError> {
    if self.failing_seasons.lock().contains(season_rating_key) {
      return Err(PlexError::NotFound(season_rating_key.to_string()));
    }
    // Listings carry no stream details.
    Ok(
      self
        .items
        .lock()
        .iter()
        .filter(|i| i.parent_rating_key.as_deref() == Some(season_rating_key))
        .map(|i| MediaItem {
          media: Vec::new(),
          ..i.clone()
        })
        .collect(),
    )
  }

  async fn set_default_audio_stream(&self, part_id: i64, stream_id: i64) -> Result<(), PlexError> {
    self.write(part_id, Write::Audio(part_id, stream_id))
  }

  async fn set_default_subtitle_stream(&self, part_id: i64, stream_id: i64) -> Result<(), PlexError> {
    self.write(part_id, Write::Subtitle(part_id, stream_id))
  }

  async fn reset_default_subtitle_stream(&self, part_id: i64) -> Result<(), PlexError> {
    self.write(part_id, Write::ResetSubtitle(part_id))
  }
}
