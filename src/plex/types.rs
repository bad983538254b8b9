//! Plex API types.
//!
//! These types mirror the JSON bodies returned by Plex Media Server
//! (`Accept: application/json`) and the payloads pushed over the
//! notification websocket.

use serde::{Deserialize, Serialize};

/// `streamType` of a video stream.
pub const STREAM_TYPE_VIDEO: i32 = 1;
/// `streamType` of an audio stream.
pub const STREAM_TYPE_AUDIO: i32 = 2;
/// `streamType` of a subtitle stream.
pub const STREAM_TYPE_SUBTITLE: i32 = 3;

/// Top-level envelope of every library response.
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataResponse {
  #[serde(rename = "MediaContainer")]
  pub media_container: MediaContainer,
}

/// Container holding a list of metadata items.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaContainer {
  #[serde(rename = "Metadata", default)]
  pub metadata: Vec<MediaItem>,
}

/// Response from `/identity`.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityResponse {
  #[serde(rename = "MediaContainer")]
  pub media_container: ServerIdentity,
}

/// Server identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerIdentity {
  pub machine_identifier: String,
  #[serde(default)]
  pub version: Option<String>,
}

/// Library item (movie, episode, track, etc.).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
  pub rating_key: String,
  #[serde(rename = "type")]
  pub item_type: String,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub parent_rating_key: Option<String>,
  #[serde(default)]
  pub parent_title: Option<String>,
  #[serde(default)]
  pub grandparent_title: Option<String>,
  #[serde(default)]
  pub index: Option<i32>,
  #[serde(default)]
  pub parent_index: Option<i32>,
  #[serde(rename = "Media", default)]
  pub media: Vec<Media>,
}

/// One encoding of an item.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
  pub id: i64,
  #[serde(rename = "Part", default)]
  pub parts: Vec<Part>,
}

/// A playable file backing a media entry.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
  pub id: i64,
  #[serde(rename = "Stream", default)]
  pub streams: Vec<Stream>,
}

/// Individual stream (video, audio, subtitle).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
  pub id: i64,
  pub stream_type: i32,
  /// Container index. Absent for sidecar subtitle files.
  #[serde(default)]
  pub index: Option<i32>,
  #[serde(default)]
  pub codec: Option<String>,
  #[serde(default)]
  pub language_code: Option<String>,
  #[serde(default)]
  pub audio_channel_layout: Option<String>,
  #[serde(default)]
  pub title: Option<String>,
  #[serde(default)]
  pub selected: bool,
  #[serde(default)]
  pub forced: bool,
  /// Download key, only present on sidecar subtitles.
  #[serde(default)]
  pub key: Option<String>,
}

/// Season an episode belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonRef {
  pub rating_key: String,
  pub title: Option<String>,
  pub show_title: Option<String>,
}

impl std::fmt::Display for SeasonRef {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "{} - {}",
      self.show_title.as_deref().unwrap_or("Unknown"),
      self.title.as_deref().unwrap_or("Unknown season")
    )
  }
}

impl MediaItem {
  /// Check whether this item is a TV episode.
  pub fn is_episode(&self) -> bool {
    self.item_type == "episode"
  }

  /// Season of an episode, if the server reported one.
  pub fn season(&self) -> Option<SeasonRef> {
    let rating_key = self.parent_rating_key.clone()?;
    Some(SeasonRef {
      rating_key,
      title: self.parent_title.clone(),
      show_title: self.grandparent_title.clone(),
    })
  }

  /// Parts of the first media entry.
  pub fn parts(&self) -> &[Part] {
    self
      .media
      .first()
      .map(|m| m.parts.as_slice())
      .unwrap_or(&[])
  }

  /// `S01E02` style episode code.
  pub fn season_episode(&self) -> String {
    format!(
      "S{:02}E{:02}",
      self.parent_index.unwrap_or(0),
      self.index.unwrap_or(0)
    )
  }

  /// Human readable label used in log lines: `S01E02 - Title`.
  pub fn label(&self) -> String {
    format!("{} - {}", self.season_episode(), self.title)
  }
}

impl Stream {
  pub fn is_audio(&self) -> bool {
    self.stream_type == STREAM_TYPE_AUDIO
  }

  pub fn is_subtitle(&self) -> bool {
    self.stream_type == STREAM_TYPE_SUBTITLE
  }
}

/// Websocket envelope pushed by `/:/websockets/notifications`.
#[derive(Debug, Clone, Deserialize)]
pub struct WsMessage {
  #[serde(rename = "NotificationContainer")]
  pub notification_container: Notification,
}

/// Notification container.
#[derive(Debug, Clone, Deserialize)]
pub struct Notification {
  #[serde(rename = "type")]
  pub notification_type: String,
  #[serde(rename = "PlaySessionStateNotification", default)]
  pub play_session_states: Vec<PlaySessionState>,
}

/// Playback state of one client session.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaySessionState {
  pub rating_key: String,
  pub client_identifier: String,
  pub session_key: String,
  #[serde(default)]
  pub state: Option<String>,
  #[serde(default)]
  pub view_offset: Option<i64>,
}

impl Notification {
  /// Check whether this is a playback position update.
  pub fn is_playing(&self) -> bool {
    self.notification_type == "playing"
  }
}
