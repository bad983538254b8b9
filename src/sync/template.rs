//! Portable descriptions of the streams a viewer picked.
//!
//! A template records what a stream looks like (codec, language, title,
//! position) rather than which stream it is, so it can be matched against
//! the streams of a different episode.

use super::catalog::{AudioStream, StreamCatalog, SubtitleLocation, SubtitleStream};
use super::error::SyncError;
use crate::plex::MediaItem;

/// Snapshot of a selected audio stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioStreamTemplate {
  /// 1-based position in the combined audio + subtitle list.
  pub all_streams_index: usize,
  /// 1-based position in the audio list.
  pub audio_streams_index: usize,
  pub codec: Option<String>,
  pub channel_layout: Option<String>,
  pub language_code: Option<String>,
  pub title: Option<String>,
}

impl AudioStreamTemplate {
  /// Audio streams lead the combined list, so both indices coincide.
  pub fn new(stream: &AudioStream, audio_streams_index: usize) -> Self {
    Self {
      all_streams_index: audio_streams_index,
      audio_streams_index,
      codec: stream.codec.clone(),
      channel_layout: stream.channel_layout.clone(),
      language_code: stream.language_code.clone(),
      title: stream.title.clone(),
    }
  }
}

/// Snapshot of a selected subtitle stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleStreamTemplate {
  /// 1-based position in the combined audio + subtitle list.
  pub all_streams_index: usize,
  /// 1-based position in the subtitle list.
  pub subtitle_streams_index: usize,
  pub codec: Option<String>,
  pub forced: bool,
  pub language_code: Option<String>,
  pub location: SubtitleLocation,
  pub title: Option<String>,
}

impl SubtitleStreamTemplate {
  pub fn new(
    stream: &SubtitleStream,
    all_streams_index: usize,
    subtitle_streams_index: usize,
  ) -> Self {
    Self {
      all_streams_index,
      subtitle_streams_index,
      codec: stream.codec.clone(),
      forced: stream.forced,
      language_code: stream.language_code.clone(),
      location: stream.location,
      title: stream.title.clone(),
    }
  }
}

/// Audio and subtitle choice of one episode. `subtitle` is `None` when
/// subtitles are off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackTemplates {
  pub audio: AudioStreamTemplate,
  pub subtitle: Option<SubtitleStreamTemplate>,
}

/// Read the currently selected streams of a freshly fetched episode.
///
/// Only the first part of the first media entry is considered.
pub fn extract_templates(episode: &MediaItem) -> Result<TrackTemplates, SyncError> {
  let part = episode
    .parts()
    .first()
    .ok_or_else(|| SyncError::NoMediaPart {
      rating_key: episode.rating_key.clone(),
    })?;
  let catalog = StreamCatalog::from_part(part);

  let (audio_position, audio_stream) =
    catalog
      .selected_audio()
      .ok_or_else(|| SyncError::NoSelectedAudioStream {
        rating_key: episode.rating_key.clone(),
      })?;
  let audio = AudioStreamTemplate::new(audio_stream, audio_position);

  let subtitle = catalog
    .selected_subtitle()
    .map(|(subtitle_position, subtitle_stream)| {
      let all_streams_index = catalog
        .combined_index_of(subtitle_stream.id)
        .unwrap_or(catalog.audio_streams().len() + subtitle_position);
      SubtitleStreamTemplate::new(subtitle_stream, all_streams_index, subtitle_position)
    });

  Ok(TrackTemplates { audio, subtitle })
}

#[cfg(test)]
pub(crate) mod fixtures {
  use crate::plex::{Media, MediaItem, Part, Stream, STREAM_TYPE_AUDIO, STREAM_TYPE_SUBTITLE};

  pub fn audio(id: i64, lang: &str, codec: &str, layout: &str, title: &str) -> Stream {
    Stream {
      id,
      stream_type: STREAM_TYPE_AUDIO,
      index: Some(id as i32),
      codec: Some(codec.to_string()),
      language_code: Some(lang.to_string()),
      audio_channel_layout: Some(layout.to_string()),
      title: (!title.is_empty()).then(|| title.to_string()),
      ..Default::default()
    }
  }

  pub fn subtitle(id: i64, lang: &str, codec: &str, external: bool, forced: bool) -> Stream {
    Stream {
      id,
      stream_type: STREAM_TYPE_SUBTITLE,
      index: if external { None } else { Some(id as i32) },
      codec: Some(codec.to_string()),
      language_code: Some(lang.to_string()),
      forced,
      key: external.then(|| format!("/library/streams/{}", id)),
      ..Default::default()
    }
  }

  pub fn selected(mut stream: Stream) -> Stream {
    stream.selected = true;
    stream
  }

  pub fn episode(rating_key: &str, season_key: &str, index: i32, parts: Vec<Vec<Stream>>) -> MediaItem {
    MediaItem {
      rating_key: rating_key.to_string(),
      item_type: "episode".to_string(),
      title: format!("Episode {}", index),
      parent_rating_key: Some(season_key.to_string()),
      parent_title: Some("Season 1".to_string()),
      grandparent_title: Some("Show".to_string()),
      index: Some(index),
      parent_index: Some(1),
      media: vec![Media {
        id: index as i64 * 100,
        parts: parts
          .into_iter()
          .enumerate()
          .map(|(i, streams)| Part {
            id: index as i64 * 100 + i as i64 + 1,
            streams,
          })
          .collect(),
      }],
    }
  }
}
