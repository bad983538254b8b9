//! Organized view over the streams of one media part.

use crate::plex::{Part, Stream};

/// Where a subtitle stream lives relative to the video file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleLocation {
  /// Embedded in the container.
  Internal,
  /// Sidecar file next to the video.
  External,
}

impl SubtitleLocation {
  /// Sidecar subtitles carry no container index.
  fn of(stream: &Stream) -> Self {
    match stream.index {
      Some(index) if index >= 0 => SubtitleLocation::Internal,
      _ => SubtitleLocation::External,
    }
  }
}

/// Audio stream snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioStream {
  pub id: i64,
  pub codec: Option<String>,
  pub channel_layout: Option<String>,
  pub language_code: Option<String>,
  pub title: Option<String>,
  pub selected: bool,
}

/// Subtitle stream snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleStream {
  pub id: i64,
  pub codec: Option<String>,
  pub forced: bool,
  pub language_code: Option<String>,
  pub location: SubtitleLocation,
  pub title: Option<String>,
  pub selected: bool,
}

/// Entry of the combined audio + subtitle sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CatalogStream<'a> {
  Audio(&'a AudioStream),
  Subtitle(&'a SubtitleStream),
}

impl CatalogStream<'_> {
  pub fn id(&self) -> i64 {
    match self {
      CatalogStream::Audio(s) => s.id,
      CatalogStream::Subtitle(s) => s.id,
    }
  }
}

/// Audio and subtitle streams of one part, in source order.
///
/// Built from a freshly fetched part every time; never kept around.
#[derive(Debug, Clone)]
pub struct StreamCatalog {
  part_id: i64,
  audio: Vec<AudioStream>,
  subtitles: Vec<SubtitleStream>,
}

impl StreamCatalog {
  /// Organize the streams of a part. Video streams are dropped.
  pub fn from_part(part: &Part) -> Self {
    let audio = part
      .streams
      .iter()
      .filter(|s| s.is_audio())
      .map(|s| AudioStream {
        id: s.id,
        codec: s.codec.clone(),
        channel_layout: s.audio_channel_layout.clone(),
        language_code: s.language_code.clone(),
        title: s.title.clone(),
        selected: s.selected,
      })
      .collect();

    let subtitles = part
      .streams
      .iter()
      .filter(|s| s.is_subtitle())
      .map(|s| SubtitleStream {
        id: s.id,
        codec: s.codec.clone(),
        forced: s.forced,
        language_code: s.language_code.clone(),
        location: SubtitleLocation::of(s),
        title: s.title.clone(),
        selected: s.selected,
      })
      .collect();

    Self {
      part_id: part.id,
      audio,
      subtitles,
    }
  }

  pub fn part_id(&self) -> i64 {
    self.part_id
  }

  pub fn audio_streams(&self) -> &[AudioStream] {
    &self.audio
  }

  pub fn subtitle_streams(&self) -> &[SubtitleStream] {
    &self.subtitles
  }

  pub fn internal_subtitles(&self) -> impl Iterator<Item = &SubtitleStream> {
    self
      .subtitles
      .iter()
      .filter(|s| s.location == SubtitleLocation::Internal)
  }

  pub fn external_subtitles(&self) -> impl Iterator<Item = &SubtitleStream> {
    self
      .subtitles
      .iter()
      .filter(|s| s.location == SubtitleLocation::External)
  }

  /// Audio streams followed by subtitle streams.
  pub fn all_streams(&self) -> impl Iterator<Item = CatalogStream<'_>> {
    self
      .audio
      .iter()
      .map(CatalogStream::Audio)
      .chain(self.subtitles.iter().map(CatalogStream::Subtitle))
  }

  /// 1-based position of a stream in the combined sequence.
  pub fn combined_index_of(&self, stream_id: i64) -> Option<usize> {
    self
      .all_streams()
      .position(|s| s.id() == stream_id)
      .map(|i| i + 1)
  }

  /// Stream at a 1-based combined index.
  pub fn stream_at(&self, index: usize) -> Option<CatalogStream<'_>> {
    index.checked_sub(1).and_then(|i| self.all_streams().nth(i))
  }

  pub fn is_audio_index(&self, index: usize) -> bool {
    index > 0 && index <= self.audio.len()
  }

  pub fn is_subtitle_index(&self, index: usize) -> bool {
    index > self.audio.len() && index <= self.audio.len() + self.subtitles.len()
  }

  /// The audio stream the server reports as selected, with its 1-based list position.
  pub fn selected_audio(&self) -> Option<(usize, &AudioStream)> {
    self
      .audio
      .iter()
      .enumerate()
      .find(|(_, s)| s.selected)
      .map(|(i, s)| (i + 1, s))
  }

  /// The subtitle stream the server reports as selected, with its 1-based list position.
  pub fn selected_subtitle(&self) -> Option<(usize, &SubtitleStream)> {
    self
      .subtitles
      .iter()
      .enumerate()
      .find(|(_, s)| s.selected)
      .map(|(i, s)| (i + 1, s))
  }
}
