//! Best-match search for a template among the streams of another episode.
//!
//! Strategy: exact title + language shortcut, then additive scoring over
//! candidates sharing the template's language. Candidates in another language
//! are never returned. Equal scores keep the earliest candidate.

use super::catalog::{AudioStream, StreamCatalog, SubtitleStream};
use super::template::{AudioStreamTemplate, SubtitleStreamTemplate};

/// Title equality only counts when the candidate actually has a title.
fn same_title(candidate: &Option<String>, template: &Option<String>) -> bool {
  match candidate.as_deref() {
    Some(title) if !title.is_empty() => template.as_deref() == Some(title),
    _ => false,
  }
}

/// Keep the first candidate that reaches the highest score.
fn best_scored<'a, T>(scored: impl Iterator<Item = (u32, &'a T)>) -> Option<&'a T> {
  let mut leader: Option<(u32, &'a T)> = None;
  for (score, candidate) in scored {
    match leader {
      Some((best, _)) if score <= best => {}
      _ => leader = Some((score, candidate)),
    }
  }
  leader.map(|(_, candidate)| candidate)
}

fn audio_score(position: usize, stream: &AudioStream, template: &AudioStreamTemplate) -> u32 {
  let mut score = 0;
  if stream.codec == template.codec && stream.channel_layout == template.channel_layout {
    score += 1;
  }
  if position == template.audio_streams_index {
    score += 1;
  }
  score
}

fn subtitle_score(
  position: usize,
  stream: &SubtitleStream,
  template: &SubtitleStreamTemplate,
) -> u32 {
  let mut score = 0;
  if stream.codec == template.codec {
    score += 1;
  }
  if stream.location == template.location {
    score += 1;
  }
  if stream.forced == template.forced {
    score += 1;
  }
  if position == template.subtitle_streams_index {
    score += 1;
  }
  score
}

/// Find the audio stream in `catalog` closest to `template`.
pub fn match_audio<'a>(
  catalog: &'a StreamCatalog,
  template: &AudioStreamTemplate,
) -> Option<&'a AudioStream> {
  let streams = catalog.audio_streams();

  if let Some(exact) = streams.iter().find(|s| {
    same_title(&s.title, &template.title) && s.language_code == template.language_code
  }) {
    return Some(exact);
  }

  best_scored(
    streams
      .iter()
      .enumerate()
      .filter(|(_, s)| s.language_code == template.language_code)
      .map(|(i, s)| (audio_score(i + 1, s, template), s)),
  )
}

/// Find the subtitle stream in `catalog` closest to `template`.
pub fn match_subtitle<'a>(
  catalog: &'a StreamCatalog,
  template: &SubtitleStreamTemplate,
) -> Option<&'a SubtitleStream> {
  let streams = catalog.subtitle_streams();

  if let Some(exact) = streams.iter().find(|s| {
    same_title(&s.title, &template.title) && s.language_code == template.language_code
  }) {
    return Some(exact);
  }

  best_scored(
    streams
      .iter()
      .enumerate()
      .filter(|(_, s)| s.language_code == template.language_code)
      .map(|(i, s)| (subtitle_score(i + 1, s, template), s)),
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::plex::{Part, Stream};
  use crate::sync::catalog::SubtitleLocation;
  use crate::sync::template::fixtures::{audio, subtitle};

  fn catalog(streams: Vec<Stream>) -> StreamCatalog {
    StreamCatalog::from_part(&Part {
      id: 1,
      streams,
    })
  }

  fn audio_template(lang: &str, codec: &str, layout: &str, title: &str, index: usize) -> AudioStreamTemplate {
    AudioStreamTemplate {
      all_streams_index: index,
      audio_streams_index: index,
      codec: Some(codec.to_string()),
      channel_layout: Some(layout.to_string()),
      language_code: Some(lang.to_string()),
      title: (!title.is_empty()).then(|| title.to_string()),
    }
  }

  fn subtitle_template(lang: &str, codec: &str, external: bool, forced: bool, index: usize) -> SubtitleStreamTemplate {
    SubtitleStreamTemplate {
      all_streams_index: index + 1,
      subtitle_streams_index: index,
      codec: Some(codec.to_string()),
      forced,
      language_code: Some(lang.to_string()),
      location: if external {
        SubtitleLocation::External
      } else {
        SubtitleLocation::Internal
      },
      title: None,
    }
  }

  #[test]
  fn test_exact_title_wins_over_score() {
    let catalog = catalog(vec![
      audio(1, "eng", "ac3", "5.1", ""),
      audio(2, "eng", "aac", "stereo", "Commentary"),
    ]);
    // Stream 1 scores 2 (codec+layout, position); stream 2 only matches by title.
    let template = audio_template("eng", "ac3", "5.1", "Commentary", 1);
    assert_eq!(match_audio(&catalog, &template).map(|s| s.id), Some(2));
  }

  #[test]
  fn test_exact_title_requires_same_language() {
    let catalog = catalog(vec![
      audio(1, "jpn", "aac", "stereo", "Main"),
      audio(2, "eng", "flac", "mono", ""),
    ]);
    let template = audio_template("eng", "aac", "stereo", "Main", 1);
    assert_eq!(match_audio(&catalog, &template).map(|s| s.id), Some(2));
  }

  #[test]
  fn test_empty_titles_never_shortcut() {
    let catalog = catalog(vec![
      audio(1, "eng", "aac", "stereo", ""),
      audio(2, "eng", "ac3", "5.1", ""),
    ]);
    let mut template = audio_template("eng", "ac3", "5.1", "", 2);
    template.title = Some(String::new());
    assert_eq!(match_audio(&catalog, &template).map(|s| s.id), Some(2));
  }

  #[test]
  fn test_language_gate() {
    let catalog = catalog(vec![
      audio(1, "jpn", "ac3", "5.1", ""),
      audio(2, "eng", "aac", "stereo", ""),
    ]);
    // Stream 1 would score 2 but has the wrong language.
    let template = audio_template("eng", "ac3", "5.1", "", 1);
    assert_eq!(match_audio(&catalog, &template).map(|s| s.id), Some(2));
  }

  #[test]
  fn test_no_eligible_candidate() {
    let catalog = catalog(vec![audio(1, "jpn", "aac", "stereo", "")]);
    let template = audio_template("eng", "aac", "stereo", "", 1);
    assert!(match_audio(&catalog, &template).is_none());

    let empty = catalog_without_streams();
    assert!(match_audio(&empty, &template).is_none());
  }

  fn catalog_without_streams() -> StreamCatalog {
    catalog(Vec::new())
  }

  #[test]
  fn test_ties_keep_earliest() {
    let catalog = catalog(vec![
      audio(1, "eng", "aac", "stereo", ""),
      audio(2, "eng", "aac", "stereo", ""),
    ]);
    // Both score 1 (codec+layout), neither sits at position 3.
    let template = audio_template("eng", "aac", "stereo", "", 3);
    assert_eq!(match_audio(&catalog, &template).map(|s| s.id), Some(1));
  }

  #[test]
  fn test_language_match_alone_is_enough() {
    let catalog = catalog(vec![
      audio(1, "jpn", "aac", "stereo", ""),
      audio(2, "eng", "dts", "7.1", ""),
    ]);
    let template = audio_template("eng", "aac", "stereo", "", 1);
    assert_eq!(match_audio(&catalog, &template).map(|s| s.id), Some(2));
  }

  #[test]
  fn test_codec_needs_matching_layout() {
    let catalog = catalog(vec![
      audio(1, "eng", "aac", "5.1", ""),
      audio(2, "eng", "aac", "stereo", ""),
    ]);
    // Position 1 vs codec+layout on position 2: equal score, earliest wins.
    let template = audio_template("eng", "aac", "stereo", "", 1);
    assert_eq!(match_audio(&catalog, &template).map(|s| s.id), Some(1));

    let template = audio_template("eng", "aac", "stereo", "", 2);
    assert_eq!(match_audio(&catalog, &template).map(|s| s.id), Some(2));
  }

  #[test]
  fn test_missing_language_codes_are_equal() {
    let mut untagged = audio(1, "", "aac", "stereo", "");
    untagged.language_code = None;
    let catalog = catalog(vec![untagged, audio(2, "eng", "aac", "stereo", "")]);
    let mut template = audio_template("", "aac", "stereo", "", 1);
    template.language_code = None;
    assert_eq!(match_audio(&catalog, &template).map(|s| s.id), Some(1));
  }

  #[test]
  fn test_subtitle_scoring() {
    let catalog = catalog(vec![
      subtitle(1, "eng", "ass", false, false),
      subtitle(2, "eng", "srt", true, true),
      subtitle(3, "eng", "srt", true, false),
    ]);
    // External, non-forced SRT: stream 3 scores codec+location+forced = 3.
    let template = subtitle_template("eng", "srt", true, false, 1);
    assert_eq!(match_subtitle(&catalog, &template).map(|s| s.id), Some(3));
  }

  #[test]
  fn test_subtitle_forced_flag() {
    let catalog = catalog(vec![
      subtitle(1, "eng", "srt", true, false),
      subtitle(2, "eng", "srt", true, true),
    ]);
    let template = subtitle_template("eng", "srt", true, true, 2);
    assert_eq!(match_subtitle(&catalog, &template).map(|s| s.id), Some(2));
  }

  #[test]
  fn test_subtitle_language_gate() {
    let catalog = catalog(vec![
      subtitle(1, "fre", "srt", true, false),
      subtitle(2, "ger", "srt", true, false),
    ]);
    let template = subtitle_template("eng", "srt", true, false, 1);
    assert!(match_subtitle(&catalog, &template).is_none());
  }

  #[test]
  fn test_subtitle_exact_title() {
    let mut signs = subtitle(2, "eng", "ass", false, false);
    signs.title = Some("Signs & Songs".to_string());
    let catalog = catalog(vec![subtitle(1, "eng", "srt", true, false), signs]);
    let mut template = subtitle_template("eng", "srt", true, false, 1);
    template.title = Some("Signs & Songs".to_string());
    assert_eq!(match_subtitle(&catalog, &template).map(|s| s.id), Some(2));
  }

  #[test]
  fn test_subtitle_ties_keep_earliest() {
    let catalog = catalog(vec![
      subtitle(1, "eng", "srt", true, false),
      subtitle(2, "eng", "srt", true, false),
    ]);
    // Both score codec+location+forced, neither sits at position 3.
    let template = subtitle_template("eng", "srt", true, false, 3);
    assert_eq!(match_subtitle(&catalog, &template).map(|s| s.id), Some(1));
  }
}
