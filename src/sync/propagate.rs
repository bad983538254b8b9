//! Season-wide application of a viewer's track choice.

use std::sync::Arc;

use super::catalog::StreamCatalog;
use super::matcher::{match_audio, match_subtitle};
use super::template::{AudioStreamTemplate, SubtitleStreamTemplate};
use crate::plex::{MediaItem, MediaServer, SeasonRef};

/// What to change across a season.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagationPlan {
  pub update_audio: bool,
  pub update_subtitle: bool,
  /// Turn subtitles off everywhere instead of matching `subtitle`.
  pub reset_subtitle: bool,
  pub audio: AudioStreamTemplate,
  pub subtitle: Option<SubtitleStreamTemplate>,
}

/// Outcome counts of one propagation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationReport {
  pub episodes: usize,
  pub audio_set: usize,
  pub subtitles_set: usize,
  pub subtitles_reset: usize,
  pub no_match: usize,
  pub failures: usize,
}

impl PropagationReport {
  fn merge(&mut self, other: &PropagationReport) {
    self.episodes += other.episodes;
    self.audio_set += other.audio_set;
    self.subtitles_set += other.subtitles_set;
    self.subtitles_reset += other.subtitles_reset;
    self.no_match += other.no_match;
    self.failures += other.failures;
  }
}

/// Stream kind, for log lines.
#[derive(Debug, Clone, Copy)]
enum TrackKind {
  Audio,
  Subtitle,
}

impl TrackKind {
  fn as_str(&self) -> &'static str {
    match self {
      TrackKind::Audio => "audio",
      TrackKind::Subtitle => "subtitle",
    }
  }
}

/// Log a default stream change: `Set audio 'Title' for 'S01E02 - Name'`.
fn log_success(episode: &MediaItem, kind: TrackKind, title: Option<&str>, language: Option<&str>) {
  let descriptor = match (title.filter(|t| !t.is_empty()), language) {
    (Some(title), _) => format!("'{}' ", title),
    (None, Some(language)) => format!("'{}' ", language),
    (None, None) => String::new(),
  };
  log::info!(
    "Set {} {}for '{}'",
    kind.as_str(),
    descriptor,
    episode.label()
  );
}

/// Applies templates to every episode of a season.
pub struct SeasonPropagator<S> {
  server: Arc<S>,
  workers: usize,
}

impl<S: MediaServer + 'static> SeasonPropagator<S> {
  /// Create a propagator running up to `workers` episodes at a time.
  pub fn new(server: Arc<S>, workers: usize) -> Self {
    Self {
      server,
      workers: workers.max(1),
    }
  }

  /// Update every episode of `season` according to `plan`.
  ///
  /// Never fails: problems with one episode are logged and counted, and the
  /// remaining episodes are still processed.
  pub async fn propagate(&self, season: &SeasonRef, plan: &PropagationPlan) -> PropagationReport {
    log::info!("Attempting to update season: {}", season);

    let episodes = match self.server.season_episodes(&season.rating_key).await {
      Ok(episodes) => episodes,
      Err(e) => {
        log::error!("Failed to list episodes of '{}': {}", season, e);
        return PropagationReport {
          failures: 1,
          ..Default::default()
        };
      }
    };

    let (job_tx, job_rx) = async_channel::unbounded::<MediaItem>();
    for episode in episodes {
      // Unbounded and the receiver is still held here, so this cannot fail.
      let _ = job_tx.send(episode).await;
    }
    job_tx.close();

    let worker_count = self.workers.min(job_rx.len()).max(1);
    let plan = Arc::new(plan.clone());
    let mut handles = Vec::with_capacity(worker_count);

    for _ in 0..worker_count {
      let server = self.server.clone();
      let plan = plan.clone();
      let job_rx = job_rx.clone();
      handles.push(tokio::spawn(async move {
        let mut report = PropagationReport::default();
        while let Ok(episode) = job_rx.recv().await {
          report.merge(&Self::update_episode(server.as_ref(), &episode, &plan).await);
        }
        report
      }));
    }

    let mut report = PropagationReport::default();
    for handle in handles {
      match handle.await {
        Ok(worker_report) => report.merge(&worker_report),
        Err(e) => {
          log::error!("Propagation worker for '{}' aborted: {}", season, e);
          report.failures += 1;
        }
      }
    }

    log::info!(
      "Finished updating '{}': {} episodes, {} audio set, {} subtitles set, {} subtitles reset, {} without match, {} failed",
      season,
      report.episodes,
      report.audio_set,
      report.subtitles_set,
      report.subtitles_reset,
      report.no_match,
      report.failures
    );
    report
  }

  /// Update every part of one episode.
  async fn update_episode(server: &S, listed: &MediaItem, plan: &PropagationPlan) -> PropagationReport {
    let mut report = PropagationReport {
      episodes: 1,
      ..Default::default()
    };

    // Listings omit streams and selection state, so always refetch.
    let episode = match server.fetch_item(&listed.rating_key).await {
      Ok(episode) => episode,
      Err(e) => {
        log::warn!("Failed to refresh '{}': {}", listed.label(), e);
        report.failures += 1;
        return report;
      }
    };

    for part in episode.parts() {
      let catalog = StreamCatalog::from_part(part);

      if plan.update_audio {
        match match_audio(&catalog, &plan.audio) {
          Some(stream) => match server.set_default_audio_stream(part.id, stream.id).await {
            Ok(()) => {
              log_success(
                &episode,
                TrackKind::Audio,
                stream.title.as_deref(),
                stream.language_code.as_deref(),
              );
              report.audio_set += 1;
            }
            Err(e) => {
              log::warn!("Failed to set audio for '{}': {}", episode.label(), e);
              report.failures += 1;
            }
          },
          None => {
            log::info!("No audio matches found for '{}'", episode.label());
            report.no_match += 1;
          }
        }
      }

      if plan.update_subtitle {
        if plan.reset_subtitle {
          match server.reset_default_subtitle_stream(part.id).await {
            Ok(()) => {
              log::info!("Reset subtitle for '{}'", episode.label());
              report.subtitles_reset += 1;
            }
            Err(e) => {
              log::warn!("Failed to reset subtitle for '{}': {}", episode.label(), e);
              report.failures += 1;
            }
          }
          continue;
        }

        let Some(template) = plan.subtitle.as_ref() else {
          continue;
        };

        match match_subtitle(&catalog, template) {
          Some(stream) => match server.set_default_subtitle_stream(part.id, stream.id).await {
            Ok(()) => {
              log_success(
                &episode,
                TrackKind::Subtitle,
                stream.title.as_deref(),
                stream.language_code.as_deref(),
              );
              report.subtitles_set += 1;
            }
            Err(e) => {
              log::warn!("Failed to set subtitle for '{}': {}", episode.label(), e);
              report.failures += 1;
            }
          },
          None => {
            log::info!("No subtitle matches found for '{}'", episode.label());
            report.no_match += 1;
          }
        }
      }
    }

    report
  }
}
