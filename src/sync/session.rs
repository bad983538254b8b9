//! Session manager - tracks what each client is watching and turns in-episode
//! track changes into season-wide updates.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use super::error::SyncError;
use super::propagate::{PropagationPlan, PropagationReport, SeasonPropagator};
use super::template::{extract_templates, TrackTemplates};
use crate::plex::{ListenerEvent, MediaItem, MediaServer, Notification, SeasonRef};

/// Last observed state of one client.
#[derive(Debug, Clone)]
pub struct ClientSession {
  pub client_id: String,
  /// Rating key of the episode being watched.
  pub rating_key: String,
  pub season: SeasonRef,
  pub templates: TrackTemplates,
  last_seen: Instant,
}

/// What a playback event showed for a client.
#[derive(Debug, Clone)]
pub struct Observation {
  pub rating_key: String,
  pub season: SeasonRef,
  pub templates: TrackTemplates,
}

/// Decision taken for one observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
  /// First time this client was seen.
  Created,
  /// Same episode, same tracks.
  Unchanged,
  /// Client moved to another episode.
  Switched,
  /// Same episode, different tracks: apply them to the season.
  Propagate {
    season: SeasonRef,
    plan: PropagationPlan,
  },
}

/// Limits on the session table.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvictionPolicy {
  /// Drop sessions not seen for this long.
  pub idle_timeout: Option<Duration>,
  /// Keep at most this many sessions, dropping the least recently seen.
  pub max_sessions: Option<usize>,
}

/// Table of client sessions keyed by client identifier.
pub struct SessionStore {
  sessions: HashMap<String, ClientSession>,
  policy: EvictionPolicy,
}

impl SessionStore {
  pub fn new(policy: EvictionPolicy) -> Self {
    Self {
      sessions: HashMap::new(),
      policy,
    }
  }

  pub fn len(&self) -> usize {
    self.sessions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.sessions.is_empty()
  }

  pub fn get(&self, client_id: &str) -> Option<&ClientSession> {
    self.sessions.get(client_id)
  }

  /// Record an observation and decide what to do about it.
  pub fn observe(&mut self, client_id: &str, observation: Observation, now: Instant) -> SessionAction {
    self.evict_idle(now);

    let action = match self.sessions.get_mut(client_id) {
      None => {
        self.sessions.insert(
          client_id.to_string(),
          ClientSession {
            client_id: client_id.to_string(),
            rating_key: observation.rating_key,
            season: observation.season,
            templates: observation.templates,
            last_seen: now,
          },
        );
        SessionAction::Created
      }
      Some(session) if session.rating_key != observation.rating_key => {
        session.rating_key = observation.rating_key;
        session.season = observation.season;
        session.templates = observation.templates;
        session.last_seen = now;
        SessionAction::Switched
      }
      Some(session) => {
        session.last_seen = now;
        if session.templates == observation.templates {
          SessionAction::Unchanged
        } else {
          let previous = std::mem::replace(&mut session.templates, observation.templates);
          let current = &session.templates;
          SessionAction::Propagate {
            season: session.season.clone(),
            plan: PropagationPlan {
              update_audio: previous.audio != current.audio,
              update_subtitle: previous.subtitle != current.subtitle,
              reset_subtitle: current.subtitle.is_none(),
              audio: current.audio.clone(),
              subtitle: current.subtitle.clone(),
            },
          }
        }
      }
    };

    self.evict_overflow(client_id);
    action
  }

  fn evict_idle(&mut self, now: Instant) {
    let Some(idle_timeout) = self.policy.idle_timeout else {
      return;
    };
    self.sessions.retain(|client_id, session| {
      let keep = now.saturating_duration_since(session.last_seen) <= idle_timeout;
      if !keep {
        log::debug!("Dropping idle session of client {}", client_id);
      }
      keep
    });
  }

  /// Evict least recently seen sessions, never `keep`.
  fn evict_overflow(&mut self, keep: &str) {
    let Some(max_sessions) = self.policy.max_sessions else {
      return;
    };
    while self.sessions.len() > max_sessions.max(1) {
      let oldest = self
        .sessions
        .values()
        .filter(|s| s.client_id != keep)
        .min_by_key(|s| s.last_seen)
        .map(|s| s.client_id.clone());
      let Some(oldest) = oldest else {
        break;
      };
      log::debug!("Session table full, dropping client {}", oldest);
      self.sessions.remove(&oldest);
    }
  }
}

/// Result of handling one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
  /// Not a playback update for an episode.
  Ignored,
  Created,
  Unchanged,
  Switched,
  Propagated(PropagationReport),
}

/// Drives the session table from server notifications.
pub struct SessionManager<S> {
  server: Arc<S>,
  sessions: Mutex<SessionStore>,
  propagator: SeasonPropagator<S>,
}

impl<S: MediaServer + 'static> SessionManager<S> {
  /// Create a session manager.
  pub fn new(server: Arc<S>, policy: EvictionPolicy, propagation_workers: usize) -> Self {
    Self {
      propagator: SeasonPropagator::new(server.clone(), propagation_workers),
      server,
      sessions: Mutex::new(SessionStore::new(policy)),
    }
  }

  /// Consume listener events until the channel closes or the transport fails.
  ///
  /// Events are handled strictly one after another.
  pub async fn run(&self, mut events: mpsc::Receiver<ListenerEvent>) -> Result<(), SyncError> {
    log::info!("Session manager started, waiting for playback events...");
    while let Some(event) = events.recv().await {
      match event {
        ListenerEvent::Notification(notification) => {
          if let Err(e) = self.on_playback_event(&notification).await {
            log::error!("Failed to process playback event: {}", e);
          }
        }
        ListenerEvent::TransportError(reason) => {
          return Err(self.on_transport_error(&reason));
        }
      }
    }
    log::info!("Notification channel closed, session manager stopping");
    Ok(())
  }

  /// Handle one notification.
  ///
  /// On error the client's session is left as it was.
  pub async fn on_playback_event(
    &self,
    notification: &Notification,
  ) -> Result<SessionOutcome, SyncError> {
    if !notification.is_playing() {
      return Ok(SessionOutcome::Ignored);
    }
    let Some(state) = notification.play_session_states.first() else {
      return Ok(SessionOutcome::Ignored);
    };

    let item = self.fetch_with_retry(&state.rating_key).await?;
    if !item.is_episode() {
      log::debug!("Ignoring playback of {} '{}'", item.item_type, item.title);
      return Ok(SessionOutcome::Ignored);
    }
    let Some(season) = item.season() else {
      log::warn!("Episode '{}' reports no season, ignoring", item.label());
      return Ok(SessionOutcome::Ignored);
    };

    let templates = extract_templates(&item)?;
    let client_id = state.client_identifier.as_str();
    let action = self.sessions.lock().observe(
      client_id,
      Observation {
        rating_key: item.rating_key.clone(),
        season,
        templates,
      },
      Instant::now(),
    );

    match action {
      SessionAction::Created => {
        log::info!("Adding new client with ID {} watching '{}'", client_id, item.label());
        Ok(SessionOutcome::Created)
      }
      SessionAction::Unchanged => {
        log::debug!("Client {} unchanged on '{}'", client_id, item.label());
        Ok(SessionOutcome::Unchanged)
      }
      SessionAction::Switched => {
        log::info!("Client {} switched to '{}'", client_id, item.label());
        Ok(SessionOutcome::Switched)
      }
      SessionAction::Propagate { season, plan } => {
        log::info!(
          "Client {} changed tracks on '{}' (audio: {}, subtitle: {}, reset subtitle: {})",
          client_id,
          item.label(),
          plan.update_audio,
          plan.update_subtitle,
          plan.reset_subtitle
        );
        let report = self.propagator.propagate(&season, &plan).await;
        Ok(SessionOutcome::Propagated(report))
      }
    }
  }

  /// The notification transport failed. Nothing is kept; the caller exits.
  pub fn on_transport_error(&self, reason: &str) -> SyncError {
    log::error!("Listener ran into an error, stopping: {}", reason);
    SyncError::Transport(reason.to_string())
  }

  /// Snapshot of a client's session.
  pub fn session(&self, client_id: &str) -> Option<ClientSession> {
    self.sessions.lock().get(client_id).cloned()
  }

  pub fn session_count(&self) -> usize {
    self.sessions.lock().len()
  }

  /// Fetch an item, refetching once if the first read fails.
  async fn fetch_with_retry(&self, rating_key: &str) -> Result<MediaItem, SyncError> {
    match self.server.fetch_item(rating_key).await {
      Ok(item) => Ok(item),
      Err(e) => {
        log::warn!("Failed to fetch item {}: {}, retrying once", rating_key, e);
        Ok(self.server.fetch_item(rating_key).await?)
      }
    }
  }
}
