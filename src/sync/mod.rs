//! Default track synchronisation across the episodes of a season.

mod catalog;
mod error;
mod matcher;
mod propagate;
mod session;
mod template;

#[cfg(test)]
mod testing;

pub use catalog::{AudioStream, CatalogStream, StreamCatalog, SubtitleLocation, SubtitleStream};
pub use error::SyncError;
pub use matcher::{match_audio, match_subtitle};
pub use propagate::{PropagationPlan, PropagationReport, SeasonPropagator};
pub use session::{
  ClientSession, EvictionPolicy, Observation, SessionAction, SessionManager, SessionOutcome,
  SessionStore,
};
pub use template::{extract_templates, AudioStreamTemplate, SubtitleStreamTemplate, TrackTemplates};
