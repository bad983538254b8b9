//! Plex Media Server access.
//!
//! Handles the REST client, the notification WebSocket and the API types
//! shared with the sync core.

mod client;
mod error;
mod server;
mod types;
mod websocket;

pub use client::{redact_url, PlexClient};
pub use error::PlexError;
pub use server::MediaServer;
pub use types::*;
pub use websocket::{ListenerEvent, PlexWebSocket};
