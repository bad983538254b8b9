//! Plex HTTP client for REST API calls.

use parking_lot::RwLock;
use reqwest::{header, Client, StatusCode};
use std::sync::Arc;
use uuid::Uuid;

use super::error::PlexError;
use super::server::MediaServer;
use super::types::*;

/// Client info for Plex client identification.
const CLIENT_IDENTIFIER_PREFIX: &str = "plex-track-sync-";
const PRODUCT_NAME: &str = "Plex Track Sync";
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Plex HTTP API client.
pub struct PlexClient {
  http: Client,
  state: Arc<RwLock<ClientState>>,
}

/// Internal connection state.
struct ClientState {
  server_url: String,
  token: String,
  client_identifier: String,
}

impl PlexClient {
  /// Create a new Plex client for the given server URL and token.
  pub fn new(server_url: &str, token: &str) -> Result<Self, PlexError> {
    let server_url = server_url.trim_end_matches('/').to_string();

    if !server_url.starts_with("http://") && !server_url.starts_with("https://") {
      return Err(PlexError::InvalidUrl(
        "URL must start with http:// or https://".to_string(),
      ));
    }

    let http = Client::builder()
      .timeout(std::time::Duration::from_secs(30))
      .build()?;

    Ok(Self {
      http,
      state: Arc::new(RwLock::new(ClientState {
        server_url,
        token: token.to_string(),
        client_identifier: format!("{}{}", CLIENT_IDENTIFIER_PREFIX, Uuid::new_v4()),
      })),
    })
  }

  /// Get the client identifier sent with every request.
  pub fn client_identifier(&self) -> String {
    self.state.read().client_identifier.clone()
  }

  /// Get the server URL.
  pub fn server_url(&self) -> String {
    self.state.read().server_url.clone()
  }

  /// Verify the server is reachable and the token is accepted.
  pub async fn connect(&self) -> Result<ServerIdentity, PlexError> {
    let response: IdentityResponse = self.get("/identity").await?;
    let identity = response.media_container;

    // /identity answers without a token, so prove the token with a library call
    let _: MetadataResponse = self.get("/library/sections").await?;

    log::info!(
      "Connected to Plex Server at {} (machine {}, version {})",
      self.server_url(),
      identity.machine_identifier,
      identity.version.as_deref().unwrap_or("unknown")
    );

    Ok(identity)
  }

  /// Build a request carrying the Plex identification headers.
  fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
    let state = self.state.read();
    let url = format!("{}{}", state.server_url, path);
    self
      .http
      .request(method, &url)
      .header(header::ACCEPT, "application/json")
      .header("X-Plex-Token", state.token.as_str())
      .header("X-Plex-Client-Identifier", state.client_identifier.as_str())
      .header("X-Plex-Product", PRODUCT_NAME)
      .header("X-Plex-Version", CLIENT_VERSION)
  }

  /// Map a non-success response to an error.
  async fn check_status(
    path: &str,
    response: reqwest::Response,
  ) -> Result<reqwest::Response, PlexError> {
    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
      return Err(PlexError::NotFound(path.to_string()));
    }
    let body = response.text().await.unwrap_or_default();
    log::error!("{} failed with status {}: {}", path, status, body);
    Err(PlexError::HttpError(format!("HTTP {} - {}", status, body)))
  }

  /// Make an authenticated GET request.
  pub async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, PlexError> {
    let response = self.request(reqwest::Method::GET, path).send().await?;
    let response = Self::check_status(path, response).await?;
    Ok(response.json().await?)
  }

  /// Make an authenticated PUT request without expecting a response body.
  pub async fn put_empty(&self, path: &str) -> Result<(), PlexError> {
    log::debug!("PUT {}", path);
    let response = self.request(reqwest::Method::PUT, path).send().await?;
    Self::check_status(path, response).await?;
    Ok(())
  }

  /// Get WebSocket URL for notifications.
  pub fn websocket_url(&self) -> String {
    let state = self.state.read();

    // Convert http(s) to ws(s)
    let ws_url = if state.server_url.starts_with("https://") {
      state.server_url.replacen("https://", "wss://", 1)
    } else {
      state.server_url.replacen("http://", "ws://", 1)
    };

    format!(
      "{}/:/websockets/notifications?X-Plex-Token={}",
      ws_url, state.token
    )
  }
}

impl MediaServer for PlexClient {
  async fn fetch_item(&self, rating_key: &str) -> Result<MediaItem, PlexError> {
    let path = format!("/library/metadata/{}", rating_key);
    let response: MetadataResponse = self.get(&path).await?;
    response
      .media_container
      .metadata
      .into_iter()
      .next()
      .ok_or(PlexError::NotFound(path))
  }

  async fn season_episodes(&self, season_rating_key: &str) -> Result<Vec<MediaItem>, PlexError> {
    let path = format!("/library/metadata/{}/children", season_rating_key);
    let response: MetadataResponse = self.get(&path).await?;
    Ok(response.media_container.metadata)
  }

  async fn set_default_audio_stream(&self, part_id: i64, stream_id: i64) -> Result<(), PlexError> {
    self
      .put_empty(&format!(
        "/library/parts/{}?audioStreamID={}&allParts=1",
        part_id, stream_id
      ))
      .await
  }

  async fn set_default_subtitle_stream(
    &self,
    part_id: i64,
    stream_id: i64,
  ) -> Result<(), PlexError> {
    self
      .put_empty(&format!(
        "/library/parts/{}?subtitleStreamID={}&allParts=1",
        part_id, stream_id
      ))
      .await
  }

  async fn reset_default_subtitle_stream(&self, part_id: i64) -> Result<(), PlexError> {
    self
      .put_empty(&format!(
        "/library/parts/{}?subtitleStreamID=0&allParts=1",
        part_id
      ))
      .await
  }
}

/// Redact the Plex token from URLs for logging.
/// Replaces X-Plex-Token=XXX with X-Plex-Token=[REDACTED].
pub fn redact_url(url: &str) -> String {
  const PARAM: &str = "X-Plex-Token=";
  if let Some(idx) = url.find(PARAM) {
    let start = idx + PARAM.len();
    let end = url[start..].find('&').map(|i| start + i).unwrap_or(url.len());
    format!("{}[REDACTED]{}", &url[..start], &url[end..])
  } else {
    url.to_string()
  }
}
