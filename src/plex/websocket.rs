//! WebSocket listener for Plex server notifications.

use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

use super::client::redact_url;
use super::error::PlexError;
use super::types::*;

/// Events delivered by the listener.
#[derive(Debug, Clone)]
pub enum ListenerEvent {
  /// A decoded notification from the server.
  Notification(Notification),
  /// The connection failed or was closed by the server. Always the last event.
  TransportError(String),
}

/// Notifications buffered while the consumer is busy with a season update.
const EVENT_QUEUE_SIZE: usize = 128;

/// Internal state for channel management.
struct ChannelState {
  event_tx: mpsc::Sender<ListenerEvent>,
  event_rx: Option<mpsc::Receiver<ListenerEvent>>,
}

/// WebSocket connection to the Plex notification endpoint.
pub struct PlexWebSocket {
  channel: Arc<RwLock<ChannelState>>,
  cancel_token: Arc<RwLock<Option<CancellationToken>>>,
  task_handle: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl PlexWebSocket {
  /// Create a new WebSocket handler.
  pub fn new() -> Self {
    let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_SIZE);
    Self {
      channel: Arc::new(RwLock::new(ChannelState {
        event_tx,
        event_rx: Some(event_rx),
      })),
      cancel_token: Arc::new(RwLock::new(None)),
      task_handle: Arc::new(RwLock::new(None)),
    }
  }

  /// Connect to the notification WebSocket and start the reader task.
  pub async fn connect(&self, url: &str) -> Result<(), PlexError> {
    self.disconnect().await;

    log::info!("Connecting to notification socket {}", redact_url(url));
    let (ws_stream, _) = connect_async(url).await?;
    let (mut write, mut read) = ws_stream.split();

    let cancel_token = CancellationToken::new();
    *self.cancel_token.write() = Some(cancel_token.clone());

    let event_tx = self.channel.read().event_tx.clone();

    let handle = tokio::spawn(async move {
      let mut keepalive_interval = tokio::time::interval(std::time::Duration::from_secs(30));

      let failure = loop {
        tokio::select! {
          _ = cancel_token.cancelled() => {
            log::info!("WebSocket shutdown requested via cancellation");
            let _ = write.close().await;
            break None;
          }
          msg = read.next() => {
            match msg {
              Some(Ok(Message::Text(text))) => {
                if let Some(notification) = Self::handle_message(&text) {
                  if !Self::forward(&event_tx, notification) {
                    log::debug!("Notification receiver dropped, stopping listener");
                    break None;
                  }
                }
              }
              Some(Ok(Message::Close(frame))) => {
                log::info!("WebSocket closed by server");
                break Some(format!("connection closed by server: {:?}", frame));
              }
              Some(Err(e)) => {
                log::error!("WebSocket error: {}", e);
                break Some(e.to_string());
              }
              None => {
                log::info!("WebSocket stream ended");
                break Some("notification stream ended".to_string());
              }
              _ => {}
            }
          }
          _ = keepalive_interval.tick() => {
            if let Err(e) = write.send(Message::Ping(Default::default())).await {
              log::error!("Failed to send keepalive: {}", e);
              break Some(e.to_string());
            }
          }
        }
      };

      if let Some(reason) = failure {
        let _ = event_tx.send(ListenerEvent::TransportError(reason)).await;
      }
    });

    *self.task_handle.write() = Some(handle);

    Ok(())
  }

  /// Decode one text frame. Frames that are not notifications are skipped.
  fn handle_message(text: &str) -> Option<Notification> {
    match serde_json::from_str::<WsMessage>(text) {
      Ok(msg) => {
        let notification = msg.notification_container;
        log::trace!("Received {} notification", notification.notification_type);
        Some(notification)
      }
      Err(e) => {
        log::debug!("Skipping undecodable WebSocket message: {}", e);
        None
      }
    }
  }

  /// Queue a notification without blocking the reader, so pings and
  /// cancellation keep being serviced while the consumer is busy.
  ///
  /// Returns `false` once the receiver is gone.
  fn forward(event_tx: &mpsc::Sender<ListenerEvent>, notification: Notification) -> bool {
    match event_tx.try_send(ListenerEvent::Notification(notification)) {
      Ok(()) => true,
      Err(TrySendError::Full(ListenerEvent::Notification(dropped))) => {
        log::warn!(
          "Notification queue full, dropping {} notification",
          dropped.notification_type
        );
        true
      }
      Err(TrySendError::Full(_)) => true,
      Err(TrySendError::Closed(_)) => false,
    }
  }

  /// Disconnect from WebSocket.
  pub async fn disconnect(&self) {
    if let Some(token) = self.cancel_token.write().take() {
      token.cancel();
    }

    // Take the handle without holding the lock across await
    let handle = self.task_handle.write().take();
    if let Some(handle) = handle {
      let _ = tokio::time::timeout(std::time::Duration::from_secs(2), handle).await;
    }
  }

  /// Take the event receiver. Returns `None` once taken.
  pub fn take_event_receiver(&self) -> Option<mpsc::Receiver<ListenerEvent>> {
    self.channel.write().event_rx.take()
  }
}

impl Default for PlexWebSocket {
  fn default() -> Self {
    Self::new()
  }
}
