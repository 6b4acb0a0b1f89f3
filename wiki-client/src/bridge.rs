//! Client side of the server's event bus bridge
//!
//! The bridge speaks JSON frames over a raw WebSocket. After the socket
//! opens the client registers for `page.saved`, keeps the connection alive
//! with periodic pings and hands every delivered message body to the
//! caller as a [`PageSavedNotification`].

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;
use wiki_core::{Config, PageSavedNotification, Result, WikiError};

/// Address on which the server publishes successful page updates
pub const PAGE_SAVED_ADDRESS: &str = "page.saved";

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum OutboundFrame<'a> {
    Register { address: &'a str },
    Ping,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum InboundFrame {
    Rec {
        address: String,
        #[serde(default)]
        body: serde_json::Value,
    },
    Err {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        body: Option<serde_json::Value>,
    },
    #[serde(other)]
    Other,
}

fn encode(frame: &OutboundFrame<'_>) -> Result<Message> {
    Ok(Message::Text(serde_json::to_string(frame)?))
}

/// Decode one text frame; `None` for frames that carry no page update
fn decode_frame(text: &str) -> Result<Option<PageSavedNotification>> {
    match serde_json::from_str::<InboundFrame>(text)? {
        InboundFrame::Rec { address, body } if address == PAGE_SAVED_ADDRESS => {
            Ok(Some(serde_json::from_value(body)?))
        }
        InboundFrame::Rec { address, .. } => {
            tracing::debug!("Ignoring message for unregistered address {}", address);
            Ok(None)
        }
        InboundFrame::Err { message, body } => {
            tracing::warn!(
                "Event bus reported an error: {}",
                message
                    .or_else(|| body.map(|b| b.to_string()))
                    .unwrap_or_else(|| "unknown".to_string())
            );
            Ok(None)
        }
        InboundFrame::Other => Ok(None),
    }
}

/// Connector for the server's event bus bridge
#[derive(Debug, Clone)]
pub struct EventBusBridge {
    url: Url,
    ping_interval: Duration,
}

impl EventBusBridge {
    pub fn new(url: Url, ping_interval: Duration) -> Self {
        Self { url, ping_interval }
    }

    /// Build a connector from the editor configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config.event_bus_url()?,
            config.event_bus.ping_interval(),
        ))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Open the socket and register for `page.saved`
    pub async fn connect(&self) -> Result<BridgeConnection> {
        let (ws_stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| WikiError::event_bus(format!("failed to connect to {}: {}", self.url, e)))?;
        let (mut writer, mut reader) = ws_stream.split();

        writer
            .send(encode(&OutboundFrame::Register {
                address: PAGE_SAVED_ADDRESS,
            })?)
            .await
            .map_err(|e| WikiError::event_bus(format!("failed to register handler: {}", e)))?;
        tracing::info!("Registered for {} on {}", PAGE_SAVED_ADDRESS, self.url);

        let ping_frame = encode(&OutboundFrame::Ping)?;
        let ping_interval = self.ping_interval;
        let (sender, receiver) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            let mut ping = tokio::time::interval_at(Instant::now() + ping_interval, ping_interval);

            loop {
                tokio::select! {
                    _ = ping.tick() => {
                        if let Err(e) = writer.send(ping_frame.clone()).await {
                            break Some(format!("ping failed: {}", e));
                        }
                    }
                    message = reader.next() => match message {
                        Some(Ok(Message::Text(text))) => match decode_frame(&text) {
                            Ok(Some(notification)) => {
                                if sender.send(notification).is_err() {
                                    break None;
                                }
                            }
                            Ok(None) => {}
                            Err(e) => tracing::warn!("Invalid event bus frame: {}", e),
                        },
                        Some(Ok(Message::Close(frame))) => {
                            break frame.map(|f| f.reason.to_string());
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => break Some(e.to_string()),
                        None => break None,
                    }
                }
            }
        });

        Ok(BridgeConnection {
            url: self.url.clone(),
            notifications: receiver,
            task: Some(task),
        })
    }
}

/// An open bridge connection delivering `page.saved` notifications
pub struct BridgeConnection {
    url: Url,
    notifications: mpsc::UnboundedReceiver<PageSavedNotification>,
    task: Option<JoinHandle<Option<String>>>,
}

impl BridgeConnection {
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Next delivered notification, `None` once the socket has closed
    pub async fn next(&mut self) -> Option<PageSavedNotification> {
        self.notifications.recv().await
    }

    /// Wait for the socket task to finish and report why it closed
    pub async fn closed(mut self) -> Option<String> {
        match self.task.take() {
            Some(task) => match task.await {
                Ok(reason) => reason,
                Err(e) => Some(e.to_string()),
            },
            None => None,
        }
    }
}

impl Drop for BridgeConnection {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
