//! In-process event bus fanning editor state changes out to the UI

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::error::{Result, WikiError};
use crate::page::PageId;

/// Kind of a transient alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    Success,
    Error,
}

impl AlertKind {
    /// How long an alert of this kind stays visible
    pub fn display_duration(&self, success: Duration, error: Duration) -> Duration {
        match self {
            AlertKind::Success => success,
            AlertKind::Error => error,
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertKind::Success => write!(f, "success"),
            AlertKind::Error => write!(f, "error"),
        }
    }
}

/// Events published by the editor controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EditorEvent {
    /// The page collection was fetched
    PageListUpdated { count: usize, timestamp: SystemTime },
    /// A persisted page replaced the editor content
    PageLoaded {
        id: PageId,
        name: String,
        timestamp: SystemTime,
    },
    /// The editor was reset to a fresh draft
    DraftStarted { name: String, timestamp: SystemTime },
    /// The preview surface was replaced
    PreviewUpdated {
        html: String,
        sequence: u64,
        timestamp: SystemTime,
    },
    /// An alert became visible
    AlertShown {
        kind: AlertKind,
        message: String,
        timestamp: SystemTime,
    },
    /// The visible alert timed out
    AlertCleared { kind: AlertKind, timestamp: SystemTime },
    /// Another session saved the page being edited
    ConflictDetected {
        id: PageId,
        client: Option<String>,
        timestamp: SystemTime,
    },
    /// The server event bus bridge opened
    EventBusConnected { url: String, timestamp: SystemTime },
    /// The server event bus bridge closed
    EventBusDisconnected {
        reason: Option<String>,
        timestamp: SystemTime,
    },
}

impl EditorEvent {
    pub fn page_list_updated(count: usize) -> Self {
        Self::PageListUpdated {
            count,
            timestamp: SystemTime::now(),
        }
    }

    pub fn page_loaded(id: PageId, name: String) -> Self {
        Self::PageLoaded {
            id,
            name,
            timestamp: SystemTime::now(),
        }
    }

    pub fn draft_started(name: String) -> Self {
        Self::DraftStarted {
            name,
            timestamp: SystemTime::now(),
        }
    }

    pub fn preview_updated(html: String, sequence: u64) -> Self {
        Self::PreviewUpdated {
            html,
            sequence,
            timestamp: SystemTime::now(),
        }
    }

    pub fn alert_shown(kind: AlertKind, message: String) -> Self {
        Self::AlertShown {
            kind,
            message,
            timestamp: SystemTime::now(),
        }
    }

    pub fn alert_cleared(kind: AlertKind) -> Self {
        Self::AlertCleared {
            kind,
            timestamp: SystemTime::now(),
        }
    }

    pub fn conflict_detected(id: PageId, client: Option<String>) -> Self {
        Self::ConflictDetected {
            id,
            client,
            timestamp: SystemTime::now(),
        }
    }

    pub fn event_bus_connected(url: String) -> Self {
        Self::EventBusConnected {
            url,
            timestamp: SystemTime::now(),
        }
    }

    pub fn event_bus_disconnected(reason: Option<String>) -> Self {
        Self::EventBusDisconnected {
            reason,
            timestamp: SystemTime::now(),
        }
    }

    /// Get the event type identifier
    pub fn event_type(&self) -> &str {
        match self {
            EditorEvent::PageListUpdated { .. } => "page_list_updated",
            EditorEvent::PageLoaded { .. } => "page_loaded",
            EditorEvent::DraftStarted { .. } => "draft_started",
            EditorEvent::PreviewUpdated { .. } => "preview_updated",
            EditorEvent::AlertShown { .. } => "alert_shown",
            EditorEvent::AlertCleared { .. } => "alert_cleared",
            EditorEvent::ConflictDetected { .. } => "conflict_detected",
            EditorEvent::EventBusConnected { .. } => "event_bus_connected",
            EditorEvent::EventBusDisconnected { .. } => "event_bus_disconnected",
        }
    }
}

/// Handler for editor events
#[async_trait]
pub trait EditorEventHandler: Send + Sync {
    /// Handle an editor event
    async fn handle_event(&self, event: &EditorEvent) -> Result<()>;

    /// Get handler name for debugging
    fn handler_name(&self) -> &str {
        "UnnamedEditorEventHandler"
    }
}

/// Unique identifier for event subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub Uuid);

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Event bus for publishing and subscribing to editor events
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish an event to all subscribers
    async fn publish(&self, event: EditorEvent) -> Result<()>;

    /// Subscribe to editor events
    async fn subscribe(&self, handler: Arc<dyn EditorEventHandler>) -> Result<SubscriptionId>;

    /// Unsubscribe from events
    async fn unsubscribe(&self, id: SubscriptionId) -> Result<()>;

    /// Get the number of active subscriptions
    async fn subscription_count(&self) -> usize;
}

/// In-memory implementation of the event bus
pub struct InMemoryEventBus {
    subscriptions: RwLock<HashMap<SubscriptionId, Arc<dyn EditorEventHandler>>>,
}

impl InMemoryEventBus {
    /// Create a new in-memory event bus
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, event: EditorEvent) -> Result<()> {
        // Snapshot so handlers may subscribe or unsubscribe while running
        let handlers: Vec<Arc<dyn EditorEventHandler>> =
            self.subscriptions.read().await.values().cloned().collect();

        if handlers.is_empty() {
            tracing::trace!("No subscribers for event type: {}", event.event_type());
            return Ok(());
        }

        let mut handlers_called = 0;
        for handler in handlers {
            if let Err(e) = handler.handle_event(&event).await {
                tracing::error!(
                    "Handler {} failed to process event {}: {}",
                    handler.handler_name(),
                    event.event_type(),
                    e
                );
            } else {
                handlers_called += 1;
            }
        }

        tracing::debug!(
            "Routed event {} to {} handlers",
            event.event_type(),
            handlers_called
        );
        Ok(())
    }

    async fn subscribe(&self, handler: Arc<dyn EditorEventHandler>) -> Result<SubscriptionId> {
        let id = SubscriptionId::new();
        tracing::debug!(
            "Created subscription {:?} for handler {}",
            id,
            handler.handler_name()
        );
        self.subscriptions.write().await.insert(id, handler);
        Ok(id)
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
        if self.subscriptions.write().await.remove(&id).is_some() {
            tracing::debug!("Removed subscription: {:?}", id);
        } else {
            tracing::warn!("Attempted to remove non-existent subscription: {:?}", id);
        }
        Ok(())
    }

    async fn subscription_count(&self) -> usize {
        self.subscriptions.read().await.len()
    }
}

/// Handler that forwards every event into an unbounded channel
pub struct ChannelEventHandler {
    sender: mpsc::UnboundedSender<EditorEvent>,
}

impl ChannelEventHandler {
    /// Create a handler together with the receiving end of its channel
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<EditorEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Arc::new(Self { sender }), receiver)
    }
}

#[async_trait]
impl EditorEventHandler for ChannelEventHandler {
    async fn handle_event(&self, event: &EditorEvent) -> Result<()> {
        self.sender
            .send(event.clone())
            .map_err(|_| WikiError::event_bus("event receiver dropped"))
    }

    fn handler_name(&self) -> &str {
        "ChannelEventHandler"
    }
}
