//! Wiki Core - shared foundation of the wiki page editor
//!
//! This crate provides the page model, error type, configuration and the
//! in-process event bus used by the transports, the editor controller and
//! the CLI.

pub mod config;
pub mod error;
pub mod event;
pub mod page;

// Re-export commonly used types
pub use config::{Config, EditorConfig, EventBusConfig, RendererKind, ServerConfig};
pub use error::{Result, WikiError};
pub use event::{
    AlertKind, ChannelEventHandler, EditorEvent, EditorEventHandler, EventBus, InMemoryEventBus,
    SubscriptionId,
};
pub use page::{newest_page, ClientId, Page, PageId, PageSavedNotification, PageSummary};
