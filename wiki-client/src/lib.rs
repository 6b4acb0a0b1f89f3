//! Transports used by the wiki page editor: the REST page API, the
//! markdown preview renderers and the server event bus bridge.

pub mod api;
pub mod bridge;
pub mod render;

pub use api::{HttpWikiApi, WikiApi};
pub use bridge::{BridgeConnection, EventBusBridge, PAGE_SAVED_ADDRESS};
pub use render::{renderer_for, LocalRenderer, MarkdownRenderer, RemoteRenderer};
