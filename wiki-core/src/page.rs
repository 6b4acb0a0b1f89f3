//! Page model shared by the transports and the editor controller

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Server-assigned page identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(pub i64);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PageId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(PageId)
    }
}

/// Token identifying one editing session.
///
/// Generated once per controller and sent with every update so that the
/// session can recognise its own `page.saved` notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A wiki page, either a local draft or a persisted page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Absent until the page has been created on the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PageId>,
    pub name: String,
    pub markdown: String,
    /// Rendered HTML as supplied by the server
    #[serde(default)]
    pub html: String,
}

impl Page {
    /// Create an unsaved draft
    pub fn draft(name: impl Into<String>, markdown: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            markdown: markdown.into(),
            html: String::new(),
        }
    }

    /// Whether the page has been persisted at least once
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

/// Entry of the page collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    pub id: PageId,
    pub name: String,
}

/// Pick the summary with the highest id
pub fn newest_page(pages: &[PageSummary]) -> Option<&PageSummary> {
    pages.iter().max_by_key(|page| page.id)
}

/// Body of a `page.saved` event bus message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSavedNotification {
    pub id: PageId,
    /// Token of the saving session; older clients do not send one
    #[serde(default)]
    pub client: Option<String>,
}

impl PageSavedNotification {
    /// Whether the save was made by the given session
    pub fn is_from(&self, client: &ClientId) -> bool {
        self.client
            .as_deref()
            .is_some_and(|token| token == client.to_string())
    }
}
