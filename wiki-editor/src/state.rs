//! Snapshot-able editor state

use serde::{Deserialize, Serialize};
use std::fmt;
use wiki_core::{ClientId, Page, PageSummary};

use crate::alert::{Alert, AlertSlot};

/// Lifecycle of the page being edited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageStatus {
    /// Nothing has been opened yet
    Unloaded,
    /// Local page without a server identifier
    Draft,
    /// Page known to the server
    Persisted,
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageStatus::Unloaded => write!(f, "unloaded"),
            PageStatus::Draft => write!(f, "draft"),
            PageStatus::Persisted => write!(f, "persisted"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EditorState {
    pub page: Page,
    pub status: PageStatus,
    pub client: ClientId,
    /// Page list from the last successful reload
    pub pages: Vec<PageSummary>,
    /// Set when another session saved the loaded page
    pub modified_elsewhere: bool,
    pub alert: AlertSlot,
    pub preview_html: String,
    /// Render sequence of the preview currently shown. A page load records
    /// the last sequence issued so renders started before it count as stale.
    pub preview_sequence: u64,
}

impl EditorState {
    pub fn new(client: ClientId) -> Self {
        Self {
            page: Page::draft("", ""),
            status: PageStatus::Unloaded,
            client,
            pages: Vec::new(),
            modified_elsewhere: false,
            alert: AlertSlot::default(),
            preview_html: String::new(),
            preview_sequence: 0,
        }
    }

    /// Replace the page with a fresh draft and drop the conflict flag
    pub fn start_draft(&mut self, draft: Page) {
        self.page = Page { id: None, ..draft };
        self.status = PageStatus::Draft;
        self.modified_elsewhere = false;
    }

    /// Replace the page with one fetched from the server
    pub fn load(&mut self, page: Page, preview_sequence: u64) {
        self.preview_html = page.html.clone();
        self.preview_sequence = preview_sequence;
        self.status = if page.is_persisted() {
            PageStatus::Persisted
        } else {
            PageStatus::Draft
        };
        self.page = page;
        self.modified_elsewhere = false;
    }

    pub fn page_exists(&self) -> bool {
        self.page.is_persisted()
    }

    pub fn alert(&self) -> Option<&Alert> {
        self.alert.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiki_core::PageId;

    #[test]
    fn test_lifecycle() {
        let mut state = EditorState::new(ClientId::new());
        assert_eq!(state.status, PageStatus::Unloaded);
        assert!(!state.page_exists());

        state.start_draft(Page::draft("Example page", "# Example page"));
        assert_eq!(state.status, PageStatus::Draft);
        assert!(!state.page_exists());

        state.modified_elsewhere = true;
        let page = Page {
            id: Some(PageId(2)),
            name: "Example page".to_string(),
            markdown: "# Example page".to_string(),
            html: "<h1>Example page</h1>".to_string(),
        };
        state.load(page, 4);
        assert_eq!(state.status, PageStatus::Persisted);
        assert!(state.page_exists());
        assert!(!state.modified_elsewhere);
        assert_eq!(state.preview_html, "<h1>Example page</h1>");
        assert_eq!(state.preview_sequence, 4);
    }

    #[test]
    fn test_draft_never_keeps_an_id() {
        let mut state = EditorState::new(ClientId::new());
        state.start_draft(Page {
            id: Some(PageId(1)),
            name: "x".to_string(),
            markdown: String::new(),
            html: String::new(),
        });
        assert_eq!(state.page.id, None);
        assert_eq!(state.status, PageStatus::Draft);
    }
}
