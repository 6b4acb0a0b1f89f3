//! Editor controller
//!
//! Binds the editor state to the page API, the preview renderer and the
//! server event bus. Every state change is published on the in-process
//! [`EventBus`] so a UI can follow along without polling.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wiki_client::{
    renderer_for, BridgeConnection, EventBusBridge, HttpWikiApi, MarkdownRenderer, WikiApi,
};
use wiki_core::{
    newest_page, ClientId, Config, EditorConfig, EditorEvent, EventBus, Page, PageId,
    PageSavedNotification, PageSummary, Result, WikiError,
};

use crate::alert::Alert;
use crate::scheduler::ScheduledTask;
use crate::state::{EditorState, PageStatus};

pub const PAGE_CREATED: &str = "Page created";
pub const PAGE_SAVED: &str = "Page saved";
pub const PAGE_DELETED: &str = "Page deleted";

struct ControllerInner {
    api: Arc<dyn WikiApi>,
    renderer: Arc<dyn MarkdownRenderer>,
    events: Arc<dyn EventBus>,
    config: EditorConfig,
    client: ClientId,
    state: RwLock<EditorState>,
    preview_task: ScheduledTask,
    alert_task: ScheduledTask,
    render_sequence: AtomicU64,
    bridge_listener: Mutex<Option<JoinHandle<()>>>,
}

/// Controller for one editing session. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct EditorController {
    inner: Arc<ControllerInner>,
}

impl EditorController {
    pub fn new(
        api: Arc<dyn WikiApi>,
        renderer: Arc<dyn MarkdownRenderer>,
        events: Arc<dyn EventBus>,
        config: EditorConfig,
    ) -> Self {
        let client = ClientId::new();
        debug!("Editor session {} created", client);

        Self {
            inner: Arc::new(ControllerInner {
                api,
                renderer,
                events,
                config,
                client,
                state: RwLock::new(EditorState::new(client)),
                preview_task: ScheduledTask::new("preview"),
                alert_task: ScheduledTask::new("alert"),
                render_sequence: AtomicU64::new(0),
                bridge_listener: Mutex::new(None),
            }),
        }
    }

    /// Build a controller talking HTTP to the configured server
    pub fn from_config(config: &Config, events: Arc<dyn EventBus>) -> Result<Self> {
        let api = HttpWikiApi::new(&config.server)?;
        let renderer = renderer_for(config.editor.renderer, &api);
        Ok(Self::new(
            Arc::new(api),
            renderer,
            events,
            config.editor.clone(),
        ))
    }

    /// Reload the page list, start a fresh draft and render its preview
    pub async fn initialize(&self) {
        // Failure is logged by list_pages; the draft is usable without it
        let _ = self.list_pages().await;
        self.new_page().await;
    }

    /// Stop timers and the event bus listener
    pub fn shutdown(&self) {
        self.inner.preview_task.cancel();
        self.inner.alert_task.cancel();
        if let Some(listener) = self
            .inner
            .bridge_listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            listener.abort();
        }
        debug!("Editor session {} shut down", self.inner.client);
    }

    /// Discard the current page and start an unsaved default draft
    pub async fn new_page(&self) {
        let draft = Page::draft(
            self.inner.config.default_page_name.clone(),
            self.inner.config.default_markdown.clone(),
        );
        let name = draft.name.clone();
        let markdown = draft.markdown.clone();

        let markdown_changed = {
            let mut state = self.inner.state.write().await;
            let changed = state.page.markdown != markdown || state.status == PageStatus::Unloaded;
            state.start_draft(draft);
            changed
        };

        if markdown_changed {
            self.schedule_preview(markdown);
        }
        debug!("Started draft '{}'", name);
        self.publish(EditorEvent::draft_started(name)).await;
    }

    /// Fetch the page collection
    pub async fn list_pages(&self) -> Result<Vec<PageSummary>> {
        let pages = self
            .inner
            .api
            .list_pages()
            .await
            .inspect_err(|e| warn!("Failed to reload pages: {}", e))?;

        self.inner.state.write().await.pages = pages.clone();
        debug!("Loaded {} pages", pages.len());
        self.publish(EditorEvent::page_list_updated(pages.len()))
            .await;
        Ok(pages)
    }

    /// Open a persisted page, showing the HTML the server rendered for it
    pub async fn load_page(&self, id: PageId) -> Result<()> {
        let mut page = self
            .inner
            .api
            .fetch_page(id)
            .await
            .inspect_err(|e| warn!("Failed to load page {}: {}", id, e))?;
        page.id.get_or_insert(id);

        let name = page.name.clone();
        let markdown = page.markdown.clone();
        let html = page.html.clone();

        let (markdown_changed, sequence) = {
            let mut state = self.inner.state.write().await;
            let changed = state.page.markdown != markdown;
            let sequence = self.inner.render_sequence.load(Ordering::SeqCst);
            state.load(page, sequence);
            (changed, sequence)
        };
        if markdown_changed {
            self.schedule_preview(markdown);
        }

        info!("Loaded page {} '{}'", id, name);
        self.publish(EditorEvent::page_loaded(id, name)).await;
        self.publish(EditorEvent::preview_updated(html, sequence))
            .await;
        Ok(())
    }

    /// Create the draft or update the persisted page
    pub async fn save_page(&self) -> Result<()> {
        let page = self.inner.state.read().await.page.clone();

        match page.id {
            None => self.create_page(&page).await,
            Some(id) => self.update_page(id, &page.markdown).await,
        }
    }

    async fn create_page(&self, page: &Page) -> Result<()> {
        if let Err(e) = self
            .inner
            .api
            .create_page(&page.name, &page.markdown)
            .await
        {
            warn!("Failed to create page '{}': {}", page.name, e);
            self.show_error(e.alert_message()).await;
            return Err(e);
        }

        info!("Created page '{}'", page.name);
        let pages = self.list_pages().await;
        self.show_success(PAGE_CREATED).await;

        // The create response carries no id; the newest page is assumed to
        // be the one just created
        match newest_page(&pages?) {
            Some(newest) => self.load_page(newest.id).await,
            None => {
                warn!("Page list is empty after creating '{}'", page.name);
                Ok(())
            }
        }
    }

    async fn update_page(&self, id: PageId, markdown: &str) -> Result<()> {
        match self
            .inner
            .api
            .update_page(id, markdown, self.inner.client)
            .await
        {
            Ok(()) => {
                info!("Saved page {}", id);
                self.show_success(PAGE_SAVED).await;
                Ok(())
            }
            Err(e) => {
                warn!("Failed to save page {}: {}", id, e);
                self.show_error(e.alert_message()).await;
                Err(e)
            }
        }
    }

    /// Delete the persisted page and fall back to a new draft
    pub async fn delete_page(&self) -> Result<()> {
        let id = self
            .inner
            .state
            .read()
            .await
            .page
            .id
            .ok_or_else(|| WikiError::state("the current page has never been saved"))?;

        if let Err(e) = self.inner.api.delete_page(id).await {
            warn!("Failed to delete page {}: {}", id, e);
            self.show_error(e.alert_message()).await;
            return Err(e);
        }

        info!("Deleted page {}", id);
        // Failure is logged by list_pages; the draft below does not need it
        let _ = self.list_pages().await;
        self.new_page().await;
        self.show_success(PAGE_DELETED).await;
        Ok(())
    }

    pub async fn show_success(&self, message: impl Into<String>) {
        self.show_alert(Alert::success(message)).await;
    }

    pub async fn show_error(&self, message: impl Into<String>) {
        self.show_alert(Alert::error(message)).await;
    }

    async fn show_alert(&self, alert: Alert) {
        let kind = alert.kind;
        let message = alert.message.clone();
        let visible_for = kind.display_duration(
            self.inner.config.success_alert(),
            self.inner.config.error_alert(),
        );

        // The expiry must be armed before the guard drops, so the timer
        // always belongs to the newest alert
        {
            let mut state = self.inner.state.write().await;
            let generation = state.alert.show(alert);
            let controller = self.clone();
            self.inner.alert_task.arm(visible_for, async move {
                controller.expire_alert(generation).await;
            });
        }
        self.publish(EditorEvent::alert_shown(kind, message)).await;
    }

    async fn expire_alert(&self, generation: u64) {
        let expired = self.inner.state.write().await.alert.expire(generation);
        if let Some(alert) = expired {
            debug!("{} alert cleared", alert.kind);
            self.publish(EditorEvent::alert_cleared(alert.kind)).await;
        }
    }

    /// Replace the markdown source; a change re-arms the preview debounce
    pub async fn set_markdown(&self, markdown: impl Into<String>) {
        let markdown = markdown.into();
        {
            let mut state = self.inner.state.write().await;
            if state.page.markdown == markdown {
                return;
            }
            state.page.markdown = markdown.clone();
        }
        self.schedule_preview(markdown);
    }

    /// Rename the page; only drafts send their name to the server
    pub async fn set_page_name(&self, name: impl Into<String>) {
        self.inner.state.write().await.page.name = name.into();
    }

    fn schedule_preview(&self, markdown: String) {
        let controller = self.clone();
        let delay = self.inner.config.preview_debounce();
        debug!("Preview render scheduled in {:?}", delay);
        self.inner.preview_task.arm(delay, async move {
            controller.render_preview(markdown).await;
        });
    }

    async fn render_preview(&self, markdown: String) {
        let sequence = self.inner.render_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            "Render #{} via {} ({} bytes)",
            sequence,
            self.inner.renderer.renderer_name(),
            markdown.len()
        );

        let html = match self.inner.renderer.render(&markdown).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Render #{} failed: {}", sequence, e);
                return;
            }
        };

        {
            let mut state = self.inner.state.write().await;
            if self.inner.config.discard_stale_previews && sequence <= state.preview_sequence {
                debug!(
                    "Discarding render #{}, #{} already shown",
                    sequence, state.preview_sequence
                );
                return;
            }
            state.preview_html = html.clone();
            state.preview_sequence = sequence;
        }
        self.publish(EditorEvent::preview_updated(html, sequence))
            .await;
    }

    /// Check a `page.saved` notification against the loaded page.
    ///
    /// Returns whether it marked the page as modified elsewhere. Saves made
    /// by this session never do.
    pub async fn handle_page_saved(&self, notification: PageSavedNotification) -> bool {
        let conflict = {
            let mut state = self.inner.state.write().await;
            let conflict = state.page.id == Some(notification.id)
                && !notification.is_from(&self.inner.client);
            if conflict {
                state.modified_elsewhere = true;
            }
            conflict
        };

        if conflict {
            warn!(
                "Page {} was modified by another client ({})",
                notification.id,
                notification.client.as_deref().unwrap_or("unknown")
            );
            self.publish(EditorEvent::conflict_detected(
                notification.id,
                notification.client,
            ))
            .await;
        } else {
            debug!("Ignoring page.saved for page {}", notification.id);
        }
        conflict
    }

    /// Connect to the server event bus and start listening for saves
    pub async fn connect_event_bus(&self, bridge: &EventBusBridge) -> Result<()> {
        let connection = bridge.connect().await?;
        self.attach_event_bus(connection).await;
        Ok(())
    }

    /// Feed every notification of an open bridge connection to
    /// [`handle_page_saved`](Self::handle_page_saved)
    pub async fn attach_event_bus(&self, mut connection: BridgeConnection) {
        let url = connection.url().to_string();
        self.publish(EditorEvent::event_bus_connected(url.clone()))
            .await;

        let controller = self.clone();
        let listener = tokio::spawn(async move {
            while let Some(notification) = connection.next().await {
                controller.handle_page_saved(notification).await;
            }
            let reason = connection.closed().await;
            warn!(
                "Event bus {} closed: {}",
                url,
                reason.as_deref().unwrap_or("no reason given")
            );
            controller
                .publish(EditorEvent::event_bus_disconnected(reason))
                .await;
        });

        let previous = self
            .inner
            .bridge_listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(listener);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    async fn publish(&self, event: EditorEvent) {
        if let Err(e) = self.inner.events.publish(event).await {
            warn!("Failed to publish editor event: {}", e);
        }
    }

    pub async fn status(&self) -> PageStatus {
        self.inner.state.read().await.status
    }

    pub async fn page(&self) -> Page {
        self.inner.state.read().await.page.clone()
    }

    pub async fn page_exists(&self) -> bool {
        self.inner.state.read().await.page_exists()
    }

    pub async fn pages(&self) -> Vec<PageSummary> {
        self.inner.state.read().await.pages.clone()
    }

    pub fn client_id(&self) -> ClientId {
        self.inner.client
    }

    pub async fn is_modified_elsewhere(&self) -> bool {
        self.inner.state.read().await.modified_elsewhere
    }

    pub async fn alert(&self) -> Option<Alert> {
        self.inner.state.read().await.alert().cloned()
    }

    pub async fn preview_html(&self) -> String {
        self.inner.state.read().await.preview_html.clone()
    }

    /// Whether a preview render is waiting for the debounce to elapse
    pub fn preview_pending(&self) -> bool {
        self.inner.preview_task.is_pending()
    }
}
