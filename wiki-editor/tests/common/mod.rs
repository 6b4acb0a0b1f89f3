#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use wiki_client::{MarkdownRenderer, WikiApi};
use wiki_core::{
    ChannelEventHandler, ClientId, EditorConfig, EditorEvent, EditorEventHandler, EventBus,
    InMemoryEventBus, Page, PageId, PageSummary, Result, WikiError,
};
use wiki_editor::EditorController;

/// Page store standing in for the wiki server
#[derive(Default)]
pub struct MemoryWiki {
    pages: Mutex<Vec<Page>>,
    next_id: Mutex<i64>,
    create_failure: Mutex<Option<WikiError>>,
    update_failure: Mutex<Option<WikiError>>,
    delete_failure: Mutex<Option<WikiError>>,
    pub updates: Mutex<Vec<(PageId, String, ClientId)>>,
}

impl MemoryWiki {
    pub fn with_pages(pages: &[(&str, &str)]) -> Arc<Self> {
        let wiki = Arc::new(Self::default());
        for (name, markdown) in pages {
            wiki.insert(name, markdown);
        }
        wiki
    }

    pub fn insert(&self, name: &str, markdown: &str) -> PageId {
        let mut next_id = self.next_id.lock().unwrap();
        let id = PageId(*next_id);
        *next_id += 1;
        self.pages.lock().unwrap().push(Page {
            id: Some(id),
            name: name.to_string(),
            markdown: markdown.to_string(),
            html: String::new(),
        });
        id
    }

    pub fn fail_next_create(&self, error: WikiError) {
        *self.create_failure.lock().unwrap() = Some(error);
    }

    pub fn fail_next_update(&self, error: WikiError) {
        *self.update_failure.lock().unwrap() = Some(error);
    }

    pub fn fail_next_delete(&self, error: WikiError) {
        *self.delete_failure.lock().unwrap() = Some(error);
    }

    pub fn page(&self, id: PageId) -> Option<Page> {
        self.pages
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == Some(id))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.pages.lock().unwrap().len()
    }
}

fn no_such_page(id: PageId) -> WikiError {
    WikiError::api(404, format!("There is no page with ID {}", id))
}

#[async_trait]
impl WikiApi for MemoryWiki {
    async fn list_pages(&self) -> Result<Vec<PageSummary>> {
        Ok(self
            .pages
            .lock()
            .unwrap()
            .iter()
            .map(|p| PageSummary {
                id: p.id.unwrap(),
                name: p.name.clone(),
            })
            .collect())
    }

    async fn fetch_page(&self, id: PageId) -> Result<Page> {
        let mut page = self.page(id).ok_or_else(|| no_such_page(id))?;
        page.html = format!("<server>{}</server>", page.markdown);
        Ok(page)
    }

    async fn create_page(&self, name: &str, markdown: &str) -> Result<()> {
        if let Some(error) = self.create_failure.lock().unwrap().take() {
            return Err(error);
        }
        self.insert(name, markdown);
        Ok(())
    }

    async fn update_page(&self, id: PageId, markdown: &str, client: ClientId) -> Result<()> {
        if let Some(error) = self.update_failure.lock().unwrap().take() {
            return Err(error);
        }
        self.updates
            .lock()
            .unwrap()
            .push((id, markdown.to_string(), client));
        let mut pages = self.pages.lock().unwrap();
        let page = pages
            .iter_mut()
            .find(|p| p.id == Some(id))
            .ok_or_else(|| no_such_page(id))?;
        page.markdown = markdown.to_string();
        Ok(())
    }

    async fn delete_page(&self, id: PageId) -> Result<()> {
        if let Some(error) = self.delete_failure.lock().unwrap().take() {
            return Err(error);
        }
        self.pages.lock().unwrap().retain(|p| p.id != Some(id));
        Ok(())
    }
}

/// Renderer recording every request; inputs listed in `delays` take that
/// long to come back
#[derive(Default)]
pub struct RecordingRenderer {
    pub requests: Mutex<Vec<String>>,
    delays: HashMap<String, Duration>,
}

impl RecordingRenderer {
    pub fn with_delays(delays: &[(&str, Duration)]) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            delays: delays
                .iter()
                .map(|(markdown, delay)| (markdown.to_string(), *delay))
                .collect(),
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarkdownRenderer for RecordingRenderer {
    async fn render(&self, markdown: &str) -> Result<String> {
        self.requests.lock().unwrap().push(markdown.to_string());
        if let Some(delay) = self.delays.get(markdown) {
            tokio::time::sleep(*delay).await;
        }
        Ok(format!("<p>{}</p>", markdown))
    }

    fn renderer_name(&self) -> &str {
        "RecordingRenderer"
    }
}

/// Handler that yields back to the scheduler several times when a given
/// alert is shown, so concurrent work can overtake its publication
pub struct YieldingHandler {
    message: String,
    yields: usize,
}

impl YieldingHandler {
    pub fn on_alert(message: &str, yields: usize) -> Arc<Self> {
        Arc::new(Self {
            message: message.to_string(),
            yields,
        })
    }
}

#[async_trait]
impl EditorEventHandler for YieldingHandler {
    async fn handle_event(&self, event: &EditorEvent) -> Result<()> {
        if matches!(event, EditorEvent::AlertShown { message, .. } if *message == self.message) {
            for _ in 0..self.yields {
                tokio::task::yield_now().await;
            }
        }
        Ok(())
    }

    fn handler_name(&self) -> &str {
        "YieldingHandler"
    }
}

pub struct Harness {
    pub controller: EditorController,
    pub bus: Arc<InMemoryEventBus>,
    pub wiki: Arc<MemoryWiki>,
    pub renderer: Arc<RecordingRenderer>,
    pub events: mpsc::UnboundedReceiver<EditorEvent>,
}

impl Harness {
    pub async fn new(wiki: Arc<MemoryWiki>) -> Self {
        Self::with(wiki, RecordingRenderer::default(), EditorConfig::default()).await
    }

    pub async fn with(
        wiki: Arc<MemoryWiki>,
        renderer: RecordingRenderer,
        config: EditorConfig,
    ) -> Self {
        let bus = Arc::new(InMemoryEventBus::new());
        let (handler, events) = ChannelEventHandler::channel();
        bus.subscribe(handler).await.unwrap();

        let renderer = Arc::new(renderer);
        let controller =
            EditorController::new(wiki.clone(), renderer.clone(), bus.clone(), config);
        Self {
            controller,
            bus,
            wiki,
            renderer,
            events,
        }
    }

    /// Events published so far
    pub fn drain_events(&mut self) -> Vec<EditorEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Let spawned tasks run without moving the paused clock
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Advance the paused clock and let woken tasks run
pub async fn advance_ms(ms: u64) {
    tokio::time::advance(Duration::from_millis(ms)).await;
    settle().await;
}
