//! Terminal and preview-file output for an edit session

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;
use wiki_core::{AlertKind, EditorEvent, EditorEventHandler, Result};

/// Path of the preview document written next to an edited file
pub fn preview_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_owned();
    name.push(".html");
    PathBuf::from(name)
}

/// Wrap a rendered fragment into a standalone HTML document
pub fn preview_document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        html_escape::encode_text(title),
        body
    )
}

/// Prints alerts and conflicts, and keeps the preview file current
pub struct ConsoleReporter {
    preview_file: PathBuf,
    title: Mutex<String>,
}

impl ConsoleReporter {
    pub fn new(edited_file: &Path) -> Self {
        Self {
            preview_file: preview_path(edited_file),
            title: Mutex::new(String::new()),
        }
    }

    pub fn preview_file(&self) -> &Path {
        &self.preview_file
    }

    async fn write_preview(&self, html: &str) -> Result<()> {
        let title = self.title.lock().await.clone();
        tokio::fs::write(&self.preview_file, preview_document(&title, html)).await?;
        debug!("Preview written to {}", self.preview_file.display());
        Ok(())
    }
}

#[async_trait]
impl EditorEventHandler for ConsoleReporter {
    async fn handle_event(&self, event: &EditorEvent) -> Result<()> {
        match event {
            EditorEvent::PageLoaded { id, name, .. } => {
                *self.title.lock().await = name.clone();
                println!("📄 Page {} '{}'", id, name);
            }
            EditorEvent::DraftStarted { name, .. } => {
                *self.title.lock().await = name.clone();
                println!("📝 New page '{}' (not saved yet)", name);
            }
            EditorEvent::PreviewUpdated { html, .. } => self.write_preview(html).await?,
            EditorEvent::AlertShown { kind, message, .. } => match kind {
                AlertKind::Success => println!("✅ {}", message),
                AlertKind::Error => println!("❌ {}", message),
            },
            EditorEvent::ConflictDetected { id, .. } => {
                println!(
                    "⚠️  Page {} has been modified by another user. Saving will overwrite their changes.",
                    id
                );
            }
            EditorEvent::EventBusConnected { url, .. } => {
                println!("📡 Listening for page updates on {}", url);
            }
            EditorEvent::EventBusDisconnected { .. } => {
                println!("📡 Page update notifications stopped");
            }
            _ => {}
        }
        Ok(())
    }

    fn handler_name(&self) -> &str {
        "ConsoleReporter"
    }
}
