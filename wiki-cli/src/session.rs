//! Interactive edit session
//!
//! The page being edited is mirrored into a local file. Saving the file
//! updates the preview; commands typed on stdin drive the page CRUD.

use anyhow::{bail, Context, Result};
use notify::{EventKind, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use wiki_client::EventBusBridge;
use wiki_core::{Config, EventBus, InMemoryEventBus, PageId};
use wiki_editor::EditorController;

use crate::console::ConsoleReporter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Save,
    Delete,
    New,
    Load(PageId),
    Name(String),
    List,
    Help,
    Quit,
}

impl SessionCommand {
    /// Parse one stdin line; `Ok(None)` for blank lines
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word {
            "" => return Ok(None),
            "save" | "s" => SessionCommand::Save,
            "delete" => SessionCommand::Delete,
            "new" => SessionCommand::New,
            "list" | "ls" => SessionCommand::List,
            "help" | "?" => SessionCommand::Help,
            "quit" | "exit" | "q" => SessionCommand::Quit,
            "load" | "open" => {
                let id = rest
                    .parse()
                    .with_context(|| format!("'{}' is not a page id", rest))?;
                SessionCommand::Load(id)
            }
            "name" => {
                if rest.is_empty() {
                    bail!("usage: name <page name>");
                }
                SessionCommand::Name(rest.to_string())
            }
            other => bail!("unknown command '{}', type 'help' for a list", other),
        };
        Ok(Some(command))
    }
}

const HELP: &str = "\
Commands:
  save          create the page or save your changes
  delete        delete the current page
  new           start a new page
  load <id>     open a page
  name <text>   rename the new page before its first save
  list          list pages
  quit          leave the editor";

pub struct EditSession {
    controller: EditorController,
    file: PathBuf,
    config: Config,
}

impl EditSession {
    pub async fn start(config: Config, file: PathBuf, page: Option<PageId>) -> Result<Self> {
        let bus = Arc::new(InMemoryEventBus::new());
        let reporter = Arc::new(ConsoleReporter::new(&file));
        println!("🌐 Preview: {}", reporter.preview_file().display());
        bus.subscribe(reporter).await?;

        let controller = EditorController::from_config(&config, bus)?;
        controller.initialize().await;
        if let Some(id) = page {
            controller
                .load_page(id)
                .await
                .with_context(|| format!("failed to open page {}", id))?;
        }

        let session = Self {
            controller,
            file,
            config,
        };
        session.mirror_page().await?;
        Ok(session)
    }

    /// Write the current page's markdown into the edited file
    async fn mirror_page(&self) -> Result<()> {
        let markdown = self.controller.page().await.markdown;
        tokio::fs::write(&self.file, markdown)
            .await
            .with_context(|| format!("failed to write {}", self.file.display()))?;
        debug!("Mirrored page into {}", self.file.display());
        Ok(())
    }

    async fn connect_event_bus(&self) {
        if !self.config.event_bus.enabled {
            return;
        }
        let result = match EventBusBridge::from_config(&self.config) {
            Ok(bridge) => self.controller.connect_event_bus(&bridge).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!("Conflict warnings disabled: {}", e);
        }
    }

    pub async fn run(self) -> Result<()> {
        self.connect_event_bus().await;

        // Editors often save by replacing the file, so watch its directory
        let watched = tokio::fs::canonicalize(&self.file)
            .await
            .with_context(|| format!("failed to resolve {}", self.file.display()))?;
        let directory = watched
            .parent()
            .map(Path::to_path_buf)
            .context("edited file has no parent directory")?;
        let file_name = watched.file_name().map(|name| name.to_owned());

        let (changes_tx, mut changes) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event)
                    if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
                        && event
                            .paths
                            .iter()
                            .any(|path| path.file_name() == file_name.as_deref()) =>
                {
                    let _ = changes_tx.send(());
                }
                Ok(_) => {}
                Err(e) => warn!("File watch error: {}", e),
            }
        })
        .context("failed to create file watcher")?;
        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", directory.display()))?;

        println!("✏️  Editing {}. Type 'help' for commands.", self.file.display());
        info!("Edit session started for {}", self.file.display());

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
                Some(()) = changes.recv() => self.reload_file().await,
                line = lines.next_line() => match line? {
                    Some(line) => match SessionCommand::parse(&line) {
                        Ok(Some(SessionCommand::Quit)) => break,
                        Ok(Some(command)) => self.execute(command).await,
                        Ok(None) => {}
                        Err(e) => println!("{}", e),
                    },
                    None => break,
                },
            }
        }

        drop(watcher);
        self.controller.shutdown();
        println!("👋 Bye");
        Ok(())
    }

    async fn reload_file(&self) {
        match tokio::fs::read_to_string(&self.file).await {
            Ok(markdown) => self.controller.set_markdown(markdown).await,
            Err(e) => warn!("Failed to read {}: {}", self.file.display(), e),
        }
    }

    async fn execute(&self, command: SessionCommand) {
        let replaces_page = matches!(
            command,
            SessionCommand::Save
                | SessionCommand::Delete
                | SessionCommand::New
                | SessionCommand::Load(_)
        );

        let outcome: Result<()> = match command {
            SessionCommand::Save => {
                // The editor may hold changes the watcher has not reported yet
                self.reload_file().await;
                self.controller.save_page().await.map_err(Into::into)
            }
            SessionCommand::Delete => self.controller.delete_page().await.map_err(Into::into),
            SessionCommand::New => {
                self.controller.new_page().await;
                Ok(())
            }
            SessionCommand::Load(id) => self.controller.load_page(id).await.map_err(Into::into),
            SessionCommand::Name(name) => {
                if self.controller.page_exists().await {
                    println!("Only new pages can be renamed");
                } else {
                    self.controller.set_page_name(name).await;
                }
                Ok(())
            }
            SessionCommand::List => print_page_list(&self.controller).await,
            SessionCommand::Help => {
                println!("{}", HELP);
                Ok(())
            }
            SessionCommand::Quit => Ok(()),
        };

        match outcome {
            Ok(()) if replaces_page => {
                if let Err(e) = self.mirror_page().await {
                    error!("{:#}", e);
                }
            }
            Ok(()) => {}
            Err(e) => error!("{}", e),
        }
    }
}

/// Print the page list, marking the page currently open
pub async fn print_page_list(controller: &EditorController) -> Result<()> {
    let pages = controller.list_pages().await?;
    if pages.is_empty() {
        println!("No pages yet");
        return Ok(());
    }
    let current = controller.page().await.id;
    for page in pages {
        let marker = if Some(page.id) == current { "*" } else { " " };
        println!("{} {:>4}  {}", marker, page.id, page.name);
    }
    Ok(())
}
