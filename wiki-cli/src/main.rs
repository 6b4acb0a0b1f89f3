//! Wiki CLI - edit wiki pages from the terminal with a live HTML preview

mod console;
mod session;

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, Level};
use wiki_core::{Config, InMemoryEventBus, PageId};
use wiki_editor::EditorController;

use crate::session::{print_page_list, EditSession};

/// What to do once the configuration is loaded
#[derive(Debug, Clone)]
pub enum Action {
    List,
    Show { id: PageId, html: bool },
    Edit { file: PathBuf, page: Option<PageId> },
}

/// CLI arguments structure
#[derive(Debug, Clone)]
pub struct Args {
    pub config_file: Option<PathBuf>,
    pub server: Option<String>,
    pub token: Option<String>,
    pub dev_mode: bool,
    pub action: Action,
}

impl Args {
    fn command() -> Command {
        Command::new("wiki")
            .version("0.1.0")
            .about("Edit wiki pages with a live markdown preview")
            .long_about(
                "Lists, shows and edits pages of a wiki server. The edit command mirrors \
                a page into a local markdown file, renders a preview next to it whenever \
                the file changes and warns when someone else saves the same page.",
            )
            .subcommand_required(true)
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .global(true)
                    .help("Path to configuration file (JSON format)")
                    .value_parser(clap::value_parser!(PathBuf)),
            )
            .arg(
                Arg::new("server")
                    .short('s')
                    .long("server")
                    .global(true)
                    .help("Base URL of the wiki server")
                    .value_parser(clap::value_parser!(String)),
            )
            .arg(
                Arg::new("token")
                    .long("token")
                    .global(true)
                    .help("API token sent as a bearer credential")
                    .value_parser(clap::value_parser!(String)),
            )
            .arg(
                Arg::new("dev-mode")
                    .long("dev-mode")
                    .global(true)
                    .help("Enable development mode with enhanced logging")
                    .action(clap::ArgAction::SetTrue),
            )
            .subcommand(Command::new("list").about("List pages"))
            .subcommand(
                Command::new("show")
                    .about("Print a page")
                    .arg(
                        Arg::new("id")
                            .help("Page id")
                            .required(true)
                            .value_parser(clap::value_parser!(i64)),
                    )
                    .arg(
                        Arg::new("html")
                            .long("html")
                            .help("Print the rendered HTML instead of the markdown")
                            .action(clap::ArgAction::SetTrue),
                    ),
            )
            .subcommand(
                Command::new("edit")
                    .about("Edit a page through a local file")
                    .arg(
                        Arg::new("file")
                            .help("Markdown file mirroring the page; the preview goes to <file>.html")
                            .required(true)
                            .value_parser(clap::value_parser!(PathBuf)),
                    )
                    .arg(
                        Arg::new("page")
                            .short('p')
                            .long("page")
                            .help("Page to open instead of a new one")
                            .value_parser(clap::value_parser!(i64)),
                    ),
            )
            .after_help(
                "EXAMPLES:\n    \
                wiki list                                 List pages on http://localhost:8080\n    \
                wiki --server https://wiki.example.com show 3\n    \
                wiki edit notes.md                        Start a new page\n    \
                wiki edit notes.md --page 3               Edit page 3",
            )
    }

    /// Parse command line arguments
    pub fn parse() -> Self {
        Self::from_matches(&Self::command().get_matches())
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        let action = match matches.subcommand() {
            Some(("show", sub)) => Action::Show {
                id: PageId(sub.get_one::<i64>("id").copied().unwrap_or_default()),
                html: sub.get_flag("html"),
            },
            Some(("edit", sub)) => Action::Edit {
                file: sub.get_one::<PathBuf>("file").cloned().unwrap_or_default(),
                page: sub.get_one::<i64>("page").copied().map(PageId),
            },
            _ => Action::List,
        };

        Self {
            config_file: matches.get_one::<PathBuf>("config").cloned(),
            server: matches.get_one::<String>("server").cloned(),
            token: matches.get_one::<String>("token").cloned(),
            dev_mode: matches.get_flag("dev-mode"),
            action,
        }
    }

    /// Load the configuration and apply command line overrides
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config_file.as_deref())?;
        if let Some(server) = &self.server {
            config.server.base_url = server.clone();
        }
        if let Some(token) = &self.token {
            config.server.api_token = Some(token.clone());
        }
        config.validate()?;
        Ok(config)
    }
}

async fn show_page(config: &Config, id: PageId, html: bool) -> Result<()> {
    let controller = EditorController::from_config(config, Arc::new(InMemoryEventBus::new()))?;
    controller
        .load_page(id)
        .await
        .with_context(|| format!("failed to load page {}", id))?;

    if html {
        println!("{}", controller.preview_html().await);
    } else {
        let page = controller.page().await;
        println!("# {} ({})\n", page.name, id);
        print!("{}", page.markdown);
    }
    Ok(())
}

async fn list_pages(config: &Config) -> Result<()> {
    let controller = EditorController::from_config(config, Arc::new(InMemoryEventBus::new()))?;
    print_page_list(&controller).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.dev_mode {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(args.dev_mode)
        .with_line_number(args.dev_mode)
        .with_file(args.dev_mode);

    if args.dev_mode {
        subscriber.with_ansi(true).pretty().init();
        info!("🔧 Development mode enabled");
    } else {
        subscriber.with_ansi(true).init();
    }

    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Invalid configuration:\n{:#}", e);
            std::process::exit(1);
        }
    };
    info!("Using wiki server {}", config.server.base_url);

    let outcome = match args.action {
        Action::List => list_pages(&config).await,
        Action::Show { id, html } => show_page(&config, id, html).await,
        Action::Edit { file, page } => match EditSession::start(config, file, page).await {
            Ok(session) => session.run().await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = outcome {
        error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::from_matches(&Args::command().try_get_matches_from(argv).unwrap())
    }

    #[test]
    fn test_parse_edit_with_globals() {
        let args = parse(&[
            "wiki",
            "edit",
            "notes.md",
            "--page",
            "3",
            "--server",
            "http://wiki.local:8080",
            "--dev-mode",
        ]);
        assert!(args.dev_mode);
        assert_eq!(args.server.as_deref(), Some("http://wiki.local:8080"));
        match args.action {
            Action::Edit { file, page } => {
                assert_eq!(file, PathBuf::from("notes.md"));
                assert_eq!(page, Some(PageId(3)));
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_parse_show() {
        let args = parse(&["wiki", "--token", "jwt", "show", "7", "--html"]);
        assert_eq!(args.token.as_deref(), Some("jwt"));
        assert!(matches!(args.action, Action::Show { id: PageId(7), html: true }));
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Args::command().try_get_matches_from(["wiki"]).is_err());
    }

    #[test]
    fn test_command_line_overrides_config() {
        let mut args = parse(&["wiki", "list"]);
        args.config_file = Some(PathBuf::from("/nonexistent/wiki.json"));
        assert!(args.load_config().is_err());

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        Config::default().save_to_file(&path).unwrap();

        args.config_file = Some(path);
        args.server = Some("https://wiki.example.com".to_string());
        args.token = Some("jwt".to_string());
        let config = args.load_config().unwrap();
        assert_eq!(config.server.base_url, "https://wiki.example.com");
        assert_eq!(config.server.api_token.as_deref(), Some("jwt"));
    }
}
