//! Configuration management for the wiki editor

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::{Result, WikiError};

/// Default name of a fresh draft
pub const DEFAULT_PAGE_NAME: &str = "Example page";

/// Default markdown of a fresh draft
pub const DEFAULT_MARKDOWN: &str = "# Example page\n\nSome text _here_.\n";

/// Main editor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub editor: EditorConfig,
    pub event_bus: EventBusConfig,
}

impl Config {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| WikiError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| WikiError::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| WikiError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| WikiError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Default location of the configuration file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wiki-editor").join("config.json"))
    }

    /// Load configuration from an explicit file, the default location, or defaults,
    /// then apply `WIKI_*` environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(default) if default.exists() => {
                    tracing::debug!("Loading configuration from {}", default.display());
                    Self::from_file(&default)?
                }
                _ => Self::new(),
            },
        };

        let env: HashMap<String, String> = std::env::vars()
            .filter(|(key, _)| key.starts_with("WIKI_"))
            .collect();
        config.apply_environment_overrides(&env)?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_environment_overrides(
        &mut self,
        env_overrides: &HashMap<String, String>,
    ) -> Result<()> {
        for (key, value) in env_overrides {
            match key.as_str() {
                "WIKI_SERVER_URL" => self.server.base_url = value.clone(),
                "WIKI_API_TOKEN" => {
                    self.server.api_token = if value.is_empty() {
                        None
                    } else {
                        Some(value.clone())
                    };
                }
                "WIKI_PREVIEW_DEBOUNCE_MS" => {
                    self.editor.preview_debounce_ms = value.parse().map_err(|_| {
                        WikiError::Config(format!(
                            "Invalid debounce delay in environment variable: {}",
                            value
                        ))
                    })?;
                }
                "WIKI_EVENT_BUS_ENABLED" => {
                    self.event_bus.enabled = value.parse().map_err(|_| {
                        WikiError::Config(format!(
                            "Invalid boolean in environment variable: {}",
                            value
                        ))
                    })?;
                }
                _ => {
                    // Ignore unknown environment variables
                }
            }
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let base = self.server.base_url()?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(WikiError::Config(format!(
                "Server URL must use http or https: {}",
                self.server.base_url
            )));
        }

        if self.server.request_timeout_secs == 0 {
            return Err(WikiError::Config("Request timeout must be positive".to_string()));
        }

        if self.editor.success_alert_ms == 0 || self.editor.error_alert_ms == 0 {
            return Err(WikiError::Config(
                "Alert durations must be positive".to_string(),
            ));
        }

        if !self.event_bus.path.starts_with('/') {
            return Err(WikiError::Config(format!(
                "Event bus path must start with '/': {}",
                self.event_bus.path
            )));
        }

        if self.event_bus.enabled && self.event_bus.ping_interval_secs == 0 {
            return Err(WikiError::Config(
                "Event bus ping interval must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// WebSocket address of the server's event bus bridge.
    ///
    /// Follows the page's own scheme: `http` maps to `ws`, `https` to `wss`.
    pub fn event_bus_url(&self) -> Result<Url> {
        let mut url = self.server.base_url()?;
        let scheme = match url.scheme() {
            "https" => "wss",
            "http" => "ws",
            other => {
                return Err(WikiError::Config(format!(
                    "Unsupported server scheme: {}",
                    other
                )))
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| WikiError::Config("Failed to derive event bus scheme".to_string()))?;
        url.set_path(&format!(
            "{}/websocket",
            self.event_bus.path.trim_end_matches('/')
        ));
        Ok(url)
    }
}

/// Wiki server connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// Parsed base URL
    pub fn base_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.base_url)?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_token: None,
            request_timeout_secs: 30,
        }
    }
}

/// Which renderer produces the live preview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// POST the markdown to the server's render endpoint
    #[default]
    Remote,
    /// Render in-process
    Local,
}

/// Editor behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub default_page_name: String,
    pub default_markdown: String,
    pub preview_debounce_ms: u64,
    pub success_alert_ms: u64,
    pub error_alert_ms: u64,
    pub renderer: RendererKind,
    /// Drop render responses that arrive after a newer one was applied
    pub discard_stale_previews: bool,
}

impl EditorConfig {
    pub fn preview_debounce(&self) -> Duration {
        Duration::from_millis(self.preview_debounce_ms)
    }

    pub fn success_alert(&self) -> Duration {
        Duration::from_millis(self.success_alert_ms)
    }

    pub fn error_alert(&self) -> Duration {
        Duration::from_millis(self.error_alert_ms)
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_page_name: DEFAULT_PAGE_NAME.to_string(),
            default_markdown: DEFAULT_MARKDOWN.to_string(),
            preview_debounce_ms: 300,
            success_alert_ms: 3000,
            error_alert_ms: 5000,
            renderer: RendererKind::default(),
            discard_stale_previews: false,
        }
    }
}

/// Server event bus bridge settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventBusConfig {
    pub enabled: bool,
    pub path: String,
    pub ping_interval_secs: u64,
}

impl EventBusConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/eventbus".to_string(),
            ping_interval_secs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_defaults() {
        let config = Config::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.base_url, "http://localhost:8080");
        assert_eq!(config.editor.preview_debounce(), Duration::from_millis(300));
        assert_eq!(config.editor.success_alert(), Duration::from_millis(3000));
        assert_eq!(config.editor.error_alert(), Duration::from_millis(5000));
        assert_eq!(config.editor.default_page_name, "Example page");
        assert_eq!(config.editor.renderer, RendererKind::Remote);
        assert!(!config.editor.discard_stale_previews);
    }

    #[test]
    fn test_config_file_operations() {
        let mut config = Config::new();
        config.server.base_url = "https://wiki.example.org".to_string();
        config.editor.renderer = RendererKind::Local;

        let temp_file = NamedTempFile::new().unwrap();
        assert!(config.save_to_file(temp_file.path()).is_ok());

        let loaded = Config::from_file(temp_file.path()).unwrap();
        assert_eq!(loaded.server.base_url, "https://wiki.example.org");
        assert_eq!(loaded.editor.renderer, RendererKind::Local);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), r#"{"editor":{"preview_debounce_ms":50}}"#).unwrap();

        let loaded = Config::from_file(temp_file.path()).unwrap();
        assert_eq!(loaded.editor.preview_debounce_ms, 50);
        assert_eq!(loaded.editor.error_alert_ms, 5000);
        assert_eq!(loaded.event_bus.path, "/eventbus");
    }

    #[test]
    fn test_environment_overrides() {
        let mut config = Config::new();
        let mut env = HashMap::new();
        env.insert("WIKI_SERVER_URL".to_string(), "http://10.0.0.2:9000".to_string());
        env.insert("WIKI_API_TOKEN".to_string(), "secret".to_string());
        env.insert("WIKI_PREVIEW_DEBOUNCE_MS".to_string(), "120".to_string());
        env.insert("WIKI_EVENT_BUS_ENABLED".to_string(), "false".to_string());

        config.apply_environment_overrides(&env).unwrap();
        assert_eq!(config.server.base_url, "http://10.0.0.2:9000");
        assert_eq!(config.server.api_token.as_deref(), Some("secret"));
        assert_eq!(config.editor.preview_debounce_ms, 120);
        assert!(!config.event_bus.enabled);

        let mut bad = HashMap::new();
        bad.insert("WIKI_PREVIEW_DEBOUNCE_MS".to_string(), "soon".to_string());
        assert!(config.apply_environment_overrides(&bad).is_err());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::new();
        config.server.base_url = "ftp://wiki".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::new();
        config.server.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::new();
        config.event_bus.path = "eventbus".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_event_bus_url() {
        let mut config = Config::new();
        assert_eq!(
            config.event_bus_url().unwrap().as_str(),
            "ws://localhost:8080/eventbus/websocket"
        );

        config.server.base_url = "https://wiki.example.org/".to_string();
        assert_eq!(
            config.event_bus_url().unwrap().as_str(),
            "wss://wiki.example.org/eventbus/websocket"
        );
    }
}
