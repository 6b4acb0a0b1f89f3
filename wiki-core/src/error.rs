//! Error handling for the wiki editor

use thiserror::Error;

/// Result type alias for wiki editor operations
pub type Result<T> = std::result::Result<T, WikiError>;

/// Main error type for the wiki editor
#[derive(Error, Debug)]
pub enum WikiError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport failures talking to the wiki server
    #[error("HTTP error: {0}")]
    Http(String),

    /// The server answered with an error envelope
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Event bus errors, local or remote
    #[error("Event bus error: {0}")]
    EventBus(String),

    /// Preview rendering errors
    #[error("Rendering error: {0}")]
    Rendering(String),

    /// Operation not valid for the current editor state
    #[error("State error: {0}")]
    State(String),

    /// Malformed server or event bus address
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WikiError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new transport error
    pub fn http<S: Into<String>>(msg: S) -> Self {
        Self::Http(msg.into())
    }

    /// Create a new API error from a status code and server message
    pub fn api<S: Into<String>>(status: u16, msg: S) -> Self {
        Self::Api {
            status,
            message: msg.into(),
        }
    }

    /// Create a new event bus error
    pub fn event_bus<S: Into<String>>(msg: S) -> Self {
        Self::EventBus(msg.into())
    }

    /// Create a new rendering error
    pub fn rendering<S: Into<String>>(msg: S) -> Self {
        Self::Rendering(msg.into())
    }

    /// Create a new state error
    pub fn state<S: Into<String>>(msg: S) -> Self {
        Self::State(msg.into())
    }

    /// Message to surface in an error alert.
    ///
    /// API errors carry the server's own message verbatim; everything else
    /// falls back to the error's display form.
    pub fn alert_message(&self) -> String {
        match self {
            WikiError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
