//! Common error types for Melodex

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Common result type for Melodex operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fallback text when the backend rejects a request without a message
pub const GENERIC_FAILURE: &str = "Request failed";

/// Error categories surfaced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Application,
    Unauthorized,
    Validation,
    Decode,
    Config,
    Io,
}

/// Common error types across Melodex crates
#[derive(Error, Debug)]
pub enum Error {
    /// Request never reached the backend, or no response arrived in time
    #[error("Network error: {0}")]
    Network(String),

    /// Response received but the envelope code is not the success value
    #[error("Application error {code}: {}", .message.as_deref().unwrap_or(GENERIC_FAILURE))]
    Application {
        code: String,
        message: Option<String>,
    },

    /// HTTP 401 or 403
    #[error("Unauthorized (HTTP {0})")]
    Unauthorized(u16),

    /// Caught before any request was sent
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Body was not a readable envelope
    #[error("Decode error: {0}")]
    Decode(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Network(_) => ErrorKind::Network,
            Error::Application { .. } => ErrorKind::Application,
            Error::Unauthorized(_) => ErrorKind::Unauthorized,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Decode(_) => ErrorKind::Decode,
            Error::Config(_) => ErrorKind::Config,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Text shown in a notification for this error
    pub fn user_message(&self) -> String {
        match self {
            Error::Network(_) => "Network error, please check your connection".to_string(),
            Error::Application { code, message } => match message {
                Some(msg) if !msg.trim().is_empty() => msg.clone(),
                _ => format!("{} (code {})", GENERIC_FAILURE, code),
            },
            Error::Unauthorized(_) => "Session expired, please sign in again".to_string(),
            Error::Validation(msg) => msg.clone(),
            Error::Decode(_) => "Unexpected response from server".to_string(),
            Error::Config(msg) => format!("Configuration error: {}", msg),
            Error::Io(e) => format!("File error: {}", e),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Unauthorized(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}
