//! Error types for Utero

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Out-of-range profile input or malformed keys.
    #[error("validation error: {0}")]
    Validation(String),

    /// Insecure session endpoint or denied device access.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Remote realtime session failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Advice or TTS service failure.
    #[error("{service} unavailable: {message}")]
    Upstream { service: String, message: String },

    /// Local storage read/write failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn permission(message: impl Into<String>) -> Self {
        Self::Permission(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn upstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    /// Message suitable for showing to the user. Upstream failures hide the
    /// service detail and only keep the friendly text.
    pub fn user_message(&self) -> String {
        match self {
            Self::Upstream { message, .. } => message.clone(),
            Self::Permission(m) | Self::Transport(m) => m.clone(),
            other => other.to_string(),
        }
    }
}
