//! Voice session errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    /// Endpoint is neither TLS nor loopback.
    #[error("{0}")]
    InsecureContext(String),

    #[error("Microphone access failed: {0}")]
    Microphone(String),

    #[error("audio device error: {0}")]
    Device(String),

    #[error("invalid audio data: {0}")]
    Audio(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("session closed: {0}")]
    Closed(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("a voice session is already active")]
    AlreadyActive,
}

pub type VoiceResult<T> = Result<T, VoiceError>;

impl From<VoiceError> for utero_core::Error {
    fn from(err: VoiceError) -> Self {
        match err {
            VoiceError::InsecureContext(_) | VoiceError::Microphone(_) => {
                utero_core::Error::permission(err.to_string())
            }
            other => utero_core::Error::transport(other.to_string()),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for VoiceError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        VoiceError::Connect(err.to_string())
    }
}
