//! Utero Gateway - Text-to-speech proxy with an origin allow-list

pub mod origin;
pub mod server;
pub mod tts;

pub use origin::OriginGuard;
pub use server::{create_router, start_proxy, ProxyState};
pub use tts::{ElevenLabsClient, SpeechSynthesizer, TtsError, TtsResult};
