//! Utero - Menstrual cycle tracker with an advice client and a voice assistant

pub mod config;
pub mod render;

pub use config::{elevenlabs_api_key, gemini_api_key, UteroConfig, CONFIG_FILE};
