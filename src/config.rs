//! Utero configuration
//!
//! Every tunable in one place. Loaded from TOML at startup, falls back to
//! defaults if no config file exists. Secrets only come from the environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use utero_core::ProxyConfig;
use utero_llm::DEFAULT_ADVICE_MODEL;
use utero_voice::{VoiceConfig, DEFAULT_LIVE_MODEL, GEMINI_LIVE_URL};

pub const CONFIG_FILE: &str = "utero.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UteroConfig {
    pub storage: StorageConfig,
    pub advice: AdviceConfig,
    pub voice: VoiceSettings,
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the JSON documents.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let home = std::env::var("HOME").map(PathBuf::from).unwrap_or_default();
        Self {
            data_dir: home.join(".utero"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdviceConfig {
    pub model: String,
    /// Override for the generative-language API root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for AdviceConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_ADVICE_MODEL.to_string(),
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub model: String,
    pub endpoint: String,
    pub frame_size: usize,
    pub input_sample_rate: u32,
    pub output_sample_rate: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        let defaults = VoiceConfig::default();
        Self {
            model: DEFAULT_LIVE_MODEL.to_string(),
            endpoint: GEMINI_LIVE_URL.to_string(),
            frame_size: defaults.frame_size,
            input_sample_rate: defaults.input_sample_rate,
            output_sample_rate: defaults.output_sample_rate,
            voice_name: None,
            system_instruction: None,
        }
    }
}

impl VoiceSettings {
    pub fn to_voice_config(&self) -> VoiceConfig {
        VoiceConfig {
            model: self.model.clone(),
            frame_size: self.frame_size.max(1),
            input_sample_rate: self.input_sample_rate,
            output_sample_rate: self.output_sample_rate,
            system_instruction: self.system_instruction.clone(),
            voice_name: self.voice_name.clone(),
        }
    }
}

// ============================================================
// Loading
// ============================================================

impl UteroConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}; using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::debug!("No config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Apply `PORT` and `ALLOWED_ORIGINS` from the environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var("PORT").ok().as_deref(),
            std::env::var("ALLOWED_ORIGINS").ok().as_deref(),
        );
    }

    fn apply_overrides(&mut self, port: Option<&str>, origins: Option<&str>) {
        if let Some(port) = port {
            match port.trim().parse() {
                Ok(p) => self.proxy.port = p,
                Err(_) => tracing::warn!("Ignoring invalid PORT {:?}", port),
            }
        }
        if let Some(origins) = origins {
            self.proxy.allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
    }
}

/// Key for the generative-language API (`GEMINI_API_KEY`, then `API_KEY`).
pub fn gemini_api_key() -> Option<String> {
    ["GEMINI_API_KEY", "API_KEY"]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|k| !k.trim().is_empty())
}

pub fn elevenlabs_api_key() -> Option<String> {
    std::env::var("ELEVENLABS_API_KEY").ok().filter(|k| !k.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: UteroConfig = toml::from_str(
            r#"
            [voice]
            frame_size = 2048

            [proxy]
            port = 9000
            "#,
        )
        .unwrap();
        assert_eq!(config.voice.frame_size, 2048);
        assert_eq!(config.voice.input_sample_rate, 16000);
        assert_eq!(config.voice.model, DEFAULT_LIVE_MODEL);
        assert_eq!(config.proxy.port, 9000);
        assert_eq!(config.proxy.default_voice, "alloy");
        assert_eq!(config.advice.model, DEFAULT_ADVICE_MODEL);
    }

    #[test]
    fn test_default_toml_round_trips() {
        let text = UteroConfig::default().to_toml();
        assert!(text.contains("[proxy]"));
        let parsed: UteroConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.proxy.port, 5178);
        assert_eq!(parsed.voice.endpoint, GEMINI_LIVE_URL);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = UteroConfig::default();
        config.apply_overrides(Some("8080"), Some("http://a.test, http://b.test"));
        assert_eq!(config.proxy.port, 8080);
        assert_eq!(config.proxy.allowed_origins, vec!["http://a.test", "http://b.test"]);

        config.apply_overrides(Some("not-a-port"), None);
        assert_eq!(config.proxy.port, 8080);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = UteroConfig::load(Path::new("/nonexistent/utero.toml"));
        assert_eq!(config.proxy.port, 5178);
    }
}
