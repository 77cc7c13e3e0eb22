//! Speech synthesis upstream

use bytes::Bytes;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, error};

const ELEVENLABS_API_URL: &str = "https://api.elevenlabs.io";

#[derive(Error, Debug)]
pub enum TtsError {
    /// Upstream answered with a non-success status; `body` is its text.
    #[error("upstream error {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

pub type TtsResult<T> = Result<T, TtsError>;

#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &str;

    async fn synthesize(&self, text: &str, voice: &str) -> TtsResult<Bytes>;
}

pub struct ElevenLabsClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ElevenLabsClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: ELEVENLABS_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, voice: &str) -> String {
        format!("{}/v1/text-to-speech/{}", self.base_url, voice)
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    fn name(&self) -> &str {
        "elevenlabs"
    }

    async fn synthesize(&self, text: &str, voice: &str) -> TtsResult<Bytes> {
        debug!("TTS request: voice={} chars={}", voice, text.chars().count());

        let response = self
            .client
            .post(self.endpoint(voice))
            .header("xi-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("ElevenLabs error {}: {}", status, body);
            return Err(TtsError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.bytes().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let client = ElevenLabsClient::new("k").with_base_url("http://localhost:9000/");
        assert_eq!(client.endpoint("alloy"), "http://localhost:9000/v1/text-to-speech/alloy");
    }
}
