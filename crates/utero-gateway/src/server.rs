//! Proxy server: `/api/tts`, health, and optional static files

use crate::origin::{check_origin, OriginGuard};
use crate::tts::{SpeechSynthesizer, TtsError};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use utero_core::ProxyConfig;

const BODY_LIMIT: usize = 1024 * 1024;

pub struct ProxyState {
    /// `None` when no upstream key is configured.
    pub synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    pub default_voice: String,
    pub default_format: String,
}

#[derive(Debug, Default, Deserialize)]
struct TtsRequest {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    voice: Option<String>,
    #[serde(default)]
    format: Option<String>,
}

pub fn create_router(config: &ProxyConfig, synthesizer: Option<Arc<dyn SpeechSynthesizer>>) -> Router {
    let guard = Arc::new(OriginGuard::from_config(config));
    let state = Arc::new(ProxyState {
        synthesizer,
        default_voice: config.default_voice.clone(),
        default_format: config.default_format.clone(),
    });

    let mut app = Router::new()
        .route("/api/tts", post(tts_handler))
        .route("/health", get(health_handler))
        .with_state(state);
    if let Some(dir) = &config.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(middleware::from_fn_with_state(guard, check_origin))
        .layer(TraceLayer::new_for_http())
}

pub async fn start_proxy(config: ProxyConfig, synthesizer: Option<Arc<dyn SpeechSynthesizer>>) -> anyhow::Result<()> {
    let bind_addr: SocketAddr = format!("{}:{}", config.bind.to_addr(), config.port).parse()?;
    let has_key = synthesizer.is_some();
    let app = create_router(&config, synthesizer);

    info!("Utero TTS proxy v{} starting", env!("CARGO_PKG_VERSION"));
    info!("  Listening on: {}", bind_addr);
    info!("  Allowed origins: {:?}", config.allowed_origins);
    if let Some(dir) = &config.static_dir {
        info!("  Static files: {}", dir.display());
    }
    if !has_key {
        warn!("ELEVENLABS_API_KEY not set; /api/tts will answer 500");
    }

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// Voice ids and formats end up in a URL path and a content type.
fn is_token(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

async fn tts_handler(State(state): State<Arc<ProxyState>>, body: Bytes) -> Response {
    let request: TtsRequest = serde_json::from_slice(&body).unwrap_or_default();
    let Some(text) = request.text.filter(|t| !t.is_empty()) else {
        return json_error(StatusCode::BAD_REQUEST, "Missing text");
    };
    let voice = request.voice.unwrap_or_else(|| state.default_voice.clone());
    let format = request.format.unwrap_or_else(|| state.default_format.clone());
    if !is_token(&voice) {
        return json_error(StatusCode::BAD_REQUEST, "Invalid voice");
    }
    if !is_token(&format) {
        return json_error(StatusCode::BAD_REQUEST, "Invalid format");
    }

    let Some(synthesizer) = &state.synthesizer else {
        return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Server missing ElevenLabs API key");
    };

    match synthesizer.synthesize(&text, &voice).await {
        Ok(audio) => (
            [(header::CONTENT_TYPE, format!("audio/{}", format))],
            audio,
        )
            .into_response(),
        Err(TtsError::Upstream { status, body }) => {
            error!("TTS upstream error {}: {}", status, body);
            (StatusCode::BAD_GATEWAY, body).into_response()
        }
        Err(e) => {
            error!("Proxy error: {}", e);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn health_handler(State(state): State<Arc<ProxyState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "tts": state.synthesizer.as_ref().map(|s| s.name().to_string()),
    }))
}
