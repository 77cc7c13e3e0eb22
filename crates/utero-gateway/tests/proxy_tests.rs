//! Tests for utero-gateway: origin checks, /api/tts, health and static files

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use utero_core::ProxyConfig;
use utero_gateway::*;

enum Behaviour {
    Audio(&'static [u8]),
    Upstream(u16, &'static str),
}

struct MockSynthesizer {
    behaviour: Behaviour,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockSynthesizer {
    fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn synthesize(&self, text: &str, voice: &str) -> TtsResult<Bytes> {
        self.calls.lock().unwrap().push((text.to_string(), voice.to_string()));
        match &self.behaviour {
            Behaviour::Audio(data) => Ok(Bytes::from_static(data)),
            Behaviour::Upstream(status, body) => Err(TtsError::Upstream {
                status: *status,
                body: body.to_string(),
            }),
        }
    }
}

fn router(synth: Option<Arc<MockSynthesizer>>) -> Router {
    let synth = synth.map(|s| s as Arc<dyn SpeechSynthesizer>);
    create_router(&ProxyConfig::default(), synth)
}

fn tts_request(body: Value, origin: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/tts")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(origin) = origin {
        builder = builder.header(header::ORIGIN, origin);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

// ===========================================================================
// Origin allow-list
// ===========================================================================

#[tokio::test]
async fn disallowed_origin_is_forbidden() {
    let synth = MockSynthesizer::new(Behaviour::Audio(b"RIFF"));
    let response = router(Some(synth.clone()))
        .oneshot(tts_request(json!({"text": "hi"}), Some("http://evil.example")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await, json!({"error": "Origin not allowed"}));
    assert!(synth.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn allowed_and_missing_origins_pass() {
    let synth = MockSynthesizer::new(Behaviour::Audio(b"RIFF"));
    let app = router(Some(synth.clone()));

    let response = app
        .clone()
        .oneshot(tts_request(json!({"text": "hi"}), Some("http://localhost:5173")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(tts_request(json!({"text": "hi"}), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(synth.calls.lock().unwrap().len(), 2);
}

// ===========================================================================
// /api/tts
// ===========================================================================

#[tokio::test]
async fn tts_returns_audio_with_defaults() {
    let synth = MockSynthesizer::new(Behaviour::Audio(b"RIFFdata"));
    let response = router(Some(synth.clone()))
        .oneshot(tts_request(json!({"text": "Drink some water."}), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/wav");
    assert_eq!(body_bytes(response).await, b"RIFFdata");
    assert_eq!(
        synth.calls.lock().unwrap().clone(),
        vec![("Drink some water.".to_string(), "alloy".to_string())]
    );
}

#[tokio::test]
async fn tts_honours_voice_and_format() {
    let synth = MockSynthesizer::new(Behaviour::Audio(b"ID3"));
    let response = router(Some(synth.clone()))
        .oneshot(tts_request(json!({"text": "hi", "voice": "rachel", "format": "mpeg"}), None))
        .await
        .unwrap();
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(synth.calls.lock().unwrap()[0].1, "rachel");
}

#[tokio::test]
async fn missing_text_is_bad_request() {
    let synth = MockSynthesizer::new(Behaviour::Audio(b""));
    let app = router(Some(synth.clone()));
    for body in [json!({}), json!({"text": ""}), json!({"text": 42})] {
        let response = app.clone().oneshot(tts_request(body, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, json!({"error": "Missing text"}));
    }
    assert!(synth.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn voice_with_path_characters_is_rejected() {
    let synth = MockSynthesizer::new(Behaviour::Audio(b""));
    let response = router(Some(synth.clone()))
        .oneshot(tts_request(json!({"text": "hi", "voice": "../admin"}), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(synth.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_api_key_is_server_error() {
    let response = router(None)
        .oneshot(tts_request(json!({"text": "hi"}), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({"error": "Server missing ElevenLabs API key"})
    );
}

#[tokio::test]
async fn upstream_failure_is_bad_gateway_with_upstream_text() {
    let synth = MockSynthesizer::new(Behaviour::Upstream(401, "invalid api key"));
    let response = router(Some(synth))
        .oneshot(tts_request(json!({"text": "hi"}), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_bytes(response).await, b"invalid api key");
}

// ===========================================================================
// Health and static files
// ===========================================================================

#[tokio::test]
async fn health_reports_synthesizer() {
    let synth = MockSynthesizer::new(Behaviour::Audio(b""));
    let response = router(Some(synth))
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["tts"], "mock");
}

#[tokio::test]
async fn static_dir_serves_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>utero</h1>").unwrap();
    let config = ProxyConfig {
        static_dir: Some(dir.path().to_path_buf()),
        ..ProxyConfig::default()
    };
    let app = create_router(&config, None);

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/index.html").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"<h1>utero</h1>");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/index.html")
                .header(header::ORIGIN, "http://evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
