//! Realtime session transport
//!
//! `LiveTransport` opens a bidirectional session and splits it into a sink
//! for client messages and a stream of parsed server messages.
//! `GeminiLiveTransport` speaks the Gemini Live WebSocket protocol.

use crate::error::{VoiceError, VoiceResult};
use crate::protocol::{ClientMessage, ServerMessage, SetupConfig};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMsg;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

pub const GEMINI_LIVE_URL: &str =
    "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Stream of server messages for one session
pub type LiveStream = Pin<Box<dyn Stream<Item = VoiceResult<ServerMessage>> + Send>>;

/// Shared handle used by the sender loop, tool acknowledgments, and teardown.
pub type SessionHandle = Arc<tokio::sync::Mutex<Box<dyn LiveSink>>>;

#[async_trait::async_trait]
pub trait LiveSink: Send {
    async fn send(&mut self, message: ClientMessage) -> VoiceResult<()>;

    async fn close(&mut self) -> VoiceResult<()>;
}

#[async_trait::async_trait]
pub trait LiveTransport: Send + Sync {
    /// URL the session connects to.
    fn endpoint(&self) -> &str;

    async fn connect(&self, setup: SetupConfig) -> VoiceResult<(Box<dyn LiveSink>, LiveStream)>;
}

/// True for TLS endpoints and for plain connections to the local machine.
pub fn is_secure_endpoint(endpoint: &str) -> bool {
    let Ok(url) = Url::parse(endpoint) else {
        return false;
    };
    match url.scheme() {
        "wss" | "https" => true,
        "ws" | "http" => match url.host() {
            Some(url::Host::Domain(d)) => d.eq_ignore_ascii_case("localhost") || d.ends_with(".localhost"),
            Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
            Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
            None => false,
        },
        _ => false,
    }
}

pub struct GeminiLiveTransport {
    endpoint: String,
    api_key: String,
}

impl GeminiLiveTransport {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: GEMINI_LIVE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct WsSink {
    inner: SplitSink<WsStream, WsMsg>,
    closed: bool,
}

#[async_trait::async_trait]
impl LiveSink for WsSink {
    async fn send(&mut self, message: ClientMessage) -> VoiceResult<()> {
        if self.closed {
            return Err(VoiceError::Closed("session already closed".into()));
        }
        let text = serde_json::to_string(&message).map_err(|e| VoiceError::Protocol(e.to_string()))?;
        self.inner
            .send(WsMsg::Text(text))
            .await
            .map_err(|e| VoiceError::Closed(e.to_string()))
    }

    async fn close(&mut self) -> VoiceResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let _ = self.inner.send(WsMsg::Close(None)).await;
        self.inner
            .close()
            .await
            .map_err(|e| VoiceError::Closed(e.to_string()))
    }
}

fn parse_server_stream(mut rx: SplitStream<WsStream>) -> LiveStream {
    Box::pin(async_stream::stream! {
        while let Some(frame) = rx.next().await {
            let text = match frame {
                Ok(WsMsg::Text(t)) => t,
                // the service sends JSON in binary frames too
                Ok(WsMsg::Binary(b)) => match String::from_utf8(b) {
                    Ok(t) => t,
                    Err(e) => {
                        yield Err(VoiceError::Protocol(format!("non-UTF-8 frame: {}", e)));
                        continue;
                    }
                },
                Ok(WsMsg::Close(frame)) => {
                    if let Some(f) = frame {
                        info!("Live session closed by server: {} {}", f.code, f.reason);
                    }
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    yield Err(VoiceError::Closed(e.to_string()));
                    break;
                }
            };
            match serde_json::from_str::<ServerMessage>(&text) {
                Ok(msg) => yield Ok(msg),
                Err(e) => {
                    warn!("Unparseable server message: {}", e);
                    debug!("raw: {}", text);
                }
            }
        }
    })
}

#[async_trait::async_trait]
impl LiveTransport for GeminiLiveTransport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn connect(&self, setup: SetupConfig) -> VoiceResult<(Box<dyn LiveSink>, LiveStream)> {
        if self.api_key.is_empty() {
            return Err(VoiceError::Connect("missing API key".into()));
        }
        let mut url = Url::parse(&self.endpoint).map_err(|e| VoiceError::Connect(e.to_string()))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);

        let (ws, _) = connect_async(url.as_str()).await?;
        info!("Live session connected: {}", setup.model);
        let (tx, rx) = ws.split();

        let mut sink = WsSink { inner: tx, closed: false };
        sink.send(ClientMessage::Setup(setup)).await?;

        Ok((Box::new(sink), parse_server_stream(rx)))
    }
}
