//! Utero TTS proxy

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utero_core::{BindMode, ProxyConfig};
use utero_gateway::{start_proxy, ElevenLabsClient, OriginGuard, SpeechSynthesizer};

#[derive(Parser)]
#[command(name = "utero-proxy", about = "Text-to-speech proxy for the Utero cycle assistant")]
struct Cli {
    /// Port to listen on (env: PORT)
    #[arg(short, long)]
    port: Option<u16>,
    /// Bind mode: lan or loopback
    #[arg(short, long, default_value = "lan")]
    bind: String,
    /// Comma-separated allowed origins (env: ALLOWED_ORIGINS)
    #[arg(long)]
    allowed_origins: Option<String>,
    /// Serve files from this directory for unmatched routes
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "utero=info,utero_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = ProxyConfig {
        bind: BindMode::parse(&cli.bind),
        static_dir: cli.static_dir,
        ..ProxyConfig::default()
    };
    let env_port = std::env::var("PORT").ok().and_then(|p| p.parse().ok());
    if let Some(port) = cli.port.or(env_port) {
        config.port = port;
    }
    let origins = cli.allowed_origins.or_else(|| std::env::var("ALLOWED_ORIGINS").ok());
    if let Some(origins) = origins {
        config.allowed_origins = OriginGuard::parse_list(&origins);
    }

    let synthesizer = std::env::var("ELEVENLABS_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
        .map(|key| Arc::new(ElevenLabsClient::new(key)) as Arc<dyn SpeechSynthesizer>);

    start_proxy(config, synthesizer).await
}
