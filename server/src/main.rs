use std::{net::SocketAddr, sync::Arc};

use speech_client::{GeminiSpeechClient, SpeechConfig};
use tokio::net::TcpListener;
use tracing::{info, warn};

use server::{app, config::ServerConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    async_main().await
}

async fn async_main() -> anyhow::Result<()> {
    info!("Starting script studio server...");

    let speech_config = SpeechConfig::from_env();
    if speech_config.api_key.is_none() {
        warn!("GEMINI_API_KEY / API_KEY not set, speech generation will be unavailable");
    }
    info!("Speech model: {}", speech_config.model);
    let speech = Arc::new(GeminiSpeechClient::new(&speech_config)?);

    let config = ServerConfig::from_env();
    info!(
        "Server configuration loaded: port={}, rate_limit={}/min, speech_timeout={}s",
        config.port, config.rate_limit_per_minute, config.speech_timeout_secs
    );

    let port = config.port;
    let app = app(AppState::new(speech, config))?;

    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!("Failed to bind {addr}: {e}. Try a different PORT.")
    })?;

    info!("Server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
