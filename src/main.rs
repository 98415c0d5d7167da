use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

mod api;
mod error;
mod stt;
mod text;
mod tts;

use api::routes::{create_router, AppState};
use stt::CtcEngine;
use tts::VitsEngine;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Configuration from environment
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .expect("PORT must be a number");
    let tts_voice =
        PathBuf::from(std::env::var("TTS_VOICE").unwrap_or_else(|_| "./models/tts/voice".to_string()));
    let stt_model =
        PathBuf::from(std::env::var("STT_MODEL").unwrap_or_else(|_| "./models/stt/model".to_string()));

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .expect("Invalid address");

    tracing::info!("Speech Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("TTS voice: {}", tts_voice.display());
    tracing::info!("STT model: {}", stt_model.display());

    // Both engines load before the listener binds; a broken model means the
    // process never reports ready.
    let tts = VitsEngine::load(&tts_voice).unwrap_or_else(|e| {
        tracing::error!("failed to load TTS voice: {}", e);
        std::process::exit(1);
    });
    let stt = CtcEngine::load(&stt_model).unwrap_or_else(|e| {
        tracing::error!("failed to load STT model: {}", e);
        std::process::exit(1);
    });

    let state = Arc::new(AppState {
        tts: Arc::new(tts),
        stt: Arc::new(stt),
    });

    let app = create_router(state);

    tracing::info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
