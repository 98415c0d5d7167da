use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use crate::stt::Transcriber;
use crate::tts::Synthesizer;

/// Upload cap for transcription requests.
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Engines shared across requests. Both are built once at startup and held
/// behind traits so the router can run against test doubles.
pub struct AppState {
    pub tts: Arc<dyn Synthesizer>,
    pub stt: Arc<dyn Transcriber>,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/tts/", post(handlers::synthesize))
        .route("/stt/", post(handlers::transcribe))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
