pub mod handlers;
pub mod routes;

use serde::{Deserialize, Serialize};

/// Body of `POST /tts/`. A missing `text` field deserializes to the empty
/// string so absent and empty are rejected the same way.
#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct TranscriptionResponse {
    pub filename: String,
    pub transcription: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
