use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

use super::{HealthResponse, SynthesizeRequest, TranscriptionResponse};
use crate::api::routes::AppState;
use crate::error::AppError;

pub async fn synthesize(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SynthesizeRequest>,
) -> Result<Response, AppError> {
    if request.text.is_empty() {
        return Err(AppError::BadRequest("'text' field is required".into()));
    }

    // Inference is CPU-bound; keep it off the async workers.
    let tts = Arc::clone(&state.tts);
    let wav = tokio::task::spawn_blocking(move || tts.synthesize(&request.text))
        .await
        .map_err(|e| AppError::Synthesis(format!("synthesis task failed: {e}")))??;

    Ok((StatusCode::OK, [(header::CONTENT_TYPE, "audio/wav")], wav).into_response())
}

pub async fn transcribe(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<TranscriptionResponse>, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("audio_file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::BadRequest("uploaded file must have a filename".into()))?;
        let data = field.bytes().await?;

        let stt = Arc::clone(&state.stt);
        let transcription = tokio::task::spawn_blocking(move || {
            // The temp file is removed on drop, whichever way this closure
            // exits.
            let mut temp = NamedTempFile::new()?;
            temp.write_all(&data)?;
            temp.flush()?;
            stt.transcribe(temp.path())
        })
        .await
        .map_err(|e| AppError::Transcription(format!("transcription task failed: {e}")))??;

        return Ok(Json(TranscriptionResponse {
            filename,
            transcription,
        }));
    }

    Err(AppError::BadRequest("'audio_file' field is required".into()))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
