pub mod audio;
pub mod ctc;
pub mod decoder;
pub mod features;

pub use ctc::CtcEngine;

use std::path::Path;

use crate::error::AppError;

/// A loaded speech-to-text model.
///
/// Implementations read an audio file from disk and return the recognized
/// text. Handlers hold the engine behind this trait so tests can substitute
/// a scripted implementation.
pub trait Transcriber: Send + Sync {
    fn transcribe(&self, audio_path: &Path) -> Result<String, AppError>;
}
