pub mod vits;
pub mod voice;

pub use vits::VitsEngine;
pub use voice::Voice;

use crate::error::AppError;

/// A loaded text-to-speech model.
///
/// Implementations take plain text and return a complete WAV container.
/// Handlers hold the engine behind this trait so tests can substitute a
/// scripted implementation.
pub trait Synthesizer: Send + Sync {
    fn synthesize(&self, text: &str) -> Result<Vec<u8>, AppError>;
}
