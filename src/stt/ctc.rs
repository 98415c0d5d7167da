use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ndarray::Array2;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use serde::Deserialize;

use crate::error::AppError;
use crate::stt::audio::read_samples;
use crate::stt::decoder::greedy_decode;
use crate::stt::features::{log_mel_spectrogram, MelConfig};
use crate::stt::Transcriber;

/// Sidecar configuration shipped next to a CTC acoustic model
/// (`{prefix}.onnx` + `{prefix}.onnx.json`).
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_num_mels")]
    pub num_mels: usize,
    #[serde(default = "default_frame_length")]
    pub frame_length: usize,
    #[serde(default = "default_frame_shift")]
    pub frame_shift: usize,
    /// Sentencepiece vocabulary. The CTC blank is implicit after the last
    /// entry, so the model emits `tokens.len() + 1` classes per frame.
    pub tokens: Vec<String>,
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_num_mels() -> usize {
    80
}

fn default_frame_length() -> usize {
    400
}

fn default_frame_shift() -> usize {
    160
}

impl ModelConfig {
    fn mel_config(&self) -> MelConfig {
        MelConfig {
            sample_rate: self.sample_rate,
            num_mels: self.num_mels,
            frame_length: self.frame_length,
            frame_shift: self.frame_shift,
        }
    }
}

/// A CTC speech recognizer executed through ONNX Runtime.
///
/// Like the TTS side, the session serializes behind a mutex and concurrent
/// requests queue on it.
#[derive(Debug)]
pub struct CtcEngine {
    session: Mutex<Session>,
    config: ModelConfig,
}

impl CtcEngine {
    /// Loads `{prefix}.onnx` and `{prefix}.onnx.json` and builds the session.
    pub fn load(prefix: &Path) -> Result<Self, AppError> {
        let model_path = PathBuf::from(format!("{}.onnx", prefix.display()));
        let config_path = PathBuf::from(format!("{}.onnx.json", prefix.display()));

        if !model_path.exists() {
            return Err(AppError::ModelLoad(format!(
                "speech model not found: {}",
                model_path.display()
            )));
        }
        if !config_path.exists() {
            return Err(AppError::ModelLoad(format!(
                "speech model config not found: {}",
                config_path.display()
            )));
        }

        let config: ModelConfig = serde_json::from_reader(File::open(&config_path)?)?;
        if config.tokens.is_empty() {
            return Err(AppError::ModelLoad(format!(
                "speech model config {} has an empty token list",
                config_path.display()
            )));
        }
        if config.sample_rate == 0
            || config.num_mels == 0
            || config.frame_length == 0
            || config.frame_shift == 0
        {
            return Err(AppError::ModelLoad(format!(
                "speech model config {} has zero-valued audio geometry",
                config_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e| AppError::ModelLoad(format!("failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| AppError::ModelLoad(format!("failed to set optimization level: {e}")))?
            .with_intra_threads(4)
            .map_err(|e| AppError::ModelLoad(format!("failed to set threads: {e}")))?
            .commit_from_file(&model_path)
            .map_err(|e| AppError::ModelLoad(format!("failed to load speech model: {e}")))?;

        tracing::info!(
            "loaded STT model {} ({} Hz, {} tokens)",
            model_path.display(),
            config.sample_rate,
            config.tokens.len()
        );

        Ok(Self {
            session: Mutex::new(session),
            config,
        })
    }

    /// Runs the acoustic model on one feature matrix.
    fn infer(&self, features: &Array2<f32>) -> Result<Vec<f32>, AppError> {
        let (frames, mels) = features.dim();
        let flat: Vec<f32> = features.iter().copied().collect();

        // features: [batch, frames, mels]
        let feats_value = Value::from_array((vec![1, frames, mels], flat)).map_err(|e| {
            AppError::Transcription(format!("failed to create feature tensor: {e}"))
        })?;

        // feature_lengths: [batch]
        let lengths_value = Value::from_array((vec![1], vec![frames as i64])).map_err(|e| {
            AppError::Transcription(format!("failed to create lengths tensor: {e}"))
        })?;

        let mut session = self.session.lock().unwrap();
        let outputs = session
            .run(ort::inputs![feats_value, lengths_value])
            .map_err(|e| AppError::Transcription(format!("inference failed: {e}")))?;

        let output = outputs
            .get("logprobs")
            .or_else(|| outputs.get("log_probs"))
            .or_else(|| outputs.get("output"))
            .ok_or_else(|| AppError::Transcription("missing output tensor".to_string()))?;

        let view = output
            .try_extract_tensor::<f32>()
            .map_err(|e| AppError::Transcription(format!("failed to extract output tensor: {e}")))?;

        Ok(view.1.to_vec())
    }
}

impl Transcriber for CtcEngine {
    fn transcribe(&self, audio_path: &Path) -> Result<String, AppError> {
        let samples = read_samples(audio_path, self.config.sample_rate)?;

        let features = match log_mel_spectrogram(&samples, &self.config.mel_config()) {
            Some(f) => f,
            // shorter than one frame, nothing to recognize
            None => return Ok(String::new()),
        };

        let scores = self.infer(&features)?;

        let vocab_size = self.config.tokens.len() + 1;
        if scores.len() % vocab_size != 0 {
            return Err(AppError::Transcription(format!(
                "model output length {} is not a multiple of vocabulary size {}",
                scores.len(),
                vocab_size
            )));
        }

        Ok(greedy_decode(&scores, &self.config.tokens))
    }
}
