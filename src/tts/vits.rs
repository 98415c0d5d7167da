use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::process::Command;
use std::sync::Mutex;

use hound::{SampleFormat, WavSpec, WavWriter};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;

use crate::error::AppError;
use crate::text::{normalize, split_sentences};
use crate::tts::voice::Voice;
use crate::tts::Synthesizer;

/// Longest text chunk sent through the model in one inference call.
/// VITS quality degrades on very long inputs, so requests are synthesized
/// sentence-wise and concatenated.
const MAX_CHUNK_CHARS: usize = 400;

/// A Piper-style VITS voice executed through ONNX Runtime.
///
/// The session is not reentrant, so inference calls serialize on a mutex;
/// concurrent requests queue here.
pub struct VitsEngine {
    session: Mutex<Session>,
    phoneme_id_map: HashMap<String, Vec<i64>>,
    espeak_voice: String,
    sample_rate: u32,
    noise_scale: f32,
    length_scale: f32,
    noise_w: f32,
}

impl VitsEngine {
    /// Loads `{prefix}.onnx` and `{prefix}.onnx.json` and builds the session.
    pub fn load(prefix: &Path) -> Result<Self, AppError> {
        let voice = Voice::load(prefix)?;
        let espeak_voice = voice.espeak_voice().to_string();
        let Voice { config, model_path } = voice;

        let session = Session::builder()
            .map_err(|e| AppError::ModelLoad(format!("failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| AppError::ModelLoad(format!("failed to set optimization level: {e}")))?
            .with_intra_threads(4)
            .map_err(|e| AppError::ModelLoad(format!("failed to set threads: {e}")))?
            .commit_from_file(&model_path)
            .map_err(|e| AppError::ModelLoad(format!("failed to load voice model: {e}")))?;

        tracing::info!(
            "loaded TTS voice {} ({} Hz, espeak voice '{}')",
            model_path.display(),
            config.audio.sample_rate,
            espeak_voice
        );

        Ok(Self {
            session: Mutex::new(session),
            phoneme_id_map: config.phoneme_id_map,
            espeak_voice,
            sample_rate: config.audio.sample_rate,
            noise_scale: config.inference.noise_scale,
            length_scale: config.inference.length_scale,
            noise_w: config.inference.noise_w,
        })
    }

    /// Runs the VITS graph on one phoneme id sequence.
    fn infer(&self, phoneme_ids: &[i64]) -> Result<Vec<f32>, AppError> {
        if phoneme_ids.is_empty() {
            return Ok(Vec::new());
        }

        let input_len = phoneme_ids.len();

        // input: [batch, sequence]
        let input_value = Value::from_array((vec![1, input_len], phoneme_ids.to_vec()))
            .map_err(|e| AppError::Synthesis(format!("failed to create input tensor: {e}")))?;

        // input_lengths: [batch]
        let lengths_value = Value::from_array((vec![1], vec![input_len as i64]))
            .map_err(|e| AppError::Synthesis(format!("failed to create lengths tensor: {e}")))?;

        // scales: [noise_scale, length_scale, noise_w]
        let scales_value = Value::from_array((
            vec![3],
            vec![self.noise_scale, self.length_scale, self.noise_w],
        ))
        .map_err(|e| AppError::Synthesis(format!("failed to create scales tensor: {e}")))?;

        let mut session = self.session.lock().unwrap();
        let outputs = session
            .run(ort::inputs![input_value, lengths_value, scales_value])
            .map_err(|e| AppError::Synthesis(format!("inference failed: {e}")))?;

        let output = outputs
            .get("output")
            .or_else(|| outputs.get("audio"))
            .ok_or_else(|| AppError::Synthesis("missing output tensor".to_string()))?;

        let view = output
            .try_extract_tensor::<f32>()
            .map_err(|e| AppError::Synthesis(format!("failed to extract output tensor: {e}")))?;

        Ok(view.1.to_vec())
    }
}

impl Synthesizer for VitsEngine {
    fn synthesize(&self, text: &str) -> Result<Vec<u8>, AppError> {
        let cleaned = normalize(text);
        let mut samples: Vec<f32> = Vec::new();

        for chunk in split_sentences(&cleaned, MAX_CHUNK_CHARS) {
            let phonemes = phonemize(&chunk, &self.espeak_voice)?;
            let ids = phonemes_to_ids(&phonemes, &self.phoneme_id_map);
            samples.extend(self.infer(&ids)?);
        }

        samples_to_wav(&samples, self.sample_rate)
    }
}

/// Convert text to IPA phonemes using espeak-ng
pub fn phonemize(text: &str, voice: &str) -> Result<String, AppError> {
    if text.is_empty() {
        return Ok(String::new());
    }

    let output = Command::new("espeak-ng")
        .args(["--ipa", "-q", "-v", voice, text])
        .output()
        .map_err(|e| {
            AppError::Synthesis(format!("failed to run espeak-ng (is it installed?): {e}"))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AppError::Synthesis(format!("espeak-ng failed: {stderr}")));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Map IPA phonemes to model ids using the voice's phoneme map.
///
/// The sequence is framed with the voice's BOS (`^`) and EOS (`$`) markers,
/// with the pad id (`_`) interleaved after each mapped phoneme. Characters
/// absent from the map are skipped.
pub fn phonemes_to_ids(phonemes: &str, id_map: &HashMap<String, Vec<i64>>) -> Vec<i64> {
    if phonemes.is_empty() {
        return Vec::new();
    }

    let mut ids = Vec::with_capacity(phonemes.chars().count() * 2 + 2);

    if let Some(bos) = id_map.get("^") {
        ids.extend_from_slice(bos);
    }

    let mut buf = [0u8; 4];
    for ch in phonemes.chars() {
        let key: &str = ch.encode_utf8(&mut buf);
        if let Some(mapped) = id_map.get(key) {
            ids.extend_from_slice(mapped);
            if let Some(pad) = id_map.get("_") {
                ids.extend_from_slice(pad);
            }
        }
    }

    if let Some(eos) = id_map.get("$") {
        ids.extend_from_slice(eos);
    }

    ids
}

/// Encode f32 samples as a 16-bit PCM mono WAV container.
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, AppError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut buffer = Vec::new();
    {
        let cursor = Cursor::new(&mut buffer);
        let mut writer = WavWriter::new(cursor, spec)
            .map_err(|e| AppError::Synthesis(format!("failed to create WAV writer: {e}")))?;

        for &sample in samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(value)
                .map_err(|e| AppError::Synthesis(format!("failed to write sample: {e}")))?;
        }

        writer
            .finalize()
            .map_err(|e| AppError::Synthesis(format!("failed to finalize WAV: {e}")))?;
    }

    Ok(buffer)
}
