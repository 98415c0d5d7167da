use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Sidecar configuration shipped next to a Piper voice model
/// (`{prefix}.onnx` + `{prefix}.onnx.json`).
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceConfig {
    pub audio: AudioConfig,
    #[serde(default)]
    pub espeak: Option<EspeakConfig>,
    #[serde(default)]
    pub phoneme_id_map: HashMap<String, Vec<i64>>,
    #[serde(default)]
    pub inference: InferenceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EspeakConfig {
    pub voice: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_noise_scale")]
    pub noise_scale: f32,
    #[serde(default = "default_length_scale")]
    pub length_scale: f32,
    #[serde(default = "default_noise_w")]
    pub noise_w: f32,
}

fn default_noise_scale() -> f32 {
    0.667
}

fn default_length_scale() -> f32 {
    1.0
}

fn default_noise_w() -> f32 {
    0.8
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            noise_scale: default_noise_scale(),
            length_scale: default_length_scale(),
            noise_w: default_noise_w(),
        }
    }
}

/// A voice resolved on disk: parsed config plus the model path for the
/// session builder.
#[derive(Debug)]
pub struct Voice {
    pub config: VoiceConfig,
    pub model_path: PathBuf,
}

impl Voice {
    pub fn load(prefix: &Path) -> Result<Self, AppError> {
        let model_path = PathBuf::from(format!("{}.onnx", prefix.display()));
        let config_path = PathBuf::from(format!("{}.onnx.json", prefix.display()));

        if !model_path.exists() {
            return Err(AppError::ModelLoad(format!(
                "voice model not found: {}",
                model_path.display()
            )));
        }
        if !config_path.exists() {
            return Err(AppError::ModelLoad(format!(
                "voice config not found: {}",
                config_path.display()
            )));
        }

        let config: VoiceConfig = serde_json::from_reader(File::open(&config_path)?)?;

        Ok(Self { config, model_path })
    }

    /// The espeak-ng voice to phonemize with, defaulting to English.
    pub fn espeak_voice(&self) -> &str {
        self.config
            .espeak
            .as_ref()
            .map(|e| e.voice.as_str())
            .unwrap_or("en")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_voice_config() {
        let json = r#"{
            "audio": { "sample_rate": 22050 },
            "espeak": { "voice": "en-us" },
            "phoneme_id_map": { "^": [1], "$": [2], "_": [0], "a": [14] },
            "inference": { "noise_scale": 0.5 }
        }"#;
        let config: VoiceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.audio.sample_rate, 22050);
        assert_eq!(config.espeak.unwrap().voice, "en-us");
        assert_eq!(config.phoneme_id_map["a"], vec![14]);
        // Partial inference block keeps defaults for the rest
        assert_eq!(config.inference.noise_scale, 0.5);
        assert_eq!(config.inference.length_scale, 1.0);
        assert_eq!(config.inference.noise_w, 0.8);
    }

    #[test]
    fn test_parse_minimal_config() {
        let json = r#"{ "audio": { "sample_rate": 16000 } }"#;
        let config: VoiceConfig = serde_json::from_str(json).unwrap();
        assert!(config.espeak.is_none());
        assert!(config.phoneme_id_map.is_empty());
        assert_eq!(config.inference.noise_scale, 0.667);
    }

    #[test]
    fn test_load_missing_voice() {
        let err = Voice::load(Path::new("/nonexistent/voice")).unwrap_err();
        assert!(matches!(err, AppError::ModelLoad(_)));
    }
}
