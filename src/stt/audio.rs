use std::path::Path;

use hound::{SampleFormat, WavReader};

use crate::error::AppError;

/// Accepted range for a file's declared sample rate. The resampler sizes its
/// output by `target / declared`, so the declared rate is bounded before any
/// decoding happens.
const MIN_SAMPLE_RATE: u32 = 8_000;
const MAX_SAMPLE_RATE: u32 = 192_000;

/// Decode a WAV file into mono f32 samples at `target_rate`.
///
/// Multi-channel audio is downmixed by averaging, and recordings at other
/// sample rates are linearly resampled. Files declaring a rate outside the
/// plausible speech range are rejected as corrupt.
pub fn read_samples(path: &Path, target_rate: u32) -> Result<Vec<f32>, AppError> {
    let mut reader = WavReader::open(path)
        .map_err(|e| AppError::Transcription(format!("failed to read WAV file: {e}")))?;
    let spec = reader.spec();

    if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&spec.sample_rate) {
        return Err(AppError::Transcription(format!(
            "unsupported sample rate {} Hz",
            spec.sample_rate
        )));
    }

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| AppError::Transcription(format!("failed to decode samples: {e}")))?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| AppError::Transcription(format!("failed to decode samples: {e}")))?
        }
    };

    let mono = downmix(&samples, spec.channels as usize);
    Ok(resample(&mono, spec.sample_rate, target_rate))
}

/// Average interleaved channels down to one.
fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Linear-interpolation resampler. Adequate for speech features; anything
/// fancier would need a windowed-sinc kernel.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = (samples.len() as f64 / ratio).round() as usize;
    let mut out = Vec::with_capacity(out_len);

    let last = samples.len() - 1;
    for i in 0..out_len {
        let src = i as f64 * ratio;
        let idx = (src as usize).min(last);
        let frac = (src - idx as f64) as f32;

        let current = samples[idx];
        let next = samples[(idx + 1).min(last)];
        out.push(current + (next - current) * frac);
    }

    out
}
