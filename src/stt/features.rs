use std::f64::consts::PI;

use ndarray::Array2;

/// Framing and filterbank parameters for feature extraction.
///
/// Defaults are the common 25 ms / 10 ms framing at 16 kHz with 80 mel bins.
#[derive(Debug, Clone)]
pub struct MelConfig {
    pub sample_rate: u32,
    pub num_mels: usize,
    pub frame_length: usize,
    pub frame_shift: usize,
}

impl Default for MelConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            num_mels: 80,
            frame_length: 400,
            frame_shift: 160,
        }
    }
}

/// Compute a log-mel spectrogram, shaped `[frames, num_mels]`.
///
/// Returns `None` when the geometry is degenerate or the input is shorter
/// than a single frame.
pub fn log_mel_spectrogram(samples: &[f32], config: &MelConfig) -> Option<Array2<f32>> {
    if config.frame_length == 0 || config.frame_shift == 0 || config.num_mels == 0 {
        return None;
    }
    if samples.len() < config.frame_length {
        return None;
    }

    let num_frames = (samples.len() - config.frame_length) / config.frame_shift + 1;
    let fft_size = config.frame_length.next_power_of_two();
    let num_bins = fft_size / 2 + 1;

    let window = hann_window(config.frame_length);
    let bank = mel_filterbank(config.num_mels, fft_size, config.sample_rate);

    let mut features = Array2::<f32>::zeros((num_frames, config.num_mels));
    let mut buf = vec![(0.0f64, 0.0f64); fft_size];

    for t in 0..num_frames {
        let start = t * config.frame_shift;
        let frame = &samples[start..start + config.frame_length];

        // windowed frame, zero-padded to the FFT size
        for slot in buf.iter_mut() {
            *slot = (0.0, 0.0);
        }
        for (i, &s) in frame.iter().enumerate() {
            buf[i] = (s as f64 * window[i], 0.0);
        }
        fft_in_place(&mut buf);

        let power: Vec<f64> = buf[..num_bins]
            .iter()
            .map(|&(re, im)| re * re + im * im)
            .collect();

        for (m, filter) in bank.iter().enumerate() {
            let mut energy = 0.0f64;
            for (bin, &w) in filter.iter().enumerate() {
                if w > 0.0 {
                    energy += power[bin] * w as f64;
                }
            }
            features[[t, m]] = energy.max(1e-10).ln() as f32;
        }
    }

    Some(features)
}

fn hann_window(len: usize) -> Vec<f64> {
    (0..len)
        .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f64 / (len - 1) as f64).cos())
        .collect()
}

fn hz_to_mel(hz: f64) -> f64 {
    1127.0 * (1.0 + hz / 700.0).ln()
}

fn mel_to_hz(mel: f64) -> f64 {
    700.0 * ((mel / 1127.0).exp() - 1.0)
}

/// Triangular mel filters spanning 0 Hz to Nyquist, one row per mel bin.
fn mel_filterbank(num_mels: usize, fft_size: usize, sample_rate: u32) -> Vec<Vec<f32>> {
    let num_bins = fft_size / 2 + 1;
    let low_mel = hz_to_mel(0.0);
    let high_mel = hz_to_mel(sample_rate as f64 / 2.0);

    // band edges, two extra for the triangle shoulders
    let edges: Vec<f64> = (0..num_mels + 2)
        .map(|i| low_mel + (high_mel - low_mel) * i as f64 / (num_mels + 1) as f64)
        .map(mel_to_hz)
        .collect();

    let hz_per_bin = sample_rate as f64 / fft_size as f64;
    let mut bank = vec![vec![0.0f32; num_bins]; num_mels];

    for (m, filter) in bank.iter_mut().enumerate() {
        let (left, center, right) = (edges[m], edges[m + 1], edges[m + 2]);
        for (bin, weight) in filter.iter_mut().enumerate() {
            let hz = bin as f64 * hz_per_bin;
            if hz > left && hz < right {
                let w = if hz <= center {
                    (hz - left) / (center - left)
                } else {
                    (right - hz) / (right - center)
                };
                *weight = w as f32;
            }
        }
    }

    bank
}

/// In-place radix-2 FFT over (re, im) pairs. Length must be a power of two.
fn fft_in_place(buf: &mut [(f64, f64)]) {
    let n = buf.len();
    if n <= 1 {
        return;
    }
    debug_assert!(n.is_power_of_two());

    // bit-reversal permutation
    let mut j = 0usize;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j |= bit;
        if i < j {
            buf.swap(i, j);
        }
    }

    let mut len = 2;
    while len <= n {
        let ang = -2.0 * PI / len as f64;
        let (w_re, w_im) = (ang.cos(), ang.sin());
        for start in (0..n).step_by(len) {
            let (mut cur_re, mut cur_im) = (1.0f64, 0.0f64);
            for k in 0..len / 2 {
                let (a_re, a_im) = buf[start + k];
                let (b_re, b_im) = buf[start + k + len / 2];
                let t_re = b_re * cur_re - b_im * cur_im;
                let t_im = b_re * cur_im + b_im * cur_re;
                buf[start + k] = (a_re + t_re, a_im + t_im);
                buf[start + k + len / 2] = (a_re - t_re, a_im - t_im);
                let next_re = cur_re * w_re - cur_im * w_im;
                let next_im = cur_re * w_im + cur_im * w_re;
                cur_re = next_re;
                cur_im = next_im;
            }
        }
        len <<= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_short_returns_none() {
        let config = MelConfig::default();
        assert!(log_mel_spectrogram(&vec![0.0; 100], &config).is_none());
    }

    #[test]
    fn test_zero_geometry_returns_none() {
        let samples = vec![0.0; 16000];
        for config in [
            MelConfig {
                frame_shift: 0,
                ..Default::default()
            },
            MelConfig {
                frame_length: 0,
                ..Default::default()
            },
            MelConfig {
                num_mels: 0,
                ..Default::default()
            },
        ] {
            assert!(log_mel_spectrogram(&samples, &config).is_none());
        }
    }

    #[test]
    fn test_silence_shape() {
        let config = MelConfig::default();
        let features = log_mel_spectrogram(&vec![0.0; 16000], &config).unwrap();
        // (16000 - 400) / 160 + 1
        assert_eq!(features.dim(), (98, 80));
        // pure silence hits the log floor everywhere
        let floor = (1e-10f64).ln() as f32;
        assert!(features.iter().all(|&v| (v - floor).abs() < 1e-4));
    }

    #[test]
    fn test_tone_above_floor() {
        let config = MelConfig::default();
        let tone: Vec<f32> = (0..16000)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16000.0).sin())
            .collect();
        let features = log_mel_spectrogram(&tone, &config).unwrap();
        assert!(features.iter().all(|v| v.is_finite()));
        let floor = (1e-10f64).ln() as f32;
        let max = features.iter().cloned().fold(f32::MIN, f32::max);
        assert!(max > floor + 1.0);
    }

    #[test]
    fn test_fft_impulse_is_flat() {
        let mut buf = vec![(0.0, 0.0); 8];
        buf[0] = (1.0, 0.0);
        fft_in_place(&mut buf);
        for &(re, im) in &buf {
            let mag = (re * re + im * im).sqrt();
            assert!((mag - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_fft_parseval() {
        let signal: Vec<f64> = (0..16).map(|i| ((i * 7) % 5) as f64 - 2.0).collect();
        let time_energy: f64 = signal.iter().map(|x| x * x).sum();

        let mut buf: Vec<(f64, f64)> = signal.iter().map(|&x| (x, 0.0)).collect();
        fft_in_place(&mut buf);
        let freq_energy: f64 =
            buf.iter().map(|&(re, im)| re * re + im * im).sum::<f64>() / 16.0;

        assert!((time_energy - freq_energy).abs() < 1e-9);
    }

    #[test]
    fn test_mel_scale_roundtrip() {
        for hz in [0.0, 100.0, 440.0, 4000.0, 8000.0] {
            assert!((mel_to_hz(hz_to_mel(hz)) - hz).abs() < 1e-6);
        }
    }

    #[test]
    fn test_filterbank_weights() {
        let bank = mel_filterbank(26, 512, 16000);
        assert_eq!(bank.len(), 26);
        for filter in &bank {
            assert_eq!(filter.len(), 257);
            assert!(filter.iter().any(|&w| w > 0.0));
            assert!(filter.iter().all(|&w| (0.0..=1.0).contains(&w)));
        }
    }
}
