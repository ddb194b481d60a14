//! # WAV Reading and Preprocessing
//!
//! Converts a WAV file into the sample shape the Whisper models expect:
//! mono, 16 kHz, 32-bit float in `[-1.0, 1.0]`.
//!
//! ## Processing Steps:
//! 1. **Decode**: parse the container and PCM data (8/16/24-bit int or 32-bit float)
//! 2. **Mixdown**: average interleaved channels to mono
//! 3. **Resample**: nearest-sample conversion to 16 kHz
//! 4. **DC removal**: center the signal around zero

use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::path::Path;

/// Sample rate required by the Whisper models.
pub const SAMPLE_RATE: u32 = 16_000;

/// Load a WAV file as mono 16 kHz float samples.
pub fn load_wav(path: &Path) -> Result<Vec<f32>> {
    let mut file = File::open(path)
        .with_context(|| format!("failed to open audio file {}", path.display()))?;

    let (header, data) = wav::read(&mut file)
        .with_context(|| format!("failed to parse WAV data in {}", path.display()))?;

    let samples = to_float_samples(data)?;
    if samples.is_empty() {
        return Err(anyhow!("audio file {} contains no samples", path.display()));
    }

    let mono = mix_to_mono(&samples, header.channel_count as usize);
    let mut resampled = resample(&mono, header.sampling_rate, SAMPLE_RATE);
    remove_dc_offset(&mut resampled);

    tracing::debug!(
        source_rate = header.sampling_rate,
        channels = header.channel_count,
        samples = resampled.len(),
        duration_s = resampled.len() as f64 / SAMPLE_RATE as f64,
        "decoded audio file"
    );

    Ok(resampled)
}

/// Scale integer PCM into the float range ML models expect.
fn to_float_samples(data: wav::BitDepth) -> Result<Vec<f32>> {
    let samples = match data {
        wav::BitDepth::Eight(samples) => samples
            .into_iter()
            .map(|s| (s as f32 - 128.0) / 128.0)
            .collect(),
        wav::BitDepth::Sixteen(samples) => samples
            .into_iter()
            .map(|s| s as f32 / 32768.0)
            .collect(),
        wav::BitDepth::TwentyFour(samples) => samples
            .into_iter()
            .map(|s| s as f32 / 8_388_608.0)
            .collect(),
        wav::BitDepth::ThirtyTwoFloat(samples) => samples,
        wav::BitDepth::Empty => return Err(anyhow!("WAV file has an empty data chunk")),
    };
    Ok(samples)
}

/// Average interleaved channels down to one.
fn mix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Nearest-sample rate conversion.
///
/// Good enough for speech fed to Whisper; no interpolation filter.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = (samples.len() as f64 / ratio).round() as usize;

    (0..out_len)
        .map(|i| {
            let src = ((i as f64 * ratio) as usize).min(samples.len() - 1);
            samples[src]
        })
        .collect()
}

/// Remove the DC offset so the signal is centered around zero.
///
/// An offset shifts every sample up or down, wasting dynamic range the mel
/// features could otherwise use.
fn remove_dc_offset(samples: &mut [f32]) {
    if samples.is_empty() {
        return;
    }

    let offset = samples.iter().sum::<f32>() / samples.len() as f32;
    for sample in samples {
        *sample -= offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mix_to_mono_averages_channels() {
        let stereo = vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        let mono = mix_to_mono(&stereo, 2);
        assert_eq!(mono, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_mono_passthrough() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(mix_to_mono(&samples, 1), samples);
    }

    #[test]
    fn test_resample_halves_rate() {
        let samples: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let out = resample(&samples, 32_000, 16_000);
        assert_eq!(out.len(), 50);
        assert_eq!(out[1], 2.0);
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let samples = vec![0.1, 0.2];
        assert_eq!(resample(&samples, 16_000, 16_000), samples);
    }

    #[test]
    fn test_dc_offset_removal_centers_signal() {
        let mut samples = vec![0.6, 0.4, 0.6, 0.4];
        remove_dc_offset(&mut samples);
        let mean: f32 = samples.iter().sum::<f32>() / samples.len() as f32;
        assert!(mean.abs() < 1e-6);
    }

    #[test]
    fn test_load_wav_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");

        // 0.5s of a quiet square wave at 16kHz mono, 16-bit
        let header = wav::Header::new(wav::WAV_FORMAT_PCM, 1, SAMPLE_RATE, 16);
        let samples: Vec<i16> = (0..8000)
            .map(|i| if (i / 80) % 2 == 0 { 8000 } else { -8000 })
            .collect();
        let mut out = File::create(&path).unwrap();
        wav::write(header, &wav::BitDepth::Sixteen(samples), &mut out).unwrap();

        let decoded = load_wav(&path).unwrap();
        assert_eq!(decoded.len(), 8000);
        assert!(decoded.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn test_load_wav_rejects_non_wav_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-audio.wav");
        std::fs::write(&path, b"definitely not RIFF data").unwrap();
        assert!(load_wav(&path).is_err());
    }
}
