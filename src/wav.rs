//! WAV file I/O for captured and caller-supplied audio.
//!
//! The recorder writes 32-bit float WAV; caller-supplied files may be any
//! PCM WAV, which is mixed down to mono and resampled to 16kHz on read.

use crate::audio::{AudioBuffer, AudioResampler, TARGET_SAMPLE_RATE, to_mono};
use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;

/// Resampler chunk size for whole-file conversion.
const RESAMPLE_CHUNK: usize = 480;

/// Write a mono buffer as a 32-bit float WAV file.
pub fn write_wav(path: impl AsRef<Path>, buffer: &AudioBuffer) -> Result<()> {
    let path = path.as_ref();
    let spec = WavSpec {
        channels: 1,
        sample_rate: buffer.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {}", path.display()))?;
    for &sample in &buffer.samples {
        writer.write_sample(sample)?;
    }
    writer.finalize().context("Failed to finalize WAV file")?;

    Ok(())
}

/// Read a WAV file as mono samples at its native sample rate.
pub fn read_wav(path: impl AsRef<Path>) -> Result<AudioBuffer> {
    let path = path.as_ref();
    let mut reader = WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .context("Failed to read WAV samples")?,
        SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .context("Failed to read WAV samples")?
        }
    };

    let mono = to_mono(&samples, spec.channels);
    Ok(AudioBuffer::new(mono, spec.sample_rate))
}

/// Read a WAV file and convert it to 16kHz mono.
pub fn read_wav_16k(path: impl AsRef<Path>) -> Result<AudioBuffer> {
    let buffer = read_wav(path)?;
    if buffer.sample_rate == TARGET_SAMPLE_RATE {
        return Ok(buffer);
    }

    let mut resampler = AudioResampler::new(buffer.sample_rate, TARGET_SAMPLE_RATE, RESAMPLE_CHUNK)?;

    // The resampler consumes whole chunks; pad the tail with silence.
    let mut padded = buffer.samples;
    let remainder = padded.len() % RESAMPLE_CHUNK;
    if remainder != 0 {
        padded.resize(padded.len() + RESAMPLE_CHUNK - remainder, 0.0);
    }

    let resampled = resampler
        .process(&padded)
        .context("Failed to resample audio")?;
    Ok(AudioBuffer::new(resampled, TARGET_SAMPLE_RATE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_read_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("clip.wav");

        let samples: Vec<f32> = (0..1600)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16000.0).sin())
            .collect();
        write_wav(&path, &AudioBuffer::new(samples.clone(), 16000)).unwrap();

        let buffer = read_wav(&path).unwrap();
        assert_eq!(buffer.sample_rate, 16000);
        assert_eq!(buffer.samples.len(), samples.len());
        for (a, b) in buffer.samples.iter().zip(&samples) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_read_int16_wav() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("int16.wav");

        let spec = WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        writer.write_sample(16384_i16).unwrap(); // 0.5 at full scale
        writer.write_sample(-16384_i16).unwrap();
        writer.finalize().unwrap();

        let buffer = read_wav(&path).unwrap();
        assert_eq!(buffer.samples.len(), 2);
        assert!((buffer.samples[0] - 0.5).abs() < 1e-4);
        assert!((buffer.samples[1] + 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_read_stereo_mixdown() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("stereo.wav");

        let spec = WavSpec {
            channels: 2,
            sample_rate: 16000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        // L=0.2, R=0.4 -> mono 0.3
        writer.write_sample(0.2_f32).unwrap();
        writer.write_sample(0.4_f32).unwrap();
        writer.finalize().unwrap();

        let buffer = read_wav(&path).unwrap();
        assert_eq!(buffer.samples.len(), 1);
        assert!((buffer.samples[0] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_read_wav_16k_resamples() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("48k.wav");

        // Half a second at 48kHz
        let samples: Vec<f32> = (0..24000)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 48000.0).sin())
            .collect();
        write_wav(&path, &AudioBuffer::new(samples, 48000)).unwrap();

        let buffer = read_wav_16k(&path).unwrap();
        assert_eq!(buffer.sample_rate, TARGET_SAMPLE_RATE);
        // 24000 input samples at a 1/3 ratio -> 8000 output samples
        assert_eq!(buffer.samples.len(), 8000);
    }

    #[test]
    fn test_read_wav_16k_passthrough() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("16k.wav");

        write_wav(&path, &AudioBuffer::new(vec![0.1; 1600], 16000)).unwrap();

        let buffer = read_wav_16k(&path).unwrap();
        assert_eq!(buffer.samples.len(), 1600);
    }

    #[test]
    fn test_read_missing_file() {
        let result = read_wav("/nonexistent/clip.wav");
        assert!(result.is_err());
    }
}
