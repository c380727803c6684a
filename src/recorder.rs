//! Silence-triggered microphone capture.
//!
//! Records fixed 100ms chunks from the default input device and stops once
//! the RMS level has stayed below a threshold for long enough, or when the
//! maximum duration is reached. The captured audio is written to an
//! ephemeral WAV file that is removed when its handle is dropped.

use crate::audio::{AudioBuffer, AudioCapture, AudioResampler, TARGET_SAMPLE_RATE, rms};
use crate::wav;
use anyhow::{Context, Result};
use std::time::Duration;
use tempfile::TempPath;
use tracing::{debug, info};

/// Duration of one capture chunk in seconds.
pub const CHUNK_SECS: f32 = 0.1;

/// Captured chunks required before an early stop, as a multiple of the
/// silence run length. Keeps leading silence alone from ending the take
/// immediately, while still bounding a recording that stays silent.
const LEADING_SILENCE_FACTOR: usize = 2;

/// Input chunk size for the native-rate resampler.
const RESAMPLER_CHUNK: usize = 1024;

/// Tuning for one recording session.
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderConfig {
    /// Maximum recording duration in seconds.
    pub max_duration_secs: f32,
    /// RMS level below which a chunk counts as silence.
    pub silence_threshold: f32,
    /// How long silence must persist before recording stops.
    pub silence_secs: f32,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: 30.0,
            silence_threshold: 0.01,
            silence_secs: 1.5,
        }
    }
}

/// Stop rule for the capture loop.
///
/// Tracks the run of consecutive chunks whose RMS is below the threshold.
/// Capture stops once the run reaches the configured silence length and the
/// total chunk count has passed the leading-silence guard.
#[derive(Debug)]
pub struct SilenceTracker {
    threshold: f32,
    required_run: usize,
    min_total: usize,
    run: usize,
    total: usize,
}

impl SilenceTracker {
    /// Create a tracker for the given threshold and silence duration.
    pub fn new(threshold: f32, silence_secs: f32) -> Self {
        let required_run = (silence_secs / CHUNK_SECS) as usize;
        Self {
            threshold,
            required_run,
            min_total: required_run * LEADING_SILENCE_FACTOR,
            run: 0,
            total: 0,
        }
    }

    /// Record one chunk's RMS level. Returns true when capture should stop.
    pub fn observe(&mut self, level: f32) -> bool {
        self.total += 1;
        if level < self.threshold {
            self.run += 1;
        } else {
            self.run = 0;
        }

        self.run >= self.required_run && self.total > self.min_total
    }

    /// Number of chunks observed so far.
    pub fn chunks_seen(&self) -> usize {
        self.total
    }
}

/// Microphone recorder with silence detection.
pub struct Recorder {
    config: RecorderConfig,
}

impl Recorder {
    /// Create a recorder with the given tuning.
    pub fn new(config: RecorderConfig) -> Self {
        Self { config }
    }

    /// Record until silence persists or the maximum duration is reached.
    ///
    /// Returns the path of a newly written 16kHz mono WAV file. The file is
    /// deleted when the returned `TempPath` is dropped.
    pub fn record(&self) -> Result<TempPath> {
        let capture = AudioCapture::start().context("Failed to start audio capture")?;
        let native_rate = capture.sample_rate();

        let mut resampler = if native_rate != TARGET_SAMPLE_RATE {
            Some(
                AudioResampler::new(native_rate, TARGET_SAMPLE_RATE, RESAMPLER_CHUNK)
                    .context("Failed to create resampler")?,
            )
        } else {
            None
        };

        let chunk_samples = (TARGET_SAMPLE_RATE as f32 * CHUNK_SECS) as usize;
        let max_chunks = (self.config.max_duration_secs / CHUNK_SECS) as usize;
        let mut tracker = SilenceTracker::new(self.config.silence_threshold, self.config.silence_secs);

        // Native-rate backlog, resampled 16kHz backlog, and the final take
        let mut native_buffer: Vec<f32> = Vec::new();
        let mut chunk_buffer: Vec<f32> = Vec::new();
        let mut recorded: Vec<f32> = Vec::new();

        info!(
            native_rate,
            target_rate = TARGET_SAMPLE_RATE,
            max_chunks,
            "Audio capture started"
        );
        eprintln!("Recording... (speak now, will stop after silence)");

        let mut stopped_on_silence = false;
        'capture: while tracker.chunks_seen() < max_chunks {
            let Some(samples) = capture.recv_timeout(Duration::from_millis(200))? else {
                continue;
            };

            match &mut resampler {
                Some(resampler) => {
                    native_buffer.extend(samples);
                    let full = native_buffer.len() - native_buffer.len() % resampler.chunk_size();
                    if full > 0 {
                        let input: Vec<f32> = native_buffer.drain(..full).collect();
                        chunk_buffer.extend(resampler.process(&input)?);
                    }
                }
                None => chunk_buffer.extend(samples),
            }

            while chunk_buffer.len() >= chunk_samples {
                let chunk: Vec<f32> = chunk_buffer.drain(..chunk_samples).collect();
                let level = rms(&chunk);
                recorded.extend_from_slice(&chunk);

                if tracker.observe(level) {
                    debug!(chunks = tracker.chunks_seen(), "Silence threshold reached");
                    stopped_on_silence = true;
                    break 'capture;
                }
                if tracker.chunks_seen() >= max_chunks {
                    break 'capture;
                }
            }
        }

        capture.stop();
        eprintln!("Recording stopped.");
        info!(
            chunks = tracker.chunks_seen(),
            samples = recorded.len(),
            stopped_on_silence,
            "Capture finished"
        );

        let temp_file = tempfile::Builder::new()
            .prefix("stt-")
            .suffix(".wav")
            .tempfile()
            .context("Failed to create temporary audio file")?;
        let path = temp_file.into_temp_path();
        wav::write_wav(&path, &AudioBuffer::new(recorded, TARGET_SAMPLE_RATE))
            .context("Failed to write captured audio")?;

        Ok(path)
    }
}

#[cfg(test)]
#[path = "recorder_test.rs"]
mod tests;
