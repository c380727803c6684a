//! Whisper transcription backend.
//!
//! Uses whisper.cpp via whisper-rs for speech-to-text.

use super::Transcriber;
use crate::audio::{AudioBuffer, TARGET_SAMPLE_RATE};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, WhisperState,
};

/// Whisper speech-to-text transcriber.
///
/// The underlying WhisperContext is leaked intentionally - the model stays
/// loaded for the remainder of the process, which for a single-shot CLI is
/// exactly one transcription. This avoids self-referential struct patterns
/// between the context and its state.
pub struct WhisperTranscriber {
    state: WhisperState,
    language: Option<String>,
}

impl WhisperTranscriber {
    /// Create a new Whisper transcriber.
    ///
    /// # Arguments
    /// * `model_path` - Path to the Whisper GGML model file
    /// * `language` - Language code (e.g., "en", "de") or None for auto-detect
    pub fn new(model_path: impl AsRef<Path>, language: Option<String>) -> Result<Self> {
        info!(
            path = %model_path.as_ref().display(),
            language = ?language,
            "Loading Whisper model"
        );

        let ctx = WhisperContext::new_with_params(
            model_path.as_ref().to_str().context("Invalid model path")?,
            WhisperContextParameters::default(),
        )
        .context("Failed to load Whisper model")?;

        let ctx_box = Box::new(ctx);
        let ctx_ref: &'static WhisperContext = Box::leak(ctx_box);

        let state = ctx_ref
            .create_state()
            .context("Failed to create Whisper state")?;

        Ok(Self { state, language })
    }
}

impl Transcriber for WhisperTranscriber {
    fn transcribe(&mut self, audio: &AudioBuffer) -> Result<String> {
        debug!(
            samples = audio.samples.len(),
            duration_secs = audio.duration_secs(),
            "Transcribing audio with Whisper"
        );

        if audio.sample_rate != TARGET_SAMPLE_RATE {
            anyhow::bail!(
                "Whisper expects 16kHz audio, got {}Hz. Resample before calling transcribe.",
                audio.sample_rate
            );
        }

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        if let Some(ref lang) = self.language {
            params.set_language(Some(lang));
        } else {
            params.set_language(None); // Auto-detect
        }

        // Disable printing to stdout
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        self.state
            .full(params, &audio.samples)
            .context("Whisper inference failed")?;

        // Collect all segments
        let num_segments = self.state.full_n_segments();
        let mut result = String::new();

        for i in 0..num_segments {
            if let Some(segment) = self.state.get_segment(i) {
                if let Ok(text) = segment.to_str_lossy() {
                    result.push_str(&text);
                }
            }
        }

        debug!(text_len = result.len(), "Transcription complete");

        Ok(result.trim().to_string())
    }
}
