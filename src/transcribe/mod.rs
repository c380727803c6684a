//! Speech-to-text transcription.
//!
//! This module provides a trait abstraction for transcription backends
//! and implementations for specific inference stacks. Every adapter
//! normalizes its engine's result shape into a single flattened string.

use crate::audio::AudioBuffer;
use crate::backend::Backend;
use crate::models::{ModelId, ModelManager, ModelSize, mel_filters_id};
use anyhow::Result;
use tracing::info;

mod faster_whisper;
mod moonshine;
mod whisper;

pub use faster_whisper::CandleWhisperTranscriber;
pub use moonshine::MoonshineTranscriber;
pub use whisper::WhisperTranscriber;

/// Speech-to-text transcriber.
///
/// Implementations convert audio samples to text.
pub trait Transcriber {
    /// Transcribe 16kHz mono audio to text.
    fn transcribe(&mut self, audio: &AudioBuffer) -> Result<String>;
}

/// Construct the adapter for a selected backend.
///
/// Model assets are read from the manager's models directory; the caller
/// is expected to have checked availability first.
pub fn create_transcriber(
    backend: Backend,
    manager: &ModelManager,
    size: ModelSize,
    language: &str,
) -> Result<Box<dyn Transcriber>> {
    info!(backend = %backend, model = %size, "Loading transcription backend");

    match backend {
        Backend::Whisper => {
            let model_path = manager.asset_path(ModelId::WhisperGgml(size));
            Ok(Box::new(WhisperTranscriber::new(
                model_path,
                parse_language(language),
            )?))
        }
        Backend::Moonshine => Ok(Box::new(MoonshineTranscriber::new(
            &manager.moonshine_dir(size),
        )?)),
        Backend::FasterWhisper => {
            let mel_path = manager.asset_path(mel_filters_id(size));
            Ok(Box::new(CandleWhisperTranscriber::new(
                &manager.candle_dir(size),
                &mel_path,
                parse_language(language),
            )?))
        }
    }
}

/// Map the CLI language code to an explicit language; "auto" and the empty
/// string mean detection.
fn parse_language(language: &str) -> Option<String> {
    if language.is_empty() || language == "auto" {
        None
    } else {
        Some(language.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_language() {
        assert_eq!(parse_language("en"), Some("en".to_string()));
        assert_eq!(parse_language("cs"), Some("cs".to_string()));
        assert_eq!(parse_language("auto"), None);
        assert_eq!(parse_language(""), None);
    }
}
