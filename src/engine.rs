//! One-shot transcription pipeline.
//!
//! The engine coordinates a single invocation: probe the backends, resolve
//! the audio source (microphone capture or a caller-supplied file), run
//! the selected adapter, and produce the output envelope. An ephemeral
//! capture file is removed on every exit path; a caller-supplied file is
//! never touched.

use crate::backend::{self, Backend, BackendChoice};
use crate::models::{ModelManager, ModelSize};
use crate::output::TranscriptionResult;
use crate::recorder::{Recorder, RecorderConfig};
use crate::transcribe;
use crate::wav;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, info};

/// Parameters for a single transcription run.
#[derive(Debug, Clone)]
pub struct Request {
    pub backend: BackendChoice,
    pub model: ModelSize,
    pub language: String,
    /// Maximum recording duration in seconds.
    pub duration_secs: f32,
    /// Pre-recorded audio to transcribe instead of recording.
    pub audio_file: Option<PathBuf>,
    pub silence_threshold: f32,
    pub silence_secs: f32,
}

/// Audio input for one run.
enum AudioSource {
    /// Recorded by us; the TempPath removes the file when dropped.
    Ephemeral(TempPath),
    /// Supplied by the caller; never deleted.
    Provided(PathBuf),
}

impl AudioSource {
    fn path(&self) -> &Path {
        match self {
            AudioSource::Ephemeral(path) => path,
            AudioSource::Provided(path) => path,
        }
    }
}

/// Transcription engine for one invocation.
pub struct Engine {
    manager: ModelManager,
}

impl Engine {
    /// Create an engine over the given model storage.
    pub fn new(manager: ModelManager) -> Self {
        Self { manager }
    }

    /// Execute one request and produce the output envelope.
    ///
    /// Never panics or escapes an error: every failure is folded into a
    /// `success == false` envelope.
    pub fn run(&self, request: &Request) -> TranscriptionResult {
        let available = backend::available_backends(&self.manager, request.model);
        let names: Vec<String> = available.iter().map(ToString::to_string).collect();
        debug!(available = ?names, "Probed backends");

        let selected = match backend::select_backend(request.backend, &available) {
            Ok(selected) => selected,
            Err(e) => {
                return TranscriptionResult::failure(
                    format!("{e:#}"),
                    request.backend.label(),
                    request.model.name(),
                )
                .with_available(names);
            }
        };
        info!(backend = %selected, model = %request.model, "Backend selected");

        match self.transcribe_once(selected, request) {
            Ok(text) => TranscriptionResult::ok(text, selected.name(), request.model.name()),
            Err(e) => {
                TranscriptionResult::failure(format!("{e:#}"), selected.name(), request.model.name())
            }
        }
    }

    fn transcribe_once(&self, selected: Backend, request: &Request) -> Result<String> {
        let source = self.resolve_source(request)?;

        let audio = wav::read_wav_16k(source.path())?;
        debug!(
            samples = audio.samples.len(),
            duration_secs = audio.duration_secs(),
            "Audio loaded"
        );

        let mut transcriber = transcribe::create_transcriber(
            selected,
            &self.manager,
            request.model,
            &request.language,
        )?;

        transcriber.transcribe(&audio)
        // source dropped here; an ephemeral capture file is removed
    }

    fn resolve_source(&self, request: &Request) -> Result<AudioSource> {
        if let Some(path) = &request.audio_file {
            anyhow::ensure!(path.exists(), "Audio file not found: {}", path.display());
            return Ok(AudioSource::Provided(path.clone()));
        }

        let recorder = Recorder::new(RecorderConfig {
            max_duration_secs: request.duration_secs,
            silence_threshold: request.silence_threshold,
            silence_secs: request.silence_secs,
        });
        Ok(AudioSource::Ephemeral(recorder.record()?))
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
