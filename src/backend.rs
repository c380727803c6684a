//! Backend registry and selection policy.
//!
//! The set of transcription backends is fixed at compile time; which of
//! them can actually run is decided once at startup by probing for their
//! model assets on disk.

use crate::models::{ModelManager, ModelSize};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A speech-to-text inference backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Moonshine ONNX encoder/decoder via ONNX Runtime.
    Moonshine,
    /// whisper.cpp GGML models via whisper-rs.
    Whisper,
    /// Whisper safetensors weights on candle.
    FasterWhisper,
}

impl Backend {
    /// All backends, in probe order.
    pub const ALL: [Backend; 3] = [Backend::Moonshine, Backend::Whisper, Backend::FasterWhisper];

    /// Preference order for automatic selection.
    const AUTO_PREFERENCE: [Backend; 3] =
        [Backend::Moonshine, Backend::FasterWhisper, Backend::Whisper];

    /// Stable name used in CLI arguments and JSON output.
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Moonshine => "moonshine",
            Backend::Whisper => "whisper",
            Backend::FasterWhisper => "faster-whisper",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Backend requested on the command line or in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BackendChoice {
    /// Pick the best available backend.
    #[default]
    Auto,
    Moonshine,
    Whisper,
    FasterWhisper,
}

impl BackendChoice {
    /// The explicitly requested backend, or None for automatic selection.
    pub fn requested(&self) -> Option<Backend> {
        match self {
            BackendChoice::Auto => None,
            BackendChoice::Moonshine => Some(Backend::Moonshine),
            BackendChoice::Whisper => Some(Backend::Whisper),
            BackendChoice::FasterWhisper => Some(Backend::FasterWhisper),
        }
    }

    /// Label for JSON output before a concrete backend has been chosen.
    pub fn label(&self) -> &'static str {
        match self.requested() {
            Some(backend) => backend.name(),
            None => "auto",
        }
    }
}

/// Probe which backends have their model assets on disk, in fixed order.
///
/// Missing assets mean "not available", never an error.
pub fn available_backends(manager: &ModelManager, size: ModelSize) -> Vec<Backend> {
    Backend::ALL
        .iter()
        .copied()
        .filter(|backend| manager.backend_available(*backend, size))
        .collect()
}

/// Resolve a backend choice against the available set.
///
/// Automatic selection prefers moonshine, then faster-whisper, then
/// whisper. An explicitly requested backend that is not available is an
/// error naming the request and the available set.
pub fn select_backend(choice: BackendChoice, available: &[Backend]) -> Result<Backend> {
    if available.is_empty() {
        anyhow::bail!(
            "No speech-to-text backend available. Fetch model assets with --download first."
        );
    }

    match choice.requested() {
        None => Backend::AUTO_PREFERENCE
            .iter()
            .copied()
            .find(|backend| available.contains(backend))
            .context("No speech-to-text backend available"),
        Some(backend) if available.contains(&backend) => Ok(backend),
        Some(backend) => {
            let names: Vec<&str> = available.iter().map(Backend::name).collect();
            anyhow::bail!(
                "Backend '{}' not available. Available: {}",
                backend,
                names.join(", ")
            )
        }
    }
}

#[cfg(test)]
#[path = "backend_test.rs"]
mod tests;
