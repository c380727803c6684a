//! Moonshine transcription backend.
//!
//! Runs the Moonshine ONNX encoder/decoder pair through ONNX Runtime.
//! Moonshine consumes raw 16kHz samples directly, so there is no spectral
//! front end; decoding is a greedy loop over the exported decoder.

use super::Transcriber;
use crate::audio::{AudioBuffer, TARGET_SAMPLE_RATE};
use anyhow::{Context, Result, anyhow};
use ndarray::{Array2, Array3};
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use tokenizers::Tokenizer;
use tracing::{debug, info};

/// Longest slice of audio fed through the encoder at once, in seconds.
const WINDOW_SECS: usize = 30;

/// Upper bound on generated tokens per second of audio.
const TOKENS_PER_SECOND: usize = 6;

/// Moonshine speech-to-text transcriber.
pub struct MoonshineTranscriber {
    encoder: Session,
    decoder: Session,
    tokenizer: Tokenizer,
    decoder_start_token_id: u32,
    eos_token_id: u32,
}

impl MoonshineTranscriber {
    /// Load the Moonshine models from a directory.
    ///
    /// # Files Required
    /// - `encoder_model.onnx`
    /// - `decoder_model.onnx`
    /// - `tokenizer.json`
    /// - `config.json`
    pub fn new(model_dir: impl AsRef<Path>) -> Result<Self> {
        let model_dir = model_dir.as_ref();
        info!(dir = %model_dir.display(), "Loading Moonshine model");

        let encoder = load_session(&model_dir.join("encoder_model.onnx"))?;
        let decoder = load_session(&model_dir.join("decoder_model.onnx"))?;

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {e}", tokenizer_path.display()))?;

        let (decoder_start_token_id, eos_token_id) =
            read_generation_config(&model_dir.join("config.json"))?;

        debug!(
            decoder_start_token_id,
            eos_token_id, "Moonshine model loaded"
        );

        Ok(Self {
            encoder,
            decoder,
            tokenizer,
            decoder_start_token_id,
            eos_token_id,
        })
    }

    /// Greedily decode one window of audio into a text fragment.
    fn decode_window(&mut self, samples: &[f32]) -> Result<String> {
        let audio = Array2::from_shape_vec((1, samples.len()), samples.to_vec())
            .context("Failed to create audio array")?;

        let outputs = self
            .encoder
            .run(ort::inputs![
                "input_values" => TensorRef::from_array_view(&audio)?
            ])
            .context("Moonshine encoder inference failed")?;

        let (shape, hidden) = outputs["last_hidden_state"]
            .try_extract_tensor::<f32>()
            .context("Failed to extract encoder hidden states")?;
        let frames = shape[1] as usize;
        let hidden_dim = shape[2] as usize;
        let hidden_states = Array3::from_shape_vec((1, frames, hidden_dim), hidden.to_vec())
            .context("Failed to reshape encoder hidden states")?;
        drop(outputs);

        let max_tokens = samples.len() / TARGET_SAMPLE_RATE as usize * TOKENS_PER_SECOND + 8;
        let mut tokens: Vec<i64> = vec![self.decoder_start_token_id as i64];

        for _ in 0..max_tokens {
            let input_ids = Array2::from_shape_vec((1, tokens.len()), tokens.clone())
                .context("Failed to create token array")?;

            let outputs = self
                .decoder
                .run(ort::inputs![
                    "input_ids" => TensorRef::from_array_view(&input_ids)?,
                    "encoder_hidden_states" => TensorRef::from_array_view(&hidden_states)?
                ])
                .context("Moonshine decoder inference failed")?;

            let (shape, logits) = outputs["logits"]
                .try_extract_tensor::<f32>()
                .context("Failed to extract decoder logits")?;
            let vocab = shape[shape.len() - 1] as usize;
            let last_step = &logits[logits.len() - vocab..];

            let next = argmax(last_step) as u32;
            if next == self.eos_token_id {
                break;
            }
            tokens.push(next as i64);
        }

        let generated: Vec<u32> = tokens[1..].iter().map(|&t| t as u32).collect();
        let text = self
            .tokenizer
            .decode(&generated, true)
            .map_err(|e| anyhow!("Failed to decode tokens: {e}"))?;

        Ok(text.trim().to_string())
    }
}

impl Transcriber for MoonshineTranscriber {
    fn transcribe(&mut self, audio: &AudioBuffer) -> Result<String> {
        debug!(
            samples = audio.samples.len(),
            duration_secs = audio.duration_secs(),
            "Transcribing audio with Moonshine"
        );

        if audio.sample_rate != TARGET_SAMPLE_RATE {
            anyhow::bail!(
                "Moonshine expects 16kHz audio, got {}Hz. Resample before calling transcribe.",
                audio.sample_rate
            );
        }

        let window_samples = WINDOW_SECS * TARGET_SAMPLE_RATE as usize;
        let mut fragments = Vec::new();

        for window in audio.samples.chunks(window_samples) {
            let text = self.decode_window(window)?;
            if !text.is_empty() {
                fragments.push(text);
            }
        }

        Ok(join_fragments(&fragments))
    }
}

/// Join text fragments with single spaces.
fn join_fragments(fragments: &[String]) -> String {
    fragments.join(" ").trim().to_string()
}

/// Index of the largest value in a non-empty slice.
fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

fn load_session(path: &Path) -> Result<Session> {
    Session::builder()
        .context("Failed to create ONNX session builder")?
        .with_intra_threads(1)
        .context("Failed to set intra threads")?
        .commit_from_file(path)
        .with_context(|| format!("Failed to load Moonshine model from {}", path.display()))
}

/// Read decoder start and EOS token ids from the model config.
fn read_generation_config(path: &Path) -> Result<(u32, u32)> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read model config: {}", path.display()))?;
    let config: serde_json::Value =
        serde_json::from_str(&content).context("Failed to parse model config")?;

    let start = config["decoder_start_token_id"].as_u64().unwrap_or(1) as u32;
    let eos = config["eos_token_id"].as_u64().unwrap_or(2) as u32;
    Ok((start, eos))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_fragments() {
        let fragments = vec!["hello".to_string(), "world".to_string()];
        assert_eq!(join_fragments(&fragments), "hello world");
    }

    #[test]
    fn test_join_fragments_single() {
        assert_eq!(join_fragments(&["hello".to_string()]), "hello");
    }

    #[test]
    fn test_join_fragments_empty() {
        assert_eq!(join_fragments(&[]), "");
    }

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 0.9, 0.3]), 1);
        assert_eq!(argmax(&[2.0]), 0);
        assert_eq!(argmax(&[-1.0, -0.5, -3.0]), 1);
    }
}
