//! Whisper transcription on candle.
//!
//! Runs the safetensors Whisper weights through candle-transformers with a
//! mel spectrogram front end, greedily decoding each 30-second segment.

use super::Transcriber;
use crate::audio::{AudioBuffer, TARGET_SAMPLE_RATE};
use anyhow::{Context, Result, anyhow};
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::whisper::{self as m, Config};
use std::path::Path;
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

/// Upper bound on generated tokens per segment.
const MAX_SEGMENT_TOKENS: usize = 224;

/// Whisper speech-to-text transcriber on the candle runtime.
pub struct CandleWhisperTranscriber {
    model: m::model::Whisper,
    tokenizer: Tokenizer,
    config: Config,
    device: Device,
    mel_filters: Vec<f32>,
    language: Option<String>,
}

impl CandleWhisperTranscriber {
    /// Load Whisper weights from a directory.
    ///
    /// # Files Required
    /// - `config.json`
    /// - `tokenizer.json`
    /// - `model.safetensors`
    ///
    /// plus a mel filter bank file matching the model's mel bin count.
    pub fn new(
        model_dir: impl AsRef<Path>,
        mel_filters_path: impl AsRef<Path>,
        language: Option<String>,
    ) -> Result<Self> {
        let model_dir = model_dir.as_ref();
        let device = Device::Cpu;

        info!(
            dir = %model_dir.display(),
            language = ?language,
            "Loading candle Whisper model"
        );

        let config_path = model_dir.join("config.json");
        let config_contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read model config: {}", config_path.display()))?;
        let config: Config =
            serde_json::from_str(&config_contents).context("Failed to parse model config")?;

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {e}", tokenizer_path.display()))?;

        let mel_bytes = std::fs::read(mel_filters_path.as_ref()).with_context(|| {
            format!(
                "Failed to read mel filters: {}",
                mel_filters_path.as_ref().display()
            )
        })?;
        let mel_filters = read_mel_filters(&mel_bytes, &config)?;

        let weights_path = model_dir.join("model.safetensors");
        // SAFETY: safetensors files are memory-mapped read-only
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], m::DTYPE, &device)
                .context("Failed to load model weights")?
        };

        let model =
            m::model::Whisper::load(&vb, config.clone()).context("Failed to build model")?;

        Ok(Self {
            model,
            tokenizer,
            config,
            device,
            mel_filters,
            language,
        })
    }

    /// Greedily decode one mel segment into text.
    fn decode_segment(&mut self, mel: &Tensor) -> Result<String> {
        let sot_token = token_id(&self.tokenizer, m::SOT_TOKEN)?;
        let transcribe_token = token_id(&self.tokenizer, m::TRANSCRIBE_TOKEN)?;
        let no_timestamps_token = token_id(&self.tokenizer, m::NO_TIMESTAMPS_TOKEN)?;
        let eot_token = token_id(&self.tokenizer, m::EOT_TOKEN)?;

        let audio_features = self
            .model
            .encoder
            .forward(mel, true)
            .context("Encoder inference failed")?;

        let mut tokens = vec![sot_token];
        if let Some(lang) = &self.language {
            match self.tokenizer.token_to_id(&format!("<|{lang}|>")) {
                Some(id) => tokens.push(id),
                None => warn!(language = %lang, "Model has no token for language, detecting"),
            }
        }
        tokens.push(transcribe_token);
        tokens.push(no_timestamps_token);
        let prompt_len = tokens.len();

        for _ in 0..MAX_SEGMENT_TOKENS {
            let token_tensor = Tensor::new(tokens.as_slice(), &self.device)?.unsqueeze(0)?;

            let decoder_output = self
                .model
                .decoder
                .forward(&token_tensor, &audio_features, tokens.len() == prompt_len)
                .context("Decoder inference failed")?;

            let logits = self
                .model
                .decoder
                .final_linear(&decoder_output.squeeze(0)?)
                .context("Logit projection failed")?;

            let seq_len = logits.dim(0)?;
            let next_token = logits
                .get(seq_len - 1)?
                .argmax(0)?
                .to_scalar::<u32>()
                .context("Failed to read next token")?;

            if next_token == eot_token {
                break;
            }
            tokens.push(next_token);
        }

        self.model.reset_kv_cache();

        let generated = &tokens[prompt_len..];
        let text = self
            .tokenizer
            .decode(generated, true)
            .map_err(|e| anyhow!("Failed to decode tokens: {e}"))?;

        Ok(text.trim().to_string())
    }
}

impl Transcriber for CandleWhisperTranscriber {
    fn transcribe(&mut self, audio: &AudioBuffer) -> Result<String> {
        debug!(
            samples = audio.samples.len(),
            duration_secs = audio.duration_secs(),
            "Transcribing audio with candle Whisper"
        );

        if audio.sample_rate != TARGET_SAMPLE_RATE {
            anyhow::bail!(
                "Whisper expects 16kHz audio, got {}Hz. Resample before calling transcribe.",
                audio.sample_rate
            );
        }

        let mut segments: Vec<String> = Vec::new();

        for (i, chunk) in audio.samples.chunks(m::N_SAMPLES).enumerate() {
            let samples = if chunk.len() < m::N_SAMPLES {
                let mut padded = chunk.to_vec();
                padded.resize(m::N_SAMPLES, 0.0);
                padded
            } else {
                chunk.to_vec()
            };

            let mel_data = m::audio::pcm_to_mel(&self.config, &samples, &self.mel_filters);
            let n_mel = self.config.num_mel_bins;
            let n_frames = mel_data.len() / n_mel;
            let mel = Tensor::from_vec(mel_data, (1, n_mel, n_frames), &self.device)
                .context("Failed to build mel tensor")?;

            debug!(segment = i, "Transcribing audio segment");
            let text = self.decode_segment(&mel)?;
            if !text.is_empty() {
                segments.push(text);
            }
        }

        Ok(segments.join(" ").trim().to_string())
    }
}

fn token_id(tokenizer: &Tokenizer, token: &str) -> Result<u32> {
    tokenizer
        .token_to_id(token)
        .ok_or_else(|| anyhow!("Token not found in tokenizer: {token}"))
}

/// Parse a little-endian f32 mel filter bank, validating its length
/// against the model config.
fn read_mel_filters(bytes: &[u8], config: &Config) -> Result<Vec<f32>> {
    let expected_len = config.num_mel_bins * (m::N_FFT / 2 + 1);
    if bytes.len() < expected_len * 4 {
        anyhow::bail!(
            "Mel filters file too small: {} bytes, expected at least {}",
            bytes.len(),
            expected_len * 4
        );
    }

    let filters: Vec<f32> = bytes
        .chunks_exact(4)
        .take(expected_len)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    Ok(filters)
}
