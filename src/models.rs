//! Model asset catalog, storage layout, and downloads.
//!
//! Each backend needs a fixed set of files under the models directory.
//! A backend counts as available for a given size when every file in its
//! set exists; `ensure` fetches missing files on demand.

use crate::backend::Backend;
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

const WHISPER_GGML_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";
const MOONSHINE_BASE_URL: &str = "https://huggingface.co/UsefulSensors";
const OPENAI_WHISPER_BASE_URL: &str = "https://huggingface.co/openai";
const MEL_FILTERS_BASE_URL: &str =
    "https://raw.githubusercontent.com/huggingface/candle/main/candle-examples/examples/whisper";

/// Model size selectable with `--model`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelSize {
    #[default]
    Tiny,
    Base,
    Small,
    Medium,
    Large,
}

impl ModelSize {
    /// Stable name used in CLI arguments and JSON output.
    pub fn name(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
        }
    }
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelSize {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tiny" => Ok(ModelSize::Tiny),
            "base" => Ok(ModelSize::Base),
            "small" => Ok(ModelSize::Small),
            "medium" => Ok(ModelSize::Medium),
            "large" | "large-v3" => Ok(ModelSize::Large),
            other => anyhow::bail!(
                "Unknown model size '{}'. Expected one of: tiny, base, small, medium, large",
                other
            ),
        }
    }
}

/// Identifier for a downloadable model asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelId {
    /// whisper.cpp GGML weights.
    WhisperGgml(ModelSize),
    /// Moonshine ONNX encoder.
    MoonshineEncoder(ModelSize),
    /// Moonshine ONNX decoder.
    MoonshineDecoder(ModelSize),
    /// Moonshine tokenizer definition.
    MoonshineTokenizer(ModelSize),
    /// Moonshine generation config.
    MoonshineConfig(ModelSize),
    /// Whisper safetensors weights for candle.
    CandleWeights(ModelSize),
    /// Whisper tokenizer definition for candle.
    CandleTokenizer(ModelSize),
    /// Whisper model config for candle.
    CandleConfig(ModelSize),
    /// 80-bin mel filter bank.
    MelFilters80,
    /// 128-bin mel filter bank (large models).
    MelFilters128,
}

/// Metadata for a downloadable model asset.
struct ModelInfo {
    /// Path relative to the models directory.
    filename: String,
    /// Download URL.
    url: String,
    /// Expected file size for validation (optional).
    size_bytes: Option<u64>,
}

/// GGML filename stem for a whisper.cpp model size.
fn ggml_stem(size: ModelSize) -> &'static str {
    match size {
        ModelSize::Tiny => "tiny",
        ModelSize::Base => "base",
        ModelSize::Small => "small",
        ModelSize::Medium => "medium",
        ModelSize::Large => "large-v3",
    }
}

/// Moonshine repository name for a model size, when one exists.
fn moonshine_repo(size: ModelSize) -> Option<&'static str> {
    match size {
        ModelSize::Tiny => Some("moonshine-tiny"),
        ModelSize::Base => Some("moonshine-base"),
        _ => None,
    }
}

/// OpenAI whisper repository name for a model size.
fn candle_repo(size: ModelSize) -> &'static str {
    match size {
        ModelSize::Tiny => "whisper-tiny",
        ModelSize::Base => "whisper-base",
        ModelSize::Small => "whisper-small",
        ModelSize::Medium => "whisper-medium",
        ModelSize::Large => "whisper-large-v3",
    }
}

/// Mel filter bank matching a whisper model size.
pub fn mel_filters_id(size: ModelSize) -> ModelId {
    match size {
        ModelSize::Large => ModelId::MelFilters128,
        _ => ModelId::MelFilters80,
    }
}

/// Asset set a backend needs at a given size, or None when the backend has
/// no model at that size.
pub fn backend_assets(backend: Backend, size: ModelSize) -> Option<Vec<ModelId>> {
    match backend {
        Backend::Whisper => Some(vec![ModelId::WhisperGgml(size)]),
        Backend::Moonshine => moonshine_repo(size).map(|_| {
            vec![
                ModelId::MoonshineEncoder(size),
                ModelId::MoonshineDecoder(size),
                ModelId::MoonshineTokenizer(size),
                ModelId::MoonshineConfig(size),
            ]
        }),
        Backend::FasterWhisper => Some(vec![
            ModelId::CandleConfig(size),
            ModelId::CandleTokenizer(size),
            ModelId::CandleWeights(size),
            mel_filters_id(size),
        ]),
    }
}

impl ModelId {
    /// Get model metadata.
    fn info(&self) -> ModelInfo {
        match self {
            ModelId::WhisperGgml(size) => {
                let stem = ggml_stem(*size);
                ModelInfo {
                    filename: format!("ggml-{stem}.bin"),
                    url: format!("{WHISPER_GGML_BASE_URL}/ggml-{stem}.bin"),
                    size_bytes: Some(match size {
                        ModelSize::Tiny => 77_691_713,
                        ModelSize::Base => 147_951_465,
                        ModelSize::Small => 487_601_967,
                        ModelSize::Medium => 1_533_774_781,
                        ModelSize::Large => 3_094_623_691,
                    }),
                }
            }
            ModelId::MoonshineEncoder(size) => moonshine_file(*size, "onnx/encoder_model.onnx"),
            ModelId::MoonshineDecoder(size) => moonshine_file(*size, "onnx/decoder_model.onnx"),
            ModelId::MoonshineTokenizer(size) => moonshine_file(*size, "tokenizer.json"),
            ModelId::MoonshineConfig(size) => moonshine_file(*size, "config.json"),
            ModelId::CandleWeights(size) => candle_file(*size, "model.safetensors"),
            ModelId::CandleTokenizer(size) => candle_file(*size, "tokenizer.json"),
            ModelId::CandleConfig(size) => candle_file(*size, "config.json"),
            ModelId::MelFilters80 => ModelInfo {
                filename: "melfilters.bytes".to_string(),
                url: format!("{MEL_FILTERS_BASE_URL}/melfilters.bytes"),
                size_bytes: None,
            },
            ModelId::MelFilters128 => ModelInfo {
                filename: "melfilters128.bytes".to_string(),
                url: format!("{MEL_FILTERS_BASE_URL}/melfilters128.bytes"),
                size_bytes: None,
            },
        }
    }
}

fn moonshine_file(size: ModelSize, file: &str) -> ModelInfo {
    // backend_assets filters out sizes moonshine does not publish
    let repo = moonshine_repo(size).unwrap_or("moonshine-tiny");
    let local = file.rsplit('/').next().unwrap_or(file);
    ModelInfo {
        filename: format!("{repo}/{local}"),
        url: format!("{MOONSHINE_BASE_URL}/{repo}/resolve/main/{file}"),
        size_bytes: None,
    }
}

fn candle_file(size: ModelSize, file: &str) -> ModelInfo {
    let repo = candle_repo(size);
    ModelInfo {
        filename: format!("{repo}/{file}"),
        url: format!("{OPENAI_WHISPER_BASE_URL}/{repo}/resolve/main/{file}"),
        size_bytes: None,
    }
}

/// Manages model storage and downloads.
pub struct ModelManager {
    models_dir: PathBuf,
}

impl ModelManager {
    /// Create a manager using the default models directory,
    /// `~/.local/share/stt-cli/models/`.
    pub fn new() -> Result<Self> {
        let models_dir = dirs::data_dir()
            .context("Could not determine data directory")?
            .join("stt-cli")
            .join("models");
        Ok(Self { models_dir })
    }

    /// Create a manager with a custom models directory.
    pub fn with_dir(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    /// Get the models directory path.
    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Local path of a model asset.
    pub fn asset_path(&self, id: ModelId) -> PathBuf {
        self.models_dir.join(id.info().filename)
    }

    /// Directory holding moonshine assets for a size.
    pub fn moonshine_dir(&self, size: ModelSize) -> PathBuf {
        self.models_dir
            .join(moonshine_repo(size).unwrap_or("moonshine-tiny"))
    }

    /// Directory holding candle whisper assets for a size.
    pub fn candle_dir(&self, size: ModelSize) -> PathBuf {
        self.models_dir.join(candle_repo(size))
    }

    /// Whether every asset a backend needs at this size is on disk.
    pub fn backend_available(&self, backend: Backend, size: ModelSize) -> bool {
        backend_assets(backend, size)
            .is_some_and(|ids| ids.iter().all(|id| self.asset_path(*id).exists()))
    }

    /// Ensure every asset for a backend is present, downloading as needed.
    pub fn ensure_backend(&self, backend: Backend, size: ModelSize) -> Result<Vec<PathBuf>> {
        let ids = backend_assets(backend, size).with_context(|| {
            format!("Backend '{}' has no model at size '{}'", backend, size)
        })?;
        ids.into_iter().map(|id| self.ensure(id)).collect()
    }

    /// Ensure a model asset is available, downloading if necessary.
    ///
    /// Returns the path to the asset file.
    pub fn ensure(&self, id: ModelId) -> Result<PathBuf> {
        let info = id.info();
        let path = self.models_dir.join(&info.filename);

        if path.exists() {
            // Validate size if known
            if let Some(expected) = info.size_bytes {
                let actual = fs::metadata(&path)
                    .context("Failed to read model metadata")?
                    .len();
                if actual != expected {
                    warn!(
                        model = ?id,
                        expected,
                        actual,
                        "Model size mismatch, re-downloading"
                    );
                    fs::remove_file(&path).context("Failed to remove corrupted model")?;
                } else {
                    debug!(path = %path.display(), "Model already exists");
                    return Ok(path);
                }
            } else {
                debug!(path = %path.display(), "Model already exists");
                return Ok(path);
            }
        }

        self.download(&info, &path)?;
        Ok(path)
    }

    /// Download a model asset from its URL.
    fn download(&self, info: &ModelInfo, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).context("Failed to create models directory")?;
        }

        info!(
            url = %info.url,
            dest = %dest.display(),
            "Downloading model"
        );

        let response = reqwest::blocking::get(&info.url)
            .with_context(|| format!("Failed to download model from {}", info.url))?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to download model: HTTP {}", response.status());
        }

        let total = info.size_bytes.or_else(|| response.content_length());
        let bar = match total {
            Some(total) => ProgressBar::new(total),
            None => ProgressBar::new_spinner(),
        };
        bar.set_message(info.filename.clone());

        // Write to temporary file first, then rename (atomic)
        let temp_path = dest.with_extension("tmp");
        let mut file =
            fs::File::create(&temp_path).context("Failed to create temporary model file")?;
        let mut reader = bar.wrap_read(response);
        std::io::copy(&mut reader, &mut file).context("Failed to write model file")?;
        bar.finish_and_clear();
        file.sync_all().context("Failed to sync model file")?;
        drop(file);

        if let Some(expected) = info.size_bytes {
            let actual = fs::metadata(&temp_path)
                .context("Failed to read downloaded model metadata")?
                .len();
            if actual != expected {
                let _ = fs::remove_file(&temp_path);
                anyhow::bail!(
                    "Downloaded model size mismatch: expected {}, got {}",
                    expected,
                    actual
                );
            }
        }

        fs::rename(&temp_path, dest).context("Failed to finalize model file")?;

        info!(path = %dest.display(), "Model downloaded");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_model_size_parsing() {
        assert_eq!("tiny".parse::<ModelSize>().unwrap(), ModelSize::Tiny);
        assert_eq!("large".parse::<ModelSize>().unwrap(), ModelSize::Large);
        assert_eq!("large-v3".parse::<ModelSize>().unwrap(), ModelSize::Large);

        let err = "gigantic".parse::<ModelSize>().unwrap_err();
        assert!(err.to_string().contains("gigantic"));
    }

    #[test]
    fn test_whisper_ggml_info() {
        let info = ModelId::WhisperGgml(ModelSize::Tiny).info();
        assert_eq!(info.filename, "ggml-tiny.bin");
        assert!(info.url.contains("ggerganov"));
        assert_eq!(info.size_bytes, Some(77_691_713));

        let info = ModelId::WhisperGgml(ModelSize::Large).info();
        assert_eq!(info.filename, "ggml-large-v3.bin");
    }

    #[test]
    fn test_moonshine_info() {
        let info = ModelId::MoonshineEncoder(ModelSize::Tiny).info();
        assert_eq!(info.filename, "moonshine-tiny/encoder_model.onnx");
        assert!(info.url.contains("UsefulSensors/moonshine-tiny"));
    }

    #[test]
    fn test_moonshine_only_tiny_and_base() {
        assert!(backend_assets(Backend::Moonshine, ModelSize::Tiny).is_some());
        assert!(backend_assets(Backend::Moonshine, ModelSize::Base).is_some());
        assert!(backend_assets(Backend::Moonshine, ModelSize::Small).is_none());
        assert!(backend_assets(Backend::Moonshine, ModelSize::Large).is_none());
    }

    #[test]
    fn test_mel_filters_by_size() {
        assert_eq!(mel_filters_id(ModelSize::Tiny), ModelId::MelFilters80);
        assert_eq!(mel_filters_id(ModelSize::Large), ModelId::MelFilters128);
    }

    #[test]
    fn test_model_manager_custom_dir() {
        let temp = TempDir::new().unwrap();
        let manager = ModelManager::with_dir(temp.path());
        assert_eq!(manager.models_dir(), temp.path());
    }

    #[test]
    fn test_backend_available_empty_dir() {
        let temp = TempDir::new().unwrap();
        let manager = ModelManager::with_dir(temp.path());

        for backend in Backend::ALL {
            assert!(!manager.backend_available(backend, ModelSize::Tiny));
        }
    }

    #[test]
    fn test_backend_available_with_assets() {
        let temp = TempDir::new().unwrap();
        let manager = ModelManager::with_dir(temp.path());

        std::fs::write(temp.path().join("ggml-tiny.bin"), b"stub").unwrap();
        assert!(manager.backend_available(Backend::Whisper, ModelSize::Tiny));
        assert!(!manager.backend_available(Backend::Whisper, ModelSize::Base));
        assert!(!manager.backend_available(Backend::Moonshine, ModelSize::Tiny));
    }

    #[test]
    fn test_ensure_skips_existing_file() {
        let temp = TempDir::new().unwrap();
        let manager = ModelManager::with_dir(temp.path());

        // MelFilters80 has no expected size, so an existing file is accepted
        let path = manager.asset_path(ModelId::MelFilters80);
        std::fs::write(&path, b"stub").unwrap();

        let ensured = manager.ensure(ModelId::MelFilters80).unwrap();
        assert_eq!(ensured, path);
    }

    #[test]
    fn test_asset_path_layout() {
        let temp = TempDir::new().unwrap();
        let manager = ModelManager::with_dir(temp.path());

        assert_eq!(
            manager.asset_path(ModelId::CandleWeights(ModelSize::Base)),
            temp.path().join("whisper-base/model.safetensors")
        );
        assert_eq!(
            manager.moonshine_dir(ModelSize::Base),
            temp.path().join("moonshine-base")
        );
        assert_eq!(
            manager.candle_dir(ModelSize::Large),
            temp.path().join("whisper-large-v3")
        );
    }
}
