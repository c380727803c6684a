use clap::Parser;
use std::path::PathBuf;
use stt_cli::backend::{self, Backend, BackendChoice};
use stt_cli::config::Config;
use stt_cli::engine::{Engine, Request};
use stt_cli::models::{ModelManager, ModelSize};
use stt_cli::output::{BackendList, TranscriptionResult};

#[derive(Parser)]
#[command(name = "stt")]
#[command(about = "Speech-to-text bridge - records a clip and prints a JSON transcription")]
#[command(version)]
struct Cli {
    /// Transcription backend
    #[arg(long, value_enum)]
    backend: Option<BackendChoice>,

    /// Model size: tiny, base, small, medium, large
    #[arg(long)]
    model: Option<String>,

    /// Maximum recording duration in seconds
    #[arg(long)]
    duration: Option<f32>,

    /// Language code for transcription, or "auto" to detect
    #[arg(long)]
    language: Option<String>,

    /// Audio file to transcribe (skips recording; the file is never deleted)
    #[arg(long)]
    audio_file: Option<PathBuf>,

    /// List available backends and exit
    #[arg(long)]
    list_backends: bool,

    /// Download model assets for the selected backend, then exit
    #[arg(long)]
    download: bool,

    /// Config file path (default: ~/.config/stt-cli/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    std::process::exit(run(cli));
}

fn run(cli: Cli) -> i32 {
    let backend_label = cli.backend.unwrap_or_default().label();
    let model_label = cli.model.clone().unwrap_or_else(|| "tiny".to_string());

    let config = match &cli.config {
        Some(path) => match Config::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                emit(&TranscriptionResult::failure(
                    format!("{e:#}"),
                    backend_label,
                    model_label,
                ));
                return 1;
            }
        },
        None => Config::load().unwrap_or_default(),
    };

    if let Err(e) = stt_cli::init_logging(config.logging.level) {
        eprintln!("Failed to initialize logging: {e:#}");
    }

    let choice = cli.backend.unwrap_or(config.transcription.backend);
    let model_name = cli.model.unwrap_or(config.transcription.model);

    let model = match model_name.parse::<ModelSize>() {
        Ok(model) => model,
        Err(e) => {
            emit(&TranscriptionResult::failure(
                e.to_string(),
                choice.label(),
                model_name,
            ));
            return 1;
        }
    };

    let manager = match ModelManager::new() {
        Ok(manager) => manager,
        Err(e) => {
            emit(&TranscriptionResult::failure(
                format!("{e:#}"),
                choice.label(),
                model.name(),
            ));
            return 1;
        }
    };

    if cli.list_backends {
        emit(&backend_list(&manager, model));
        return 0;
    }

    if cli.download {
        // Automatic selection downloads the preferred backend
        let target = choice.requested().unwrap_or(Backend::Moonshine);
        if let Err(e) = manager.ensure_backend(target, model) {
            emit(&TranscriptionResult::failure(
                format!("{e:#}"),
                target.name(),
                model.name(),
            ));
            return 1;
        }
        emit(&backend_list(&manager, model));
        return 0;
    }

    let request = Request {
        backend: choice,
        model,
        language: cli.language.unwrap_or(config.transcription.language),
        duration_secs: cli.duration.unwrap_or(config.recording.max_duration_secs),
        audio_file: cli.audio_file,
        silence_threshold: config.recording.silence_threshold,
        silence_secs: config.recording.silence_secs,
    };

    let result = Engine::new(manager).run(&request);
    emit(&result);
    if result.success { 0 } else { 1 }
}

fn backend_list(manager: &ModelManager, model: ModelSize) -> BackendList {
    BackendList {
        available_backends: backend::available_backends(manager, model)
            .iter()
            .map(ToString::to_string)
            .collect(),
    }
}

/// Print the one JSON object this invocation emits on stdout.
fn emit<T: serde::Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Failed to serialize output: {e}"),
    }
}
