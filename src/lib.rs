pub mod audio;
pub mod backend;
pub mod config;
pub mod engine;
pub mod models;
pub mod output;
pub mod recorder;
pub mod transcribe;
pub mod wav;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Application-specific environment variable for log filtering (overrides config).
const LOG_ENV_VAR: &str = "STT_LOG";

/// Set up logging to stderr; stdout is reserved for the JSON envelope.
pub fn init_logging(level: config::LogLevel) -> anyhow::Result<()> {
    // STT_LOG env var overrides config file level
    let filter = EnvFilter::builder()
        .with_env_var(LOG_ENV_VAR)
        .with_default_directive(level.as_directive().parse()?)
        .from_env()?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_ansi(false))
        .with(filter)
        .init();

    // Route whisper.cpp and GGML logs through tracing
    whisper_rs::install_logging_hooks();

    Ok(())
}
