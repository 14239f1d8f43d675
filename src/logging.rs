use std::io;
use std::path::Path;
use std::sync::Mutex;

use file_rotate::{ContentLimit, FileRotate, compression::Compression, suffix::AppendCount};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt};

use crate::config::LoggingConfig;

/// Installs the global subscriber: stdout in JSON or plain text, plus an
/// optional size-rotated JSON file. `RUST_LOG` overrides `default_level`.
pub fn init_logging(default_level: &str, config: &LoggingConfig) {
    if let Err(error) = tracing_log::LogTracer::init() {
        eprintln!(
            "logging bridge initialization failed (continuing with existing logger): {}",
            error
        );
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = match open_log_file(config) {
        Ok(writer) => writer.map(|writer| {
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_ansi(false)
                .with_writer(Mutex::new(writer))
        }),
        Err(error) => {
            eprintln!(
                "log file {} unavailable (continuing with stdout only): {}",
                config.file, error
            );
            None
        }
    };
    let json_layer = config.json.then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
    });
    let text_layer = (!config.json).then(fmt::layer);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer);

    if let Err(error) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("global logger initialization failed: {}", error);
    }
}

fn open_log_file(config: &LoggingConfig) -> io::Result<Option<FileRotate<AppendCount>>> {
    let path = config.file.trim();
    if path.is_empty() {
        return Ok(None);
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let max_bytes = usize::try_from(config.file_max_bytes).unwrap_or(usize::MAX);
    Ok(Some(FileRotate::new(
        path,
        AppendCount::new(config.file_keep as usize),
        ContentLimit::BytesSurpassed(max_bytes),
        Compression::None,
        None,
    )))
}
