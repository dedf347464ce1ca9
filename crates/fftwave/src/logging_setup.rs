//! Tracing subscriber for the binary
//!
//! `[log] level` applies to the fftwave crates. Everything else (cpal and
//! friends) stays at WARN unless a `[log] filters` entry names it. A
//! non-empty `RUST_LOG` replaces the configured filter entirely.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use fftwave_core::logging::LogConfig;
use tracing::{debug, info};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Targets that follow `[log] level`
const OWN_CRATES: [&str; 4] = ["fftwave", "fftwave_core", "fftwave_control", "fftwave_render"];
const DEPENDENCY_LEVEL: &str = "warn";

/// Keeps the file writer thread alive; drop it last.
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Filter directives for `config`, most general first
fn directives(config: &LogConfig) -> String {
    let level = config.parse_level().to_string().to_lowercase();
    let mut parts = vec![DEPENDENCY_LEVEL.to_string()];
    parts.extend(OWN_CRATES.iter().map(|krate| format!("{}={}", krate, level)));
    parts.extend(
        config
            .filters
            .iter()
            .map(|filter| filter.trim())
            .filter(|filter| !filter.is_empty())
            .map(str::to_string),
    );
    parts.join(",")
}

fn build_filter(config: &LogConfig, rust_log: Option<&str>) -> Result<EnvFilter> {
    match rust_log.map(str::trim).filter(|env| !env.is_empty()) {
        Some(env) => EnvFilter::try_new(env).with_context(|| format!("Invalid RUST_LOG {:?}", env)),
        None => {
            let directives = directives(config);
            EnvFilter::try_new(&directives)
                .with_context(|| format!("Invalid [log] filters: {}", directives))
        }
    }
}

struct LogFile {
    writer: NonBlocking,
    guard: WorkerGuard,
    path: PathBuf,
    removed: usize,
}

fn open_log_file(config: &LogConfig) -> Result<Option<LogFile>> {
    if !config.file_output {
        return Ok(None);
    }
    config
        .ensure_log_directory()
        .with_context(|| format!("Failed to create log directory {:?}", config.log_directory))?;
    let removed = config
        .cleanup_old_logs()
        .with_context(|| format!("Failed to clean up {:?}", config.log_directory))?;

    let path = config.current_log_path();
    let file =
        File::create(&path).with_context(|| format!("Failed to create log file {:?}", path))?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    Ok(Some(LogFile {
        writer,
        guard,
        path,
        removed,
    }))
}

/// Install the global subscriber described by `config`.
pub fn init(config: &LogConfig) -> Result<LogGuard> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = build_filter(config, rust_log.as_deref())?;
    let log_file = open_log_file(config)?;

    let console = config.console_output.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(true)
    });

    let (file_layer, file_info, guard) = match log_file {
        Some(LogFile {
            writer,
            guard,
            path,
            removed,
        }) => (
            Some(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_thread_names(true),
            ),
            Some((path, removed)),
            Some(guard),
        ),
        None => (None, None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    match rust_log {
        Some(env) if !env.trim().is_empty() => info!("Logging filter from RUST_LOG: {}", env),
        _ => info!("Logging filter: {}", directives(config)),
    }
    if let Some((path, removed)) = file_info {
        info!("Logging to {:?}", path);
        debug!("Removed {} old log files", removed);
    }

    Ok(LogGuard { _file: guard })
}
