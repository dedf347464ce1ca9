//! Logging configuration
//!
//! The subscriber itself is installed by the binary; this module only holds
//! the serialisable settings and the log file housekeeping.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

const LOG_PREFIX: &str = "fftwave_";
const LOG_EXTENSION: &str = "log";

/// Logging settings (`[log]` section of the config file)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default level; `RUST_LOG` overrides it
    pub level: String,
    /// Log to stderr
    pub console_output: bool,
    /// Log to a file in `log_directory`
    pub file_output: bool,
    /// Directory for log files
    pub log_directory: PathBuf,
    /// Number of log files kept when cleaning up
    pub max_log_files: usize,
    /// Extra `target=level` directives, e.g. `"fftwave_render=debug"`
    pub filters: Vec<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            file_output: false,
            log_directory: PathBuf::from("logs"),
            max_log_files: 10,
            filters: Vec::new(),
        }
    }
}

impl LogConfig {
    /// Parsed level, falling back to INFO for unknown strings.
    pub fn parse_level(&self) -> LevelFilter {
        self.level.parse().unwrap_or(LevelFilter::INFO)
    }

    /// Create the log directory when file output is enabled.
    pub fn ensure_log_directory(&self) -> io::Result<()> {
        if self.file_output {
            fs::create_dir_all(&self.log_directory)?;
        }
        Ok(())
    }

    /// Path of the log file for this process run
    pub fn current_log_path(&self) -> PathBuf {
        static SESSION: OnceLock<u64> = OnceLock::new();
        let stamp = SESSION.get_or_init(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0)
        });
        self.log_directory
            .join(format!("{}{}.{}", LOG_PREFIX, stamp, LOG_EXTENSION))
    }

    /// Delete the oldest log files so that at most `max_log_files - 1` remain
    /// before the new one is created. Returns how many were removed.
    pub fn cleanup_old_logs(&self) -> io::Result<usize> {
        if !self.file_output || !self.log_directory.exists() {
            return Ok(0);
        }

        let mut logs: Vec<(SystemTime, PathBuf)> = fs::read_dir(&self.log_directory)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension().is_some_and(|ext| ext == LOG_EXTENSION)
                    && path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .is_some_and(|name| name.starts_with(LOG_PREFIX))
            })
            .filter_map(|path| {
                let modified = fs::metadata(&path).and_then(|m| m.modified()).ok()?;
                Some((modified, path))
            })
            .collect();

        let keep = self.max_log_files.saturating_sub(1);
        if logs.len() <= keep {
            return Ok(0);
        }

        logs.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
        let mut removed = 0;
        for (_, path) in logs.drain(keep..) {
            fs::remove_file(&path)?;
            removed += 1;
        }
        Ok(removed)
    }
}
