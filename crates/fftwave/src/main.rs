//! fftwave - real-time audio spectrum visualizer for LED matrices
//!
//! Wires an audio source, the render pipeline, an optional Art-Net DMX
//! listener and stdin commands together.

mod commands;
mod logging_setup;
mod snapshot;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::unbounded;
use fftwave_control::{ArtNetReceiver, DmxHandle, DmxListener};
use fftwave_core::{AudioSource, Config, SweepSource};
use fftwave_render::{Compositor, FrameSink, NullSink, Pipeline, PipelineOptions};
use tracing::{info, warn};

use crate::snapshot::PngSnapshotSink;

/// Command-line interface
#[derive(Parser, Debug)]
#[command(name = "fftwave", version)]
#[command(about = "Real-time audio spectrum visualizer for LED matrices")]
struct Cli {
    /// Configuration file (TOML). A missing file means built-in defaults.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Use a synthetic frequency sweep instead of the sound card
    #[arg(long)]
    emulate: bool,

    /// Periodically save the presented frame to this PNG file
    #[arg(long, value_name = "PNG")]
    snapshot: Option<PathBuf>,

    /// Stop after this many frames (0 runs until `quit`)
    #[arg(long, default_value_t = 0)]
    frames: u64,
}

/// Load the config file, or defaults if it does not exist.
/// The flag reports whether defaults were used.
fn load_config(path: &Path) -> Result<(Config, bool)> {
    if !path.exists() {
        return Ok((Config::default(), true));
    }
    let config = Config::load(path)
        .with_context(|| format!("Failed to load configuration from {:?}", path))?;
    Ok((config, false))
}

fn open_source(config: &Config, emulate: bool) -> Result<Box<dyn AudioSource>> {
    if !emulate {
        #[cfg(feature = "audio")]
        {
            let source = fftwave_core::CpalSource::open(config.sample_rate)
                .context("Failed to open the audio input (try --emulate)")?;
            return Ok(Box::new(source));
        }
        #[cfg(not(feature = "audio"))]
        warn!("Built without audio capture, using the synthetic sweep");
    }
    let sweep = SweepSource::new(config.sample_rate, config.capture_chunk_len())
        .context("Failed to create the synthetic sweep")?;
    Ok(Box::new(sweep))
}

fn start_dmx(config: &Config, handle: &DmxHandle) -> Result<Option<DmxListener>> {
    if !config.dmx.enabled {
        return Ok(None);
    }
    let receiver = ArtNetReceiver::bind(
        &config.dmx.bind,
        config.dmx.universe,
        config.dmx.start_address,
    )
    .context("Failed to start the Art-Net receiver")?;
    let listener = DmxListener::start(receiver, handle.clone(), config.dmx.timeout())
        .context("Failed to start the DMX listener")?;
    Ok(Some(listener))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, defaults) = load_config(&cli.config)?;

    let _log_guard = logging_setup::init(&config.log)?;

    info!("==========================================");
    info!("===      fftwave session started       ===");
    info!("==========================================");
    if defaults {
        warn!("{:?} not found, using default configuration", cli.config);
    }

    let source = open_source(&config, cli.emulate)?;
    info!("Audio source: {} at {} Hz", source.name(), source.sample_rate());

    let compositor = Compositor::new(&config).context("Failed to set up rendering")?;
    let sink: Box<dyn FrameSink> = match cli.snapshot {
        Some(path) => Box::new(PngSnapshotSink::new(
            path,
            config.display.refresh_rate as u64,
        )),
        None => Box::new(NullSink),
    };

    let dmx = DmxHandle::default();
    let mut listener = start_dmx(&config, &dmx)?;

    let (events_tx, events_rx) = unbounded();
    let quit = Arc::new(AtomicBool::new(false));
    commands::spawn(events_tx, quit.clone())?;

    let options = PipelineOptions {
        max_frames: (cli.frames > 0).then_some(cli.frames),
        ..PipelineOptions::default()
    };
    let mut pipeline = Pipeline::start(&config, source, compositor, sink, dmx, events_rx, options)
        .context("Failed to start the pipeline")?;

    while pipeline.is_running() && !quit.load(Ordering::Acquire) {
        thread::sleep(Duration::from_millis(100));
    }

    info!("Shutting down");
    pipeline.stop();
    if let Some(listener) = listener.as_mut() {
        listener.stop();
    }

    let stats = pipeline.stats();
    info!(
        "Captured {} chunks, analyzed {} spectra ({} dropped, {} failed), rendered {} frames",
        stats.windows_captured,
        stats.spectra_analyzed,
        stats.spectra_dropped,
        stats.analysis_failures,
        stats.frames_rendered
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["fftwave"]);
        assert_eq!(cli.config, PathBuf::from("config.toml"));
        assert!(!cli.emulate);
        assert_eq!(cli.frames, 0);
        assert!(cli.snapshot.is_none());
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "fftwave", "-c", "panel.toml", "--emulate", "--snapshot", "out.png", "--frames", "10",
        ]);
        assert_eq!(cli.config, PathBuf::from("panel.toml"));
        assert!(cli.emulate);
        assert_eq!(cli.snapshot, Some(PathBuf::from("out.png")));
        assert_eq!(cli.frames, 10);
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, defaults) = load_config(&dir.path().join("nope.toml")).unwrap();
        assert!(defaults);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_bad_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[display]\nsmooth_curve = 1.5\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_emulated_source() {
        let source = open_source(&Config::default(), true).unwrap();
        assert_eq!(source.sample_rate(), 44100);
    }
}
