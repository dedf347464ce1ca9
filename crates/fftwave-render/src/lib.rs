//! fftwave Render - Pixel Pipeline
//!
//! This crate turns smoothed spectra into LED matrix frames, including:
//! - Canvas / pixel sink abstraction with an in-memory frame buffer
//! - Bar pattern layouts (single, mirrored, dual, quad, sideways, blank)
//! - Background ambiance layers keyed off the sound energy history
//! - Compositor running one render tick
//! - Threaded capture / analysis / render pipeline

use thiserror::Error;

pub mod background;
pub mod canvas;
pub mod compositor;
pub mod pattern;
pub mod pipeline;
pub mod radius;

pub use background::{default_backgrounds, BackgroundInput, BackgroundRenderer, BackgroundSettings};
pub use canvas::{Canvas, Frame, FrameBuffer, FrameSink, MemorySink, NullSink};
pub use compositor::{Compositor, Overlay};
pub use pattern::{default_patterns, LayoutKind, PatternInput, PatternRenderer, PatternSettings};
pub use pipeline::{Mailbox, Pipeline, PipelineOptions, PipelineStats};
pub use radius::RadiusMap;

/// Rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Core error: {0}")]
    Core(#[from] fftwave_core::CoreError),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("Thread spawn failed: {0}")]
    ThreadSpawn(std::io::Error),
}

/// Result type for rendering operations
pub type Result<T> = std::result::Result<T, RenderError>;
