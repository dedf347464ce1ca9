//! Frame sink that periodically saves the presented frame as an image

use std::path::PathBuf;

use fftwave_render::{Frame, FrameSink, RenderError};
use image::RgbaImage;
use tracing::{debug, info};

/// Writes every `every`-th presented frame to `path`, replacing the file
pub struct PngSnapshotSink {
    path: PathBuf,
    every: u64,
    presented: u64,
    buffer: Vec<u8>,
}

impl PngSnapshotSink {
    pub fn new(path: PathBuf, every: u64) -> Self {
        info!("Saving frame snapshots to {:?} every {} frames", path, every.max(1));
        Self {
            path,
            every: every.max(1),
            presented: 0,
            buffer: Vec::new(),
        }
    }

    fn save(&mut self, frame: &Frame<'_>) -> fftwave_render::Result<()> {
        self.buffer.clear();
        for pixel in frame.pixels {
            self.buffer
                .extend_from_slice(&[pixel.r, pixel.g, pixel.b, pixel.a]);
        }

        let image = RgbaImage::from_raw(
            frame.width as u32,
            frame.height as u32,
            std::mem::take(&mut self.buffer),
        )
        .ok_or_else(|| RenderError::Sink("frame does not match its size".to_string()))?;

        let result = image
            .save(&self.path)
            .map_err(|e| RenderError::Sink(format!("Failed to save {:?}: {}", self.path, e)));
        self.buffer = image.into_raw();
        result?;

        debug!("Saved snapshot {} to {:?}", self.presented, self.path);
        Ok(())
    }
}

impl FrameSink for PngSnapshotSink {
    fn present(&mut self, frame: &Frame<'_>) -> fftwave_render::Result<()> {
        self.presented += 1;
        if self.presented % self.every == 0 {
            self.save(frame)?;
        }
        Ok(())
    }
}
