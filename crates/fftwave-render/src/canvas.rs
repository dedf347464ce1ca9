//! Pixel canvas and frame sinks
//!
//! Renderers draw into a [`Canvas`]; the compositor owns a [`FrameBuffer`]
//! and hands finished frames to a [`FrameSink`], which stands in for the LED
//! matrix driver.

use std::sync::Arc;

use fftwave_core::Rgba;
use parking_lot::Mutex;

use crate::{RenderError, Result};

/// Writable pixel grid, origin top-left
pub trait Canvas {
    /// Width in pixels
    fn width(&self) -> usize;

    /// Height in pixels
    fn height(&self) -> usize;

    /// Color at `(x, y)`; out-of-bounds reads return transparent
    fn get(&self, x: usize, y: usize) -> Rgba;

    /// Set `(x, y)`; out-of-bounds writes are ignored
    fn set(&mut self, x: usize, y: usize, color: Rgba);

    /// Reset every pixel to transparent
    fn clear(&mut self);
}

/// Borrowed view of a finished frame
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Columns
    pub width: usize,
    /// Rows
    pub height: usize,
    /// Row-major pixels, `width * height` long
    pub pixels: &'a [Rgba],
}

impl Frame<'_> {
    /// Pixel at `(x, y)`
    pub fn get(&self, x: usize, y: usize) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y * self.width + x).copied()
    }
}

/// Destination of presented frames
pub trait FrameSink: Send {
    /// Show one frame. Called once per render tick.
    fn present(&mut self, frame: &Frame<'_>) -> Result<()>;
}

/// In-memory canvas with a brightness applied on present
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    pixels: Vec<Rgba>,
    brightness: u8,
    scratch: Vec<Rgba>,
}

impl FrameBuffer {
    /// Transparent buffer of `width × height` at full brightness
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidGeometry(format!(
                "canvas must not be empty, got {}x{}",
                width, height
            )));
        }
        Ok(Self {
            width,
            height,
            pixels: vec![Rgba::TRANSPARENT; width * height],
            brightness: 100,
            scratch: Vec::with_capacity(width * height),
        })
    }

    /// Current brightness in percent
    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Set brightness, clamped to 100
    pub fn set_brightness(&mut self, percent: u8) {
        self.brightness = percent.min(100);
    }

    /// Step brightness by `delta`, staying within `0..=100`
    pub fn adjust_brightness(&mut self, delta: i32) {
        self.brightness = (self.brightness as i32 + delta).clamp(0, 100) as u8;
    }

    /// Raw pixels, before brightness
    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    /// Unscaled view of the buffer
    pub fn frame(&self) -> Frame<'_> {
        Frame {
            width: self.width,
            height: self.height,
            pixels: &self.pixels,
        }
    }

    /// Scale by brightness and hand the frame to `sink`
    pub fn present(&mut self, sink: &mut dyn FrameSink) -> Result<()> {
        let brightness = self.brightness;
        self.scratch.clear();
        self.scratch
            .extend(self.pixels.iter().map(|p| p.scaled(brightness)));
        sink.present(&Frame {
            width: self.width,
            height: self.height,
            pixels: &self.scratch,
        })
    }
}

impl Canvas for FrameBuffer {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn get(&self, x: usize, y: usize) -> Rgba {
        if x >= self.width || y >= self.height {
            return Rgba::TRANSPARENT;
        }
        self.pixels[y * self.width + x]
    }

    #[inline]
    fn set(&mut self, x: usize, y: usize, color: Rgba) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = color;
        }
    }

    fn clear(&mut self) {
        self.pixels.fill(Rgba::TRANSPARENT);
    }
}

/// Sink that keeps a copy of the last presented frame
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    last: Arc<Mutex<Option<Vec<Rgba>>>>,
    presented: Arc<Mutex<u64>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the last frame, if any was presented
    pub fn last_frame(&self) -> Option<Vec<Rgba>> {
        self.last.lock().clone()
    }

    /// Frames presented so far
    pub fn presented(&self) -> u64 {
        *self.presented.lock()
    }
}

impl FrameSink for MemorySink {
    fn present(&mut self, frame: &Frame<'_>) -> Result<()> {
        let mut last = self.last.lock();
        match last.as_mut() {
            Some(pixels) => {
                pixels.clear();
                pixels.extend_from_slice(frame.pixels);
            }
            None => *last = Some(frame.pixels.to_vec()),
        }
        *self.presented.lock() += 1;
        Ok(())
    }
}

/// Sink that discards every frame
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn present(&mut self, _frame: &Frame<'_>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_canvas_rejected() {
        assert!(FrameBuffer::new(0, 4).is_err());
        assert!(FrameBuffer::new(4, 0).is_err());
    }

    #[test]
    fn test_set_get_and_bounds() {
        let mut fb = FrameBuffer::new(4, 2).unwrap();
        fb.set(3, 1, Rgba::WHITE);
        fb.set(4, 0, Rgba::WHITE);
        fb.set(0, 2, Rgba::WHITE);
        assert_eq!(fb.get(3, 1), Rgba::WHITE);
        assert_eq!(fb.get(9, 9), Rgba::TRANSPARENT);
        assert_eq!(fb.pixels().iter().filter(|p| **p == Rgba::WHITE).count(), 1);

        fb.clear();
        assert!(fb.pixels().iter().all(Rgba::is_transparent));
    }

    #[test]
    fn test_brightness_clamped() {
        let mut fb = FrameBuffer::new(1, 1).unwrap();
        fb.adjust_brightness(5);
        assert_eq!(fb.brightness(), 100);
        fb.set_brightness(1);
        fb.adjust_brightness(-1);
        fb.adjust_brightness(-1);
        assert_eq!(fb.brightness(), 0);
        fb.set_brightness(250);
        assert_eq!(fb.brightness(), 100);
    }

    #[test]
    fn test_present_applies_brightness() {
        let mut fb = FrameBuffer::new(2, 1).unwrap();
        fb.set(0, 0, Rgba::rgb(200, 100, 0));
        fb.set_brightness(50);

        let mut sink = MemorySink::new();
        fb.present(&mut sink).unwrap();
        let frame = sink.last_frame().unwrap();
        assert_eq!(frame[0], Rgba::rgb(100, 50, 0));
        assert_eq!(frame[1], Rgba::TRANSPARENT);
        assert_eq!(sink.presented(), 1);
        // the buffer itself stays unscaled
        assert_eq!(fb.get(0, 0), Rgba::rgb(200, 100, 0));
    }

    #[test]
    fn test_frame_get() {
        let fb = FrameBuffer::new(2, 2).unwrap();
        let frame = fb.frame();
        assert_eq!(frame.get(1, 1), Some(Rgba::TRANSPARENT));
        assert_eq!(frame.get(2, 0), None);
    }
}
