//! Fixed-size circular buffer of signed 16-bit samples.
//!
//! The capture thread writes chunks of any length; the analysis thread reads
//! the most recent `capacity` samples in chronological order.

use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::info;

use crate::{CoreError, Result};

/// Circular buffer retaining the last `capacity` samples written.
#[derive(Debug, Clone)]
pub struct SampleRing {
    data: Vec<i16>,
    write_pos: usize,
    written: u64,
}

impl SampleRing {
    /// Create a zero-filled ring. The capacity must be positive.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(CoreError::InvalidConfig(
                "sample ring capacity must be positive".to_string(),
            ));
        }
        Ok(Self {
            data: vec![0; capacity],
            write_pos: 0,
            written: 0,
        })
    }

    /// Ring sized for a `2^chunk_power` analysis window.
    pub fn for_chunk_power(chunk_power: u32) -> Result<Self> {
        Self::new(1usize << chunk_power)
    }

    /// Write samples, overwriting the oldest data. Returns the count consumed.
    pub fn write(&mut self, samples: &[i16]) -> usize {
        let n = samples.len();
        self.written += n as u64;

        // Only the tail can survive a write longer than the ring
        let capacity = self.data.len();
        let tail = if n > capacity {
            &samples[n - capacity..]
        } else {
            samples
        };

        for &sample in tail {
            self.data[self.write_pos] = sample;
            self.write_pos = (self.write_pos + 1) % capacity;
        }
        n
    }

    /// The most recent `capacity` samples, oldest first.
    pub fn read(&self) -> Vec<i16> {
        let mut out = Vec::with_capacity(self.data.len());
        self.read_into(&mut out);
        out
    }

    /// Like [`read`](Self::read) but reuses the caller's allocation.
    pub fn read_into(&self, out: &mut Vec<i16>) {
        out.clear();
        out.extend_from_slice(&self.data[self.write_pos..]);
        out.extend_from_slice(&self.data[..self.write_pos]);
    }

    /// Ring capacity (the analysis window length)
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Total samples written since creation
    pub fn total_written(&self) -> u64 {
        self.written
    }

    /// Dump the current window as 16-bit mono WAV.
    pub fn save_wav<P: AsRef<Path>>(&self, path: P, sample_rate: u32) -> Result<()> {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path.as_ref(), spec)?;
        for sample in self.read() {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;

        info!(
            "Saved {} samples to {:?}",
            self.data.len(),
            path.as_ref()
        );
        Ok(())
    }
}
