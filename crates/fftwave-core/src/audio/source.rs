//! Audio sources feeding the capture thread

use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::{CoreError, Result};

/// Producer of signed 16-bit mono samples.
///
/// `read` blocks until the next chunk is available and returns how many
/// samples were written into `buf`. `Ok(0)` means nothing arrived yet; the
/// caller should check for shutdown and try again.
pub trait AudioSource: Send {
    /// Fill `buf` with the next chunk of samples
    fn read(&mut self, buf: &mut [i16]) -> Result<usize>;

    /// Sample rate of the produced audio
    fn sample_rate(&self) -> u32;

    /// Human readable name for logging
    fn name(&self) -> &str;
}

const SWEEP_START_HZ: i64 = 10;

/// Synthetic sawtooth sweep used when no sound card is available.
///
/// Every chunk raises the sweep frequency by 10 %; once it passes the sample
/// rate it restarts at 10 Hz. Chunks are paced to real time unless pacing is
/// turned off.
#[derive(Debug, Clone)]
pub struct SweepSource {
    sample_rate: u32,
    chunk_len: usize,
    freq: i64,
    position: i64,
    paced: bool,
    next_deadline: Option<Instant>,
}

impl SweepSource {
    /// Create a sweep emitting `chunk_len` samples per read.
    pub fn new(sample_rate: u32, chunk_len: usize) -> Result<Self> {
        if sample_rate == 0 || chunk_len == 0 {
            return Err(CoreError::InvalidConfig(format!(
                "sweep needs a positive sample rate and chunk length, got {} / {}",
                sample_rate, chunk_len
            )));
        }
        Ok(Self {
            sample_rate,
            chunk_len,
            freq: SWEEP_START_HZ,
            position: 0,
            paced: true,
            next_deadline: None,
        })
    }

    /// Enable or disable real-time pacing.
    pub fn paced(mut self, paced: bool) -> Self {
        self.paced = paced;
        self
    }

    /// Current sweep frequency in Hz
    pub fn frequency(&self) -> i64 {
        self.freq
    }

    fn chunk_duration(&self) -> Duration {
        Duration::from_secs_f64(self.chunk_len as f64 / self.sample_rate as f64)
    }

    fn wait_for_deadline(&mut self) {
        let now = Instant::now();
        let deadline = *self.next_deadline.get_or_insert(now);
        if deadline > now {
            thread::sleep(deadline - now);
        }
        // Fall back to "now" after a long stall instead of bursting to catch up
        let next = deadline + self.chunk_duration();
        self.next_deadline = Some(next.max(Instant::now()));
    }
}

impl AudioSource for SweepSource {
    fn read(&mut self, buf: &mut [i16]) -> Result<usize> {
        if self.paced {
            self.wait_for_deadline();
        }

        self.freq = (self.freq as f64 * 1.1).round() as i64;
        if self.freq > self.sample_rate as i64 {
            self.freq = SWEEP_START_HZ;
            debug!("Sweep wrapped back to {} Hz", SWEEP_START_HZ);
        }

        let rate = self.sample_rate as i64;
        let n = buf.len().min(self.chunk_len);
        for slot in buf.iter_mut().take(n) {
            // Truncating to i16 folds the ramp into a sawtooth
            *slot = (self.freq * self.position * 0xffff / rate - 0x7fff) as i16;
            self.position = (self.position + 1) % rate;
        }
        Ok(n)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn name(&self) -> &str {
        "sweep"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_chunk() {
        assert!(SweepSource::new(44100, 0).is_err());
        assert!(SweepSource::new(0, 441).is_err());
    }

    #[test]
    fn test_chunk_length_and_frequency_growth() {
        let mut source = SweepSource::new(44100, 441).unwrap().paced(false);
        let mut buf = vec![0i16; 1024];

        assert_eq!(source.read(&mut buf).unwrap(), 441);
        assert_eq!(source.frequency(), 11);
        source.read(&mut buf).unwrap();
        assert_eq!(source.frequency(), 12);
    }

    #[test]
    fn test_frequency_wraps_at_sample_rate() {
        let mut source = SweepSource::new(1000, 10).unwrap().paced(false);
        let mut buf = vec![0i16; 10];
        let mut wrapped = false;
        for _ in 0..200 {
            source.read(&mut buf).unwrap();
            assert!(source.frequency() <= 1000);
            if source.frequency() == SWEEP_START_HZ {
                wrapped = true;
            }
        }
        assert!(wrapped, "sweep never wrapped");
    }

    #[test]
    fn test_produces_signal() {
        let mut source = SweepSource::new(44100, 441).unwrap().paced(false);
        let mut buf = vec![0i16; 441];
        source.read(&mut buf).unwrap();
        assert_eq!(buf[0], -0x7fff);
        assert!(buf.iter().any(|&s| s != buf[0]));
    }
}
