//! Sound card capture through cpal
//!
//! The cpal stream lives on its own thread so the source itself stays `Send`.
//! Chunks are handed over through a bounded channel; when the capture thread
//! falls behind, new chunks are dropped and counted.
//!
//! The device must run at the configured sample rate. Band edges and the WAV
//! dump are computed from that rate, so a device that cannot provide it is
//! rejected instead of being opened at its default rate.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SizedSample};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::{debug, error, info, warn};

use super::source::AudioSource;
use crate::{CoreError, Result};

const CHUNK_QUEUE_DEPTH: usize = 16;
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Default input device of the default cpal host, down-mixed to mono i16
pub struct CpalSource {
    receiver: Receiver<Vec<i16>>,
    pending: Vec<i16>,
    sample_rate: u32,
    dropped: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    stream_thread: Option<JoinHandle<()>>,
}

impl CpalSource {
    /// Open the default input device at `sample_rate`.
    ///
    /// Fails with [`CoreError::Audio`] when none of the device's input
    /// configurations covers that rate.
    pub fn open(sample_rate: u32) -> Result<Self> {
        let (chunk_tx, chunk_rx) = bounded(CHUNK_QUEUE_DEPTH);
        let (ready_tx, ready_rx) = bounded::<Result<()>>(1);
        let dropped = Arc::new(AtomicU64::new(0));
        let running = Arc::new(AtomicBool::new(true));

        let thread_dropped = dropped.clone();
        let thread_running = running.clone();
        let handle = thread::Builder::new()
            .name("cpal-stream".to_string())
            .spawn(move || {
                let stream = match open_stream(sample_rate, chunk_tx, thread_dropped) {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                while thread_running.load(Ordering::Acquire) {
                    thread::sleep(READ_TIMEOUT);
                }
                drop(stream);
                info!("cpal stream closed");
            })
            .map_err(CoreError::Io)?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(e);
            }
            Err(_) => {
                let _ = handle.join();
                return Err(CoreError::Audio("cpal stream thread died".to_string()));
            }
        }

        Ok(Self {
            receiver: chunk_rx,
            pending: Vec::new(),
            sample_rate,
            dropped,
            running,
            stream_thread: Some(handle),
        })
    }

    /// Chunks dropped because the consumer was too slow
    pub fn dropped_chunks(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// One supported input configuration range of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InputRange {
    min_rate: u32,
    max_rate: u32,
    channels: u16,
    format: SampleFormat,
}

impl InputRange {
    fn covers(&self, sample_rate: u32) -> bool {
        (self.min_rate..=self.max_rate).contains(&sample_rate)
    }
}

/// Lower is better. `None` for formats the stream builder cannot convert.
fn format_rank(format: SampleFormat) -> Option<u8> {
    match format {
        SampleFormat::I16 => Some(0),
        SampleFormat::F32 => Some(1),
        SampleFormat::U16 => Some(2),
        _ => None,
    }
}

/// Index of the range to open at `sample_rate`: usable format, fewest
/// channels, then the cheapest conversion to i16.
fn select_input_range(ranges: &[InputRange], sample_rate: u32) -> Option<usize> {
    ranges
        .iter()
        .enumerate()
        .filter(|(_, range)| range.covers(sample_rate))
        .filter_map(|(i, range)| Some((i, range.channels, format_rank(range.format)?)))
        .min_by_key(|&(_, channels, rank)| (channels, rank))
        .map(|(i, _, _)| i)
}

fn describe_ranges(ranges: &[InputRange]) -> String {
    ranges
        .iter()
        .map(|r| format!("{}-{} Hz {:?} x{}", r.min_rate, r.max_rate, r.format, r.channels))
        .collect::<Vec<_>>()
        .join(", ")
}

fn open_stream(
    sample_rate: u32,
    sender: Sender<Vec<i16>>,
    dropped: Arc<AtomicU64>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| CoreError::Audio("No default input device found".to_string()))?;
    let supported: Vec<cpal::SupportedStreamConfigRange> = device
        .supported_input_configs()
        .map_err(|e| CoreError::Audio(e.to_string()))?
        .collect();
    let ranges: Vec<InputRange> = supported
        .iter()
        .map(|range| InputRange {
            min_rate: range.min_sample_rate(),
            max_rate: range.max_sample_rate(),
            channels: range.channels(),
            format: range.sample_format(),
        })
        .collect();

    let index = select_input_range(&ranges, sample_rate).ok_or_else(|| {
        CoreError::Audio(format!(
            "Input device does not support {} Hz (supported: {})",
            sample_rate,
            describe_ranges(&ranges)
        ))
    })?;
    let chosen = supported[index].clone().with_sample_rate(sample_rate);
    info!("Opening input device with {:?}", chosen);

    let channels = chosen.channels() as usize;
    let config = chosen.config();
    let stream = match chosen.sample_format() {
        SampleFormat::I16 => build_stream::<i16>(&device, &config, channels, sender, dropped),
        SampleFormat::U16 => build_stream::<u16>(&device, &config, channels, sender, dropped),
        SampleFormat::F32 => build_stream::<f32>(&device, &config, channels, sender, dropped),
        other => Err(CoreError::Audio(format!(
            "Unsupported sample format {:?}",
            other
        ))),
    }?;

    stream
        .play()
        .map_err(|e| CoreError::Audio(e.to_string()))?;
    Ok(stream)
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    sender: Sender<Vec<i16>>,
    dropped: Arc<AtomicU64>,
) -> Result<cpal::Stream>
where
    T: SizedSample + Send + 'static,
    i16: cpal::FromSample<T>,
{
    let channels = channels.max(1);
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                // First channel only
                let chunk: Vec<i16> = data
                    .iter()
                    .step_by(channels)
                    .map(|&sample| cpal::Sample::from_sample(sample))
                    .collect();
                match sender.try_send(chunk) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        let total = dropped.fetch_add(1, Ordering::Relaxed) + 1;
                        if total % 100 == 1 {
                            debug!("Capture queue full, {} chunks dropped so far", total);
                        }
                    }
                    Err(TrySendError::Disconnected(_)) => {}
                }
            },
            |err| error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| CoreError::Audio(e.to_string()))
}

impl AudioSource for CpalSource {
    fn read(&mut self, buf: &mut [i16]) -> Result<usize> {
        if self.pending.is_empty() {
            match self.receiver.recv_timeout(READ_TIMEOUT) {
                Ok(chunk) => self.pending = chunk,
                Err(RecvTimeoutError::Timeout) => return Ok(0),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(CoreError::Audio("Audio stream disconnected".to_string()))
                }
            }
        }

        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn name(&self) -> &str {
        "cpal"
    }
}

impl Drop for CpalSource {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.stream_thread.take() {
            if handle.join().is_err() {
                warn!("cpal stream thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(min_rate: u32, max_rate: u32, channels: u16, format: SampleFormat) -> InputRange {
        InputRange {
            min_rate,
            max_rate,
            channels,
            format,
        }
    }

    #[test]
    fn test_rejects_device_without_configured_rate() {
        // Typical USB interface fixed at 48 kHz
        let ranges = [
            range(48000, 48000, 2, SampleFormat::F32),
            range(48000, 48000, 1, SampleFormat::I16),
        ];
        assert_eq!(select_input_range(&ranges, 44100), None);
        assert_eq!(select_input_range(&ranges, 48000), Some(1));
    }

    #[test]
    fn test_picks_range_covering_rate() {
        let ranges = [
            range(8000, 22050, 1, SampleFormat::I16),
            range(8000, 96000, 2, SampleFormat::F32),
        ];
        assert_eq!(select_input_range(&ranges, 44100), Some(1));
    }

    #[test]
    fn test_prefers_mono_then_i16() {
        let ranges = [
            range(44100, 44100, 2, SampleFormat::I16),
            range(44100, 48000, 1, SampleFormat::U16),
            range(8000, 192000, 1, SampleFormat::F32),
        ];
        assert_eq!(select_input_range(&ranges, 44100), Some(2));
    }

    #[test]
    fn test_skips_unconvertible_formats() {
        let ranges = [
            range(44100, 44100, 1, SampleFormat::I8),
            range(44100, 44100, 2, SampleFormat::F32),
        ];
        assert_eq!(select_input_range(&ranges, 44100), Some(1));
        assert_eq!(select_input_range(&ranges[..1], 44100), None);
    }

    #[test]
    fn test_describe_ranges_lists_every_range() {
        let text = describe_ranges(&[
            range(48000, 48000, 2, SampleFormat::F32),
            range(8000, 16000, 1, SampleFormat::I16),
        ]);
        assert_eq!(text, "48000-48000 Hz F32 x2, 8000-16000 Hz I16 x1");
    }
}
