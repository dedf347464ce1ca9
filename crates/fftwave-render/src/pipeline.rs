//! Multi-threaded capture / analysis / render pipeline
//!
//! Three threads run on their own clocks:
//! - Capture thread: pulls chunks from an [`AudioSource`] into the shared
//!   [`SampleRing`] and pings the analysis thread
//! - Analysis thread: waits for a ping, analyzes the current window and posts
//!   the spectrum to a latest-wins [`Mailbox`]
//! - Render thread: ticks at the refresh rate, takes the newest spectrum if
//!   there is one and runs the [`Compositor`]
//!
//! No stage ever waits on a slower downstream stage: the ping channel holds a
//! single token and the mailbox a single spectrum, so stale work is dropped
//! instead of queued.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use fftwave_control::{ControlEvent, DmxHandle};
use fftwave_core::audio::analyzer::AnalyzerConfig;
use fftwave_core::{AudioSource, Config, MagnitudeSpectrum, SampleRing, SpectralAnalyzer};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, trace, warn};

use crate::canvas::FrameSink;
use crate::compositor::Compositor;
use crate::{RenderError, Result};

const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Single-slot handoff where a new value replaces an unread one
#[derive(Debug)]
pub struct Mailbox<T> {
    slot: Mutex<Option<T>>,
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value`. Returns `true` if an unread value was dropped.
    pub fn post(&self, value: T) -> bool {
        self.slot.lock().replace(value).is_some()
    }

    /// Take the pending value, if any
    pub fn take(&self) -> Option<T> {
        self.slot.lock().take()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }
}

/// Pipeline statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Capture chunks written to the ring
    pub windows_captured: u64,
    pub spectra_analyzed: u64,
    /// Spectra replaced in the mailbox before the render thread took them
    pub spectra_dropped: u64,
    pub analysis_failures: u64,
    pub frames_rendered: u64,
}

/// Runtime options not covered by [`Config`]
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Stop after this many frames
    pub max_frames: Option<u64>,
    /// Where `SaveRecording` writes WAV files
    pub recording_dir: PathBuf,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_frames: None,
            recording_dir: PathBuf::from("."),
        }
    }
}

/// Running pipeline. Dropping it stops all threads.
pub struct Pipeline {
    running: Arc<AtomicBool>,
    stats: Arc<RwLock<PipelineStats>>,
    ring: Arc<Mutex<SampleRing>>,
    capture_thread: Option<JoinHandle<()>>,
    analysis_thread: Option<JoinHandle<()>>,
    render_thread: Option<JoinHandle<()>>,
}

impl Pipeline {
    /// Spawn the capture, analysis and render threads.
    pub fn start(
        config: &Config,
        source: Box<dyn AudioSource>,
        compositor: Compositor,
        sink: Box<dyn FrameSink>,
        dmx: DmxHandle,
        events: Receiver<ControlEvent>,
        options: PipelineOptions,
    ) -> Result<Self> {
        config.validate()?;
        let analyzer = SpectralAnalyzer::new(AnalyzerConfig::from(config))?;

        let mut pipeline = Self {
            running: Arc::new(AtomicBool::new(true)),
            stats: Arc::new(RwLock::new(PipelineStats::default())),
            ring: Arc::new(Mutex::new(SampleRing::for_chunk_power(config.fft.chunk_power)?)),
            capture_thread: None,
            analysis_thread: None,
            render_thread: None,
        };

        let (ready_tx, ready_rx) = bounded::<()>(1);
        let mailbox = Arc::new(Mailbox::<MagnitudeSpectrum>::new());

        pipeline.capture_thread = Some(pipeline.spawn_capture(
            source,
            config.capture_chunk_len(),
            ready_tx,
        )?);
        pipeline.analysis_thread = Some(pipeline.spawn_analysis(analyzer, ready_rx, mailbox.clone())?);

        let render = RenderLoop {
            compositor,
            sink,
            dmx,
            events,
            mailbox,
            period: Duration::from_secs_f64(1.0 / config.display.refresh_rate as f64),
            bin_count: config.fft.bin_count,
            sample_rate: config.sample_rate,
            options,
        };
        pipeline.render_thread = Some(pipeline.spawn_render(render)?);

        info!(
            "Pipeline started: {} Hz audio, {}-sample window, {} Hz refresh",
            config.sample_rate,
            config.chunk_size(),
            config.display.refresh_rate
        );
        Ok(pipeline)
    }

    fn spawn_capture(
        &self,
        mut source: Box<dyn AudioSource>,
        chunk_len: usize,
        ready_tx: Sender<()>,
    ) -> Result<JoinHandle<()>> {
        let running = self.running.clone();
        let stats = self.stats.clone();
        let ring = self.ring.clone();

        thread::Builder::new()
            .name("capture-thread".to_string())
            .spawn(move || {
                info!("Capture thread started ({})", source.name());
                let mut chunk = vec![0i16; chunk_len];

                while running.load(Ordering::Acquire) {
                    let n = match source.read(&mut chunk) {
                        Ok(0) => continue,
                        Ok(n) => n,
                        Err(e) => {
                            warn!("Audio read failed: {}", e);
                            thread::sleep(POLL_TIMEOUT);
                            continue;
                        }
                    };

                    ring.lock().write(&chunk[..n]);
                    stats.write().windows_captured += 1;

                    // The analysis thread reads the newest window anyway, so
                    // one pending token is enough
                    if let Err(TrySendError::Disconnected(_)) = ready_tx.try_send(()) {
                        break;
                    }
                }

                info!("Capture thread stopped");
            })
            .map_err(RenderError::ThreadSpawn)
    }

    fn spawn_analysis(
        &self,
        mut analyzer: SpectralAnalyzer,
        ready_rx: Receiver<()>,
        mailbox: Arc<Mailbox<MagnitudeSpectrum>>,
    ) -> Result<JoinHandle<()>> {
        let running = self.running.clone();
        let stats = self.stats.clone();
        let ring = self.ring.clone();

        thread::Builder::new()
            .name("analysis-thread".to_string())
            .spawn(move || {
                info!("Analysis thread started");
                let mut window = Vec::with_capacity(analyzer.config().chunk_size());

                while running.load(Ordering::Acquire) {
                    match ready_rx.recv_timeout(POLL_TIMEOUT) {
                        Ok(()) => {}
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }

                    ring.lock().read_into(&mut window);
                    match analyzer.analyze(&window) {
                        Ok(spectrum) => {
                            let dropped = mailbox.post(spectrum);
                            let mut stats = stats.write();
                            stats.spectra_analyzed += 1;
                            if dropped {
                                stats.spectra_dropped += 1;
                                debug!("Dropped spectrum (render thread behind)");
                            }
                        }
                        Err(e) => {
                            stats.write().analysis_failures += 1;
                            warn!("Analysis cycle skipped: {}", e);
                        }
                    }
                }

                info!("Analysis thread stopped");
            })
            .map_err(RenderError::ThreadSpawn)
    }

    fn spawn_render(&self, mut render: RenderLoop) -> Result<JoinHandle<()>> {
        let running = self.running.clone();
        let stats = self.stats.clone();
        let ring = self.ring.clone();

        thread::Builder::new()
            .name("render-thread".to_string())
            .spawn(move || {
                info!("Render thread started");
                render.run(&running, &stats, &ring);
                info!("Render thread stopped");
            })
            .map_err(RenderError::ThreadSpawn)
    }

    /// Current statistics
    pub fn stats(&self) -> PipelineStats {
        *self.stats.read()
    }

    /// Threads are still running. Turns false once a frame limit is reached.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Block until the pipeline stops on its own, or `timeout` passes.
    /// Returns whether it stopped.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_running() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
        true
    }

    /// Signal shutdown and join every thread. Safe to call more than once.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);

        for (name, handle) in [
            ("capture", self.capture_thread.take()),
            ("analysis", self.analysis_thread.take()),
            ("render", self.render_thread.take()),
        ] {
            if let Some(handle) = handle {
                if handle.join().is_err() {
                    error!("{} thread panicked", name);
                }
            }
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State owned by the render thread
struct RenderLoop {
    compositor: Compositor,
    sink: Box<dyn FrameSink>,
    dmx: DmxHandle,
    events: Receiver<ControlEvent>,
    mailbox: Arc<Mailbox<MagnitudeSpectrum>>,
    period: Duration,
    bin_count: usize,
    sample_rate: u32,
    options: PipelineOptions,
}

impl RenderLoop {
    fn run(&mut self, running: &AtomicBool, stats: &RwLock<PipelineStats>, ring: &Arc<Mutex<SampleRing>>) {
        let mut spectrum: MagnitudeSpectrum = vec![0.0; self.bin_count];
        let mut last_tick: Option<Instant> = None;
        let mut next_tick = Instant::now();

        while running.load(Ordering::Acquire) {
            while let Ok(event) = self.events.try_recv() {
                self.handle_event(event, ring);
            }

            if let Some(latest) = self.mailbox.take() {
                spectrum = latest;
            }

            let now = Instant::now();
            let elapsed = last_tick.map_or(Duration::ZERO, |t| now.duration_since(t));
            last_tick = Some(now);

            let dmx = self.dmx.load();
            if let Err(e) = self
                .compositor
                .render_at(now, elapsed, &spectrum, &dmx, self.sink.as_mut())
            {
                warn!("Frame not presented: {}", e);
            }

            let frames = {
                let mut stats = stats.write();
                stats.frames_rendered += 1;
                stats.frames_rendered
            };
            if frames % 1000 == 0 {
                trace!("Rendered {} frames", frames);
            }
            if self.options.max_frames.is_some_and(|max| frames >= max) {
                info!("Frame limit of {} reached", frames);
                running.store(false, Ordering::Release);
                break;
            }

            next_tick += self.period;
            let now = Instant::now();
            if next_tick > now {
                thread::sleep(next_tick - now);
            } else {
                // Fell behind; skip the missed ticks instead of bursting
                next_tick = now;
            }
        }
    }

    fn handle_event(&mut self, event: ControlEvent, ring: &Arc<Mutex<SampleRing>>) {
        debug!("Control event: {}", event);
        match event {
            ControlEvent::NextPattern => self.compositor.next_pattern(),
            ControlEvent::NextBackground => self.compositor.next_background(),
            ControlEvent::BrightnessUp => self.compositor.adjust_brightness(1),
            ControlEvent::BrightnessDown => self.compositor.adjust_brightness(-1),
            ControlEvent::ToggleOverride => self.dmx.toggle_override(),
            ControlEvent::SaveRecording => self.save_recording(ring),
        }
    }

    fn save_recording(&self, ring: &Arc<Mutex<SampleRing>>) {
        let snapshot = ring.lock().clone();
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let path = self
            .options
            .recording_dir
            .join(format!("recording_{}.wav", stamp));
        let sample_rate = self.sample_rate;

        // Writing the file must not stall the render tick
        let spawned = thread::Builder::new()
            .name("wav-writer".to_string())
            .spawn(move || {
                if let Err(e) = snapshot.save_wav(&path, sample_rate) {
                    error!("Failed to save recording to {:?}: {}", path, e);
                }
            });
        if let Err(e) = spawned {
            error!("Failed to start recording writer: {}", e);
        }
    }
}
