//! Art-Net protocol input (ArtDmx)
//!
//! Art-Net is a UDP-based protocol for transmitting DMX512 over Ethernet.
//! The receiver listens for ArtDmx packets on one universe and decodes the
//! control block found at the configured start address.

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use super::{DmxControl, EXTENDED_FRAME_LEN, FRAME_LEN};
use crate::snapshot::DmxHandle;
use crate::{error::ControlError, Result};

const HEADER: &[u8; 8] = b"Art-Net\0";
const OP_DMX: u16 = 0x5000;
const DMX_OFFSET: usize = 18;
const MAX_PACKET: usize = DMX_OFFSET + 512;
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Split an ArtDmx packet into `(universe, channel data)`.
///
/// Returns `Ok(None)` for valid Art-Net packets of other opcodes.
pub fn parse_artdmx(packet: &[u8]) -> Result<Option<(u16, &[u8])>> {
    if packet.len() < 10 || &packet[0..8] != HEADER {
        return Err(ControlError::InvalidMessage(
            "Not an Art-Net packet".to_string(),
        ));
    }

    // OpCode (little-endian)
    let opcode = u16::from_le_bytes([packet[8], packet[9]]);
    if opcode != OP_DMX {
        return Ok(None);
    }
    if packet.len() < DMX_OFFSET {
        return Err(ControlError::InvalidMessage(format!(
            "ArtDmx header truncated at {} bytes",
            packet.len()
        )));
    }

    // Universe (Port-Address, little-endian)
    let universe = u16::from_le_bytes([packet[14], packet[15]]);

    // Length (big-endian)
    let length = u16::from_be_bytes([packet[16], packet[17]]) as usize;
    let data = &packet[DMX_OFFSET..];
    if length > data.len() || length > 512 {
        return Err(ControlError::InvalidMessage(format!(
            "ArtDmx length {} exceeds payload of {} bytes",
            length,
            data.len()
        )));
    }

    Ok(Some((universe, &data[..length])))
}

/// Art-Net listener for one universe
pub struct ArtNetReceiver {
    socket: UdpSocket,
    universe: u16,
    start_address: u16,
    frames: u64,
}

impl ArtNetReceiver {
    /// Bind the receiver
    ///
    /// # Arguments
    /// * `bind` - Listen address (typically "0.0.0.0:6454")
    /// * `universe` - Art-Net universe to accept
    /// * `start_address` - 1-based DMX channel of the first control byte
    pub fn bind(bind: &str, universe: u16, start_address: u16) -> Result<Self> {
        let addr: SocketAddr = bind.parse().map_err(|e| {
            ControlError::DmxError(format!("Invalid Art-Net bind address: {}", e))
        })?;
        if start_address == 0 || start_address as usize + FRAME_LEN - 1 > 512 {
            return Err(ControlError::DmxError(format!(
                "Start address {} leaves no room for the control block",
                start_address
            )));
        }

        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(POLL_TIMEOUT))?;

        info!(
            "Art-Net receiver listening on {} (universe {}, address {})",
            socket.local_addr()?,
            universe,
            start_address
        );

        Ok(Self {
            socket,
            universe,
            start_address,
            frames: 0,
        })
    }

    /// Address the socket is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Wait up to the poll timeout for one packet and decode it.
    ///
    /// Packets for other universes, other opcodes and frames without the
    /// valid marker all yield `Ok(None)`.
    pub fn receive(&mut self) -> Result<Option<DmxControl>> {
        let mut buf = [0u8; MAX_PACKET];
        let len = match self.socket.recv_from(&mut buf) {
            Ok((len, _)) => len,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                return Ok(None)
            }
            Err(e) => return Err(e.into()),
        };

        self.decode_packet(&buf[..len])
    }

    fn decode_packet(&mut self, packet: &[u8]) -> Result<Option<DmxControl>> {
        let Some((universe, channels)) = parse_artdmx(packet)? else {
            return Ok(None);
        };
        if universe != self.universe {
            return Ok(None);
        }

        let start = self.start_address as usize - 1;
        if channels.len() < start + FRAME_LEN {
            return Err(ControlError::InvalidMessage(format!(
                "Universe {} carries {} channels, control block ends at {}",
                universe,
                channels.len(),
                start + FRAME_LEN
            )));
        }
        let end = (start + EXTENDED_FRAME_LEN).min(channels.len());

        self.frames += 1;
        if self.frames % 100 == 0 {
            trace!("Received {} Art-Net frames", self.frames);
        }
        DmxControl::decode(&channels[start..end])
    }

    /// Get the accepted universe
    pub fn universe(&self) -> u16 {
        self.universe
    }
}

/// Tracks when the console was last heard from
#[derive(Debug, Clone, Copy)]
struct SignalWatch {
    timeout: Duration,
    last_seen: Option<Instant>,
}

impl SignalWatch {
    fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_seen: None,
        }
    }

    fn seen(&mut self, now: Instant) {
        self.last_seen = Some(now);
    }

    /// True once when the signal has been silent for longer than the timeout
    fn lost(&mut self, now: Instant) -> bool {
        match self.last_seen {
            Some(seen) if now.saturating_duration_since(seen) > self.timeout => {
                self.last_seen = None;
                true
            }
            _ => false,
        }
    }
}

/// Background thread feeding Art-Net frames into a [`DmxHandle`]
///
/// The handle goes inactive when no valid frame arrived for `timeout`, and
/// becomes active again with the next frame.
pub struct DmxListener {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl DmxListener {
    /// Start listening. The handle goes inactive when the listener stops.
    pub fn start(
        mut receiver: ArtNetReceiver,
        handle: DmxHandle,
        timeout: Duration,
    ) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = running.clone();

        let thread = thread::Builder::new()
            .name("artnet-rx".to_string())
            .spawn(move || {
                info!("DMX listener started");
                let mut watch = SignalWatch::new(timeout);
                let mut previous: Option<DmxControl> = None;
                while thread_running.load(Ordering::Acquire) {
                    match receiver.receive() {
                        Ok(Some(control)) => {
                            if previous.is_none() {
                                info!("DMX signal acquired");
                            }
                            handle.update(|current| {
                                current.merge_frame(control, previous.as_ref())
                            });
                            previous = Some(control);
                            watch.seen(Instant::now());
                        }
                        Ok(None) => {}
                        Err(ControlError::InvalidMessage(msg)) => debug!("{}", msg),
                        Err(e) => {
                            warn!("Art-Net receive failed: {}", e);
                            thread::sleep(POLL_TIMEOUT);
                        }
                    }
                    if watch.lost(Instant::now()) {
                        info!("DMX signal lost after {:?}, releasing control", timeout);
                        handle.update(|control| control.active = false);
                        previous = None;
                    }
                }
                handle.update(|control| control.active = false);
                info!("DMX listener stopped");
            })?;

        Ok(Self {
            running,
            thread: Some(thread),
        })
    }

    /// Stop the listener and wait for its thread. Safe to call twice.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("DMX listener thread panicked");
            }
        }
    }
}

impl Drop for DmxListener {
    fn drop(&mut self) {
        self.stop();
    }
}
