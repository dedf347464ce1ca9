//! fftwave Control - external control inputs
//!
//! This crate provides the inputs that steer the renderer from outside:
//! - **DMX**: control block decoding and an Art-Net receiver
//! - **Snapshot**: the lock-free [`DmxHandle`] read by the render loop
//! - **Events**: rotary-encoder style [`ControlEvent`]s
//!
//! ## Quick Start
//!
//! ```rust
//! use fftwave_control::{ControlEvent, DmxHandle};
//!
//! let dmx = DmxHandle::default();
//! let event: ControlEvent = "override".parse().unwrap();
//! if event == ControlEvent::ToggleOverride {
//!     dmx.toggle_override();
//! }
//! assert!(dmx.load().override_color().is_some());
//! ```

#![warn(missing_docs)]

/// Error types
pub mod error;

/// DMX input (decoding, Art-Net)
pub mod dmx;
/// UI events
pub mod events;
/// Shared control snapshot
pub mod snapshot;

// Re-exports
pub use dmx::{ArtNetReceiver, DmxControl, DmxListener};
pub use error::{ControlError, Result};
pub use events::ControlEvent;
pub use snapshot::DmxHandle;
