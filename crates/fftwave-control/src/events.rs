//! Discrete UI events
//!
//! These are what a rotary encoder produces (turn = brightness, press = next
//! pattern, long press = override toggle). The binary also accepts them as
//! single-word commands on stdin.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ControlError;

/// One user interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlEvent {
    /// Select the next pattern
    NextPattern,
    /// Select the next background
    NextBackground,
    /// Raise brightness by one step
    BrightnessUp,
    /// Lower brightness by one step
    BrightnessDown,
    /// Flip the constant override color on or off
    ToggleOverride,
    /// Dump the current audio window to a WAV file
    SaveRecording,
}

impl ControlEvent {
    /// Every event, in help-text order
    pub const ALL: [ControlEvent; 6] = [
        ControlEvent::NextPattern,
        ControlEvent::NextBackground,
        ControlEvent::BrightnessUp,
        ControlEvent::BrightnessDown,
        ControlEvent::ToggleOverride,
        ControlEvent::SaveRecording,
    ];

    /// Command word accepted by [`FromStr`]
    pub fn command(&self) -> &'static str {
        match self {
            ControlEvent::NextPattern => "pattern",
            ControlEvent::NextBackground => "background",
            ControlEvent::BrightnessUp => "up",
            ControlEvent::BrightnessDown => "down",
            ControlEvent::ToggleOverride => "override",
            ControlEvent::SaveRecording => "record",
        }
    }
}

impl fmt::Display for ControlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

impl FromStr for ControlEvent {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let word = s.trim().to_ascii_lowercase();
        match word.as_str() {
            "p" | "pattern" | "next" => Ok(ControlEvent::NextPattern),
            "b" | "background" => Ok(ControlEvent::NextBackground),
            "+" | "up" => Ok(ControlEvent::BrightnessUp),
            "-" | "down" => Ok(ControlEvent::BrightnessDown),
            "o" | "override" => Ok(ControlEvent::ToggleOverride),
            "r" | "record" => Ok(ControlEvent::SaveRecording),
            _ => Err(ControlError::InvalidMessage(format!(
                "Unknown command: {:?}",
                s.trim()
            ))),
        }
    }
}
