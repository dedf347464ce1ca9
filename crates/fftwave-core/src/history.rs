//! Sound energy history
//!
//! A fixed-capacity ring of tri-band energy samples, newest first. Both
//! renderer families read it: patterns as a radial "history fill" and
//! backgrounds as time-delayed ripples and waterfalls.

use std::collections::VecDeque;
use std::time::Instant;

use crate::color::Rgba;
use crate::{normalize, CoreError, Result};

/// Aggregate loudness of one render tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergySample {
    /// Loudest band in the lower third of the spectrum
    pub bass: f64,
    /// Loudest band in the middle third
    pub mid: f64,
    /// Loudest band in the upper third
    pub treble: f64,
    /// Hue phase in `[0, 1)` at the time of the push
    pub hue: f64,
    /// When the sample was taken
    pub at: Instant,
}

impl EnergySample {
    /// Sample with the same value in all three bands
    pub fn uniform(value: f64, hue: f64, at: Instant) -> Self {
        Self {
            bass: value,
            mid: value,
            treble: value,
            hue,
            at,
        }
    }

    /// `max(bass, mid, treble)`
    pub fn max_band(&self) -> f64 {
        self.bass.max(self.mid).max(self.treble)
    }

    /// HSV color of the sample: value from the loudest band normalised to
    /// `[min, max]`, hue captured at push time.
    pub fn color(&self, min: f64, max: f64, saturation: f64) -> Rgba {
        Rgba::from_hsv(self.hue, saturation, normalize(self.max_band(), min, max))
    }
}

/// Fixed-capacity ring of [`EnergySample`]s. Index 0 is the newest sample.
#[derive(Debug, Clone)]
pub struct SoundEnergyHistory {
    samples: VecDeque<EnergySample>,
    capacity: usize,
}

impl SoundEnergyHistory {
    /// Empty history holding at most `capacity` samples
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(CoreError::InvalidConfig(
                "sound energy history needs at least one slot".to_string(),
            ));
        }
        Ok(Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Push a new sample to the front, evicting the oldest when full.
    pub fn push(&mut self, sample: EnergySample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_back();
        }
        self.samples.push_front(sample);
    }

    /// Sample `index` ticks ago
    pub fn get(&self, index: usize) -> Option<&EnergySample> {
        self.samples.get(index)
    }

    /// Newest sample
    pub fn latest(&self) -> Option<&EnergySample> {
        self.samples.front()
    }

    /// Samples, newest first
    pub fn iter(&self) -> impl Iterator<Item = &EnergySample> {
        self.samples.iter()
    }

    /// Number of samples stored
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// No sample pushed yet
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of samples kept
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Mean of [`EnergySample::max_band`] over the `n` newest samples.
    ///
    /// Missing samples count as silence, so a fresh history ramps up instead
    /// of jumping to the first value.
    pub fn recent_max_average(&self, n: usize) -> f64 {
        if n == 0 {
            return 0.0;
        }
        let sum: f64 = self.samples.iter().take(n).map(EnergySample::max_band).sum();
        sum / n as f64
    }

    /// Index of the sample closest in time to each target, for targets that
    /// move monotonically into the past.
    ///
    /// The scan pointer only ever advances, so the whole lookup is a single
    /// pass over the history.
    pub fn nearest_indexes<I>(&self, targets: I) -> Vec<usize>
    where
        I: IntoIterator<Item = Instant>,
    {
        let mut cursor = 0;
        targets
            .into_iter()
            .map(|target| {
                while cursor + 1 < self.samples.len()
                    && distance(target, self.samples[cursor].at)
                        > distance(target, self.samples[cursor + 1].at)
                {
                    cursor += 1;
                }
                cursor
            })
            .collect()
    }
}

fn distance(a: Instant, b: Instant) -> std::time::Duration {
    if a > b {
        a - b
    } else {
        b - a
    }
}
