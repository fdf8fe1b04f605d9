//! Per-channel DSP strip.

use crate::dsp::level::LevelDetector;
use crate::dsp::noise_floor::NoiseFloorTracker;
use crate::dsp::smoother::OnePoleSmoother;

/// RMS detection window in milliseconds.
const RMS_WINDOW_MS: f64 = 20.0;

/// Detector, floor tracker, and gain smoother for a single channel.
/// Owned by the audio thread; parameters and meters live elsewhere as
/// atomic cells.
pub(crate) struct ChannelStrip {
    pub level: LevelDetector,
    pub floor: NoiseFloorTracker,
    pub smoother: OnePoleSmoother,
}

impl ChannelStrip {
    pub fn new(attack_ms: f64, release_ms: f64, sample_rate: f64) -> Self {
        Self {
            level: LevelDetector::new(RMS_WINDOW_MS, sample_rate),
            floor: NoiseFloorTracker::new(sample_rate),
            smoother: OnePoleSmoother::from_ms(attack_ms, release_ms, sample_rate),
        }
    }

    pub fn set_smoothing(&mut self, attack_ms: f64, release_ms: f64, sample_rate: f64) {
        self.smoother.set_times(attack_ms, release_ms, sample_rate);
    }

    /// Clear all DSP state. Parameters are untouched.
    pub fn reset(&mut self) {
        self.level.reset();
        self.floor.reset();
        self.smoother.reset();
    }
}
