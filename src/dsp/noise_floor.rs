//! Adaptive noise floor tracking.

use super::gain::{db_to_linear, linear_to_db};
use super::smoother::OnePoleSmoother;

/// Time constant for tracking the floor downward (fast).
const FALL_MS: f64 = 500.0;

/// Time constant for tracking the floor upward (slow).
const RISE_MS: f64 = 5000.0;

/// Activation margin above the floor, in dB.
const MARGIN_DB: f64 = 6.0;

/// Initial floor estimate in dBFS. Starts high so it tracks down quickly.
const INIT_DB: f64 = -60.0;

/// Lower bound for the floor in dBFS. Keeps the activity threshold and any
/// downstream division away from zero.
const MIN_FLOOR_DB: f64 = -120.0;

/// Minimum-follower estimate of the ambient background level.
///
/// The estimate falls quickly when the signal drops below it and rises only
/// slowly, so speech passages do not drag the floor upward. A channel is
/// "active" when its RMS exceeds the floor by the margin.
pub struct NoiseFloorTracker {
    floor: f64,
    smoother: OnePoleSmoother,
    margin: f64,
    min_floor: f64,
}

impl NoiseFloorTracker {
    pub fn new(sample_rate: f64) -> Self {
        // The smoother's attack side handles rising input (slow), the
        // release side handles falling input (fast).
        let mut smoother = OnePoleSmoother::from_ms(RISE_MS, FALL_MS, sample_rate);
        let init = db_to_linear(INIT_DB);
        smoother.set_value(init);
        Self {
            floor: init,
            smoother,
            margin: db_to_linear(MARGIN_DB),
            min_floor: db_to_linear(MIN_FLOOR_DB),
        }
    }

    /// Update the estimate with the block's RMS level (linear).
    ///
    /// Input well above the current floor is treated as program material and
    /// does not pull the estimate up; the smoother keeps ticking toward the
    /// held floor instead.
    pub fn update(&mut self, rms_linear: f64) {
        if rms_linear < self.floor * self.margin {
            self.floor = self.smoother.process(rms_linear.max(self.min_floor));
        } else {
            self.floor = self.smoother.process(self.floor);
        }
        if self.floor < self.min_floor {
            self.floor = self.min_floor;
            self.smoother.set_value(self.min_floor);
        }
    }

    /// True when `rms_linear` clears the floor by the activation margin.
    #[inline]
    pub fn is_active(&self, rms_linear: f64) -> bool {
        rms_linear > self.floor * self.margin
    }

    #[inline]
    pub fn floor_db(&self) -> f64 {
        linear_to_db(self.floor)
    }

    /// Return to the initial high floor.
    pub fn reset(&mut self) {
        let init = db_to_linear(INIT_DB);
        self.floor = init;
        self.smoother.set_value(init);
    }
}
