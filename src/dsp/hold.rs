//! Last-mic-hold tracking.

use super::gain::ms_to_samples;

/// Keeps the most recently active channel open for a hold window after every
/// channel goes quiet, so the mix does not pump up ambient noise the moment
/// all talkers pause at once.
pub struct HoldTracker {
    last_active: Option<usize>,
    elapsed: u64,
    hold_samples: u64,
}

impl HoldTracker {
    pub fn new(hold_ms: f64, sample_rate: f64) -> Self {
        Self {
            last_active: None,
            elapsed: 0,
            hold_samples: ms_to_samples(hold_ms, sample_rate) as u64,
        }
    }

    /// Advance one block and return the channel to hold open, if any.
    ///
    /// `active` and `participating` are per-channel flags; `block_size` is
    /// the number of samples in this block. A held channel is released early
    /// if it stops participating (muted, bypassed, or lost the solo).
    pub fn update(
        &mut self,
        active: &[bool],
        participating: &[bool],
        block_size: usize,
    ) -> Option<usize> {
        let mut last_found = None;
        for (i, (&a, &p)) in active.iter().zip(participating).enumerate() {
            if a && p {
                last_found = Some(i);
            }
        }

        if let Some(ch) = last_found {
            self.last_active = Some(ch);
            self.elapsed = 0;
            return None;
        }

        if self.hold_samples == 0 {
            return None;
        }

        match self.last_active {
            Some(ch) if participating.get(ch).copied().unwrap_or(false) => {
                self.elapsed += block_size as u64;
                if self.elapsed < self.hold_samples {
                    Some(ch)
                } else {
                    None
                }
            }
            _ => {
                // Held channel vanished from the mix, or none was known.
                self.last_active = None;
                None
            }
        }
    }

    pub fn set_hold_time_ms(&mut self, hold_ms: f64, sample_rate: f64) {
        self.hold_samples = ms_to_samples(hold_ms, sample_rate) as u64;
    }

    pub fn reset(&mut self) {
        self.last_active = None;
        self.elapsed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_hold_while_any_channel_active() {
        let mut h = HoldTracker::new(500.0, 48000.0);
        assert_eq!(h.update(&[true, false], &[true, true], 256), None);
    }

    #[test]
    fn test_holds_last_active_channel() {
        let mut h = HoldTracker::new(500.0, 48000.0);
        h.update(&[false, true], &[true, true], 256);

        let held = h.update(&[false, false], &[true, true], 256);
        assert_eq!(held, Some(1));
    }

    #[test]
    fn test_hold_expires_after_window() {
        let mut h = HoldTracker::new(500.0, 48000.0);
        h.update(&[true], &[true], 256);

        // 500ms at 48kHz is 24000 samples; 200 blocks of 256 is far past it.
        for _ in 0..200 {
            h.update(&[false], &[true], 256);
        }
        assert_eq!(h.update(&[false], &[true], 256), None);
    }

    #[test]
    fn test_held_channel_leaving_mix_releases() {
        let mut h = HoldTracker::new(500.0, 48000.0);
        h.update(&[true], &[true], 256);

        let held = h.update(&[false], &[false], 256);
        assert_eq!(held, None);
    }

    #[test]
    fn test_zero_hold_time_disables() {
        let mut h = HoldTracker::new(0.0, 48000.0);
        h.update(&[true], &[true], 256);
        assert_eq!(h.update(&[false], &[true], 256), None);
    }

    #[test]
    fn test_new_talker_retriggers() {
        let mut h = HoldTracker::new(500.0, 48000.0);
        h.update(&[true, false], &[true, true], 256);
        for _ in 0..10 {
            h.update(&[false, false], &[true, true], 256);
        }

        // Channel 1 takes over, then silence again: hold follows channel 1
        // with a fresh counter.
        h.update(&[false, true], &[true, true], 256);
        assert_eq!(h.update(&[false, false], &[true, true], 256), Some(1));
    }

    #[test]
    fn test_reset_forgets_last_active() {
        let mut h = HoldTracker::new(500.0, 48000.0);
        h.update(&[true], &[true], 256);
        h.reset();
        assert_eq!(h.update(&[false], &[true], 256), None);
    }
}
