//! Sliding-window RMS level detection.

use super::gain::{ms_to_samples, sanitize};

/// RMS detector over a fixed window of squared samples.
///
/// The window is a ring buffer with an incrementally maintained running sum,
/// so each sample costs O(1): subtract the ejected square, add the new one.
/// The sum is clamped at zero to keep floating-point drift from pushing the
/// mean negative over long sessions.
pub struct LevelDetector {
    window: Box<[f64]>,
    write_pos: usize,
    running_sum: f64,
    samples_seen: u64,
    current_rms: f64,
}

impl LevelDetector {
    /// Create a detector with a window of `window_ms` at `sample_rate`.
    /// The window is sized once here and never reallocated.
    pub fn new(window_ms: f64, sample_rate: f64) -> Self {
        let len = ms_to_samples(window_ms, sample_rate).max(1);
        Self {
            window: vec![0.0; len].into_boxed_slice(),
            write_pos: 0,
            running_sum: 0.0,
            samples_seen: 0,
            current_rms: 0.0,
        }
    }

    /// Feed a block of samples and update the RMS estimate.
    /// Non-finite input samples count as zero.
    pub fn process_block(&mut self, samples: &[f32]) {
        for &s in samples {
            let clean = sanitize(s) as f64;
            let squared = clean * clean;

            self.running_sum -= self.window[self.write_pos];
            self.running_sum += squared;
            if self.running_sum < 0.0 {
                self.running_sum = 0.0;
            }

            self.window[self.write_pos] = squared;
            self.write_pos += 1;
            if self.write_pos >= self.window.len() {
                self.write_pos = 0;
            }
            self.samples_seen += 1;
        }

        // During the initial partial fill, divide by what has actually
        // been written instead of the full window length.
        let count = (self.samples_seen.min(self.window.len() as u64)) as f64;
        self.current_rms = if count > 0.0 {
            (self.running_sum / count).sqrt()
        } else {
            0.0
        };
    }

    /// RMS at the end of the last processed block (linear).
    #[inline]
    pub fn rms(&self) -> f64 {
        self.current_rms
    }

    /// Clear the window and running sum.
    pub fn reset(&mut self) {
        self.window.fill(0.0);
        self.write_pos = 0;
        self.running_sum = 0.0;
        self.samples_seen = 0;
        self.current_rms = 0.0;
    }
}
