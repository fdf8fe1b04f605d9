//! One-pole gain smoother with asymmetric attack and release.

use super::gain::one_pole_coeff;

/// One-pole smoother that rises with the attack coefficient and falls with
/// the release coefficient. Used per-sample to ramp channel gains without
/// zipper noise.
pub struct OnePoleSmoother {
    value: f64,
    attack_coeff: f64,
    release_coeff: f64,
}

impl OnePoleSmoother {
    /// Create from attack/release time constants in milliseconds.
    pub fn from_ms(attack_ms: f64, release_ms: f64, sample_rate: f64) -> Self {
        Self {
            value: 0.0,
            attack_coeff: one_pole_coeff(attack_ms, sample_rate),
            release_coeff: one_pole_coeff(release_ms, sample_rate),
        }
    }

    /// Advance one sample toward `target` and return the smoothed value.
    #[inline]
    pub fn process(&mut self, target: f64) -> f64 {
        let coeff = if target > self.value {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.value += coeff * (target - self.value);
        self.value
    }

    /// Jump to a value with no smoothing.
    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Update coefficients from new time constants.
    pub fn set_times(&mut self, attack_ms: f64, release_ms: f64, sample_rate: f64) {
        self.attack_coeff = one_pole_coeff(attack_ms, sample_rate);
        self.release_coeff = one_pole_coeff(release_ms, sample_rate);
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converges_to_target() {
        let mut s = OnePoleSmoother::from_ms(5.0, 150.0, 48000.0);
        for _ in 0..48000 {
            s.process(0.5);
        }
        assert!((s.value() - 0.5).abs() < 1e-6, "got {}", s.value());
    }

    #[test]
    fn test_attack_faster_than_release() {
        let mut rising = OnePoleSmoother::from_ms(5.0, 150.0, 48000.0);
        let mut falling = OnePoleSmoother::from_ms(5.0, 150.0, 48000.0);
        falling.set_value(1.0);

        // 240 samples = 5ms at 48kHz
        for _ in 0..240 {
            rising.process(1.0);
            falling.process(0.0);
        }

        let risen = rising.value();
        let fallen = 1.0 - falling.value();
        assert!(risen > fallen, "attack {} should outpace release {}", risen, fallen);
    }

    #[test]
    fn test_step_bounded_by_coeff() {
        // Each step moves at most alpha * (target - value).
        let mut s = OnePoleSmoother::from_ms(5.0, 150.0, 48000.0);
        let alpha = one_pole_coeff(5.0, 48000.0);
        let mut prev = s.value();
        for _ in 0..1000 {
            let next = s.process(1.0);
            let step = next - prev;
            assert!(step >= 0.0, "ramp toward higher target must not fall");
            assert!(step <= alpha * (1.0 - prev) + 1e-15);
            prev = next;
        }
    }

    #[test]
    fn test_set_value_and_reset() {
        let mut s = OnePoleSmoother::from_ms(5.0, 150.0, 48000.0);
        s.set_value(0.75);
        assert_eq!(s.value(), 0.75);
        s.reset();
        assert_eq!(s.value(), 0.0);
    }
}
