//! Wait-free parameter cells.
//!
//! Every parameter is an independent atomic with relaxed ordering. Control
//! threads store into the cells at any time; the audio thread snapshots them
//! once at the top of each block. No parameter write can block, allocate, or
//! tear.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

pub const DEFAULT_WEIGHT: f32 = 1.0;
pub const DEFAULT_ATTACK_MS: f32 = 5.0;
pub const DEFAULT_RELEASE_MS: f32 = 150.0;
pub const DEFAULT_HOLD_MS: f32 = 500.0;

pub const MIN_ATTACK_MS: f32 = 0.1;
pub const MAX_ATTACK_MS: f32 = 100.0;
pub const MIN_RELEASE_MS: f32 = 1.0;
pub const MAX_RELEASE_MS: f32 = 1000.0;
pub const MIN_HOLD_MS: f32 = 0.0;
pub const MAX_HOLD_MS: f32 = 5000.0;

/// A float stored as raw bits in an `AtomicU32` so readers never observe a
/// torn value.
pub(crate) struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// Per-channel parameter cells.
pub(crate) struct ChannelParams {
    weight: AtomicF32,
    muted: AtomicBool,
    soloed: AtomicBool,
    bypassed: AtomicBool,
}

impl ChannelParams {
    pub fn new() -> Self {
        Self {
            weight: AtomicF32::new(DEFAULT_WEIGHT),
            muted: AtomicBool::new(false),
            soloed: AtomicBool::new(false),
            bypassed: AtomicBool::new(false),
        }
    }

    pub fn set_weight(&self, weight: f32) {
        let clamped = if weight.is_finite() {
            weight.clamp(0.0, 1.0)
        } else {
            DEFAULT_WEIGHT
        };
        self.weight.store(clamped);
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Relaxed);
    }

    pub fn set_soloed(&self, soloed: bool) {
        self.soloed.store(soloed, Ordering::Relaxed);
    }

    pub fn set_bypassed(&self, bypassed: bool) {
        self.bypassed.store(bypassed, Ordering::Relaxed);
    }

    /// Read all cells once, for use within a single block.
    pub fn snapshot(&self) -> ChannelParamSnapshot {
        ChannelParamSnapshot {
            weight: self.weight.load() as f64,
            muted: self.muted.load(Ordering::Relaxed),
            soloed: self.soloed.load(Ordering::Relaxed),
            bypassed: self.bypassed.load(Ordering::Relaxed),
        }
    }
}

/// Plain values captured from [`ChannelParams`] at the top of a block.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ChannelParamSnapshot {
    pub weight: f64,
    pub muted: bool,
    pub soloed: bool,
    pub bypassed: bool,
}

impl ChannelParamSnapshot {
    /// Whether this channel takes part in gain-sharing.
    ///
    /// Muted and bypassed channels never participate. When any channel is
    /// soloed, only soloed channels participate.
    pub fn participates(&self, any_solo: bool) -> bool {
        if self.muted || self.bypassed {
            return false;
        }
        !any_solo || self.soloed
    }
}

/// Global parameter cells.
pub(crate) struct EngineParams {
    global_bypass: AtomicBool,
    attack_ms: AtomicF32,
    release_ms: AtomicF32,
    hold_ms: AtomicF32,
    nom_enabled: AtomicBool,
}

impl EngineParams {
    pub fn new() -> Self {
        Self {
            global_bypass: AtomicBool::new(false),
            attack_ms: AtomicF32::new(DEFAULT_ATTACK_MS),
            release_ms: AtomicF32::new(DEFAULT_RELEASE_MS),
            hold_ms: AtomicF32::new(DEFAULT_HOLD_MS),
            nom_enabled: AtomicBool::new(true),
        }
    }

    pub fn set_global_bypass(&self, bypass: bool) {
        self.global_bypass.store(bypass, Ordering::Relaxed);
    }

    pub fn set_attack_ms(&self, ms: f32) {
        let clamped = if ms.is_finite() {
            ms.clamp(MIN_ATTACK_MS, MAX_ATTACK_MS)
        } else {
            DEFAULT_ATTACK_MS
        };
        self.attack_ms.store(clamped);
    }

    pub fn set_release_ms(&self, ms: f32) {
        let clamped = if ms.is_finite() {
            ms.clamp(MIN_RELEASE_MS, MAX_RELEASE_MS)
        } else {
            DEFAULT_RELEASE_MS
        };
        self.release_ms.store(clamped);
    }

    pub fn set_hold_ms(&self, ms: f32) {
        let clamped = if ms.is_finite() {
            ms.clamp(MIN_HOLD_MS, MAX_HOLD_MS)
        } else {
            DEFAULT_HOLD_MS
        };
        self.hold_ms.store(clamped);
    }

    pub fn set_nom_enabled(&self, enabled: bool) {
        self.nom_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn global_bypass(&self) -> bool {
        self.global_bypass.load(Ordering::Relaxed)
    }

    pub fn attack_ms(&self) -> f64 {
        self.attack_ms.load() as f64
    }

    pub fn release_ms(&self) -> f64 {
        self.release_ms.load() as f64
    }

    pub fn hold_ms(&self) -> f64 {
        self.hold_ms.load() as f64
    }

    pub fn nom_enabled(&self) -> bool {
        self.nom_enabled.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_defaults() {
        let p = ChannelParams::new().snapshot();
        assert_eq!(p.weight, 1.0);
        assert!(!p.muted);
        assert!(!p.soloed);
        assert!(!p.bypassed);
    }

    #[test]
    fn test_weight_clamped() {
        let p = ChannelParams::new();
        p.set_weight(1.5);
        assert_eq!(p.snapshot().weight, 1.0);
        p.set_weight(-0.5);
        assert_eq!(p.snapshot().weight, 0.0);
        p.set_weight(f32::NAN);
        assert_eq!(p.snapshot().weight, 1.0);
    }

    #[test]
    fn test_participation_matrix() {
        let normal = ChannelParams::new().snapshot();
        assert!(normal.participates(false));
        assert!(!normal.participates(true));

        let p = ChannelParams::new();
        p.set_soloed(true);
        assert!(p.snapshot().participates(true));

        p.set_muted(true);
        // Mute wins over solo.
        assert!(!p.snapshot().participates(true));

        let b = ChannelParams::new();
        b.set_bypassed(true);
        assert!(!b.snapshot().participates(false));
    }

    #[test]
    fn test_time_params_clamped() {
        let p = EngineParams::new();
        p.set_attack_ms(0.0);
        assert_eq!(p.attack_ms(), MIN_ATTACK_MS as f64);
        p.set_attack_ms(1e6);
        assert_eq!(p.attack_ms(), MAX_ATTACK_MS as f64);

        p.set_release_ms(0.0);
        assert_eq!(p.release_ms(), MIN_RELEASE_MS as f64);

        p.set_hold_ms(-10.0);
        assert_eq!(p.hold_ms(), 0.0);
        p.set_hold_ms(60000.0);
        assert_eq!(p.hold_ms(), MAX_HOLD_MS as f64);

        p.set_hold_ms(f32::INFINITY);
        assert_eq!(p.hold_ms(), DEFAULT_HOLD_MS as f64);
    }

    #[test]
    fn test_global_defaults() {
        let p = EngineParams::new();
        assert!(!p.global_bypass());
        assert!(p.nom_enabled());
        assert_eq!(p.attack_ms(), DEFAULT_ATTACK_MS as f64);
        assert_eq!(p.release_ms(), DEFAULT_RELEASE_MS as f64);
        assert_eq!(p.hold_ms(), DEFAULT_HOLD_MS as f64);
    }
}
