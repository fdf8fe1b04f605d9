//! Lock-free metering.
//!
//! Each meter field is an independent atomic cell written with relaxed
//! ordering at the end of every block. Readers take wait-free loads and may
//! see fields from adjacent blocks, which is acceptable for display meters;
//! what they can never see is a torn float or a non-finite value.

use super::params::AtomicF32;
use crate::dsp::gain::SILENCE_FLOOR_DB;
use std::sync::atomic::{AtomicBool, Ordering};

/// Per-channel meter snapshot crossing the C boundary.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AutomixChannelMetering {
    /// Pre-gain RMS in dBFS, floored at -120.
    pub input_rms_db: f32,
    /// Smoothed applied gain at the end of the block, in dB.
    pub gain_db: f32,
    /// Post-gain RMS in dBFS, floored at -120.
    pub output_rms_db: f32,
    /// Tracked noise floor in dBFS.
    pub noise_floor_db: f32,
    /// Whether the channel was classified active this block.
    pub is_active: bool,
}

impl Default for AutomixChannelMetering {
    fn default() -> Self {
        Self {
            input_rms_db: SILENCE_FLOOR_DB as f32,
            gain_db: SILENCE_FLOOR_DB as f32,
            output_rms_db: SILENCE_FLOOR_DB as f32,
            noise_floor_db: -60.0,
            is_active: false,
        }
    }
}

/// Global meter snapshot crossing the C boundary.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct AutomixGlobalMetering {
    /// Number of open microphones, including hold extension.
    pub nom_count: f32,
    /// Applied NOM attenuation in dB (0 or negative).
    pub nom_attenuation_db: f32,
}

/// Atomic cells behind one channel's meter snapshot.
pub(crate) struct ChannelMeterCells {
    input_rms_db: AtomicF32,
    gain_db: AtomicF32,
    output_rms_db: AtomicF32,
    noise_floor_db: AtomicF32,
    is_active: AtomicBool,
}

impl ChannelMeterCells {
    pub fn new() -> Self {
        let d = AutomixChannelMetering::default();
        Self {
            input_rms_db: AtomicF32::new(d.input_rms_db),
            gain_db: AtomicF32::new(d.gain_db),
            output_rms_db: AtomicF32::new(d.output_rms_db),
            noise_floor_db: AtomicF32::new(d.noise_floor_db),
            is_active: AtomicBool::new(false),
        }
    }

    /// Publish end-of-block values. Called from the audio thread only.
    pub fn publish(
        &self,
        input_rms_db: f64,
        gain_db: f64,
        output_rms_db: f64,
        noise_floor_db: f64,
        is_active: bool,
    ) {
        self.input_rms_db.store(input_rms_db as f32);
        self.gain_db.store(gain_db as f32);
        self.output_rms_db.store(output_rms_db as f32);
        self.noise_floor_db.store(noise_floor_db as f32);
        self.is_active.store(is_active, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> AutomixChannelMetering {
        AutomixChannelMetering {
            input_rms_db: self.input_rms_db.load(),
            gain_db: self.gain_db.load(),
            output_rms_db: self.output_rms_db.load(),
            noise_floor_db: self.noise_floor_db.load(),
            is_active: self.is_active.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        let d = AutomixChannelMetering::default();
        self.publish(
            d.input_rms_db as f64,
            d.gain_db as f64,
            d.output_rms_db as f64,
            d.noise_floor_db as f64,
            d.is_active,
        );
    }
}

/// Atomic cells behind the global meter snapshot.
pub(crate) struct GlobalMeterCells {
    nom_count: AtomicF32,
    nom_attenuation_db: AtomicF32,
}

impl GlobalMeterCells {
    pub fn new() -> Self {
        Self {
            nom_count: AtomicF32::new(0.0),
            nom_attenuation_db: AtomicF32::new(0.0),
        }
    }

    pub fn publish(&self, nom_count: f64, nom_attenuation_db: f64) {
        self.nom_count.store(nom_count as f32);
        self.nom_attenuation_db.store(nom_attenuation_db as f32);
    }

    pub fn snapshot(&self) -> AutomixGlobalMetering {
        AutomixGlobalMetering {
            nom_count: self.nom_count.load(),
            nom_attenuation_db: self.nom_attenuation_db.load(),
        }
    }

    pub fn reset(&self) {
        self.publish(0.0, 0.0);
    }
}
