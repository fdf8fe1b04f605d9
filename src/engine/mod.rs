//! Core automix engine.
//!
//! One [`AutomixEngine`] per audio stream. The engine owns every per-channel
//! detector, the shared scratch buffers, and the atomic parameter and meter
//! cells. `process_raw` runs the gain-sharing pipeline over one block:
//! detection, noise-floor tracking, activity classification, last-mic-hold,
//! Dugan gain-sharing, NOM attenuation, per-sample smoothing, in-place
//! application, and meter publication.
//!
//! Thread model: the realtime thread is the sole caller of `process_raw`;
//! parameter setters and meter getters are wait-free atomic accesses and may
//! run concurrently from any thread. Nothing in the engine locks, and
//! nothing on the audio path allocates.

mod channel;
mod metering;
mod params;

pub use metering::{AutomixChannelMetering, AutomixGlobalMetering};

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::dsp::gain::{linear_to_db, sanitize};
use crate::dsp::gain_share::compute_gain_share;
use crate::dsp::hold::HoldTracker;
use crate::dsp::nom::NomAttenuation;
use channel::ChannelStrip;
use metering::{ChannelMeterCells, GlobalMeterCells};
use params::{ChannelParamSnapshot, ChannelParams, EngineParams};

use crate::{AUTOMIX_MAX_BLOCK_SIZE, AUTOMIX_MAX_CHANNELS};

/// Engine construction failure.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("sample rate must be finite and positive, got {0}")]
    InvalidSampleRate(f32),
}

/// Mutable DSP state, touched only by the audio thread.
struct EngineState {
    channels: Box<[ChannelStrip]>,
    hold: HoldTracker,
    nom: NomAttenuation,
    /// Per-sample gain ramp scratch, refilled per channel each block.
    gain_ramp: Box<[f32]>,
    // Per-block scratch, one slot per channel.
    rms: [f64; AUTOMIX_MAX_CHANNELS],
    active: [bool; AUTOMIX_MAX_CHANNELS],
    participating: [bool; AUTOMIX_MAX_CHANNELS],
    bypassed: [bool; AUTOMIX_MAX_CHANNELS],
    weights: [f64; AUTOMIX_MAX_CHANNELS],
    targets: [f64; AUTOMIX_MAX_CHANNELS],
    // Last-seen time parameters, to recompute coefficients only on change.
    attack_ms: f64,
    release_ms: f64,
    hold_ms: f64,
}

/// Automatic microphone mixer engine.
///
/// Channel count, sample rate, and maximum block size are fixed at
/// construction; all buffers are sized then and never reallocated.
pub struct AutomixEngine {
    num_channels: usize,
    sample_rate: f64,
    max_block: usize,
    params: EngineParams,
    channel_params: Box<[ChannelParams]>,
    channel_meters: Box<[ChannelMeterCells]>,
    global_meters: GlobalMeterCells,
    reset_requested: AtomicBool,
    state: UnsafeCell<EngineState>,
}

// The engine is shared across the audio, control, and metering threads.
// Everything reachable through `&self` is atomic except `state`, which is
// only projected to `&mut` inside `process_raw` under the single-caller
// contract documented there.
unsafe impl Send for AutomixEngine {}
unsafe impl Sync for AutomixEngine {}

impl AutomixEngine {
    /// Create an engine for `num_channels` streams at `sample_rate`.
    ///
    /// The channel count is clamped to `[1, AUTOMIX_MAX_CHANNELS]` and the
    /// block size to `[1, AUTOMIX_MAX_BLOCK_SIZE]`. The engine is returned
    /// boxed; the per-channel window state is too large to live on a stack.
    pub fn new(
        num_channels: usize,
        sample_rate: f32,
        max_block_size: usize,
    ) -> Result<Box<Self>, EngineError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(EngineError::InvalidSampleRate(sample_rate));
        }
        let sr = sample_rate as f64;
        let num_channels = num_channels.clamp(1, AUTOMIX_MAX_CHANNELS);
        let max_block = max_block_size.clamp(1, AUTOMIX_MAX_BLOCK_SIZE);

        let attack_ms = params::DEFAULT_ATTACK_MS as f64;
        let release_ms = params::DEFAULT_RELEASE_MS as f64;
        let hold_ms = params::DEFAULT_HOLD_MS as f64;

        let channels: Vec<ChannelStrip> = (0..num_channels)
            .map(|_| ChannelStrip::new(attack_ms, release_ms, sr))
            .collect();
        let channel_params: Vec<ChannelParams> =
            (0..num_channels).map(|_| ChannelParams::new()).collect();
        let channel_meters: Vec<ChannelMeterCells> =
            (0..num_channels).map(|_| ChannelMeterCells::new()).collect();

        Ok(Box::new(Self {
            num_channels,
            sample_rate: sr,
            max_block,
            params: EngineParams::new(),
            channel_params: channel_params.into_boxed_slice(),
            channel_meters: channel_meters.into_boxed_slice(),
            global_meters: GlobalMeterCells::new(),
            reset_requested: AtomicBool::new(false),
            state: UnsafeCell::new(EngineState {
                channels: channels.into_boxed_slice(),
                hold: HoldTracker::new(hold_ms, sr),
                nom: NomAttenuation::new(),
                gain_ramp: vec![0.0; max_block].into_boxed_slice(),
                rms: [0.0; AUTOMIX_MAX_CHANNELS],
                active: [false; AUTOMIX_MAX_CHANNELS],
                participating: [false; AUTOMIX_MAX_CHANNELS],
                bypassed: [false; AUTOMIX_MAX_CHANNELS],
                weights: [0.0; AUTOMIX_MAX_CHANNELS],
                targets: [0.0; AUTOMIX_MAX_CHANNELS],
                attack_ms,
                release_ms,
                hold_ms,
            }),
        }))
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Process one block of audio in place.
    ///
    /// `channel_ptrs` points to `num_channels` buffer pointers, each with at
    /// least `num_samples` f32 samples. Extra channels beyond the engine's
    /// count are ignored; blocks longer than the constructed maximum are
    /// clamped and the tail is left untouched.
    ///
    /// # Safety
    /// The pointers must be valid for the stated sizes, and at most one call
    /// may be in flight per engine at a time (the realtime audio thread is
    /// the sole caller).
    pub unsafe fn process_raw(
        &self,
        channel_ptrs: *const *mut f32,
        num_channels: usize,
        num_samples: usize,
    ) {
        let num_ch = num_channels.min(self.num_channels);
        let num_samples = num_samples.min(self.max_block);
        if num_ch == 0 || num_samples == 0 {
            return;
        }

        let state = &mut *self.state.get();
        if self.reset_requested.swap(false, Ordering::Relaxed) {
            self.apply_reset(state);
        }

        let EngineState {
            channels,
            hold,
            nom,
            gain_ramp,
            rms,
            active,
            participating,
            bypassed,
            weights,
            targets,
            attack_ms,
            release_ms,
            hold_ms,
        } = state;

        // Parameter snapshot. Cells are read once here; coefficient updates
        // happen only when a time constant actually changed.
        let new_attack = self.params.attack_ms();
        let new_release = self.params.release_ms();
        if new_attack != *attack_ms || new_release != *release_ms {
            *attack_ms = new_attack;
            *release_ms = new_release;
            for strip in channels.iter_mut() {
                strip.set_smoothing(new_attack, new_release, self.sample_rate);
            }
        }
        let new_hold = self.params.hold_ms();
        if new_hold != *hold_ms {
            *hold_ms = new_hold;
            hold.set_hold_time_ms(new_hold, self.sample_rate);
        }

        let mut snaps = [ChannelParamSnapshot::default(); AUTOMIX_MAX_CHANNELS];
        let mut any_solo = false;
        for i in 0..num_ch {
            snaps[i] = self.channel_params[i].snapshot();
            any_solo |= snaps[i].soloed;
        }
        for i in 0..num_ch {
            participating[i] = snaps[i].participates(any_solo);
            bypassed[i] = snaps[i].bypassed;
            weights[i] = snaps[i].weight;
        }

        let ptrs = std::slice::from_raw_parts(channel_ptrs, num_ch);

        // Phase 1: sliding-window RMS per channel. This runs even under
        // global bypass so input metering keeps tracking.
        for i in 0..num_ch {
            let input = std::slice::from_raw_parts(ptrs[i], num_samples);
            channels[i].level.process_block(input);
            rms[i] = channels[i].level.rms();
        }

        if self.params.global_bypass() {
            // Buffer untouched; meters reflect input only.
            for i in 0..num_ch {
                let input_db = linear_to_db(rms[i]);
                self.channel_meters[i].publish(
                    input_db,
                    0.0,
                    input_db,
                    channels[i].floor.floor_db(),
                    false,
                );
            }
            self.global_meters.publish(0.0, 0.0);
            return;
        }

        // Phase 2: adaptive noise floor, participating channels only.
        for i in 0..num_ch {
            if participating[i] {
                channels[i].floor.update(rms[i]);
            }
        }

        // Phase 3: activity classification.
        for i in 0..num_ch {
            active[i] = participating[i] && channels[i].floor.is_active(rms[i]);
        }

        // Phase 4: last-mic-hold.
        let held = hold.update(&active[..num_ch], &participating[..num_ch], num_samples);

        // Phase 5: Dugan gain-sharing.
        let open_mics = compute_gain_share(
            &rms[..num_ch],
            &weights[..num_ch],
            &active[..num_ch],
            held,
            &mut targets[..num_ch],
        );

        // Phase 6: NOM attenuation.
        nom.set_enabled(self.params.nom_enabled());
        nom.update(open_mics);
        let nom_linear = nom.linear();

        // Phases 7-8: per-sample smoothing into the gain ramp, then in-place
        // application with input sanitization. Phase 9 publishes per-channel
        // meters as each channel finishes.
        for i in 0..num_ch {
            let strip = &mut channels[i];
            let input_db = linear_to_db(rms[i]);

            if bypassed[i] {
                // Unity passthrough: the buffer is not modified at all.
                strip.smoother.set_value(1.0);
                self.channel_meters[i].publish(
                    input_db,
                    0.0,
                    input_db,
                    strip.floor.floor_db(),
                    false,
                );
                continue;
            }

            let target = targets[i] * nom_linear;
            let ramp = &mut gain_ramp[..num_samples];
            for g in ramp.iter_mut() {
                *g = strip.smoother.process(target) as f32;
            }

            let buf = std::slice::from_raw_parts_mut(ptrs[i], num_samples);
            let mut out_sum_sq = 0.0f64;
            for (sample, &g) in buf.iter_mut().zip(ramp.iter()) {
                let out = sanitize(*sample) * g;
                *sample = out;
                out_sum_sq += (out as f64) * (out as f64);
            }
            let output_rms = (out_sum_sq / num_samples as f64).sqrt();

            self.channel_meters[i].publish(
                input_db,
                linear_to_db(strip.smoother.value()),
                linear_to_db(output_rms),
                strip.floor.floor_db(),
                active[i],
            );
        }

        self.global_meters.publish(nom.nom(), nom.db());
    }

    // ---- Parameter setters (wait-free, any thread) ----

    pub fn set_channel_weight(&self, channel: usize, weight: f32) {
        if let Some(p) = self.channel_params.get(channel) {
            p.set_weight(weight);
        }
    }

    pub fn set_channel_mute(&self, channel: usize, muted: bool) {
        if let Some(p) = self.channel_params.get(channel) {
            p.set_muted(muted);
        }
    }

    pub fn set_channel_solo(&self, channel: usize, soloed: bool) {
        if let Some(p) = self.channel_params.get(channel) {
            p.set_soloed(soloed);
        }
    }

    pub fn set_channel_bypass(&self, channel: usize, bypassed: bool) {
        if let Some(p) = self.channel_params.get(channel) {
            p.set_bypassed(bypassed);
        }
    }

    pub fn set_global_bypass(&self, bypass: bool) {
        self.params.set_global_bypass(bypass);
    }

    pub fn set_attack_ms(&self, ms: f32) {
        self.params.set_attack_ms(ms);
    }

    pub fn set_release_ms(&self, ms: f32) {
        self.params.set_release_ms(ms);
    }

    pub fn set_hold_time_ms(&self, ms: f32) {
        self.params.set_hold_ms(ms);
    }

    pub fn set_nom_atten_enabled(&self, enabled: bool) {
        self.params.set_nom_enabled(enabled);
    }

    /// Request a DSP state reset. The audio thread applies it at the top of
    /// the next block, so this is safe to call from any thread while audio
    /// is running. Parameters are preserved.
    pub fn request_reset(&self) {
        self.reset_requested.store(true, Ordering::Relaxed);
    }

    fn apply_reset(&self, state: &mut EngineState) {
        for strip in state.channels.iter_mut() {
            strip.reset();
        }
        state.hold.reset();
        state.nom.reset();
        for cells in self.channel_meters.iter() {
            cells.reset();
        }
        self.global_meters.reset();
    }

    // ---- Metering getters (wait-free, any thread) ----

    pub fn channel_metering(&self, channel: usize) -> Option<AutomixChannelMetering> {
        self.channel_meters.get(channel).map(|c| c.snapshot())
    }

    pub fn global_metering(&self) -> AutomixGlobalMetering {
        self.global_meters.snapshot()
    }

    /// Fill `out` with up to `num_channels` snapshots; returns the count.
    pub fn all_channel_metering(&self, out: &mut [AutomixChannelMetering]) -> usize {
        let count = out.len().min(self.num_channels);
        for (slot, cells) in out.iter_mut().zip(self.channel_meters.iter()) {
            *slot = cells.snapshot();
        }
        count
    }
}
