//! Automatic Microphone Mixer Core
//!
//! A Dugan-style gain-sharing automixer for up to 32 live microphone
//! channels. Whichever microphone carries the program material is opened up
//! while idle channels are attenuated, with the applied gains summing to
//! approximately one unit across the active set.
//!
//! The crate exposes two surfaces:
//! - `automix_*` - a C-callable API around an opaque engine handle, for the
//!   plugin wrapper to link against.
//! - [`AutomixEngine`] - the same engine as a plain Rust type.
//!
//! Thread contract: `automix_process` is called by the realtime audio thread
//! only; every parameter setter and metering getter is a wait-free atomic
//! access and may run concurrently from control and UI threads. Nothing on
//! the audio path locks or allocates.

use std::ffi::c_char;
use std::ptr;

mod dsp;
mod engine;

pub use engine::{AutomixChannelMetering, AutomixEngine, AutomixGlobalMetering, EngineError};

/// Maximum number of channels the engine supports.
pub const AUTOMIX_MAX_CHANNELS: usize = 32;

/// Maximum block size in samples.
pub const AUTOMIX_MAX_BLOCK_SIZE: usize = 4096;

/// Version string handed out by `automix_version`.
static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");

// ============================================================================
// Lifecycle
// ============================================================================

/// Create a new automix engine.
///
/// # Arguments
/// * `num_channels` - Number of microphone channels, clamped to [1, 32]
/// * `sample_rate` - Sample rate in Hz
/// * `max_block_size` - Largest block `automix_process` will be called with,
///   clamped to [1, 4096]
///
/// # Returns
/// Opaque handle to the engine, or null on failure. Free with
/// `automix_destroy`.
#[no_mangle]
pub unsafe extern "C" fn automix_create(
    num_channels: u32,
    sample_rate: f32,
    max_block_size: u32,
) -> *mut AutomixEngine {
    match AutomixEngine::new(num_channels as usize, sample_rate, max_block_size as usize) {
        Ok(engine) => {
            log::debug!(
                "automix engine created: channels={}, rate={}, max_block={}",
                engine.num_channels(),
                sample_rate,
                max_block_size
            );
            Box::into_raw(engine)
        }
        Err(err) => {
            log::warn!("automix engine creation failed: {}", err);
            ptr::null_mut()
        }
    }
}

/// Destroy an engine and free its memory. Tolerates null.
///
/// Must not be called while `automix_process` is in flight.
#[no_mangle]
pub unsafe extern "C" fn automix_destroy(engine: *mut AutomixEngine) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
        log::debug!("automix engine destroyed");
    }
}

/// Returns a pointer to a static null-terminated UTF-8 version string.
#[no_mangle]
pub extern "C" fn automix_version() -> *const c_char {
    VERSION.as_ptr() as *const c_char
}

// ============================================================================
// Processing
// ============================================================================

/// Process a block of audio in place.
///
/// # Arguments
/// * `engine` - Engine handle
/// * `channel_ptrs` - Array of `num_channels` pointers, each to
///   `num_samples` contiguous f32 samples (non-interleaved)
/// * `num_channels` - Number of buffer pointers supplied
/// * `num_samples` - Samples per channel
///
/// Null engine or null buffer array is a no-op. NaN and infinity in the
/// input are replaced by zero and never reach the output or the meters.
#[no_mangle]
pub unsafe extern "C" fn automix_process(
    engine: *mut AutomixEngine,
    channel_ptrs: *const *mut f32,
    num_channels: u32,
    num_samples: u32,
) {
    if engine.is_null() || channel_ptrs.is_null() {
        return;
    }
    (*engine).process_raw(channel_ptrs, num_channels as usize, num_samples as usize);
}

/// Reset all DSP state (detector windows, noise floors, smoothed gains,
/// hold timer, meters) while keeping parameters. The reset is applied by the
/// audio thread at the top of the next block, so this is safe to call while
/// audio is running.
#[no_mangle]
pub unsafe extern "C" fn automix_reset(engine: *mut AutomixEngine) {
    if engine.is_null() {
        return;
    }
    (*engine).request_reset();
}

/// Get the engine's channel count, or 0 for a null handle.
#[no_mangle]
pub unsafe extern "C" fn automix_num_channels(engine: *const AutomixEngine) -> u32 {
    if engine.is_null() {
        return 0;
    }
    (*engine).num_channels() as u32
}

// ============================================================================
// Parameters
// ============================================================================

/// Set a channel's gain-share weight (clamped to [0, 1]).
/// Out-of-range channel is a no-op.
#[no_mangle]
pub unsafe extern "C" fn automix_set_channel_weight(
    engine: *mut AutomixEngine,
    channel: u32,
    weight: f32,
) {
    if engine.is_null() {
        return;
    }
    (*engine).set_channel_weight(channel as usize, weight);
}

/// Mute or unmute a channel. Out-of-range channel is a no-op.
#[no_mangle]
pub unsafe extern "C" fn automix_set_channel_mute(
    engine: *mut AutomixEngine,
    channel: u32,
    muted: bool,
) {
    if engine.is_null() {
        return;
    }
    (*engine).set_channel_mute(channel as usize, muted);
}

/// Solo or unsolo a channel. While any channel is soloed, non-soloed
/// channels are excluded from the mix. Out-of-range channel is a no-op.
#[no_mangle]
pub unsafe extern "C" fn automix_set_channel_solo(
    engine: *mut AutomixEngine,
    channel: u32,
    soloed: bool,
) {
    if engine.is_null() {
        return;
    }
    (*engine).set_channel_solo(channel as usize, soloed);
}

/// Bypass a channel: unity-gain passthrough, excluded from gain-sharing and
/// the NOM count. Out-of-range channel is a no-op.
#[no_mangle]
pub unsafe extern "C" fn automix_set_channel_bypass(
    engine: *mut AutomixEngine,
    channel: u32,
    bypassed: bool,
) {
    if engine.is_null() {
        return;
    }
    (*engine).set_channel_bypass(channel as usize, bypassed);
}

/// Bypass the whole engine: audio passes through unmodified, meters keep
/// reflecting the input.
#[no_mangle]
pub unsafe extern "C" fn automix_set_global_bypass(engine: *mut AutomixEngine, bypass: bool) {
    if engine.is_null() {
        return;
    }
    (*engine).set_global_bypass(bypass);
}

/// Set the gain smoothing attack time in milliseconds (clamped to >= 0.1).
#[no_mangle]
pub unsafe extern "C" fn automix_set_attack_ms(engine: *mut AutomixEngine, ms: f32) {
    if engine.is_null() {
        return;
    }
    (*engine).set_attack_ms(ms);
}

/// Set the gain smoothing release time in milliseconds (clamped to >= 1.0).
#[no_mangle]
pub unsafe extern "C" fn automix_set_release_ms(engine: *mut AutomixEngine, ms: f32) {
    if engine.is_null() {
        return;
    }
    (*engine).set_release_ms(ms);
}

/// Set the last-mic-hold window in milliseconds (clamped to >= 0; 0 disables
/// the hold).
#[no_mangle]
pub unsafe extern "C" fn automix_set_hold_time_ms(engine: *mut AutomixEngine, ms: f32) {
    if engine.is_null() {
        return;
    }
    (*engine).set_hold_time_ms(ms);
}

/// Enable or disable the number-of-open-mics attenuation.
#[no_mangle]
pub unsafe extern "C" fn automix_set_nom_atten_enabled(
    engine: *mut AutomixEngine,
    enabled: bool,
) {
    if engine.is_null() {
        return;
    }
    (*engine).set_nom_atten_enabled(enabled);
}

// ============================================================================
// Metering
// ============================================================================

/// Get one channel's meter snapshot (lock-free).
///
/// # Returns
/// `true` on success; `false` for a null handle, null output pointer, or
/// out-of-range channel. `out` is written only on success.
#[no_mangle]
pub unsafe extern "C" fn automix_get_channel_metering(
    engine: *const AutomixEngine,
    channel: u32,
    out: *mut AutomixChannelMetering,
) -> bool {
    if engine.is_null() || out.is_null() {
        return false;
    }
    match (*engine).channel_metering(channel as usize) {
        Some(metering) => {
            *out = metering;
            true
        }
        None => false,
    }
}

/// Get the global meter snapshot (lock-free).
///
/// # Returns
/// `true` on success; `false` for a null handle or null output pointer.
#[no_mangle]
pub unsafe extern "C" fn automix_get_global_metering(
    engine: *const AutomixEngine,
    out: *mut AutomixGlobalMetering,
) -> bool {
    if engine.is_null() || out.is_null() {
        return false;
    }
    *out = (*engine).global_metering();
    true
}

/// Fill `out` with meter snapshots for the first `min(N, capacity)`
/// channels.
///
/// # Returns
/// Number of snapshots written; 0 for a null handle or null output pointer.
#[no_mangle]
pub unsafe extern "C" fn automix_get_all_channel_metering(
    engine: *const AutomixEngine,
    out: *mut AutomixChannelMetering,
    capacity: u32,
) -> u32 {
    if engine.is_null() || out.is_null() {
        return 0;
    }
    let count = (capacity as usize).min((*engine).num_channels());
    let out = std::slice::from_raw_parts_mut(out, count);
    (*engine).all_channel_metering(out) as u32
}
