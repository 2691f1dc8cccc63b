//! # Control Values and the Per-Block Snapshot
//!
//! The four user controls (delay time, feedback, mix, voice count) are
//! written by whatever thread the host or UI runs on, at any time. The
//! audio thread reads each of them exactly once at the top of a block and
//! works from that local copy until the block is done, so a knob moving
//! mid-block can never tear the processing of that block.
//!
//! Every field is loaded independently. There is no cross-field
//! consistency: a block may see a new delay time together with an old
//! feedback amount, and that is fine.

use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};

/// Longest delay time the controls accept, in milliseconds.
pub const MAX_DELAY_MS: f32 = 2000.0;

/// Maximum number of simultaneously active voices.
pub const MAX_VOICES: usize = 16;

/// A block-local, already clamped copy of the controls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSnapshot {
    /// Delay time in milliseconds, `0.0..=2000.0`.
    pub delay_time_ms: f32,
    /// Feedback as a fraction, `0.0..=1.0`.
    pub feedback: f32,
    /// Dry/wet mix as a fraction, `0.0..=1.0`.
    pub mix: f32,
    /// Active voices, `1..=16`.
    pub voice_count: usize,
}

impl ParameterSnapshot {
    /// Build a snapshot from raw control values, clamping each one.
    ///
    /// Feedback and mix arrive as percentages (0-100) and are stored as
    /// fractions. Voice counts of zero or below become 1. Non-finite
    /// floats are treated as 0.
    pub fn new(delay_time_ms: f32, feedback_pct: f32, mix_pct: f32, voices: i32) -> Self {
        Self {
            delay_time_ms: finite_or_zero(delay_time_ms).clamp(0.0, MAX_DELAY_MS),
            feedback: finite_or_zero(feedback_pct).clamp(0.0, 100.0) / 100.0,
            mix: finite_or_zero(mix_pct).clamp(0.0, 100.0) / 100.0,
            voice_count: voices.clamp(1, MAX_VOICES as i32) as usize,
        }
    }

    /// Convert the delay time to whole samples at `sample_rate`.
    ///
    /// ```text
    /// delay_samples = delay_ms / 1000 * sample_rate
    /// ```
    ///
    /// At 44100 Hz, 500 ms is 22050 samples. The fractional part is
    /// dropped. A result of 0 is left for the delay line to clamp to 1.
    pub fn delay_samples(&self, sample_rate: f32) -> usize {
        ((self.delay_time_ms / 1000.0) * sample_rate) as usize
    }
}

impl Default for ParameterSnapshot {
    fn default() -> Self {
        Self::new(300.0, 30.0, 50.0, 1)
    }
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Anything the audio thread can take a [`ParameterSnapshot`] from.
///
/// Implementations must only do atomic loads: this is called on the
/// real-time thread once per block.
pub trait ParameterSource {
    fn snapshot(&self) -> ParameterSnapshot;
}

/// Four independently updatable atomic control values.
///
/// Floats are stored as their bit pattern in an `AtomicU32`. Setters store
/// the raw value and never block; clamping happens in
/// [`ParameterSnapshot::new`].
#[derive(Debug)]
pub struct Controls {
    delay_time_ms: AtomicU32,
    feedback_pct: AtomicU32,
    mix_pct: AtomicU32,
    voices: AtomicI32,
}

impl Controls {
    pub fn new(delay_time_ms: f32, feedback_pct: f32, mix_pct: f32, voices: i32) -> Self {
        Self {
            delay_time_ms: AtomicU32::new(delay_time_ms.to_bits()),
            feedback_pct: AtomicU32::new(feedback_pct.to_bits()),
            mix_pct: AtomicU32::new(mix_pct.to_bits()),
            voices: AtomicI32::new(voices),
        }
    }

    pub fn set_delay_time_ms(&self, ms: f32) {
        self.delay_time_ms.store(ms.to_bits(), Ordering::Relaxed);
    }

    pub fn set_feedback_pct(&self, pct: f32) {
        self.feedback_pct.store(pct.to_bits(), Ordering::Relaxed);
    }

    pub fn set_mix_pct(&self, pct: f32) {
        self.mix_pct.store(pct.to_bits(), Ordering::Relaxed);
    }

    pub fn set_voices(&self, voices: i32) {
        self.voices.store(voices, Ordering::Relaxed);
    }
}

impl Default for Controls {
    fn default() -> Self {
        Self::new(300.0, 30.0, 50.0, 1)
    }
}

impl ParameterSource for Controls {
    fn snapshot(&self) -> ParameterSnapshot {
        ParameterSnapshot::new(
            f32::from_bits(self.delay_time_ms.load(Ordering::Relaxed)),
            f32::from_bits(self.feedback_pct.load(Ordering::Relaxed)),
            f32::from_bits(self.mix_pct.load(Ordering::Relaxed)),
            self.voices.load(Ordering::Relaxed),
        )
    }
}
