//! # Voice Bank (Multi-Tap Echoes)
//!
//! A "voice" is one echo tap. All voices share the per-channel delay line
//! and read it at different distances behind the write head. With a base
//! delay of `D` samples and `n` active voices, voice `v` reads at:
//!
//! ```text
//! tap[v] = D * (v + 1) / n
//! ```
//!
//! so the taps are spread evenly up to `D`, and a single voice reads at
//! exactly `D`. The wet signal is the mean of the active taps.
//!
//! Every voice also keeps a rolling capture of its own output (channel 0
//! only) for display. Slots for all [`MAX_VOICES`] are allocated up front;
//! changing the voice count only moves the loop bound.

use super::delay_line::DelayLine;
use crate::controls::MAX_VOICES;
use crate::waveform::WAVEFORM_LEN;

pub struct VoiceBank {
    /// Distance behind the write head for each voice, already clamped.
    taps: [usize; MAX_VOICES],
    /// Rolling window of each voice's channel-0 output.
    captures: Vec<[f32; WAVEFORM_LEN]>,
    active: usize,
    /// Shared write cursor into every capture window.
    capture_pos: usize,
}

impl VoiceBank {
    pub fn new() -> Self {
        Self {
            taps: [1; MAX_VOICES],
            captures: vec![[0.0; WAVEFORM_LEN]; MAX_VOICES],
            active: 1,
            capture_pos: 0,
        }
    }

    /// Set the active voice count and recompute the taps for a block.
    ///
    /// `voice_count` is clamped to `1..=MAX_VOICES`. Inactive voices keep
    /// their previous tap and capture untouched.
    pub fn retune(&mut self, base_delay: usize, voice_count: usize, line: &DelayLine) {
        self.active = voice_count.clamp(1, MAX_VOICES);
        let n = self.active;
        for (v, tap) in self.taps[..n].iter_mut().enumerate() {
            *tap = line.clamp_delay(base_delay.saturating_mul(v + 1) / n);
        }
    }

    /// Read every active tap on `channel` and return their mean.
    ///
    /// When `capture` is set, each voice's own mixed output
    /// `dry * (1 - mix) + tap * mix` is stored at the capture cursor.
    /// Only reads the delay line, so call it before writing the frame.
    pub fn tap(&mut self, line: &DelayLine, channel: usize, dry: f32, mix: f32, capture: bool) -> f32 {
        let mut sum = 0.0;
        let voices = self.taps[..self.active]
            .iter()
            .zip(&mut self.captures[..self.active]);
        for (&tap, window) in voices {
            let delayed = line.read_at(channel, tap);
            if capture {
                window[self.capture_pos] = dry * (1.0 - mix) + delayed * mix;
            }
            sum += delayed;
        }
        sum / self.active as f32
    }

    /// Move the capture cursor forward one frame. Call once per frame.
    pub fn advance_capture(&mut self) {
        self.capture_pos = (self.capture_pos + 1) % WAVEFORM_LEN;
    }

    /// The active voices' capture windows, ready for
    /// [`WaveformWriter::publish_voices`].
    ///
    /// [`WaveformWriter::publish_voices`]: crate::waveform::WaveformWriter::publish_voices
    pub fn captures(&self) -> &[[f32; WAVEFORM_LEN]] {
        &self.captures[..self.active]
    }

    pub fn capture_cursor(&self) -> usize {
        self.capture_pos
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn tap_of(&self, voice: usize) -> Option<usize> {
        self.taps.get(voice).copied()
    }

    /// Zero every capture and rewind the cursor. Taps and the active count
    /// are recomputed at the next block anyway.
    pub fn clear(&mut self) {
        for capture in &mut self.captures {
            capture.fill(0.0);
        }
        self.capture_pos = 0;
    }
}

impl Default for VoiceBank {
    fn default() -> Self {
        Self::new()
    }
}
