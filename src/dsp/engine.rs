//! # The Delay Engine
//!
//! Owns everything the audio thread touches: the delay line, the voice
//! bank and the waveform writer. Its lifecycle is:
//!
//! ```text
//! new() → configure(sample_rate, channels) → process() … → reset() → drop
//! ```
//!
//! `configure()` is the only step that allocates and the only one that can
//! fail. `process()` and `reset()` never block, never allocate and never
//! fail; out-of-range values are clamped and contention is skipped.
//!
//! ## Per-sample law
//!
//! For each frame, for each channel:
//!
//! ```text
//! delayed = mean of the active voice taps   (READ)
//! line    ← dry + delayed * feedback        (WRITE)
//! out     = dry * (1 - mix) + delayed * mix
//! ```
//!
//! then once per frame the shared write head advances and channel 0's
//! dry/out pair is published for display.

use std::num::NonZeroUsize;

use no_denormals::no_denormals;

use super::delay_line::DelayLine;
use super::voices::VoiceBank;
use crate::controls::{ParameterSnapshot, MAX_DELAY_MS};
use crate::error::EngineError;
use crate::waveform::WaveformWriter;

/// Ring buffer length in seconds. The longest delay is 2 s; the extra
/// 100 ms keeps the maximum delay strictly below the capacity.
pub const MAX_DELAY_SECONDS: f32 = MAX_DELAY_MS / 1000.0 + 0.1;

/// Highest sample rate `configure()` accepts.
pub const MAX_SAMPLE_RATE: f32 = 768_000.0;

const DEFAULT_SAMPLE_RATE: f32 = 44100.0;
const DEFAULT_CHANNELS: usize = 2;

/// Ring buffer length for a sample rate.
///
/// At 44100 Hz this is 92611 samples, about 360 KB per channel.
pub fn delay_capacity(sample_rate: f32) -> NonZeroUsize {
    let samples = (MAX_DELAY_SECONDS * sample_rate).ceil() as usize + 1;
    NonZeroUsize::new(samples).unwrap_or(NonZeroUsize::MIN)
}

pub struct DelayEngine {
    sample_rate: f32,
    delay_line: DelayLine,
    voices: VoiceBank,
    waveform: WaveformWriter,
}

impl DelayEngine {
    /// Create an engine for stereo at 44.1 kHz. The host's real
    /// configuration arrives later through [`configure()`](Self::configure).
    pub fn new(waveform: WaveformWriter) -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            delay_line: DelayLine::new(DEFAULT_CHANNELS, delay_capacity(DEFAULT_SAMPLE_RATE)),
            voices: VoiceBank::new(),
            waveform,
        }
    }

    /// Size the delay line for a sample rate and channel count.
    ///
    /// Reallocates, so call it from the host's initialization, never from
    /// the audio callback. Only mono and stereo are accepted.
    pub fn configure(&mut self, sample_rate: f32, num_channels: usize) -> Result<(), EngineError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 || sample_rate > MAX_SAMPLE_RATE {
            return Err(EngineError::InvalidSampleRate(sample_rate));
        }
        if !(1..=2).contains(&num_channels) {
            return Err(EngineError::UnsupportedChannelCount(num_channels));
        }

        self.sample_rate = sample_rate;
        self.delay_line = DelayLine::new(num_channels, delay_capacity(sample_rate));
        self.voices.clear();
        self.waveform.clear();
        Ok(())
    }

    /// Return to silence: delay line, voice captures and display windows.
    pub fn reset(&mut self) {
        self.delay_line.clear();
        self.voices.clear();
        self.waveform.clear();
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn num_channels(&self) -> usize {
        self.delay_line.num_channels()
    }

    /// The delay the engine will actually use for `params`, in samples.
    pub fn delay_samples(&self, params: &ParameterSnapshot) -> usize {
        self.delay_line
            .clamp_delay(params.delay_samples(self.sample_rate))
    }

    /// Process one block in place.
    ///
    /// `channels` holds one slice per channel. Extra channels beyond the
    /// configured count are left untouched, and only as many frames as the
    /// shortest slice holds are processed.
    pub fn process(&mut self, params: &ParameterSnapshot, channels: &mut [&mut [f32]]) {
        no_denormals(|| self.process_block(params, channels));
    }

    fn process_block(&mut self, params: &ParameterSnapshot, channels: &mut [&mut [f32]]) {
        let num_channels = channels.len().min(self.delay_line.num_channels());
        let channels = &mut channels[..num_channels];
        let Some(num_frames) = channels.iter().map(|c| c.len()).min() else {
            return;
        };

        let feedback = params.feedback;
        let mix = params.mix;
        let base_delay = params.delay_samples(self.sample_rate);
        self.voices
            .retune(base_delay, params.voice_count, &self.delay_line);

        for frame in 0..num_frames {
            let mut monitored = (0.0, 0.0);

            for (channel, samples) in channels.iter_mut().enumerate() {
                let dry = samples[frame];

                let delayed = self
                    .voices
                    .tap(&self.delay_line, channel, dry, mix, channel == 0);
                self.delay_line.write(channel, dry + delayed * feedback);

                let out = dry * (1.0 - mix) + delayed * mix;
                samples[frame] = out;

                if channel == 0 {
                    monitored = (dry, out);
                }
            }

            self.delay_line.advance();
            self.voices.advance_capture();
            self.waveform.publish(monitored.0, monitored.1);
        }

        self.waveform.publish_voices(
            self.voices.active(),
            self.voices.capture_cursor(),
            self.voices.captures(),
        );
    }

    /// How many samples of echo remain audible after the input stops.
    ///
    /// Each repeat is scaled by `feedback`, so after `N` repeats the level
    /// is `feedback^N`. Solving `feedback^N = 0.001` (-60 dB):
    ///
    /// ```text
    /// N = log10(0.001) / log10(feedback) = -3 / log10(feedback)
    /// ```
    ///
    /// Returns `None` when feedback is 1.0 and the echoes never decay.
    pub fn tail_samples(&self, params: &ParameterSnapshot) -> Option<u32> {
        let delay = self.delay_samples(params) as f32;
        if params.feedback >= 1.0 {
            None
        } else if params.feedback > 0.001 {
            let repeats = -3.0 / params.feedback.log10();
            Some((repeats * delay) as u32)
        } else {
            Some(delay as u32)
        }
    }
}
