//! # Kodama — A Multi-Voice AU/VST3/CLAP Delay
//!
//! A delay effect built with [nih-plug](https://github.com/robbert-vdh/nih-plug).
//! Up to 16 echo taps ("voices") read one shared delay line per channel,
//! and the audio thread publishes rolling input/output/voice waveforms
//! for a display without ever waiting on it.
//!
//! ## Signal Flow
//!
//! ```text
//! Input ──┬──────────────────────────────────────── × (1 - mix) ───┐
//!         │                                                        │
//!         │    ┌───────────────────────────────────────┐           │
//!         └──►(+)──► [Delay Line] ──► taps 1..n ──► mean ─┬─ × mix ─►(+)──► Output
//!              ▲                                          │                  │
//!              └──────────────── × feedback ◄─────────────┘                  │
//!                                                                            ▼
//!                                              [Waveform windows] ──► display poller
//! ```
//!
//! ## Threads
//!
//! - The host's audio thread calls `process()`: it reads the parameters
//!   once, runs [`DelayEngine`], and try-publishes waveform frames.
//! - A display thread polls a [`WaveformReader`] at ~60 Hz (see
//!   [`WaveformPoller`]).
//! - The host's parameter thread writes the knobs whenever it likes.

pub mod controls;
pub mod dsp;
pub mod error;
pub mod params;
pub mod poller;
pub mod waveform;

use std::num::NonZeroU32;
use std::sync::Arc;

use nih_plug::prelude::*;

pub use controls::{Controls, ParameterSnapshot, ParameterSource};
pub use dsp::engine::DelayEngine;
pub use error::EngineError;
pub use params::PluginParams;
pub use poller::WaveformPoller;
pub use waveform::{WaveformReader, WaveformSnapshot, WaveformWriter, WAVEFORM_LEN};

/// The plugin: host parameters, the engine, and a reader handle for any
/// display that wants the waveforms.
pub struct KodamaDelay {
    params: Arc<PluginParams>,
    engine: DelayEngine,
    waveform: WaveformReader,
}

impl Default for KodamaDelay {
    fn default() -> Self {
        let (writer, reader) = waveform::channel();
        Self {
            params: Arc::new(PluginParams::default()),
            // Sized for 44.1 kHz stereo until initialize() tells us better.
            engine: DelayEngine::new(writer),
            waveform: reader,
        }
    }
}

impl KodamaDelay {
    /// A handle on the published waveforms. Clone it into an editor or a
    /// [`WaveformPoller`].
    pub fn waveform_reader(&self) -> WaveformReader {
        self.waveform.clone()
    }
}

impl Plugin for KodamaDelay {
    const NAME: &'static str = "Kodama";
    const VENDOR: &'static str = "Kodama Audio";
    const URL: &'static str = "";
    const EMAIL: &'static str = "";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // Stereo first since most tracks are stereo. Input and output always
    // match; anything else never reaches the engine.
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
    ];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;

    // Parameters are read once per block, so splitting blocks at
    // automation points would only add overhead.
    const SAMPLE_ACCURATE_AUTOMATION: bool = false;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    /// Allocate the delay line for the negotiated sample rate and channel
    /// count. Returning `false` makes the host reject the configuration.
    fn initialize(
        &mut self,
        audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        let num_channels = audio_io_layout
            .main_input_channels
            .map(|c| c.get() as usize)
            .unwrap_or(2);

        match self.engine.configure(buffer_config.sample_rate, num_channels) {
            Ok(()) => {
                nih_log!(
                    "configured for {num_channels} channel(s) at {} Hz",
                    buffer_config.sample_rate
                );
                true
            }
            Err(err) => {
                nih_error!("cannot initialize: {err}");
                false
            }
        }
    }

    /// Playback stopped or the plugin was bypassed: drop every echo so
    /// nothing stale plays when transport starts again.
    fn reset(&mut self) {
        self.engine.reset();
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        let params = self.params.snapshot();
        self.engine.process(&params, buffer.as_slice());

        match self.engine.tail_samples(&params) {
            Some(samples) => ProcessStatus::Tail(samples),
            None => ProcessStatus::KeepAlive,
        }
    }
}

impl ClapPlugin for KodamaDelay {
    const CLAP_ID: &'static str = "com.kodama-audio.kodama-delay";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("A multi-voice delay with feedback and dry/wet mix");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Mono,
        ClapFeature::Delay,
    ];
}

impl Vst3Plugin for KodamaDelay {
    const VST3_CLASS_ID: [u8; 16] = *b"KodamaDelay_v001";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Delay];
}

nih_export_clap!(KodamaDelay);
nih_export_vst3!(KodamaDelay);

// AUv2 entry point for Logic Pro, wrapping the CLAP export.
clap_wrapper::export_auv2!();
