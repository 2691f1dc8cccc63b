//! # Plugin Parameters
//!
//! The four knobs the host sees. Each one has a stable string ID
//! (`#[id = "..."]`) that presets and automation refer to; once published,
//! never change them.
//!
//! Feedback and mix are exposed as 0-100 % the way users think about them.
//! The engine wants fractions, so the conversion happens once per block
//! in [`ParameterSnapshot::new`]. There is no per-sample smoothing: the
//! audio thread reads every value once at the start of a block and holds
//! it for the whole block.

use nih_plug::prelude::*;

use crate::controls::{ParameterSnapshot, ParameterSource, MAX_DELAY_MS, MAX_VOICES};

#[derive(Params)]
pub struct PluginParams {
    /// **Delay Time** in milliseconds, 0 to 2000. A value of 0 still gives
    /// the shortest possible echo of one sample.
    #[id = "delay"]
    pub delay_time: FloatParam,

    /// **Feedback**, 0-100 %: how much of the echo re-enters the line.
    #[id = "fdbk"]
    pub feedback: FloatParam,

    /// **Mix**, 0-100 %: dry/wet balance.
    #[id = "mix"]
    pub mix: FloatParam,

    /// **Voices**, 1-16: number of echo taps spread across the delay time.
    #[id = "voices"]
    pub voices: IntParam,
}

impl Default for PluginParams {
    fn default() -> Self {
        Self {
            delay_time: FloatParam::new(
                "Delay Time",
                300.0,
                FloatRange::Linear {
                    min: 0.0,
                    max: MAX_DELAY_MS,
                },
            )
            .with_unit(" ms")
            .with_step_size(1.0),

            feedback: FloatParam::new("Feedback", 30.0, FloatRange::Linear { min: 0.0, max: 100.0 })
                .with_unit(" %")
                .with_step_size(0.1),

            mix: FloatParam::new("Mix", 50.0, FloatRange::Linear { min: 0.0, max: 100.0 })
                .with_unit(" %")
                .with_step_size(0.1),

            voices: IntParam::new(
                "Voices",
                1,
                IntRange::Linear {
                    min: 1,
                    max: MAX_VOICES as i32,
                },
            ),
        }
    }
}

impl ParameterSource for PluginParams {
    /// Four independent atomic loads; nih-plug stores every plain value
    /// in an atomic.
    fn snapshot(&self) -> ParameterSnapshot {
        ParameterSnapshot::new(
            self.delay_time.value(),
            self.feedback.value(),
            self.mix.value(),
            self.voices.value(),
        )
    }
}
