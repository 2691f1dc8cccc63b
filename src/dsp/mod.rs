//! # DSP
//!
//! - **`delay_line`**: per-channel ring buffers with one shared write head.
//! - **`voices`**: the multi-tap voice bank and its per-voice captures.
//! - **`engine`**: ties both together with the feedback/mix law and
//!   publishes waveforms for display.

pub mod delay_line;
pub mod engine;
pub mod voices;
