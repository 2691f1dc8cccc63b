//! Errors raised while configuring the engine.
//!
//! Nothing here can happen on the audio thread: configuration runs from
//! the host's `initialize()`, and processing itself is infallible.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("unsupported channel count {0}: only mono and stereo are supported")]
    UnsupportedChannelCount(usize),

    #[error("invalid sample rate {0} Hz")]
    InvalidSampleRate(f32),
}
