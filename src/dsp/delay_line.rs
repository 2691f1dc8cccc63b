//! # Delay Line (Multi-Channel Ring Buffer)
//!
//! A delay line stores audio samples and lets you read them back after a
//! whole number of samples. One ring buffer is kept per channel, but all
//! channels share a single write position so they stay sample-aligned.
//!
//! ## Per-frame protocol
//!
//! For every sample frame (one sample on every channel):
//!
//! 1. `read_at(channel, n)` for every tap that channel needs,
//! 2. `write(channel, value)` once per channel,
//! 3. `advance()` exactly once for the whole frame.
//!
//! Reading before writing is what keeps the delay at `n` samples. Writing
//! first would make a read of the current slot return this frame's input,
//! collapsing the delay and turning feedback instantaneous.
//!
//! ## Index math
//!
//! ```text
//! read_index = (write_pos + capacity - n) % capacity
//! ```
//!
//! `capacity` is added before subtracting because `usize` cannot go
//! negative. `n` is clamped to `[1, capacity - 1]` first, so the
//! subtraction never underflows and a zero delay is impossible.

use std::num::NonZeroUsize;

/// A set of per-channel ring buffers with a shared write head.
///
/// All buffers are allocated in [`new()`](Self::new). Nothing on the
/// processing path allocates or resizes.
pub struct DelayLine {
    /// One buffer per channel, each `capacity` samples long.
    buffers: Vec<Vec<f32>>,

    /// Where the next frame will be written. Shared by every channel.
    write_pos: usize,

    /// Length of every channel buffer.
    capacity: usize,
}

impl DelayLine {
    /// Create a delay line for `num_channels` channels, each able to hold
    /// `capacity` samples.
    ///
    /// A capacity of 1 would leave no valid delay, so it is raised to 2.
    pub fn new(num_channels: usize, capacity: NonZeroUsize) -> Self {
        let capacity = capacity.get().max(2);
        Self {
            buffers: (0..num_channels).map(|_| vec![0.0; capacity]).collect(),
            write_pos: 0,
            capacity,
        }
    }

    pub fn num_channels(&self) -> usize {
        self.buffers.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Clamp a requested delay into the readable range `[1, capacity - 1]`.
    pub fn clamp_delay(&self, delay_samples: usize) -> usize {
        delay_samples.clamp(1, self.capacity - 1)
    }

    /// Store `value` at the write position of `channel`.
    ///
    /// Does NOT advance the write position. Unknown channels are ignored.
    pub fn write(&mut self, channel: usize, value: f32) {
        if let Some(buffer) = self.buffers.get_mut(channel) {
            buffer[self.write_pos] = value;
        }
    }

    /// Read the sample written `delay_samples` frames ago on `channel`.
    ///
    /// The delay is clamped, never rejected. Unknown channels read silence.
    pub fn read_at(&self, channel: usize, delay_samples: usize) -> f32 {
        let delay = self.clamp_delay(delay_samples);
        let index = (self.write_pos + self.capacity - delay) % self.capacity;
        self.buffers
            .get(channel)
            .map_or(0.0, |buffer| buffer[index])
    }

    /// Move the shared write head forward one frame.
    ///
    /// Call this once per frame, after every channel has been read and
    /// written, not once per channel.
    pub fn advance(&mut self) {
        self.write_pos = (self.write_pos + 1) % self.capacity;
    }

    /// Fill every channel with silence and rewind the write head.
    pub fn clear(&mut self) {
        for buffer in &mut self.buffers {
            buffer.fill(0.0);
        }
        self.write_pos = 0;
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
