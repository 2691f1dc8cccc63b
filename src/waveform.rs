//! # Waveform Publishing (Audio Thread → UI)
//!
//! The audio thread keeps a rolling window of the last [`WAVEFORM_LEN`]
//! input and output samples (plus one window per active voice) so a
//! display can draw them. The display polls at a low rate, roughly 60 Hz.
//!
//! ## Locking discipline
//!
//! Both sides share one `Mutex`, but they use it differently:
//!
//! - The writer only ever calls `try_lock()`. If the reader happens to be
//!   copying at that moment, the frame is dropped and processing moves on.
//!   The audio thread never waits.
//! - The reader calls `lock()`. It may wait for the writer, but the
//!   writer's critical section is a couple of stores, so that wait is
//!   short. The reader's own critical section is a fixed 512-sample copy.
//!
//! The split into [`WaveformWriter`] and [`WaveformReader`] makes the
//! forbidden direction impossible to write: the writer type has no
//! blocking method at all, and there is only ever one writer.
//!
//! Dropped frames show up as a slightly jumpy waveform. The window is
//! always the most recent data, never stale by more than one poll.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use crate::controls::MAX_VOICES;

/// Length of every waveform window, in samples.
pub const WAVEFORM_LEN: usize = 512;

/// Copy a ring of `WAVEFORM_LEN` samples into `dst`, oldest first.
///
/// `cursor` is the slot the next sample would be written to, which is
/// also the oldest sample once the ring has wrapped:
///
/// ```text
/// dst[i] = ring[(cursor + i) % WAVEFORM_LEN]
/// ```
pub fn copy_oldest_first(ring: &[f32; WAVEFORM_LEN], cursor: usize, dst: &mut [f32]) {
    let cursor = cursor % WAVEFORM_LEN;
    let (newer, older) = ring.split_at(cursor);
    let split = older.len().min(dst.len());
    dst[..split].copy_from_slice(&older[..split]);
    let rest = (dst.len() - split).min(newer.len());
    dst[split..split + rest].copy_from_slice(&newer[..rest]);
}

/// Everything behind the lock.
struct Shared {
    input: [f32; WAVEFORM_LEN],
    output: [f32; WAVEFORM_LEN],
    /// One write cursor for both `input` and `output`.
    write_index: usize,

    /// Per-voice windows, pre-allocated for [`MAX_VOICES`].
    voices: Vec<[f32; WAVEFORM_LEN]>,
    voice_cursor: usize,
    voice_count: usize,
}

impl Shared {
    fn new() -> Self {
        Self {
            input: [0.0; WAVEFORM_LEN],
            output: [0.0; WAVEFORM_LEN],
            write_index: 0,
            voices: vec![[0.0; WAVEFORM_LEN]; MAX_VOICES],
            voice_cursor: 0,
            voice_count: 1,
        }
    }
}

/// Create a connected writer/reader pair.
///
/// The writer goes to the audio thread. The reader can be cloned and
/// handed to any number of consumers.
pub fn channel() -> (WaveformWriter, WaveformReader) {
    let shared = Arc::new(Mutex::new(Shared::new()));
    (
        WaveformWriter {
            shared: Arc::clone(&shared),
        },
        WaveformReader { shared },
    )
}

/// The real-time side. Every method is non-blocking.
pub struct WaveformWriter {
    shared: Arc<Mutex<Shared>>,
}

impl WaveformWriter {
    /// Try to lock without waiting. A poisoned lock is still usable: the
    /// data is plain samples and an index that is always kept in range.
    fn try_shared(&self) -> Option<MutexGuard<'_, Shared>> {
        match self.shared.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Append one input/output frame.
    ///
    /// Returns `false` if the reader held the lock and the frame was
    /// skipped. That is an expected outcome, not an error.
    pub fn publish(&self, input: f32, output: f32) -> bool {
        let Some(mut shared) = self.try_shared() else {
            return false;
        };
        let index = shared.write_index;
        shared.input[index] = input;
        shared.output[index] = output;
        shared.write_index = (index + 1) % WAVEFORM_LEN;
        true
    }

    /// Copy the active voice windows once per block.
    ///
    /// `captures` holds the voice rings, `cursor` is their shared write
    /// cursor. Only the first `voice_count` are copied; the remaining
    /// slots keep whatever they last held.
    pub fn publish_voices(
        &self,
        voice_count: usize,
        cursor: usize,
        captures: &[[f32; WAVEFORM_LEN]],
    ) -> bool {
        let Some(mut shared) = self.try_shared() else {
            return false;
        };
        let count = voice_count.min(captures.len()).min(MAX_VOICES);
        for (dst, src) in shared.voices.iter_mut().zip(&captures[..count]) {
            dst.copy_from_slice(src);
        }
        shared.voice_cursor = cursor % WAVEFORM_LEN;
        shared.voice_count = count.max(1);
        true
    }

    /// Zero every window and rewind the cursors.
    ///
    /// Non-blocking like everything else here. If the reader is mid-copy
    /// the clear is skipped; the next [`WAVEFORM_LEN`] frames overwrite the
    /// window anyway.
    pub fn clear(&self) -> bool {
        let Some(mut shared) = self.try_shared() else {
            return false;
        };
        shared.input.fill(0.0);
        shared.output.fill(0.0);
        shared.write_index = 0;
        for voice in &mut shared.voices {
            voice.fill(0.0);
        }
        shared.voice_cursor = 0;
        true
    }
}

/// An ordered copy of the input and output windows, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformSnapshot {
    pub input: Vec<f32>,
    pub output: Vec<f32>,
}

impl WaveformSnapshot {
    pub fn new() -> Self {
        Self {
            input: vec![0.0; WAVEFORM_LEN],
            output: vec![0.0; WAVEFORM_LEN],
        }
    }

    /// Declared length of both sequences.
    pub fn len(&self) -> usize {
        WAVEFORM_LEN
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for WaveformSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// The consumer side. Blocks briefly while the writer finishes a frame.
#[derive(Clone)]
pub struct WaveformReader {
    shared: Arc<Mutex<Shared>>,
}

impl WaveformReader {
    fn shared(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy the current input/output windows, oldest first.
    pub fn snapshot(&self) -> WaveformSnapshot {
        let mut snapshot = WaveformSnapshot::new();
        self.snapshot_into(&mut snapshot);
        snapshot
    }

    /// Like [`snapshot()`](Self::snapshot) but reuses `snapshot`'s storage.
    pub fn snapshot_into(&self, snapshot: &mut WaveformSnapshot) {
        snapshot.input.resize(WAVEFORM_LEN, 0.0);
        snapshot.output.resize(WAVEFORM_LEN, 0.0);

        let shared = self.shared();
        copy_oldest_first(&shared.input, shared.write_index, &mut snapshot.input);
        copy_oldest_first(&shared.output, shared.write_index, &mut snapshot.output);
    }

    /// Number of voices active in the most recently published block.
    pub fn voice_count(&self) -> usize {
        self.shared().voice_count
    }

    /// The window for one active voice, oldest first.
    ///
    /// Returns `None` for indices at or above [`voice_count()`](Self::voice_count).
    pub fn voice_waveform(&self, index: usize) -> Option<Vec<f32>> {
        let shared = self.shared();
        if index >= shared.voice_count {
            return None;
        }
        let mut out = vec![0.0; WAVEFORM_LEN];
        copy_oldest_first(&shared.voices[index], shared.voice_cursor, &mut out);
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn test_fresh_snapshot_is_silent() {
        let (_writer, reader) = channel();
        let snap = reader.snapshot();
        assert_eq!(snap.len(), WAVEFORM_LEN);
        assert_eq!(snap.input.len(), WAVEFORM_LEN);
        assert!(snap.input.iter().all(|&s| s == 0.0));
        assert!(snap.output.iter().all(|&s| s == 0.0));
    }

    /// Before the ring wraps, the newest samples sit at the end and the
    /// unwritten (silent) slots come first.
    #[test]
    fn test_partial_fill_puts_newest_last() {
        let (writer, reader) = channel();
        for i in 1..=3 {
            assert!(writer.publish(i as f32, -(i as f32)));
        }

        let snap = reader.snapshot();
        assert_eq!(&snap.input[WAVEFORM_LEN - 3..], &[1.0, 2.0, 3.0]);
        assert_eq!(&snap.output[WAVEFORM_LEN - 3..], &[-1.0, -2.0, -3.0]);
        assert!(snap.input[..WAVEFORM_LEN - 3].iter().all(|&s| s == 0.0));
    }

    /// After `WAVEFORM_LEN` or more publishes the window is exactly the
    /// most recent samples, oldest to newest.
    #[test]
    fn test_wrapped_window_is_most_recent_in_order() {
        let (writer, reader) = channel();
        let total = WAVEFORM_LEN * 2 + 37;
        for i in 0..total {
            writer.publish(i as f32, (i * 2) as f32);
        }

        let snap = reader.snapshot();
        let first = total - WAVEFORM_LEN;
        for (i, (&input, &output)) in snap.input.iter().zip(&snap.output).enumerate() {
            assert_eq!(input, (first + i) as f32);
            assert_eq!(output, ((first + i) * 2) as f32);
        }
    }

    /// While the reader holds the lock, publishing is skipped instead of
    /// waiting.
    #[test]
    fn test_publish_skips_under_contention() {
        let (writer, reader) = channel();
        writer.publish(1.0, 1.0);

        {
            let _held = reader.shared();
            assert!(!writer.publish(2.0, 2.0));
            assert!(!writer.publish_voices(1, 0, &[[0.0; WAVEFORM_LEN]]));
        }

        assert!(writer.publish(3.0, 3.0));
        let snap = reader.snapshot();
        assert_eq!(&snap.input[WAVEFORM_LEN - 2..], &[1.0, 3.0]);
    }

    #[test]
    fn test_snapshot_into_reuses_and_fixes_length() {
        let (writer, reader) = channel();
        writer.publish(0.5, 0.25);

        let mut snap = WaveformSnapshot {
            input: Vec::new(),
            output: vec![9.0; 3],
        };
        reader.snapshot_into(&mut snap);
        assert_eq!(snap.input.len(), WAVEFORM_LEN);
        assert_eq!(snap.output.len(), WAVEFORM_LEN);
        assert_eq!(snap.input[WAVEFORM_LEN - 1], 0.5);
        assert_eq!(snap.output[WAVEFORM_LEN - 1], 0.25);
    }

    #[test]
    fn test_voice_windows_and_bounds() {
        let (writer, reader) = channel();
        assert_eq!(reader.voice_count(), 1);

        let mut captures = vec![[0.0; WAVEFORM_LEN]; MAX_VOICES];
        for (v, capture) in captures.iter_mut().enumerate() {
            for (i, slot) in capture.iter_mut().enumerate() {
                *slot = (v * 1000 + i) as f32;
            }
        }

        assert!(writer.publish_voices(3, 10, &captures));
        assert_eq!(reader.voice_count(), 3);
        assert!(reader.voice_waveform(3).is_none());

        let voice = reader.voice_waveform(2).unwrap();
        assert_eq!(voice[0], 2010.0);
        assert_eq!(voice[WAVEFORM_LEN - 1], 2009.0);
    }

    /// Voice slots beyond the active count keep their last content.
    #[test]
    fn test_inactive_voice_slots_retain_content() {
        let (writer, reader) = channel();
        let ones = vec![[1.0; WAVEFORM_LEN]; MAX_VOICES];
        let twos = vec![[2.0; WAVEFORM_LEN]; MAX_VOICES];

        writer.publish_voices(4, 0, &ones);
        writer.publish_voices(2, 0, &twos);
        assert_eq!(reader.voice_count(), 2);

        writer.publish_voices(4, 0, &twos[..2]);
        // Only two captures were supplied, so only two are active.
        assert_eq!(reader.voice_count(), 2);

        let shared = reader.shared();
        assert_eq!(shared.voices[0][0], 2.0);
        assert_eq!(shared.voices[3][0], 1.0);
    }

    #[test]
    fn test_clear_zeroes_windows() {
        let (writer, reader) = channel();
        for i in 0..100 {
            writer.publish(i as f32, i as f32);
        }
        assert!(writer.clear());
        let snap = reader.snapshot();
        assert!(snap.input.iter().all(|&s| s == 0.0));
        assert!(snap.output.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_copy_oldest_first_into_short_destination() {
        let mut ring = [0.0; WAVEFORM_LEN];
        for (i, slot) in ring.iter_mut().enumerate() {
            *slot = i as f32;
        }
        let mut dst = [0.0; 4];
        copy_oldest_first(&ring, WAVEFORM_LEN - 2, &mut dst);
        assert_eq!(dst, [510.0, 511.0, 0.0, 1.0]);
    }

    /// A tight non-blocking writer next to a blocking reader: no deadlock,
    /// the writer finishes, and every snapshot is strictly increasing
    /// (dropped frames only leave gaps, never reorder).
    #[test]
    fn test_concurrent_writer_and_reader() {
        let (writer, reader) = channel();
        let done = Arc::new(AtomicBool::new(false));
        let frames = 200_000;

        let audio = {
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let start = Instant::now();
                let mut skipped = 0usize;
                for i in 0..frames {
                    if !writer.publish(i as f32, i as f32) {
                        skipped += 1;
                    }
                }
                done.store(true, Ordering::Release);
                (start.elapsed(), skipped)
            })
        };

        let mut snapshots = 0;
        let mut snap = WaveformSnapshot::new();
        while !done.load(Ordering::Acquire) {
            reader.snapshot_into(&mut snap);
            snapshots += 1;
            let written: Vec<f32> = snap.input.iter().copied().filter(|&s| s > 0.0).collect();
            assert!(written.windows(2).all(|w| w[0] < w[1]));
            thread::sleep(Duration::from_micros(200));
        }

        let (elapsed, skipped) = audio.join().unwrap();
        assert!(skipped < frames);
        assert!(snapshots > 0);
        // 200k trivial publishes; a writer that waited on the reader's
        // sleeps would take far longer than this.
        assert!(elapsed < Duration::from_secs(10), "writer took {elapsed:?}");

        // The final window is full and still in order.
        let last = reader.snapshot();
        assert!(last.input.iter().all(|&s| s > 0.0));
        assert!(last.input.windows(2).all(|w| w[0] < w[1]));
    }
}
