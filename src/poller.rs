//! # Waveform Poller
//!
//! A display does not need every sample, it needs a fresh picture a few
//! dozen times per second. The poller is that consumer: a plain thread
//! that wakes at a fixed rate, takes a [`WaveformSnapshot`] and hands it to
//! a callback. It owns no audio state, so it can be stopped and started
//! again at any time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use nih_plug::prelude::*;

use crate::waveform::{WaveformReader, WaveformSnapshot};

/// Refresh rate used by editors.
pub const DEFAULT_POLL_RATE_HZ: f32 = 60.0;

pub struct WaveformPoller {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl WaveformPoller {
    /// Start polling `reader` `rate_hz` times per second.
    ///
    /// The rate is clamped to 1-1000 Hz. The callback runs on the poller's
    /// own thread.
    pub fn start<F>(reader: WaveformReader, rate_hz: f32, mut on_snapshot: F) -> Self
    where
        F: FnMut(&WaveformSnapshot) + Send + 'static,
    {
        let rate_hz = if rate_hz.is_finite() {
            rate_hz.clamp(1.0, 1000.0)
        } else {
            DEFAULT_POLL_RATE_HZ
        };
        let interval = Duration::from_secs_f32(1.0 / rate_hz);
        let running = Arc::new(AtomicBool::new(true));

        let handle = {
            let running = Arc::clone(&running);
            thread::spawn(move || {
                let mut snapshot = WaveformSnapshot::new();
                while running.load(Ordering::Acquire) {
                    reader.snapshot_into(&mut snapshot);
                    on_snapshot(&snapshot);
                    thread::sleep(interval);
                }
            })
        };

        nih_log!("waveform poller started at {rate_hz} Hz");
        Self {
            running,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop polling and wait for the current iteration to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                nih_warn!("waveform poller callback panicked");
            } else {
                nih_log!("waveform poller stopped");
            }
        }
    }
}

impl Drop for WaveformPoller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::{self, WAVEFORM_LEN};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::Instant;

    fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        condition()
    }

    #[test]
    fn test_poller_delivers_snapshots_until_stopped() {
        let (writer, reader) = waveform::channel();
        writer.publish(0.25, 0.75);

        let count = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(Mutex::new(None));

        let poller = {
            let count = Arc::clone(&count);
            let last = Arc::clone(&last);
            WaveformPoller::start(reader, 500.0, move |snap| {
                count.fetch_add(1, Ordering::Relaxed);
                *last.lock().unwrap() = Some((snap.input[WAVEFORM_LEN - 1], snap.output[WAVEFORM_LEN - 1]));
            })
        };
        assert!(poller.is_running());
        assert!(wait_until(Duration::from_secs(5), || count.load(Ordering::Relaxed) >= 3));

        poller.stop();
        let after_stop = count.load(Ordering::Relaxed);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(count.load(Ordering::Relaxed), after_stop);
        assert_eq!(*last.lock().unwrap(), Some((0.25, 0.75)));
    }

    /// Stop and start again with a fresh poller on the same reader: no state
    /// carries over, the new one just sees the current window.
    #[test]
    fn test_restart_sees_current_window() {
        let (writer, reader) = waveform::channel();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = {
            let seen = Arc::clone(&seen);
            WaveformPoller::start(reader.clone(), 200.0, move |snap| {
                seen.lock().unwrap().push(snap.input[WAVEFORM_LEN - 1]);
            })
        };
        assert!(wait_until(Duration::from_secs(5), || !seen.lock().unwrap().is_empty()));
        drop(first);

        writer.publish(1.5, 0.0);
        seen.lock().unwrap().clear();

        let second = {
            let seen = Arc::clone(&seen);
            WaveformPoller::start(reader, 200.0, move |snap| {
                seen.lock().unwrap().push(snap.input[WAVEFORM_LEN - 1]);
            })
        };
        assert!(wait_until(Duration::from_secs(5), || !seen.lock().unwrap().is_empty()));
        second.stop();

        assert!(seen.lock().unwrap().iter().all(|&s| s == 1.5));
    }

    /// The audio side keeps publishing while a poller is reading.
    #[test]
    fn test_writer_keeps_running_alongside_poller() {
        let (writer, reader) = waveform::channel();
        let poller = WaveformPoller::start(reader.clone(), 1000.0, |_| {});

        let mut published = 0;
        for i in 0..100_000 {
            if writer.publish(i as f32, 0.0) {
                published += 1;
            }
        }
        poller.stop();

        assert!(published > 0);
        let snap = reader.snapshot();
        let written: Vec<f32> = snap.input.iter().copied().filter(|&s| s > 0.0).collect();
        assert!(written.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_rate_is_clamped() {
        let (_writer, reader) = waveform::channel();
        // Non-finite and zero rates must not panic in Duration conversion.
        WaveformPoller::start(reader.clone(), f32::NAN, |_| {}).stop();
        WaveformPoller::start(reader, 0.0, |_| {}).stop();
    }
}
