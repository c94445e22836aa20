//! Fixed-interval reconcile thread.
//!
//! Sleep, then run one tick, strictly serially: a tick never overlaps the
//! previous one, and a slow tick simply delays the next.

use crate::services::time_source::{SharedTimeSource, TimeSource};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Longest single sleep, so a stop request is noticed promptly.
const STOP_CHECK_SLICE: Duration = Duration::from_millis(50);

pub struct SyncLoop {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SyncLoop {
    /// Run `tick` every `interval` on a dedicated thread until stopped or
    /// until `tick` returns false.
    pub fn spawn<F>(interval: Duration, time: SharedTimeSource, mut tick: F) -> io::Result<Self>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();

        let thread = std::thread::Builder::new()
            .name("nerved-sync".to_string())
            .spawn(move || {
                tracing::debug!("Sync loop started ({:?} interval)", interval);
                loop {
                    if !sleep_unless_stopped(time.as_ref(), interval, &thread_stop) {
                        break;
                    }
                    if !tick() {
                        break;
                    }
                }
                tracing::debug!("Sync loop stopped");
            })?;

        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Ask the thread to stop and wait for the current tick to finish.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        let Some(thread) = self.thread.take() else {
            return;
        };
        // The last owner of the app may be the loop thread itself.
        if thread.thread().id() == std::thread::current().id() {
            return;
        }
        if thread.join().is_err() {
            tracing::error!("Sync loop thread panicked");
        }
    }
}

impl Drop for SyncLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Returns false if a stop was requested before `duration` elapsed.
fn sleep_unless_stopped(
    time: &dyn TimeSource,
    duration: Duration,
    stop: &AtomicBool,
) -> bool {
    let mut remaining = duration;
    while !remaining.is_zero() {
        if stop.load(Ordering::SeqCst) {
            return false;
        }
        let slice = remaining.min(STOP_CHECK_SLICE);
        time.sleep(slice);
        remaining -= slice;
    }
    !stop.load(Ordering::SeqCst)
}
