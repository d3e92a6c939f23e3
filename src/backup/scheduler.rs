//! Recurring backup timer
//!
//! A background thread that fires a callback at a fixed interval. The
//! thread parks on a condvar so disarming wakes it immediately instead of
//! waiting out the interval.

use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use tracing::debug;

/// Arm/disarm handle for the recurring timer
pub struct Scheduler {
    inner: Mutex<Option<Handle>>,
}

struct Handle {
    stop: Arc<(Mutex<bool>, Condvar)>,
    thread: thread::JoinHandle<()>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    /// Arm the timer; any previous timer is disarmed first
    pub fn start<F>(&self, interval: Duration, tick: F)
    where
        F: Fn() + Send + 'static,
    {
        self.stop();

        let stop = Arc::new((Mutex::new(false), Condvar::new()));
        let stop_for_thread = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name("posvault-backup-timer".to_string())
            .spawn(move || {
                let (lock, cvar) = &*stop_for_thread;
                loop {
                    let Ok(guard) = lock.lock() else { break };
                    // Re-waits on spurious wakeups; only a set stop flag
                    // or a real timeout gets past.
                    let Ok((guard, _)) =
                        cvar.wait_timeout_while(guard, interval, |stopped| !*stopped)
                    else {
                        break;
                    };
                    if *guard {
                        break;
                    }
                    drop(guard);
                    tick();
                }
                debug!("backup timer thread exiting");
            })
            .ok();

        if let (Some(thread), Ok(mut inner)) = (thread, self.inner.lock()) {
            *inner = Some(Handle { stop, thread });
        }
    }

    /// Disarm the timer and wait for the thread to exit
    pub fn stop(&self) {
        let handle = match self.inner.lock() {
            Ok(mut inner) => inner.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            let (lock, cvar) = &*handle.stop;
            if let Ok(mut stopped) = lock.lock() {
                *stopped = true;
            }
            cvar.notify_all();
            let _ = handle.thread.join();
        }
    }

    /// Whether a timer is currently armed
    pub fn is_running(&self) -> bool {
        self.inner.lock().map(|inner| inner.is_some()).unwrap_or(false)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
