use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::thread;
use std::time::Duration;

/// Background sweep thread, same shutdown/notify shape as the source
/// system's own TTL sweep: an `AtomicBool` flag plus a `Condvar` so
/// `stop`/`Drop` wake the thread immediately instead of waiting out the
/// remaining interval.
pub struct TtlHandle {
    shutdown: Arc<AtomicBool>,
    notify: Arc<(Mutex<()>, Condvar)>,
    handle: Option<thread::JoinHandle<()>>,
}

impl TtlHandle {
    /// Spawn the periodic sweep. `sweep` runs on every tick and is expected
    /// to perform one ordinary mutation (transaction → removes → commit)
    /// against whatever collection it closes over — the TTL daemon itself
    /// has no knowledge of documents or indices, only of when to ask for a
    /// sweep.
    ///
    /// Returns `None` when `interval_millis == 0` (no sweep configured).
    pub fn spawn<F>(interval_millis: u64, mut sweep: F) -> Option<Self>
    where
        F: FnMut() + Send + 'static,
    {
        if interval_millis == 0 {
            return None;
        }

        let shutdown = Arc::new(AtomicBool::new(false));
        let notify = Arc::new((Mutex::new(()), Condvar::new()));
        let sweep_flag = Arc::clone(&shutdown);
        let sweep_notify = Arc::clone(&notify);
        let interval = Duration::from_millis(interval_millis);

        let handle = thread::spawn(move || {
            loop {
                let (lock, cvar) = &*sweep_notify;
                let guard = lock.lock().unwrap();
                let _ = cvar.wait_timeout(guard, interval).unwrap();
                if sweep_flag.load(Ordering::Relaxed) {
                    break;
                }
                sweep();
            }
        });

        Some(Self {
            shutdown,
            notify,
            handle: Some(handle),
        })
    }

    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.notify.1.notify_one();
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

impl Drop for TtlHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
