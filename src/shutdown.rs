//! Process-wide shutdown coordination.
//! A cloneable handle: the ctrlc handler holds one clone, the engine context
//! holds another. Long-running loops poll `is_requested()` between units of work
//! and the inter-cycle sleep waits on a condvar so a signal wakes it at once.
//!
//! Notes:
//! - `request()` is idempotent.
//! - The ctrlc handler runs on its own thread, not in signal context, so taking
//!   the mutex there is fine.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a cooperative shutdown and wake any sleeper.
    pub fn request(&self) {
        let (flag, cvar) = &*self.inner;
        let mut requested = flag.lock().unwrap_or_else(PoisonError::into_inner);
        *requested = true;
        cvar.notify_all();
    }

    /// Check whether a shutdown has been requested.
    pub fn is_requested(&self) -> bool {
        let (flag, _) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for `timeout` unless a shutdown is requested first.
    /// Returns true when the sleep ended because of a shutdown request.
    pub fn sleep(&self, timeout: Duration) -> bool {
        let (flag, cvar) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = cvar
            .wait_timeout_while(guard, timeout, |requested| !*requested)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn request_is_visible_through_clones() {
        let a = Shutdown::new();
        let b = a.clone();
        assert!(!b.is_requested());
        a.request();
        a.request();
        assert!(b.is_requested());
    }

    #[test]
    fn sleep_runs_full_timeout_without_request() {
        let s = Shutdown::new();
        let start = Instant::now();
        assert!(!s.sleep(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn request_wakes_sleeper_promptly() {
        let s = Shutdown::new();
        let trigger = s.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            trigger.request();
        });
        let start = Instant::now();
        assert!(s.sleep(Duration::from_secs(30)));
        assert!(start.elapsed() < Duration::from_secs(10));
    }
}
