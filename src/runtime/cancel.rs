//! Cooperative cancellation.
//!
//! A run owns one [`CancelToken`]. Clones share the same flag. Once set it
//! stays set for the rest of the run; every wait and poll loop checks it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Granularity of [`cancellable_wait`]; bounds cancellation latency.
pub const WAIT_INCREMENT: Duration = Duration::from_millis(50);

/// Settable-once, level-triggered cancellation flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag. Returns true only for the call that actually set it.
    pub fn cancel(&self) -> bool {
        !self.flag.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Shorthand for [`cancellable_wait`] on this token.
    pub fn wait(&self, duration: Duration) -> bool {
        cancellable_wait(duration, self)
    }

    /// Blocks until the token is cancelled.
    pub fn wait_for_cancel(&self) {
        while !self.is_cancelled() {
            std::thread::sleep(WAIT_INCREMENT);
        }
    }
}

/// Sleeps for `duration` in [`WAIT_INCREMENT`] steps.
///
/// Returns `false` as soon as `cancel` is observed set, `true` once the whole
/// duration has elapsed.
pub fn cancellable_wait(duration: Duration, cancel: &CancelToken) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep(WAIT_INCREMENT.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_cancel_is_idempotent() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(token.cancel());
        assert!(!token.cancel());
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_clones_share_the_flag() {
        let token = CancelToken::new();
        let observer = token.clone();
        token.cancel();
        assert!(observer.is_cancelled());
    }

    #[test]
    fn test_wait_completes_when_not_cancelled() {
        let token = CancelToken::new();
        let start = Instant::now();
        assert!(cancellable_wait(Duration::from_millis(120), &token));
        assert!(start.elapsed() >= Duration::from_millis(120));
    }

    #[test]
    fn test_wait_returns_immediately_when_already_cancelled() {
        let token = CancelToken::new();
        token.cancel();

        let start = Instant::now();
        assert!(!cancellable_wait(Duration::from_secs(10), &token));
        assert!(start.elapsed() < WAIT_INCREMENT);
    }

    #[test]
    fn test_wait_exits_early_on_cancel() {
        let token = CancelToken::new();
        let canceller = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            canceller.cancel();
        });

        let start = Instant::now();
        assert!(!token.wait(Duration::from_secs(10)));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(100) + WAIT_INCREMENT * 4);
        handle.join().unwrap();
    }
}
