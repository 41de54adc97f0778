//! Sleeping and call pacing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Something that can block the current thread for a while.
///
/// Backoff and pacing go through this trait so tests can observe the
/// requested delays without sleeping.
pub trait Pause: Send + Sync {
    /// Blocks for `duration`.
    fn pause(&self, duration: Duration);
}

/// Sleeps on the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Spaces out remote calls issued by one loop.
pub struct Pacer {
    pause: Arc<dyn Pause>,
    call_delay: Duration,
    failure_cooldown: Duration,
    primed: AtomicBool,
}

impl Pacer {
    /// Creates a pacer.
    pub fn new(pause: Arc<dyn Pause>, call_delay: Duration, failure_cooldown: Duration) -> Self {
        Self {
            pause,
            call_delay,
            failure_cooldown,
            primed: AtomicBool::new(false),
        }
    }

    /// Starts a new loop; the next call goes out without delay.
    pub fn reset(&self) {
        self.primed.store(false, Ordering::SeqCst);
    }

    /// Waits the call delay unless this is the first call since [`Pacer::reset`].
    pub fn before_call(&self) {
        if self.primed.swap(true, Ordering::SeqCst) {
            self.pause.pause(self.call_delay);
        }
    }

    /// Waits the failure cooldown.
    pub fn after_failure(&self) {
        self.pause.pause(self.failure_cooldown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Duration>>);

    impl Pause for Recorder {
        fn pause(&self, duration: Duration) {
            self.0.lock().push(duration);
        }
    }

    #[test]
    fn first_call_is_not_delayed() {
        let recorder = Arc::new(Recorder::default());
        let pacer = Pacer::new(
            recorder.clone(),
            Duration::from_millis(10),
            Duration::from_millis(500),
        );

        pacer.before_call();
        pacer.before_call();
        pacer.after_failure();
        pacer.before_call();
        pacer.reset();
        pacer.before_call();

        assert_eq!(
            *recorder.0.lock(),
            vec![
                Duration::from_millis(10),
                Duration::from_millis(500),
                Duration::from_millis(10),
            ]
        );
    }

    #[test]
    fn thread_pause_skips_zero() {
        ThreadPause.pause(Duration::ZERO);
    }
}
