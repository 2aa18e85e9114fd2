//! Cooperative cancellation shared between a caller and a running operation.
use std::{
    sync::{Arc, Condvar, Mutex, MutexGuard},
    time::{Duration, Instant},
};

#[derive(Debug, Default)]
struct Inner {
    canceled: Mutex<bool>,
    signal: Condvar,
}

/// Cloneable cancellation flag.
///
/// Operations poll it at their suspension points. [`CancellationToken::sleep`]
/// returns early once the token is cancelled, so a waiting status loop notices
/// cancellation without finishing its poll interval.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that is already cancelled.
    pub fn canceled() -> Self {
        let token = Self::new();
        token.cancel();
        token
    }

    /// Requests cancellation and wakes every sleeper.
    pub fn cancel(&self) {
        *self.flag() = true;
        self.inner.signal.notify_all();
    }

    pub fn is_canceled(&self) -> bool {
        *self.flag()
    }

    /// Blocks for `duration` or until cancelled. Returns `true` when cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut canceled = self.flag();

        while !*canceled {
            let now = Instant::now();
            if now >= deadline {
                break;
            }

            canceled = self
                .inner
                .signal
                .wait_timeout(canceled, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }

        *canceled
    }

    fn flag(&self) -> MutexGuard<'_, bool> {
        self.inner
            .canceled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
