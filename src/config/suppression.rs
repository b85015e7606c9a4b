//! Write suppression shared by the config store and the file watcher.
//!
//! A save arms suppression before touching the file and releases it a grace
//! period after the write finished, so the watcher's delayed notifications for
//! that write are still recognized as our own.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Suppression is held this long after a save completes.
pub const SUPPRESSION_GRACE: Duration = Duration::from_millis(150);

#[derive(Debug, Default)]
pub struct WriteSuppression {
    in_flight: AtomicUsize,
    release_at: Mutex<Option<Instant>>,
}

impl WriteSuppression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a write as in progress until the returned guard is dropped,
    /// then keeps suppressing for `grace`.
    pub fn arm(&self, grace: Duration) -> SuppressionGuard<'_> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        SuppressionGuard { owner: self, grace }
    }

    pub fn is_suppressed(&self) -> bool {
        self.is_suppressed_at(Instant::now())
    }

    pub fn is_suppressed_at(&self, now: Instant) -> bool {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            return true;
        }
        self.release_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some_and(|deadline| now < deadline)
    }

    fn release_after(&self, grace: Duration) {
        let deadline = Instant::now() + grace;
        {
            let mut release_at = self
                .release_at
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            // Never shorten a window opened by a later save.
            *release_at = Some(release_at.map_or(deadline, |current| current.max(deadline)));
        }
        // Deadline first, then the counter: there is no instant where both read as clear.
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Keeps suppression armed for the lifetime of one write.
#[must_use = "suppression is released as soon as the guard is dropped"]
pub struct SuppressionGuard<'a> {
    owner: &'a WriteSuppression,
    grace: Duration,
}

impl Drop for SuppressionGuard<'_> {
    fn drop(&mut self) {
        self.owner.release_after(self.grace);
    }
}
