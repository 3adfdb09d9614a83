use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;

/// Runs at most one instance of an operation at a time and coalesces callers.
///
/// A caller that arrives while a round is in flight waits for it. If by the
/// time it gets its turn another round has started *and* finished after its
/// arrival, it shares that round's outcome instead of running again;
/// otherwise it runs a fresh round. Either way every caller sees an outcome
/// that started no earlier than its own request.
#[derive(Debug)]
pub struct SingleFlight<T> {
    last: Mutex<Option<T>>,
    started: AtomicU64,
}

impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> SingleFlight<T> {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(None),
            started: AtomicU64::new(0),
        }
    }

    /// Number of rounds started so far.
    pub fn rounds(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }

    /// True if a round is running right now.
    pub fn is_busy(&self) -> bool {
        self.last.try_lock().is_err()
    }

    pub async fn run<F, Fut>(&self, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let seen = self.started.load(Ordering::SeqCst);
        let mut last = self.last.lock().await;
        if self.started.load(Ordering::SeqCst) > seen {
            if let Some(outcome) = last.as_ref() {
                return outcome.clone();
            }
        }

        self.started.fetch_add(1, Ordering::SeqCst);
        // Cleared first so a cancelled round is never shared.
        *last = None;
        let outcome = work().await;
        *last = Some(outcome.clone());
        outcome
    }
}
