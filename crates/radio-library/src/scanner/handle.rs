//! Cancellation tokens and handles to background scans.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::scanner::{ScanOutcome, ScanState, ScanStats};

/// Cooperative cancellation flag owned by one scan
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct Slot {
    state: ScanState,
    outcome: Option<ScanOutcome>,
}

struct Shared {
    slot: Mutex<Slot>,
    finished: Condvar,
}

/// Handle to a scan running on a worker thread.
///
/// Clones share the same scan. The worker thread itself is detached: a scan
/// that ignores a bounded wait keeps running, but its token stays cancelled
/// so it can never commit.
#[derive(Clone)]
pub struct ScanHandle {
    job_id: String,
    token: CancelToken,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for ScanHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanHandle")
            .field("job_id", &self.job_id)
            .field("state", &self.state())
            .field("cancel_requested", &self.token.is_cancelled())
            .finish()
    }
}

impl ScanHandle {
    pub(crate) fn new(job_id: String, token: CancelToken) -> Self {
        Self {
            job_id,
            token,
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    state: ScanState::Idle,
                    outcome: None,
                }),
                finished: Condvar::new(),
            }),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn state(&self) -> ScanState {
        self.shared.slot.lock().state
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Request cancellation; the worker stops at its next checkpoint
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Block until the scan reaches a terminal state
    pub fn wait(&self) -> ScanOutcome {
        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(outcome) = &slot.outcome {
                return outcome.clone();
            }
            self.shared.finished.wait(&mut slot);
        }
    }

    /// Block for at most `timeout`; `true` if the scan finished in time
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut slot = self.shared.slot.lock();
        while slot.outcome.is_none() {
            if self.shared.finished.wait_until(&mut slot, deadline).timed_out() {
                return slot.outcome.is_some();
            }
        }
        true
    }

    /// The terminal outcome, if the scan has finished
    pub fn outcome(&self) -> Option<ScanOutcome> {
        self.shared.slot.lock().outcome.clone()
    }

    pub(crate) fn mark_running(&self) {
        let mut slot = self.shared.slot.lock();
        if slot.outcome.is_none() {
            slot.state = ScanState::Running;
        }
    }

    pub(crate) fn finish(&self, outcome: ScanOutcome) {
        let mut slot = self.shared.slot.lock();
        if slot.outcome.is_some() {
            return;
        }
        slot.state = outcome.state();
        slot.outcome = Some(outcome);
        self.shared.finished.notify_all();
    }
}

/// Marks the scan cancelled if the worker unwinds before finishing
pub(crate) struct FinishGuard(pub(crate) ScanHandle);

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.0.finish(ScanOutcome::Cancelled {
            stats: ScanStats::default(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn completed() -> ScanOutcome {
        ScanOutcome::Completed {
            tracks: Vec::new(),
            stats: ScanStats::default(),
        }
    }

    #[test]
    fn test_token_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_handle_lifecycle() {
        let handle = ScanHandle::new("job".to_string(), CancelToken::new());
        assert_eq!(handle.state(), ScanState::Idle);

        handle.mark_running();
        assert_eq!(handle.state(), ScanState::Running);
        assert!(handle.outcome().is_none());

        handle.finish(completed());
        assert_eq!(handle.state(), ScanState::Completed);
        assert!(handle.is_finished());

        // First outcome sticks
        handle.finish(ScanOutcome::Cancelled {
            stats: ScanStats::default(),
        });
        assert_eq!(handle.state(), ScanState::Completed);

        // Late running mark is ignored
        handle.mark_running();
        assert_eq!(handle.state(), ScanState::Completed);
    }

    #[test]
    fn test_wait_timeout_expires() {
        let handle = ScanHandle::new("job".to_string(), CancelToken::new());
        assert!(!handle.wait_timeout(Duration::from_millis(20)));
    }

    #[test]
    fn test_wait_wakes_on_finish() {
        let handle = ScanHandle::new("job".to_string(), CancelToken::new());
        let worker = handle.clone();

        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            worker.finish(completed());
        });

        assert!(handle.wait_timeout(Duration::from_secs(5)));
        assert_eq!(handle.wait().state(), ScanState::Completed);
        t.join().unwrap();
    }

    #[test]
    fn test_finish_guard_marks_cancelled_on_unwind() {
        let handle = ScanHandle::new("job".to_string(), CancelToken::new());
        let worker = handle.clone();

        let result = thread::spawn(move || {
            let _guard = FinishGuard(worker);
            panic!("worker blew up");
        })
        .join();

        assert!(result.is_err());
        assert_eq!(handle.state(), ScanState::Cancelled);
    }
}
