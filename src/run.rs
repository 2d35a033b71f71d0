//! Run plumbing shared by augmentation and export: the single-run guard,
//! cooperative cancellation, progress reporting and the per-run context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::AugmentConfig;
use crate::error::BoxforgeError;

/// Allows at most one active run at a time.
///
/// Cloning shares the same guard.
#[derive(Clone, Debug, Default)]
pub struct RunGuard {
    active: Arc<AtomicBool>,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a run as started.
    ///
    /// Fails with [`BoxforgeError::RunInProgress`] if another run holds the
    /// guard. The run ends when the returned [`ActiveRun`] is dropped.
    pub fn try_begin(&self) -> Result<ActiveRun, BoxforgeError> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| BoxforgeError::RunInProgress)?;
        Ok(ActiveRun {
            active: Arc::clone(&self.active),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Held for the duration of a run; releases the guard on drop.
#[derive(Debug)]
pub struct ActiveRun {
    active: Arc<AtomicBool>,
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Cooperative cancellation flag.
///
/// Runs check it between images; the image in flight always finishes.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Work done so far out of the run total.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    /// Completion in percent, 0 to 100. An empty run counts as complete.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.completed.min(self.total) as f64 / self.total as f64) * 100.0
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

/// Receives progress updates; `completed` never decreases within a run.
pub trait ProgressSink: Sync {
    fn on_progress(&self, progress: Progress);
}

impl<F> ProgressSink for F
where
    F: Fn(Progress) + Sync,
{
    fn on_progress(&self, progress: Progress) {
        self(progress)
    }
}

/// Sink that ignores every update.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _progress: Progress) {}
}

/// What to do with already produced derived images when a run aborts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialPolicy {
    /// Return them inside the fatal error.
    #[default]
    Keep,
    /// Drop them.
    Discard,
}

/// Everything a run reads: an immutable config snapshot, the cancellation
/// token and the progress sink.
pub struct RunContext<'a> {
    pub config: Arc<AugmentConfig>,
    pub cancel: CancellationToken,
    pub progress: &'a dyn ProgressSink,
}

impl<'a> RunContext<'a> {
    pub fn new(config: Arc<AugmentConfig>, progress: &'a dyn ProgressSink) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
            progress,
        }
    }

    /// Uses an externally owned token so the caller can cancel the run.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn guard_allows_one_run_at_a_time() {
        let guard = RunGuard::new();
        let run = guard.try_begin().expect("first run starts");
        assert!(guard.is_busy());
        assert!(matches!(
            guard.clone().try_begin(),
            Err(BoxforgeError::RunInProgress)
        ));
        drop(run);
        assert!(!guard.is_busy());
        assert!(guard.try_begin().is_ok());
    }

    #[test]
    fn token_clones_share_state() {
        let token = CancellationToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());
        token.cancel();
        assert!(observer.is_cancelled());
    }

    #[test]
    fn percent_is_bounded() {
        assert_eq!(Progress { completed: 0, total: 0 }.percent(), 100.0);
        assert_eq!(Progress { completed: 3, total: 12 }.percent(), 25.0);
        assert_eq!(Progress { completed: 20, total: 10 }.percent(), 100.0);
    }

    #[test]
    fn closures_are_sinks() {
        let seen = Mutex::new(Vec::new());
        let sink = |p: Progress| seen.lock().unwrap().push(p.completed);
        sink.on_progress(Progress { completed: 1, total: 2 });
        sink.on_progress(Progress { completed: 2, total: 2 });
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }
}
