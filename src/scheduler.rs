//! Deferred execution used for answer deadlines and zero-delay advance jobs.
//!
//! Jobs fire at least once at or after their delay and are never cancelled;
//! a job scheduled for a deadline that has since been replaced neutralises
//! itself by re-reading the session and finding the deadline mismatch.

use std::sync::Mutex;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::time::sleep;

/// A deferred unit of work. Jobs own everything they need and re-validate
/// session state when they run.
pub type ScheduledJob = BoxFuture<'static, ()>;

/// One-shot scheduler abstraction.
///
/// The service layer commits its state change first and enqueues the job
/// second, so a crash between the two loses at most one callback, never
/// consistency.
pub trait DeadlineScheduler: Send + Sync {
    /// Run `job` once, no earlier than `delay` from now.
    fn schedule(&self, delay: Duration, job: ScheduledJob);
}

/// Production scheduler: one task per job, sleeping until due.
#[derive(Debug, Default)]
pub struct TokioScheduler;

impl DeadlineScheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, job: ScheduledJob) {
        tokio::spawn(async move {
            if !delay.is_zero() {
                sleep(delay).await;
            }
            job.await;
        });
    }
}

/// Scheduler that buffers jobs instead of running them, so tests decide
/// when and in which order deferred work fires.
#[derive(Default)]
pub struct ManualScheduler {
    queue: Mutex<Vec<(Duration, ScheduledJob)>>,
}

impl ManualScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs waiting to be drained.
    pub fn pending(&self) -> usize {
        self.queue.lock().expect("scheduler queue poisoned").len()
    }

    /// Take every buffered job, in scheduling order, with its delay.
    pub fn drain(&self) -> Vec<(Duration, ScheduledJob)> {
        std::mem::take(&mut *self.queue.lock().expect("scheduler queue poisoned"))
    }
}

impl DeadlineScheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, job: ScheduledJob) {
        self.queue
            .lock()
            .expect("scheduler queue poisoned")
            .push((delay, job));
    }
}
