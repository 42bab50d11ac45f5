//! Deferred-call scheduler.
//!
//! [`Scheduler`] runs queued jobs on a single worker task, one after another,
//! in the order they were scheduled. It backs `Events::trigger_defer`:
//!
//! ```rust,ignore
//! use herald_core::{Events, Scheduler};
//!
//! let scheduler = Scheduler::start(1024)?;
//! let events = Events::new().with_scheduler(scheduler.clone());
//!
//! events.trigger_defer("saved", vec![]);   // returns immediately
//! scheduler.shutdown();
//! ```

use std::panic::AssertUnwindSafe;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use crate::error::{ScheduleError, ScheduleResult};

/// A unit of deferred work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Default number of jobs that may be pending at once.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// A FIFO queue of deferred jobs drained by one worker task.
///
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct Scheduler {
    sender: mpsc::Sender<Job>,
    capacity: usize,
    token: CancellationToken,
}

impl Scheduler {
    /// Starts a scheduler on the current tokio runtime.
    pub fn start(capacity: usize) -> ScheduleResult<Self> {
        let handle = Handle::try_current().map_err(|_| ScheduleError::NoRuntime)?;
        Ok(Self::start_on(&handle, capacity))
    }

    /// Starts a scheduler on the given runtime.
    ///
    /// A zero capacity is raised to one.
    pub fn start_on(handle: &Handle, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        let token = CancellationToken::new();

        handle.spawn(run_worker(receiver, token.clone()));
        debug!(capacity, "Scheduler started");

        Self {
            sender,
            capacity,
            token,
        }
    }

    /// Queues a job without waiting.
    pub fn schedule(&self, job: Job) -> ScheduleResult<()> {
        if self.token.is_cancelled() {
            return Err(ScheduleError::Closed);
        }
        self.sender.try_send(job).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => ScheduleError::QueueFull {
                capacity: self.capacity,
            },
            mpsc::error::TrySendError::Closed(_) => ScheduleError::Closed,
        })
    }

    /// Maximum number of pending jobs.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of jobs waiting to run.
    pub fn pending(&self) -> usize {
        self.capacity - self.sender.capacity()
    }

    /// Stops the worker. Jobs still queued are dropped.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Returns `true` once the scheduler no longer accepts jobs.
    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled() || self.sender.is_closed()
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("capacity", &self.capacity)
            .field("pending", &self.pending())
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn run_worker(mut receiver: mpsc::Receiver<Job>, token: CancellationToken) {
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            job = receiver.recv() => {
                let Some(job) = job else { break };
                trace!("Running deferred job");
                if std::panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    error!("Deferred job panicked");
                }
            }
        }
    }
    receiver.close();
    debug!("Scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_jobs_run_in_fifo_order() {
        let scheduler = Scheduler::start(16).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = oneshot::channel();

        for i in 0..5 {
            let seen = Arc::clone(&seen);
            scheduler.schedule(Box::new(move || seen.lock().push(i))).unwrap();
        }
        scheduler
            .schedule(Box::new(move || {
                let _ = done_tx.send(());
            }))
            .unwrap();

        done_rx.await.unwrap();
        assert_eq!(*seen.lock(), [0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_schedule_does_not_run_inline() {
        let scheduler = Scheduler::start(4).unwrap();
        let ran = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&ran);
        let (done_tx, done_rx) = oneshot::channel();

        scheduler
            .schedule(Box::new(move || {
                *flag.lock() = true;
                let _ = done_tx.send(());
            }))
            .unwrap();
        assert!(!*ran.lock());

        done_rx.await.unwrap();
        assert!(*ran.lock());
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_stop_worker() {
        let scheduler = Scheduler::start(4).unwrap();
        let (done_tx, done_rx) = oneshot::channel();

        scheduler.schedule(Box::new(|| panic!("boom"))).unwrap();
        scheduler
            .schedule(Box::new(move || {
                let _ = done_tx.send(());
            }))
            .unwrap();

        tokio::time::timeout(Duration::from_secs(1), done_rx)
            .await
            .expect("worker survived the panic")
            .unwrap();
    }

    #[tokio::test]
    async fn test_queue_full_and_shutdown() {
        let scheduler = Scheduler::start(1).unwrap();
        assert_eq!(scheduler.capacity(), 1);

        // The worker cannot run before this task yields.
        scheduler.schedule(Box::new(|| {})).unwrap();
        assert!(matches!(
            scheduler.schedule(Box::new(|| {})),
            Err(ScheduleError::QueueFull { capacity: 1 })
        ));

        scheduler.shutdown();
        assert!(scheduler.is_closed());
        assert!(matches!(
            scheduler.schedule(Box::new(|| {})),
            Err(ScheduleError::Closed)
        ));
    }

    #[test]
    fn test_start_without_runtime() {
        assert!(matches!(
            Scheduler::start(8),
            Err(ScheduleError::NoRuntime)
        ));
    }
}
