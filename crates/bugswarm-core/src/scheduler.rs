// ── Task scheduler ──
//
// One worker task per connector pops due jobs from a min-heap and runs
// them one at a time. Recurring jobs are fixed-rate: the next due time is
// the previous *scheduled* time plus the period, regardless of how long
// the run took.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// A unit of work the scheduler can run, possibly many times.
#[async_trait]
pub trait ScheduledTask: Send + Sync {
    /// Execute once. Failures are the task's own business; a recurring
    /// task stays scheduled no matter what happens here.
    async fn run(&self);
}

/// Cancellable reference to a scheduled job.
///
/// Cancelling prevents future runs; a run already in progress completes.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: u64,
    token: CancellationToken,
}

impl TaskHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    #[cfg(test)]
    pub(crate) fn for_tests(token: CancellationToken) -> Self {
        Self { id: 0, token }
    }
}

struct Job {
    id: u64,
    task: Arc<dyn ScheduledTask>,
    period: Option<Duration>,
    token: CancellationToken,
}

/// Single-worker timer.
///
/// Must be created inside a Tokio runtime.
pub struct TaskScheduler {
    jobs: mpsc::UnboundedSender<(Instant, Job)>,
    next_id: AtomicU64,
    cancel: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl TaskScheduler {
    pub fn new() -> Self {
        let (jobs, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let worker = tokio::spawn(run_worker(rx, cancel.clone()));
        Self {
            jobs,
            next_id: AtomicU64::new(1),
            cancel,
            worker: Some(worker),
        }
    }

    /// Run `task` once, as soon as the worker is free.
    pub fn schedule_once(&self, task: Arc<dyn ScheduledTask>) -> TaskHandle {
        self.submit(task, None)
    }

    /// Run `task` now and then every `period`, until cancelled.
    pub fn schedule_fixed_rate(&self, task: Arc<dyn ScheduledTask>, period: Duration) -> TaskHandle {
        self.submit(task, Some(period.max(MIN_PERIOD)))
    }

    pub fn is_shutdown(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop the worker. Queued jobs never run; a run in progress is
    /// allowed to finish before this returns.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                debug!(error = %e, "scheduler worker ended abnormally");
            }
        }
    }

    fn submit(&self, task: Arc<dyn ScheduledTask>, period: Option<Duration>) -> TaskHandle {
        let handle = TaskHandle {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            token: self.cancel.child_token(),
        };
        let job = Job {
            id: handle.id,
            task,
            period,
            token: handle.token.clone(),
        };
        if self.jobs.send((Instant::now(), job)).is_err() {
            handle.cancel();
        }
        handle
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Worker ───────────────────────────────────────────────────────────

async fn run_worker(mut rx: mpsc::UnboundedReceiver<(Instant, Job)>, cancel: CancellationToken) {
    // Heap entries are (due, seq); seq breaks ties in submission order.
    let mut queue: BinaryHeap<Reverse<(Instant, u64)>> = BinaryHeap::new();
    let mut jobs: HashMap<u64, Job> = HashMap::new();
    let mut seq: u64 = 0;

    loop {
        let next_due = queue.peek().map(|Reverse((due, _))| *due);
        let wake_at = next_due.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            submitted = rx.recv() => {
                let Some((due, job)) = submitted else { break };
                queue.push(Reverse((due, seq)));
                jobs.insert(seq, job);
                seq += 1;
            }
            () = tokio::time::sleep_until(wake_at), if next_due.is_some() => {
                let Some(Reverse((due, slot))) = queue.pop() else { continue };
                let Some(job) = jobs.remove(&slot) else { continue };
                if job.token.is_cancelled() {
                    trace!(job = job.id, "dropping cancelled job");
                    continue;
                }

                job.task.run().await;

                if let Some(period) = job.period {
                    if job.token.is_cancelled() {
                        continue;
                    }
                    let Some(next) = due.checked_add(period) else {
                        debug!(job = job.id, ?period, "period overflows the clock, retiring job");
                        continue;
                    };
                    queue.push(Reverse((next, seq)));
                    jobs.insert(seq, job);
                    seq += 1;
                }
            }
        }
    }

    debug!(pending = jobs.len(), "scheduler worker exiting");
}
