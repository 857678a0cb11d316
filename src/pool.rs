use crate::{
    callable::{CallableRef, UserData},
    sync::{thread, Arc, AtomicBool, AtomicUsize, Condvar, Mutex, Ordering},
};
use core::fmt;
use std::collections::VecDeque;
use tracing::{debug, trace};

/// One queued unit of work: the callable and the payload to invoke it with.
#[derive(Clone, Copy)]
struct Job {
    work: CallableRef,
    data: UserData,
}

struct PoolState {
    /// Shared FIFO queue. Enqueue and dequeue always happen under this lock.
    queue: Mutex<VecDeque<Job>>,
    /// Wakes an idle worker when a job is enqueued or the pool stops.
    work_ready: Condvar,
    /// Submitted-but-unfinished jobs, queued and executing alike. Incremented
    /// at submission, decremented after a job finishes; updated outside the
    /// queue lock.
    outstanding: AtomicUsize,
    /// Pairs with `drained` to park callers of `WorkerPool::drain`.
    drain_lock: Mutex<()>,
    drained: Condvar,
    running: AtomicBool,
}

impl PoolState {
    /// Block until a job is available or the pool is stopping.
    fn next_job(&self) -> Option<Job> {
        let mut queue = self.queue.lock().expect("WorkerPool: queue mutex poisoned");
        loop {
            if !self.running.load(Ordering::Acquire) {
                return None;
            }
            if let Some(job) = queue.pop_front() {
                return Some(job);
            }
            queue = self
                .work_ready
                .wait(queue)
                .expect("WorkerPool: queue mutex poisoned");
        }
    }

    fn finish_one(&self) {
        if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            let _guard = self
                .drain_lock
                .lock()
                .expect("WorkerPool: drain mutex poisoned");
            self.drained.notify_all();
        }
    }
}

fn worker_loop(state: &PoolState) {
    while let Some(job) = state.next_job() {
        trace!("job started");
        job.work.invoke(job.data);
        state.finish_one();
    }
}

/// Fixed-size pool of worker threads sharing one FIFO work queue.
///
/// Workers block when the queue is empty and are woken on submission; no
/// thread spins. Submission never blocks the submitter on task completion.
/// [`WorkerPool::drain`] is the single synchronization point: it parks the
/// caller until every submitted job, queued or executing, has finished.
///
/// There is no cancellation and no timeout: once submitted, a job runs to
/// completion. A job that panics takes its worker thread down with it and is
/// never counted as finished, so a subsequent `drain` will not return; task
/// failures are the task's own responsibility.
///
/// Dropping the pool signals all workers to stop after their current job and
/// joins them: in-flight work completes, queued-but-unstarted work is
/// abandoned.
#[must_use]
pub struct WorkerPool {
    state: Arc<PoolState>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl WorkerPool {
    /// Start a pool with `worker_count` threads.
    ///
    /// # Panics
    ///
    /// Panics if `worker_count` is zero.
    pub fn new(worker_count: usize) -> Self {
        assert!(worker_count >= 1, "WorkerPool requires at least one worker");
        let state = Arc::new(PoolState {
            queue: Mutex::new(VecDeque::new()),
            work_ready: Condvar::new(),
            outstanding: AtomicUsize::new(0),
            drain_lock: Mutex::new(()),
            drained: Condvar::new(),
            running: AtomicBool::new(true),
        });
        let workers = (0..worker_count)
            .map(|_| {
                let state = Arc::clone(&state);
                thread::spawn(move || worker_loop(&state))
            })
            .collect();
        debug!(workers = worker_count, "worker pool started");
        Self { state, workers }
    }

    /// Append a job to the tail of the shared queue and wake a worker.
    ///
    /// The outstanding-work count is raised before the job becomes visible,
    /// so a [`WorkerPool::drain`] racing this call can only over-wait, never
    /// return while the job is still unaccounted for.
    pub fn submit(&self, work: CallableRef, data: UserData) {
        self.state.outstanding.fetch_add(1, Ordering::AcqRel);
        {
            let mut queue = self
                .state
                .queue
                .lock()
                .expect("WorkerPool: queue mutex poisoned");
            queue.push_back(Job { work, data });
        }
        self.state.work_ready.notify_one();
    }

    /// Block until the outstanding-work count reaches zero.
    ///
    /// Count-based, not snapshot-based: jobs submitted while a drain is in
    /// progress extend it. Safe to call repeatedly; returns immediately on
    /// an idle pool.
    pub fn drain(&self) {
        let mut guard = self
            .state
            .drain_lock
            .lock()
            .expect("WorkerPool: drain mutex poisoned");
        while self.state.outstanding.load(Ordering::Acquire) != 0 {
            guard = self
                .state
                .drained
                .wait(guard)
                .expect("WorkerPool: drain mutex poisoned");
        }
        debug!("worker pool drained");
    }

    /// Number of worker threads in the pool.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Number of submitted jobs that have not finished yet, queued and
    /// executing alike.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.outstanding.load(Ordering::Acquire)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        {
            // The stop flag flips under the queue lock so a worker between
            // its running-check and its wait cannot miss the wakeup.
            let _queue = self
                .state
                .queue
                .lock()
                .expect("WorkerPool: queue mutex poisoned");
            self.state.running.store(false, Ordering::Release);
            self.state.work_ready.notify_all();
        }
        for worker in self.workers.drain(..) {
            // A panicking job takes its worker down; shutdown proceeds
            // regardless.
            let _ = worker.join();
        }
        debug!("worker pool stopped");
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers.len())
            .field("pending", &self.pending())
            .finish()
    }
}
