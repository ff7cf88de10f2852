//! Fixed-size worker pool
//!
//! Long-lived worker threads pull boxed jobs off one shared FIFO queue. All
//! shared state (queue, executing count, alive count, stop flag) lives behind
//! a single mutex with two condition variables:
//! - `work_available`: new work was queued or a stop was requested
//! - `drained`: queue empty and nobody executing, or a worker exited
//!
//! [`WorkerPool::scope`] gives the fork/join shape the simulation tick needs:
//! jobs may borrow from the caller's stack because the scope always drains the
//! pool before returning.

use std::collections::VecDeque;
use std::io;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

/// Thread count used when zero is requested
pub const DEFAULT_THREAD_COUNT: usize = 2;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct PoolState {
    queue: VecDeque<Job>,
    /// Workers currently between dequeue and completion
    working: usize,
    /// Worker threads that have not exited yet
    alive: usize,
    stop: bool,
    /// Jobs that unwound since the pool started
    panicked: usize,
}

struct Shared {
    state: Mutex<PoolState>,
    work_available: Condvar,
    drained: Condvar,
}

/// Fixed set of worker threads consuming a shared FIFO work queue
pub struct WorkerPool {
    shared: Arc<Shared>,
    handles: Vec<JoinHandle<()>>,
    thread_count: usize,
}

impl WorkerPool {
    /// Spawn `thread_count` workers (zero means [`DEFAULT_THREAD_COUNT`]).
    ///
    /// Fails only if the OS refuses to create a thread; workers spawned before
    /// the failure are shut down again.
    pub fn new(thread_count: usize) -> io::Result<Self> {
        let thread_count = if thread_count == 0 {
            DEFAULT_THREAD_COUNT
        } else {
            thread_count
        };

        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState {
                queue: VecDeque::new(),
                working: 0,
                alive: 0,
                stop: false,
                panicked: 0,
            }),
            work_available: Condvar::new(),
            drained: Condvar::new(),
        });

        let mut pool = Self {
            shared,
            handles: Vec::with_capacity(thread_count),
            thread_count,
        };

        for index in 0..thread_count {
            pool.shared.state.lock().alive += 1;
            let shared = Arc::clone(&pool.shared);
            let spawned = thread::Builder::new()
                .name(format!("flocksim-worker-{}", index))
                .spawn(move || worker_loop(shared));

            match spawned {
                Ok(handle) => pool.handles.push(handle),
                Err(e) => {
                    pool.shared.state.lock().alive -= 1;
                    error!("Failed to spawn worker {}: {}", index, e);
                    // Dropping `pool` stops the workers that did start
                    return Err(e);
                }
            }
        }

        info!("Worker pool started with {} threads", thread_count);
        Ok(pool)
    }

    /// Queue a job at the tail of the FIFO.
    ///
    /// Returns false once the pool is shutting down; the job is dropped unrun.
    pub fn add_work<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Box::new(job))
    }

    fn submit(&self, job: Job) -> bool {
        let mut state = self.shared.state.lock();
        if state.stop {
            return false;
        }
        state.queue.push_back(job);
        // Every idle worker races for the item; the losers go back to waiting
        self.shared.work_available.notify_all();
        true
    }

    /// Block until the queue is empty and no worker is executing.
    ///
    /// After a stop request this instead waits for every worker to exit.
    pub fn wait(&self) {
        let mut state = self.shared.state.lock();
        while is_busy(&state) {
            self.shared.drained.wait(&mut state);
        }
    }

    /// Run `f` with a [`Scope`] whose jobs may borrow data living at least as
    /// long as `'scope`. Returns only after every job added through the scope
    /// has finished, including when `f` itself unwinds.
    ///
    /// # Panics
    /// If any job panicked while the scope was open, after the pool drained.
    pub fn scope<'pool, 'scope, F, R>(&'pool self, f: F) -> R
    where
        F: FnOnce(&Scope<'pool, 'scope>) -> R,
    {
        let panicked_before = self.panicked_jobs();
        let result = {
            let _drain = DrainGuard(self);
            let scope = Scope {
                pool: self,
                _marker: PhantomData,
            };
            f(&scope)
        };

        let panicked = self.panicked_jobs() - panicked_before;
        if panicked > 0 {
            panic!("{} worker pool job(s) panicked inside scope", panicked);
        }
        result
    }

    /// Discard queued jobs, stop every worker and wait for them to exit.
    ///
    /// Jobs already executing run to completion. Safe to call more than once.
    pub fn shutdown(&mut self) {
        {
            let mut state = self.shared.state.lock();
            if state.stop && self.handles.is_empty() {
                return;
            }
            let discarded = state.queue.len();
            state.queue.clear();
            state.stop = true;
            self.shared.work_available.notify_all();
            if discarded > 0 {
                debug!("Discarded {} queued jobs on shutdown", discarded);
            }
        }

        self.wait();

        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                warn!("Worker thread exited abnormally");
            }
        }
        info!("Worker pool stopped");
    }

    /// Number of worker threads the pool was created with
    #[inline]
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Workers currently executing a job
    pub fn active_workers(&self) -> usize {
        self.shared.state.lock().working
    }

    /// Jobs queued but not yet picked up
    pub fn pending(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    /// Jobs that panicked since the pool started
    pub fn panicked_jobs(&self) -> usize {
        self.shared.state.lock().panicked
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("thread_count", &self.thread_count)
            .finish_non_exhaustive()
    }
}

/// Handle for queueing borrowed jobs, see [`WorkerPool::scope`]
pub struct Scope<'pool, 'scope> {
    pool: &'pool WorkerPool,
    /// Invariant in `'scope`
    _marker: PhantomData<&'scope mut &'scope ()>,
}

impl<'pool, 'scope> Scope<'pool, 'scope> {
    /// Queue a job that may borrow from the enclosing scope.
    ///
    /// Returns false if the pool is shutting down.
    pub fn add_work<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'scope,
    {
        let job: Box<dyn FnOnce() + Send + 'scope> = Box::new(job);
        // SAFETY: `WorkerPool::scope` holds a `DrainGuard` that waits for the
        // queue to empty and all workers to go idle before the scope returns
        // or unwinds, and shutdown needs `&mut WorkerPool`, which cannot happen
        // while the scope borrows the pool. The job therefore never runs or
        // is dropped after `'scope` ends.
        let job: Job = unsafe {
            std::mem::transmute::<Box<dyn FnOnce() + Send + 'scope>, Job>(job)
        };
        self.pool.submit(job)
    }
}

struct DrainGuard<'a>(&'a WorkerPool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.wait();
    }
}

#[inline]
fn is_busy(state: &PoolState) -> bool {
    !state.queue.is_empty()
        || (!state.stop && state.working != 0)
        || (state.stop && state.alive != 0)
}

fn worker_loop(shared: Arc<Shared>) {
    let mut state = shared.state.lock();
    loop {
        while state.queue.is_empty() && !state.stop {
            shared.work_available.wait(&mut state);
        }
        if state.stop {
            break;
        }

        let job = state.queue.pop_front();
        state.working += 1;

        let panicked = MutexGuard::unlocked(&mut state, || match job {
            Some(job) => run_job(job),
            None => false,
        });

        state.working -= 1;
        if panicked {
            state.panicked += 1;
        }
        if !state.stop && state.working == 0 && state.queue.is_empty() {
            shared.drained.notify_all();
        }
    }

    state.alive -= 1;
    shared.drained.notify_all();
}

/// Run one job, returning true if it panicked
fn run_job(job: Job) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(job)) {
        Ok(()) => false,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(
                "Job panicked on {}: {}",
                thread::current().name().unwrap_or("worker"),
                message
            );
            true
        }
    }
}
