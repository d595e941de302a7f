//! Fixed-size worker pool consuming a shared FIFO job queue.
//!
//! The pool knows nothing about tournaments. It runs boxed closures on a fixed
//! set of OS threads and offers a barrier ([`ThreadPool::join`]) that returns
//! once every queued job has finished. Jobs run in no particular order and on
//! no particular thread; callers give each job disjoint memory to write.
//!
//! A job that panics does not take its worker down: the panic is caught,
//! counted, and reported by the next [`ThreadPool::join`] as
//! [`PoolError::JobPanicked`].
//!
//! # Example
//!
//! ```
//! use std::sync::{
//!     Arc,
//!     atomic::{AtomicUsize, Ordering},
//! };
//!
//! use checkers_training::thread_pool::ThreadPool;
//!
//! let pool = ThreadPool::new(None).unwrap();
//! let counter = Arc::new(AtomicUsize::new(0));
//! for _ in 0..16 {
//!     let counter = Arc::clone(&counter);
//!     pool.add_job(move || {
//!         counter.fetch_add(1, Ordering::Relaxed);
//!     });
//! }
//! pool.join().unwrap();
//! assert_eq!(counter.load(Ordering::Relaxed), 16);
//! ```

use std::{
    collections::VecDeque,
    fmt, io, mem,
    num::NonZeroUsize,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    thread::{self, JoinHandle},
};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Errors reported by [`ThreadPool`].
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum PoolError {
    #[display("failed to spawn worker thread")]
    Spawn(io::Error),
    #[display("{count} job(s) panicked since the last join")]
    JobPanicked { count: usize },
}

#[derive(Default)]
struct State {
    queue: VecDeque<Job>,
    working: usize,
    panicked: usize,
    running: bool,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    work_available: Condvar,
    idle: Condvar,
}

impl Shared {
    // Jobs run outside the lock and under `catch_unwind`, so a poisoned lock
    // still guards consistent state.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, job: Job) {
        let mut state = self.lock();
        if !state.running {
            log::warn!("job submitted to a released thread pool was dropped");
            return;
        }
        state.queue.push_back(job);
        drop(state);
        self.work_available.notify_one();
    }

    fn is_working(&self) -> bool {
        let state = self.lock();
        state.working > 0 || !state.queue.is_empty()
    }
}

/// Cloneable handle for enqueuing jobs, usable from inside other jobs.
#[derive(Clone)]
pub struct PoolHandle {
    shared: Arc<Shared>,
}

impl PoolHandle {
    /// Enqueues a job. See [`ThreadPool::add_job`].
    pub fn add_job<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.push(Box::new(job));
    }
}

impl fmt::Debug for PoolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolHandle").finish_non_exhaustive()
    }
}

/// A fixed set of worker threads consuming one shared job queue.
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("workers", &self.workers.len())
            .finish_non_exhaustive()
    }
}

impl ThreadPool {
    /// Spawns the worker threads.
    ///
    /// `worker_count` defaults to the available hardware parallelism (or one
    /// worker when that cannot be determined).
    pub fn new(worker_count: Option<NonZeroUsize>) -> Result<Self, PoolError> {
        let worker_count = worker_count
            .or_else(|| thread::available_parallelism().ok())
            .map_or(1, NonZeroUsize::get);

        let shared = Arc::new(Shared::default());
        shared.lock().running = true;

        let mut pool = Self {
            shared,
            workers: Vec::with_capacity(worker_count),
        };
        for i in 0..worker_count {
            let shared = Arc::clone(&pool.shared);
            let handle = thread::Builder::new()
                .name(format!("checkers-worker-{i}"))
                .spawn(move || look_for_work(&shared))
                .map_err(PoolError::Spawn)?;
            pool.workers.push(handle);
        }
        log::debug!("thread pool started with {worker_count} workers");
        Ok(pool)
    }

    /// Number of worker threads.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Enqueues a job. Safe to call from any thread, including from a job.
    ///
    /// Jobs submitted after [`ThreadPool::release`] are dropped.
    pub fn add_job<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.push(Box::new(job));
    }

    /// Returns a handle that can enqueue jobs without borrowing the pool.
    #[must_use]
    pub fn handle(&self) -> PoolHandle {
        PoolHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Returns `true` while a job is queued or running.
    #[must_use]
    pub fn is_working(&self) -> bool {
        self.shared.is_working()
    }

    /// Blocks until the queue is empty and no worker is running a job.
    ///
    /// The pool keeps running afterwards. If any job panicked since the last
    /// call, the panics are reported (and the count reset) here.
    pub fn join(&self) -> Result<(), PoolError> {
        let mut state = self.shared.lock();
        while state.working > 0 || !state.queue.is_empty() {
            state = self
                .shared
                .idle
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        match mem::take(&mut state.panicked) {
            0 => Ok(()),
            count => Err(PoolError::JobPanicked { count }),
        }
    }

    /// Stops the pool: unstarted jobs are discarded, running jobs finish, and
    /// every worker thread is joined.
    ///
    /// Calling it more than once is harmless. It is also called on drop.
    pub fn release(&mut self) {
        let discarded = {
            let mut state = self.shared.lock();
            state.running = false;
            mem::take(&mut state.queue).len()
        };
        if discarded > 0 {
            log::debug!("thread pool released, {discarded} queued job(s) discarded");
        }
        self.shared.work_available.notify_all();
        self.shared.idle.notify_all();

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::error!("thread pool worker terminated abnormally");
            }
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.release();
    }
}

fn look_for_work(shared: &Shared) {
    loop {
        let job = {
            let mut state = shared.lock();
            loop {
                if let Some(job) = state.queue.pop_front() {
                    state.working += 1;
                    break job;
                }
                if !state.running {
                    return;
                }
                state = shared
                    .work_available
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        let result = panic::catch_unwind(AssertUnwindSafe(job));

        let mut state = shared.lock();
        state.working -= 1;
        if result.is_err() {
            log::error!("job panicked on {:?}", thread::current().name());
            state.panicked += 1;
        }
        if state.working == 0 && state.queue.is_empty() {
            shared.idle.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use super::*;

    fn pool_with(workers: usize) -> ThreadPool {
        ThreadPool::new(NonZeroUsize::new(workers)).unwrap()
    }

    #[test]
    fn test_default_worker_count_is_nonzero() {
        let pool = ThreadPool::new(None).unwrap();
        assert!(pool.worker_count() >= 1);
    }

    #[test]
    fn test_join_waits_for_all_jobs() {
        let pool = pool_with(4);
        let done = Arc::new(AtomicUsize::new(0));
        for i in 0..64 {
            let done = Arc::clone(&done);
            pool.add_job(move || {
                if i % 8 == 0 {
                    thread::sleep(Duration::from_millis(5));
                }
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.join().unwrap();
        assert!(!pool.is_working());
        assert_eq!(done.load(Ordering::SeqCst), 64);
    }

    #[test]
    fn test_join_on_idle_pool_returns_immediately() {
        let pool = pool_with(2);
        pool.join().unwrap();
        assert!(!pool.is_working());
    }

    #[test]
    fn test_pool_is_reusable_across_joins() {
        let pool = pool_with(3);
        let done = Arc::new(AtomicUsize::new(0));
        for round in 1..=5 {
            for _ in 0..10 {
                let done = Arc::clone(&done);
                pool.add_job(move || {
                    done.fetch_add(1, Ordering::SeqCst);
                });
            }
            pool.join().unwrap();
            assert!(!pool.is_working());
            assert_eq!(done.load(Ordering::SeqCst), round * 10);
        }
    }

    #[test]
    fn test_jobs_can_enqueue_jobs() {
        let pool = pool_with(2);
        let handle = pool.handle();
        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..4 {
            let handle = handle.clone();
            let done = Arc::clone(&done);
            pool.add_job(move || {
                thread::sleep(Duration::from_millis(2));
                let inner = Arc::clone(&done);
                handle.add_job(move || {
                    inner.fetch_add(10, Ordering::SeqCst);
                });
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.join().unwrap();
        assert_eq!(done.load(Ordering::SeqCst), 44);
    }

    #[test]
    fn test_jobs_run_concurrently() {
        let pool = pool_with(4);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        for _ in 0..8 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            pool.add_job(move || {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                running.fetch_sub(1, Ordering::SeqCst);
            });
        }
        pool.join().unwrap();
        assert!(peak.load(Ordering::SeqCst) > 1);
    }

    #[test]
    fn test_panicking_job_is_reported_and_worker_survives() {
        let pool = pool_with(1);
        pool.add_job(|| panic!("evaluator blew up"));
        let err = pool.join().unwrap_err();
        assert!(matches!(err, PoolError::JobPanicked { count: 1 }));

        let done = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&done);
        pool.add_job(move || {
            inner.fetch_add(1, Ordering::SeqCst);
        });
        pool.join().unwrap();
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_release_discards_unstarted_jobs() {
        let mut pool = pool_with(1);
        let started = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        {
            let started = Arc::clone(&started);
            pool.add_job(move || {
                started.fetch_add(1, Ordering::SeqCst);
                let _ = rx.recv_timeout(Duration::from_secs(5));
            });
        }
        while started.load(Ordering::SeqCst) == 0 {
            thread::yield_now();
        }
        for _ in 0..10 {
            let started = Arc::clone(&started);
            pool.add_job(move || {
                started.fetch_add(1, Ordering::SeqCst);
            });
        }
        let releaser = thread::spawn(move || {
            pool.release();
            pool
        });
        thread::sleep(Duration::from_millis(20));
        tx.send(()).unwrap();
        let pool = releaser.join().unwrap();

        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(pool.worker_count(), 0);
        assert!(!pool.is_working());
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut pool = pool_with(2);
        pool.release();
        pool.release();
        pool.add_job(|| unreachable!("released pool must not run jobs"));
        assert!(!pool.is_working());
    }
}
