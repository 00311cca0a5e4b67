//! Background pool for frame fetch + decode
//!
//! Uses work-stealing deques: idle workers steal from each other and from
//! the global injector. Jobs never touch player state; they only send a
//! completion back over a channel, so the pool can be swapped for
//! `InlinePool` to get deterministic behavior.

use crossbeam::deque::{Injector, Worker};
use log::trace;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Something that runs load jobs
pub trait WorkerPool: Send + Sync {
    fn execute(&self, job: Job);
}

impl<T: WorkerPool + ?Sized> WorkerPool for Arc<T> {
    fn execute(&self, job: Job) {
        (**self).execute(job)
    }
}

/// Runs every job immediately on the calling thread
#[derive(Debug, Default, Clone, Copy)]
pub struct InlinePool;

impl WorkerPool for InlinePool {
    fn execute(&self, job: Job) {
        job();
    }
}

/// Worker pool with work-stealing
///
/// # Example
/// ```ignore
/// let workers = Workers::new(4)?;
/// workers.execute(Box::new(move || {
///     let _ = tx.send(source.fetch(&locator));
/// }));
/// ```
pub struct Workers {
    injector: Arc<Injector<Job>>,         // Global queue for external tasks
    handles: Vec<thread::JoinHandle<()>>, // Thread handles for proper shutdown
    shutdown: Arc<AtomicBool>,            // Shutdown signal
}

impl Workers {
    /// Create worker pool.
    ///
    /// Recommended: `num_cpus::get() * 3 / 4` (leave room for the render thread).
    pub fn new(num_threads: usize) -> std::io::Result<Self> {
        let num_threads = num_threads.max(1);
        let injector: Arc<Injector<Job>> = Arc::new(Injector::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers_local: Vec<Worker<Job>> = Vec::new();
        let mut stealers = Vec::new();
        let mut handles = Vec::new();

        for _ in 0..num_threads {
            let worker: Worker<Job> = Worker::new_fifo();
            stealers.push(worker.stealer());
            workers_local.push(worker);
        }

        for (worker_id, worker) in workers_local.into_iter().enumerate() {
            let injector = Arc::clone(&injector);
            let worker_shutdown = Arc::clone(&shutdown);
            let stealers = stealers.clone();

            let spawned = thread::Builder::new()
                .name(format!("scrollplay-loader-{}", worker_id))
                .spawn(move || {
                    trace!("Loader {} started", worker_id);

                    loop {
                        // 1. Own queue
                        if let Some(job) = worker.pop() {
                            job();
                            continue;
                        }

                        // 2. Global injector
                        if let Some(job) = injector.steal().success() {
                            job();
                            continue;
                        }

                        // 3. Other workers, oldest first
                        let stolen = stealers
                            .iter()
                            .find_map(|stealer| stealer.steal().success());
                        if let Some(job) = stolen {
                            job();
                            continue;
                        }

                        if worker_shutdown.load(Ordering::Relaxed) {
                            break;
                        }

                        thread::sleep(Duration::from_millis(1));
                    }

                    trace!("Loader {} stopped", worker_id);
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    // Already-started threads exit on their next idle check
                    shutdown.store(true, Ordering::SeqCst);
                    return Err(e);
                }
            }
        }

        trace!("Workers initialized: {} threads (work-stealing)", num_threads);

        Ok(Self {
            injector,
            handles,
            shutdown,
        })
    }

    /// Default sizing: three quarters of the cores, at least one
    pub fn default_thread_count() -> usize {
        (num_cpus::get() * 3 / 4).max(1)
    }

    pub fn thread_count(&self) -> usize {
        self.handles.len()
    }
}

impl WorkerPool for Workers {
    fn execute(&self, job: Job) {
        self.injector.push(job);
    }
}

impl Drop for Workers {
    fn drop(&mut self) {
        let num_threads = self.handles.len();
        trace!("Workers shutting down ({} threads)...", num_threads);

        self.shutdown.store(true, Ordering::SeqCst);

        // In-flight decodes run to completion; don't hang teardown on a slow one
        let deadline = Instant::now() + Duration::from_millis(500);

        for handle in std::mem::take(&mut self.handles) {
            while !handle.is_finished() {
                if Instant::now() >= deadline {
                    trace!("Shutdown timeout reached, exiting anyway");
                    return;
                }
                thread::sleep(Duration::from_millis(1));
            }
            let _ = handle.join();
        }

        trace!("All {} workers stopped", num_threads);
    }
}
